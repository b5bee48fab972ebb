//! The type checker.
//!
//! Checking resolves identifiers and qualified names against the declaration
//! environment, infers a type for every node, disambiguates function
//! overloads, and records variable/overload references for the planner. All
//! failures are collected as issues; a failed node checks as `dyn` so that
//! unrelated problems in the same tree still surface.

use hashbrown::HashMap;

use crate::ast::{Comprehension, Constant, Expr, ExprId, ExprKind, MapEntry};
use crate::checker::issues::{CheckedAst, Issue, Reference, Severity, ValidationResult};
use crate::decls::{Env, FunctionDecl, OverloadDecl};
use crate::types::{
    is_assignable, is_assignable_all, substitute, Substitution, Ty, TypeRegistry,
};

#[derive(Debug, Clone)]
pub struct CheckerOptions {
    /// Ceiling on the number of AST nodes visited in one check. Macro
    /// expansion can make pathological inputs exponentially large; the
    /// budget turns that into an ordinary check error.
    pub max_expr_nodes: usize,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        CheckerOptions {
            max_expr_nodes: 10_000,
        }
    }
}

/// Check `expr` against `env`.
pub fn check<'t>(env: &Env<'t>, expr: &Expr, options: &CheckerOptions) -> ValidationResult<'t> {
    let mut checker = Checker {
        env,
        reg: env.registry(),
        types: HashMap::new(),
        references: HashMap::new(),
        issues: Vec::new(),
        scopes: Vec::new(),
        budget: options.max_expr_nodes,
        budget_exhausted: false,
    };
    checker.check_expr(expr);
    ValidationResult::new(
        CheckedAst {
            expr: expr.clone(),
            types: checker.types,
            references: checker.references,
        },
        checker.issues,
    )
}

struct Checker<'t, 'e> {
    env: &'e Env<'t>,
    reg: &'t TypeRegistry<'t>,
    types: HashMap<ExprId, &'t Ty<'t>>,
    references: HashMap<ExprId, Reference>,
    issues: Vec<Issue>,
    /// Comprehension variable scopes, innermost last. Only simple names.
    scopes: Vec<HashMap<String, &'t Ty<'t>>>,
    budget: usize,
    budget_exhausted: bool,
}

impl<'t, 'e> Checker<'t, 'e> {
    fn error(&mut self, expr_id: ExprId, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Error,
            message: message.into(),
            expr_id,
        });
    }

    fn lookup_scope(&self, name: &str) -> Option<&'t Ty<'t>> {
        if name.contains('.') {
            return None;
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn check_expr(&mut self, e: &Expr) -> &'t Ty<'t> {
        if self.budget_exhausted {
            return self.reg.dyn_type();
        }
        if self.budget == 0 {
            self.budget_exhausted = true;
            self.error(e.id, "expression exceeds the configured complexity limit");
            return self.reg.dyn_type();
        }
        self.budget -= 1;

        let ty = match &e.kind {
            ExprKind::Const(c) => self.check_const(c),
            ExprKind::Ident(name) => self.check_ident(e.id, name),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => self.check_select(e, operand, field, *test_only),
            ExprKind::Call {
                target,
                function,
                args,
            } => self.check_call(e.id, target.as_deref(), function, args),
            ExprKind::List {
                elements,
                optional_indices,
            } => self.check_list(elements, optional_indices),
            ExprKind::Map { entries } => self.check_map(e.id, entries),
            ExprKind::Struct {
                type_name, fields, ..
            } => {
                for f in fields {
                    self.check_expr(&f.value);
                }
                self.error(
                    e.id,
                    format!("undeclared struct type '{}'", type_name),
                );
                self.reg.dyn_type()
            }
            ExprKind::Comprehension(c) => self.check_comprehension(c),
        };
        self.types.insert(e.id, ty);
        ty
    }

    fn check_const(&mut self, c: &Constant) -> &'t Ty<'t> {
        match c {
            Constant::Null => self.reg.null(),
            Constant::Bool(_) => self.reg.bool(),
            Constant::Int(_) => self.reg.int(),
            Constant::Uint(_) => self.reg.uint(),
            Constant::Double(_) => self.reg.double(),
            Constant::String(_) => self.reg.string(),
            Constant::Bytes(_) => self.reg.bytes(),
            Constant::Duration(_) => self.reg.duration(),
            Constant::Timestamp(_) => self.reg.timestamp(),
        }
    }

    fn check_ident(&mut self, id: ExprId, name: &str) -> &'t Ty<'t> {
        let env = self.env;
        for candidate in env.container().resolve_candidate_names(name) {
            if let Some(ty) = self.lookup_scope(&candidate) {
                tracing::trace!(name, %candidate, "ident resolved to comprehension variable");
                return ty;
            }
            if let Some(var) = env.find_variable(&candidate) {
                tracing::trace!(name, %candidate, "ident resolved to declared variable");
                self.references
                    .insert(id, Reference::Variable { name: candidate });
                return var.ty;
            }
        }
        self.error(
            id,
            format!(
                "undeclared reference to '{}' (in container '{}')",
                name,
                env.container().name()
            ),
        );
        self.reg.dyn_type()
    }

    fn check_select(
        &mut self,
        e: &Expr,
        operand: &Expr,
        field: &str,
        test_only: bool,
    ) -> &'t Ty<'t> {
        // A select chain over plain identifiers may denote one dotted
        // variable. The longest declared prefix wins, so `x.y` resolves to a
        // declaration named `x.y` before it means field `y` of variable `x`.
        if !test_only {
            if let Some(qualified) = qualified_name(e) {
                let env = self.env;
                for candidate in env.container().resolve_candidate_names(&qualified) {
                    if let Some(var) = env.find_variable(&candidate) {
                        self.references
                            .insert(e.id, Reference::Variable { name: candidate });
                        return var.ty;
                    }
                }
            }
        }

        let operand_ty = self.check_expr(operand);
        let field_ty = self.field_type(e.id, operand_ty, field);
        if test_only {
            self.reg.bool()
        } else {
            field_ty
        }
    }

    fn field_type(&mut self, id: ExprId, operand_ty: &'t Ty<'t>, field: &str) -> &'t Ty<'t> {
        match operand_ty {
            Ty::Dyn | Ty::TypeParam(_) => self.reg.dyn_type(),
            &Ty::Map(key, value) => {
                let mut sub = Substitution::new();
                if !is_assignable(&mut sub, key, self.reg.string()) {
                    self.error(
                        id,
                        format!("type '{}' does not support field selection", operand_ty),
                    );
                    return self.reg.dyn_type();
                }
                value
            }
            // Structs are opaque to the core; field shapes are unknowable
            // without a host type provider.
            Ty::Struct(_) => self.reg.dyn_type(),
            _ => {
                self.error(
                    id,
                    format!("type '{}' does not support field selection", operand_ty),
                );
                self.reg.dyn_type()
            }
        }
    }

    fn check_call(
        &mut self,
        id: ExprId,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
    ) -> &'t Ty<'t> {
        let env = self.env;
        match target {
            None => {
                let arg_tys: Vec<&'t Ty<'t>> = args.iter().map(|a| self.check_expr(a)).collect();
                for candidate in env.container().resolve_candidate_names(function) {
                    if let Some(decl) = env.find_function(&candidate) {
                        return self.resolve_overload(id, &candidate, decl, false, &arg_tys);
                    }
                }
                self.error(
                    id,
                    format!(
                        "undeclared reference to '{}' (in container '{}')",
                        function,
                        env.container().name()
                    ),
                );
                self.reg.dyn_type()
            }
            Some(target) => {
                // `a.b.f(x)` may be function `a.b.f` rather than a member
                // call on the value `a.b`.
                if let Some(chain) = qualified_name(target) {
                    let qualified = format!("{}.{}", chain, function);
                    for candidate in env.container().resolve_candidate_names(&qualified) {
                        if env.find_function(&candidate).is_some() {
                            let arg_tys: Vec<&'t Ty<'t>> =
                                args.iter().map(|a| self.check_expr(a)).collect();
                            let decl = env.find_function(&candidate).unwrap();
                            return self.resolve_overload(id, &candidate, decl, false, &arg_tys);
                        }
                    }
                }

                let mut arg_tys = Vec::with_capacity(args.len() + 1);
                arg_tys.push(self.check_expr(target));
                for a in args {
                    arg_tys.push(self.check_expr(a));
                }
                match env.find_function(function) {
                    Some(decl) => self.resolve_overload(id, function, decl, true, &arg_tys),
                    None => {
                        self.error(
                            id,
                            format!(
                                "undeclared reference to '{}' (in container '{}')",
                                function,
                                env.container().name()
                            ),
                        );
                        self.reg.dyn_type()
                    }
                }
            }
        }
    }

    /// Select the overloads applicable to the given argument types. One
    /// match fixes the result type; several join (to `dyn` on disagreement)
    /// and the runtime picks among them by concrete value kinds.
    fn resolve_overload(
        &mut self,
        id: ExprId,
        fname: &str,
        decl: &FunctionDecl<'t>,
        member: bool,
        arg_tys: &[&'t Ty<'t>],
    ) -> &'t Ty<'t> {
        let candidates: Vec<&OverloadDecl<'t>> = decl
            .overloads
            .iter()
            .filter(|o| o.member == member && o.args.len() == arg_tys.len())
            .collect();
        if candidates.is_empty() {
            self.error(
                id,
                format!(
                    "undeclared reference to '{}' (in container '{}')",
                    fname,
                    self.env.container().name()
                ),
            );
            return self.reg.dyn_type();
        }

        let mut matched: Vec<String> = Vec::new();
        let mut result: Option<&'t Ty<'t>> = None;
        for o in candidates {
            let (inst_args, inst_result) = self.instantiate(o);
            let mut sub = Substitution::new();
            if is_assignable_all(&mut sub, &inst_args, arg_tys) {
                tracing::debug!(function = fname, overload = %o.id, "overload applies");
                matched.push(o.id.clone());
                let r = self.finalize(substitute(self.reg, &sub, inst_result));
                result = Some(match result {
                    None => r,
                    Some(prev) if core::ptr::eq(prev, r) => prev,
                    Some(_) => self.reg.dyn_type(),
                });
            }
        }

        if matched.is_empty() {
            let rendered: Vec<String> = arg_tys.iter().map(|t| t.to_string()).collect();
            self.error(
                id,
                format!(
                    "found no matching overload for '{}' applied to ({})",
                    fname,
                    rendered.join(", ")
                ),
            );
            return self.reg.dyn_type();
        }

        self.references.insert(
            id,
            Reference::Function {
                name: fname.to_string(),
                overload_ids: matched,
            },
        );
        result.unwrap_or_else(|| self.reg.dyn_type())
    }

    /// Rename an overload's type parameters to fresh names so concurrent
    /// call sites cannot interfere.
    fn instantiate(&self, o: &OverloadDecl<'t>) -> (Vec<&'t Ty<'t>>, &'t Ty<'t>) {
        if o.params.is_empty() {
            return (o.args.clone(), o.result);
        }
        let mut renames = Substitution::new();
        for &p in &o.params {
            renames.insert(p, self.reg.fresh_param());
        }
        let args = o
            .args
            .iter()
            .map(|a| substitute(self.reg, &renames, a))
            .collect();
        let result = substitute(self.reg, &renames, o.result);
        (args, result)
    }

    /// Replace instantiation parameters that stayed unbound with `dyn`.
    fn finalize(&self, ty: &'t Ty<'t>) -> &'t Ty<'t> {
        match ty {
            &Ty::TypeParam(name) if name.starts_with('%') => self.reg.dyn_type(),
            &Ty::List(e) => self.reg.list(self.finalize(e)),
            &Ty::Map(k, v) => self.reg.map(self.finalize(k), self.finalize(v)),
            &Ty::Opaque { name, params } => {
                let params: Vec<&'t Ty<'t>> = params.iter().map(|&p| self.finalize(p)).collect();
                self.reg.opaque(name, &params)
            }
            &Ty::Function { result, args } => {
                let args: Vec<&'t Ty<'t>> = args.iter().map(|&a| self.finalize(a)).collect();
                self.reg.function(self.finalize(result), &args)
            }
            &Ty::Wrapper(p) => self.reg.wrapper(self.finalize(p)),
            &Ty::Type(Some(p)) => self.reg.type_of(Some(self.finalize(p))),
            _ => ty,
        }
    }

    fn check_list(&mut self, elements: &[Expr], optional_indices: &[usize]) -> &'t Ty<'t> {
        let mut elem_ty: Option<&'t Ty<'t>> = None;
        for (i, element) in elements.iter().enumerate() {
            let mut ty = self.check_expr(element);
            if optional_indices.contains(&i) {
                ty = self.unwrap_optional(element.id, ty);
            }
            elem_ty = Some(self.join(elem_ty, ty));
        }
        self.reg.list(elem_ty.unwrap_or_else(|| self.reg.dyn_type()))
    }

    fn check_map(&mut self, id: ExprId, entries: &[MapEntry]) -> &'t Ty<'t> {
        let mut key_ty: Option<&'t Ty<'t>> = None;
        let mut value_ty: Option<&'t Ty<'t>> = None;
        for entry in entries {
            let kt = self.check_expr(&entry.key);
            key_ty = Some(self.join(key_ty, kt));
            let mut vt = self.check_expr(&entry.value);
            if entry.optional {
                vt = self.unwrap_optional(entry.value.id, vt);
            }
            value_ty = Some(self.join(value_ty, vt));
        }
        let key_ty = key_ty.unwrap_or_else(|| self.reg.dyn_type());
        let value_ty = value_ty.unwrap_or_else(|| self.reg.dyn_type());
        if !matches!(
            key_ty,
            Ty::Bool | Ty::Int | Ty::Uint | Ty::String | Ty::Dyn | Ty::TypeParam(_)
        ) {
            self.error(id, format!("unsupported map key type '{}'", key_ty));
        }
        self.reg.map(key_ty, value_ty)
    }

    fn unwrap_optional(&mut self, id: ExprId, ty: &'t Ty<'t>) -> &'t Ty<'t> {
        match ty {
            Ty::Opaque { name, params } if *name == "optional_type" && params.len() == 1 => {
                params[0]
            }
            Ty::Dyn => ty,
            _ => {
                self.error(
                    id,
                    format!("expected an optional value, found '{}'", ty),
                );
                self.reg.dyn_type()
            }
        }
    }

    /// The least informative of two element types: equal types keep their
    /// type, anything else widens to `dyn`.
    fn join(&self, prev: Option<&'t Ty<'t>>, next: &'t Ty<'t>) -> &'t Ty<'t> {
        match prev {
            None => next,
            Some(p) if core::ptr::eq(p, next) => p,
            Some(_) => self.reg.dyn_type(),
        }
    }

    fn check_comprehension(&mut self, c: &Comprehension) -> &'t Ty<'t> {
        let range_ty = self.check_expr(&c.iter_range);
        let accu_ty = self.check_expr(&c.accu_init);

        let elem_ty = match range_ty {
            Ty::List(e) => *e,
            Ty::Map(k, _) => *k,
            Ty::Dyn | Ty::TypeParam(_) => self.reg.dyn_type(),
            _ => {
                self.error(
                    c.iter_range.id,
                    format!(
                        "expression of type '{}' cannot be the range of a comprehension",
                        range_ty
                    ),
                );
                self.reg.dyn_type()
            }
        };

        let mut accu_scope = HashMap::new();
        accu_scope.insert(c.accu_var.clone(), accu_ty);
        self.scopes.push(accu_scope);

        let mut iter_scope = HashMap::new();
        iter_scope.insert(c.iter_var.clone(), elem_ty);
        self.scopes.push(iter_scope);

        let cond_ty = self.check_expr(&c.loop_condition);
        let mut sub = Substitution::new();
        if !is_assignable(&mut sub, self.reg.bool(), cond_ty) {
            self.error(
                c.loop_condition.id,
                format!(
                    "expected type 'bool' for comprehension condition, found '{}'",
                    cond_ty
                ),
            );
        }

        let step_ty = self.check_expr(&c.loop_step);
        let mut sub = Substitution::new();
        if !is_assignable(&mut sub, accu_ty, step_ty) {
            self.error(
                c.loop_step.id,
                format!(
                    "comprehension step of type '{}' is not assignable to accumulator type '{}'",
                    step_ty, accu_ty
                ),
            );
        }

        // The iteration variable is not visible to the result expression.
        self.scopes.pop();
        let result_ty = self.check_expr(&c.result);
        self.scopes.pop();

        result_ty
    }
}

/// The dotted name denoted by a chain of plain selects over an identifier,
/// if the expression is such a chain.
fn qualified_name(e: &Expr) -> Option<String> {
    match &e.kind {
        ExprKind::Ident(name) => Some(name.clone()),
        ExprKind::Select {
            operand,
            field,
            test_only: false,
        } => qualified_name(operand).map(|base| format!("{}.{}", base, field)),
        _ => None,
    }
}
