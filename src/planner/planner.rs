//! Lowering from a checked AST to a step program.
//!
//! The planner walks the tree in post-order and emits steps so that after a
//! subexpression's steps run, the stack holds exactly that subexpression's
//! value. It tracks the operand stack precisely while emitting, so the
//! resulting program carries an exact stack bound; it also owns slot
//! allocation for comprehension variables and lazy bindings. Planning is a
//! pure function of the checked AST and the registry: replanning an
//! unchanged tree yields an identical step list.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::ast::{Comprehension, Constant, Expr, ExprId, ExprKind};
use crate::checker::{CheckedAst, Reference};
use crate::errors::PlanError;
use crate::operators;
use crate::planner::steps::{CallOp, Op, Program, Step};
use crate::registry::{FunctionRegistry, Overload};
use crate::values::Val;

pub fn plan(ast: &CheckedAst<'_>, registry: &FunctionRegistry) -> Result<Program, PlanError> {
    let mut planner = Planner {
        ast,
        registry,
        steps: Vec::new(),
        subexprs: Vec::new(),
        subexpr_maxes: Vec::new(),
        scopes: Vec::new(),
        slot_count: 0,
        cur_depth: 0,
        max_depth: 0,
    };
    planner.plan_expr(&ast.expr)?;
    debug_assert_eq!(planner.cur_depth, 1, "program must leave a single value");

    let max_stack = planner.max_depth + planner.subexpr_maxes.iter().sum::<usize>();
    tracing::debug!(
        steps = planner.steps.len(),
        subexprs = planner.subexprs.len(),
        slots = planner.slot_count,
        max_stack,
        "planned program"
    );
    Ok(Program {
        steps: planner.steps,
        subexprs: planner.subexprs,
        slot_count: planner.slot_count,
        max_stack,
    })
}

#[derive(Debug, Clone, Copy)]
enum Binding {
    Slot(usize),
    Lazy { slot: usize, subexpr: usize },
}

struct Planner<'a, 't> {
    ast: &'a CheckedAst<'t>,
    registry: &'a FunctionRegistry,
    steps: Vec<Step>,
    subexprs: Vec<Vec<Step>>,
    subexpr_maxes: Vec<usize>,
    scopes: Vec<HashMap<String, Binding>>,
    slot_count: usize,
    cur_depth: usize,
    max_depth: usize,
}

impl<'a, 't> Planner<'a, 't> {
    fn emit(&mut self, op: Op, expr_id: ExprId) -> usize {
        self.steps.push(Step { op, expr_id });
        self.steps.len() - 1
    }

    fn patch(&mut self, at: usize, target: usize) {
        let offset = target as isize - at as isize;
        match &mut self.steps[at].op {
            Op::Jump { offset: o }
            | Op::JumpIfFalse { offset: o, .. }
            | Op::JumpIfTrue { offset: o, .. }
            | Op::JumpIfNotBool { offset: o }
            | Op::IterInit {
                exit_offset: o, ..
            }
            | Op::IterNext { offset: o, .. } => *o = offset,
            other => unreachable!("patching non-jump step {:?}", other),
        }
    }

    fn label(&self) -> usize {
        self.steps.len()
    }

    fn push_stack(&mut self) {
        self.cur_depth += 1;
        if self.cur_depth > self.max_depth {
            self.max_depth = self.cur_depth;
        }
    }

    fn pop_stack(&mut self, n: usize) {
        debug_assert!(self.cur_depth >= n, "planner stack underflow");
        self.cur_depth -= n;
    }

    fn alloc_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    fn lookup_scope(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn plan_expr(&mut self, e: &Expr) -> Result<(), PlanError> {
        match &e.kind {
            ExprKind::Const(c) => {
                let v = const_val(c);
                self.emit(Op::PushConst(v), e.id);
                self.push_stack();
                Ok(())
            }
            ExprKind::Ident(name) => self.plan_ident(e.id, name),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => self.plan_select(e, operand, field, *test_only),
            ExprKind::Call {
                target,
                function,
                args,
            } => self.plan_call(e, target.as_deref(), function, args),
            ExprKind::List {
                elements,
                optional_indices,
            } => {
                for element in elements {
                    self.plan_expr(element)?;
                }
                self.pop_stack(elements.len());
                self.emit(
                    Op::MakeList {
                        size: elements.len(),
                        optionals: optional_indices.clone().into(),
                    },
                    e.id,
                );
                self.push_stack();
                Ok(())
            }
            ExprKind::Map { entries } => {
                let mut optionals = Vec::new();
                for (i, entry) in entries.iter().enumerate() {
                    self.plan_expr(&entry.key)?;
                    self.plan_expr(&entry.value)?;
                    if entry.optional {
                        optionals.push(i);
                    }
                }
                self.pop_stack(entries.len() * 2);
                self.emit(
                    Op::MakeMap {
                        size: entries.len(),
                        optionals: optionals.into(),
                    },
                    e.id,
                );
                self.push_stack();
                Ok(())
            }
            ExprKind::Struct { type_name, .. } => Err(PlanError::OpaqueStruct {
                type_name: type_name.clone(),
            }),
            ExprKind::Comprehension(c) => self.plan_comprehension(e.id, c),
        }
    }

    fn plan_ident(&mut self, id: ExprId, name: &str) -> Result<(), PlanError> {
        if let Some(binding) = self.lookup_scope(name) {
            match binding {
                Binding::Slot(slot) => {
                    self.emit(Op::LoadSlot { slot }, id);
                }
                Binding::Lazy { slot, subexpr } => {
                    self.emit(Op::CheckInit { slot, subexpr }, id);
                }
            }
            self.push_stack();
            return Ok(());
        }
        match self.ast.references.get(&id) {
            Some(Reference::Variable { name }) => {
                self.emit(
                    Op::Resolve {
                        name: name.as_str().into(),
                    },
                    id,
                );
                self.push_stack();
                Ok(())
            }
            _ => Err(PlanError::MissingReference {
                id,
                name: name.to_string(),
            }),
        }
    }

    fn plan_select(
        &mut self,
        e: &Expr,
        operand: &Expr,
        field: &str,
        test_only: bool,
    ) -> Result<(), PlanError> {
        // A select chain the checker folded into one variable reference
        // plans as a single resolve; the operand chain is never evaluated.
        if let Some(Reference::Variable { name }) = self.ast.references.get(&e.id) {
            self.emit(
                Op::Resolve {
                    name: name.as_str().into(),
                },
                e.id,
            );
            self.push_stack();
            return Ok(());
        }
        self.plan_expr(operand)?;
        self.pop_stack(1);
        self.emit(
            Op::Select {
                field: field.into(),
                test_only,
            },
            e.id,
        );
        self.push_stack();
        Ok(())
    }

    fn plan_call(
        &mut self,
        e: &Expr,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
    ) -> Result<(), PlanError> {
        if target.is_none() && args.len() == 2 && function == operators::LOGICAL_AND {
            return self.plan_logic(e.id, &args[0], &args[1], true);
        }
        if target.is_none() && args.len() == 2 && function == operators::LOGICAL_OR {
            return self.plan_logic(e.id, &args[0], &args[1], false);
        }
        if target.is_none() && args.len() == 3 && function == operators::CONDITIONAL {
            return self.plan_conditional(e.id, &args[0], &args[1], &args[2]);
        }

        let Some(Reference::Function { name, overload_ids }) = self.ast.references.get(&e.id)
        else {
            return Err(PlanError::MissingReference {
                id: e.id,
                name: function.to_string(),
            });
        };
        if overload_ids.is_empty() {
            return Err(PlanError::EmptyCandidateSet { id: e.id });
        }

        // A member-style call whose resolved name differs from the call's
        // own function name was a namespaced global; its target is a
        // namespace, not a value.
        let member_call = target.is_some() && name == function;
        let mut argc = args.len();
        if member_call {
            self.plan_expr(target.unwrap())?;
            argc += 1;
        }
        for arg in args {
            self.plan_expr(arg)?;
        }

        let mut overloads: Vec<Arc<Overload>> = Vec::with_capacity(overload_ids.len());
        for id in overload_ids {
            let overload =
                self.registry
                    .find_by_id(id)
                    .cloned()
                    .ok_or_else(|| PlanError::MissingOverload {
                        id: id.clone(),
                    })?;
            overloads.push(overload);
        }

        self.pop_stack(argc);
        self.emit(
            Op::Call(CallOp {
                function: name.as_str().into(),
                overloads,
                argc,
            }),
            e.id,
        );
        self.push_stack();
        Ok(())
    }

    /// `a && b` / `a || b`: evaluate the left side, jump over the right when
    /// it already decides the outcome, otherwise merge commutatively so a
    /// deciding right side beats a left error or unknown.
    fn plan_logic(
        &mut self,
        id: ExprId,
        left: &Expr,
        right: &Expr,
        is_and: bool,
    ) -> Result<(), PlanError> {
        self.plan_expr(left)?;
        let short = if is_and {
            self.emit(
                Op::JumpIfFalse {
                    offset: 0,
                    pop: false,
                },
                id,
            )
        } else {
            self.emit(
                Op::JumpIfTrue {
                    offset: 0,
                    pop: false,
                },
                id,
            )
        };
        self.plan_expr(right)?;
        self.pop_stack(2);
        self.emit(if is_and { Op::LogicAnd } else { Op::LogicOr }, id);
        self.push_stack();
        let end = self.label();
        self.patch(short, end);
        Ok(())
    }

    /// `c ? t : e`: only the selected branch runs; a non-bool condition
    /// (error or unknown) is itself the result.
    fn plan_conditional(
        &mut self,
        id: ExprId,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
    ) -> Result<(), PlanError> {
        self.plan_expr(cond)?;
        let bypass = self.emit(Op::JumpIfNotBool { offset: 0 }, id);
        let to_else = self.emit(
            Op::JumpIfFalse {
                offset: 0,
                pop: true,
            },
            id,
        );
        self.pop_stack(1);

        let depth_before = self.cur_depth;
        self.plan_expr(then_branch)?;
        let to_end = self.emit(Op::Jump { offset: 0 }, id);

        let else_label = self.label();
        self.patch(to_else, else_label);
        // Only one branch runs; both share the same stack window.
        self.cur_depth = depth_before;
        self.plan_expr(else_branch)?;

        let end = self.label();
        self.patch(to_end, end);
        self.patch(bypass, end);
        self.cur_depth = depth_before + 1;
        Ok(())
    }

    fn plan_comprehension(&mut self, id: ExprId, c: &Comprehension) -> Result<(), PlanError> {
        if is_bind(c) {
            return self.plan_bind(id, c);
        }

        let iter_slot = self.alloc_slot();
        let iter_var_slot = self.alloc_slot();
        let accu_slot = self.alloc_slot();
        let depth_before = self.cur_depth;

        self.plan_expr(&c.iter_range)?;
        let init = self.emit(
            Op::IterInit {
                iter_slot,
                exit_offset: 0,
            },
            c.iter_range.id,
        );
        self.pop_stack(1);

        self.plan_expr(&c.accu_init)?;
        self.emit(Op::AssignSlotAndPop { slot: accu_slot }, c.accu_init.id);
        self.pop_stack(1);

        let mut scope = HashMap::new();
        scope.insert(c.accu_var.clone(), Binding::Slot(accu_slot));
        scope.insert(c.iter_var.clone(), Binding::Slot(iter_var_slot));
        self.scopes.push(scope);

        let header = self.label();
        self.plan_expr(&c.loop_condition)?;
        let cond_bypass = self.emit(Op::JumpIfNotBool { offset: 0 }, c.loop_condition.id);
        let cond_exit = self.emit(
            Op::JumpIfFalse {
                offset: 0,
                pop: true,
            },
            c.loop_condition.id,
        );
        self.pop_stack(1);

        let next = self.emit(
            Op::IterNext {
                iter_slot,
                offset: 0,
            },
            id,
        );
        self.push_stack();
        self.emit(
            Op::AssignSlotAndPop {
                slot: iter_var_slot,
            },
            id,
        );
        self.pop_stack(1);

        self.plan_expr(&c.loop_step)?;
        self.emit(Op::AssignSlotAndPop { slot: accu_slot }, c.loop_step.id);
        self.pop_stack(1);
        let back = self.emit(Op::Jump { offset: 0 }, id);
        self.patch(back, header);

        // Result sequence: reached from the loop condition turning false or
        // the iterator running dry, both at the pre-loop stack depth.
        let result_label = self.label();
        self.patch(cond_exit, result_label);
        self.patch(next, result_label);
        self.cur_depth = depth_before;
        self.plan_expr(&c.result)?;

        // Exit: the comprehension value is on the stack — the result, or an
        // error/unknown that bypassed the loop.
        let exit = self.label();
        self.patch(init, exit);
        self.patch(cond_bypass, exit);
        self.cur_depth = depth_before + 1;

        self.scopes.pop();
        self.emit(Op::ClearSlot { slot: iter_slot }, id);
        self.emit(
            Op::ClearSlot {
                slot: iter_var_slot,
            },
            id,
        );
        self.emit(Op::ClearSlot { slot: accu_slot }, id);
        Ok(())
    }

    /// A bind-shaped comprehension (empty range, constant-false condition)
    /// is a lazily initialized alias: the initializer moves into the
    /// subexpression catalog and every reference site becomes a memoizing
    /// `CheckInit`.
    fn plan_bind(&mut self, id: ExprId, c: &Comprehension) -> Result<(), PlanError> {
        let slot = self.alloc_slot();
        let subexpr = self.plan_subexpr(&c.accu_init, slot)?;

        let mut scope = HashMap::new();
        scope.insert(c.accu_var.clone(), Binding::Lazy { slot, subexpr });
        self.scopes.push(scope);

        self.plan_expr(&c.result)?;

        self.scopes.pop();
        self.emit(Op::ClearSlot { slot }, id);
        Ok(())
    }

    /// Plan an initializer into the subexpression catalog. The emitted list
    /// ends with a non-popping `AssignSlot`, so running it both memoizes
    /// `slot` and leaves the value on the stack for the reference site.
    fn plan_subexpr(&mut self, e: &Expr, slot: usize) -> Result<usize, PlanError> {
        let saved_steps = core::mem::take(&mut self.steps);
        let saved_cur = self.cur_depth;
        let saved_max = self.max_depth;
        self.cur_depth = 0;
        self.max_depth = 0;

        self.plan_expr(e)?;
        self.emit(Op::AssignSlot { slot }, e.id);
        debug_assert_eq!(self.cur_depth, 1, "subexpression must leave one value");

        let steps = core::mem::replace(&mut self.steps, saved_steps);
        self.subexpr_maxes.push(self.max_depth);
        self.cur_depth = saved_cur;
        self.max_depth = saved_max;
        self.subexprs.push(steps);
        Ok(self.subexprs.len() - 1)
    }
}

fn is_bind(c: &Comprehension) -> bool {
    matches!(&c.iter_range.kind, ExprKind::List { elements, .. } if elements.is_empty())
        && matches!(
            &c.loop_condition.kind,
            ExprKind::Const(Constant::Bool(false))
        )
}

fn const_val(c: &Constant) -> Val {
    match c {
        Constant::Null => Val::Null,
        Constant::Bool(b) => Val::Bool(*b),
        Constant::Int(i) => Val::Int(*i),
        Constant::Uint(u) => Val::Uint(*u),
        Constant::Double(d) => Val::Double(*d),
        Constant::String(s) => Val::string(s.as_str()),
        Constant::Bytes(b) => Val::bytes(b.clone()),
        Constant::Duration(d) => Val::Duration(*d),
        Constant::Timestamp(t) => Val::Timestamp(*t),
    }
}
