//! The declaration environment the checker resolves names against.
//!
//! An [`EnvBuilder`] accumulates variable and function declarations, checking
//! each function overload against the already-registered set as it arrives:
//! two overloads of one function collide when they share the receiver flag
//! and their argument lists are pairwise mutually assignable, and an overload
//! id may not be reused for a different signature. A built [`Env`] is
//! immutable and safe to share across concurrent checks.

use hashbrown::HashMap;

use crate::decls::Container;
use crate::errors::DeclError;
use crate::types::{
    is_assignable_all, type_params, Substitution, Ty, TypeRegistry,
};

/// A name bound to a type. Names may be dotted (`request.auth`).
#[derive(Debug, Clone)]
pub struct VariableDecl<'t> {
    pub name: String,
    pub ty: &'t Ty<'t>,
}

/// One concrete signature of a function.
///
/// For member-style overloads the receiver is `args[0]`.
#[derive(Debug, Clone)]
pub struct OverloadDecl<'t> {
    pub id: String,
    pub member: bool,
    pub args: Vec<&'t Ty<'t>>,
    pub result: &'t Ty<'t>,
    /// Names of the type parameters occurring in the signature.
    pub params: Vec<&'t str>,
}

impl<'t> OverloadDecl<'t> {
    pub fn global(
        id: impl Into<String>,
        args: Vec<&'t Ty<'t>>,
        result: &'t Ty<'t>,
    ) -> OverloadDecl<'t> {
        Self::build(id, false, args, result)
    }

    pub fn member(
        id: impl Into<String>,
        args: Vec<&'t Ty<'t>>,
        result: &'t Ty<'t>,
    ) -> OverloadDecl<'t> {
        Self::build(id, true, args, result)
    }

    fn build(
        id: impl Into<String>,
        member: bool,
        args: Vec<&'t Ty<'t>>,
        result: &'t Ty<'t>,
    ) -> OverloadDecl<'t> {
        let mut params = Vec::new();
        for arg in &args {
            type_params(arg, &mut params);
        }
        type_params(result, &mut params);
        OverloadDecl {
            id: id.into(),
            member,
            args,
            result,
            params,
        }
    }

    /// Whether two overloads cannot be told apart at a call site.
    fn overlaps(&self, other: &OverloadDecl<'t>) -> bool {
        if self.member != other.member || self.args.len() != other.args.len() {
            return false;
        }
        let mut forward = Substitution::new();
        let mut backward = Substitution::new();
        is_assignable_all(&mut forward, &self.args, &other.args)
            && is_assignable_all(&mut backward, &other.args, &self.args)
    }

    fn same_signature(&self, other: &OverloadDecl<'t>) -> bool {
        self.member == other.member
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(other.args.iter())
                .all(|(a, b)| core::ptr::eq(*a, *b))
            && core::ptr::eq(self.result, other.result)
    }
}

/// A function name bound to its non-empty overload set.
#[derive(Debug, Clone)]
pub struct FunctionDecl<'t> {
    pub name: String,
    pub overloads: Vec<OverloadDecl<'t>>,
}

/// The immutable declaration environment.
pub struct Env<'t> {
    registry: &'t TypeRegistry<'t>,
    container: Container,
    variables: HashMap<String, VariableDecl<'t>>,
    functions: HashMap<String, FunctionDecl<'t>>,
}

impl<'t> Env<'t> {
    pub fn registry(&self) -> &'t TypeRegistry<'t> {
        self.registry
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableDecl<'t>> {
        self.variables.get(name)
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl<'t>> {
        self.functions.get(name)
    }
}

type ParamPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Mutable builder for an [`Env`].
pub struct EnvBuilder<'t> {
    registry: &'t TypeRegistry<'t>,
    container: Container,
    variables: HashMap<String, VariableDecl<'t>>,
    functions: HashMap<String, FunctionDecl<'t>>,
    accepts_param: ParamPredicate,
}

impl core::fmt::Debug for EnvBuilder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnvBuilder")
            .field("container", &self.container)
            .field("variables", &self.variables.len())
            .field("functions", &self.functions.len())
            .finish_non_exhaustive()
    }
}

impl<'t> EnvBuilder<'t> {
    pub fn new(registry: &'t TypeRegistry<'t>) -> EnvBuilder<'t> {
        EnvBuilder {
            registry,
            container: Container::default(),
            variables: HashMap::new(),
            functions: HashMap::new(),
            // Single capital letters, optionally digit-suffixed, plus the
            // registry's own fresh names.
            accepts_param: Box::new(|name| {
                let mut chars = name.chars();
                match chars.next() {
                    Some('%') => chars.all(|c| c.is_ascii_digit()),
                    Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_digit()),
                    _ => false,
                }
            }),
        }
    }

    /// Set the namespace expressions are checked inside.
    pub fn container(&mut self, name: impl Into<String>) -> &mut Self {
        self.container = Container::new(name);
        self
    }

    /// Replace the predicate deciding which type-parameter names
    /// declarations may use.
    pub fn accept_type_params(
        &mut self,
        pred: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.accepts_param = Box::new(pred);
        self
    }

    pub fn declare_variable(
        &mut self,
        name: impl Into<String>,
        ty: &'t Ty<'t>,
    ) -> Result<&mut Self, DeclError> {
        let name = name.into();
        self.check_params_accepted(ty)?;
        if self.variables.contains_key(&name) {
            return Err(DeclError::DuplicateVariable { name });
        }
        self.variables
            .insert(name.clone(), VariableDecl { name, ty });
        Ok(self)
    }

    /// Declare a function, merging its overloads into any existing set for
    /// the same name. Collisions and id reuse are rejected here, before any
    /// expression sees the environment.
    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        overloads: Vec<OverloadDecl<'t>>,
    ) -> Result<&mut Self, DeclError> {
        let name = name.into();
        if overloads.is_empty() && !self.functions.contains_key(&name) {
            return Err(DeclError::EmptyFunction { function: name });
        }
        for o in &overloads {
            for arg in &o.args {
                self.check_params_accepted(arg)?;
            }
            self.check_params_accepted(o.result)?;
        }
        let existing = self.functions.entry(name.clone()).or_insert(FunctionDecl {
            name: name.clone(),
            overloads: Vec::new(),
        });
        for new in overloads {
            if let Some(old) = existing.overloads.iter().find(|o| o.id == new.id) {
                if old.same_signature(&new) {
                    // Idempotent redeclaration.
                    continue;
                }
                return Err(DeclError::OverloadRedeclared { id: new.id });
            }
            if let Some(old) = existing.overloads.iter().find(|o| o.overlaps(&new)) {
                return Err(DeclError::OverloadCollision {
                    function: name.clone(),
                    new_id: new.id,
                    existing_id: old.id.clone(),
                });
            }
            existing.overloads.push(new);
        }
        Ok(self)
    }

    fn check_params_accepted(&self, ty: &'t Ty<'t>) -> Result<(), DeclError> {
        let mut params = Vec::new();
        type_params(ty, &mut params);
        for p in params {
            if !(self.accepts_param)(p) {
                return Err(DeclError::RejectedTypeParam {
                    name: p.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn build(self) -> Env<'t> {
        Env {
            registry: self.registry,
            container: self.container,
            variables: self.variables,
            functions: self.functions,
        }
    }
}
