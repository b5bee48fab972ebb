//! The runtime function registry.
//!
//! The registry maps function names to overload implementations and overload
//! ids to the same implementations; the planner resolves the checker's
//! recorded candidate ids through the latter index and bakes the handles
//! into call steps, so the evaluator never searches by name.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::errors::RegistryError;
use crate::values::{Kind, Val};

/// When an overload's implementation sees its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Invoked only after error/unknown propagation; arguments are plain
    /// values.
    Strict,
    /// Receives the raw argument values, errors and unknowns included.
    Lazy,
}

type Imp = Box<dyn Fn(&[Val]) -> Val + Send + Sync>;

/// One runtime overload: a kind signature plus the host function
/// implementing it.
pub struct Overload {
    pub id: String,
    /// Expected kind per argument; `None` accepts any kind.
    pub arg_kinds: Vec<Option<Kind>>,
    pub strictness: Strictness,
    imp: Imp,
}

impl Overload {
    pub fn strict(
        id: impl Into<String>,
        arg_kinds: Vec<Option<Kind>>,
        imp: impl Fn(&[Val]) -> Val + Send + Sync + 'static,
    ) -> Overload {
        Overload {
            id: id.into(),
            arg_kinds,
            strictness: Strictness::Strict,
            imp: Box::new(imp),
        }
    }

    pub fn lazy(
        id: impl Into<String>,
        argc: usize,
        imp: impl Fn(&[Val]) -> Val + Send + Sync + 'static,
    ) -> Overload {
        Overload {
            id: id.into(),
            arg_kinds: vec![None; argc],
            strictness: Strictness::Lazy,
            imp: Box::new(imp),
        }
    }

    pub fn argc(&self) -> usize {
        self.arg_kinds.len()
    }

    /// Whether the concrete argument kinds fit this overload's signature.
    pub fn matches(&self, args: &[Val]) -> bool {
        self.arg_kinds.len() == args.len()
            && self
                .arg_kinds
                .iter()
                .zip(args.iter())
                .all(|(expected, arg)| match expected {
                    None => true,
                    Some(kind) => arg.kind() == *kind,
                })
    }

    pub fn invoke(&self, args: &[Val]) -> Val {
        (self.imp)(args)
    }
}

impl core::fmt::Debug for Overload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Overload")
            .field("id", &self.id)
            .field("arg_kinds", &self.arg_kinds)
            .field("strictness", &self.strictness)
            .finish()
    }
}

/// Host function implementations, indexed by function name and overload id.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    by_name: HashMap<String, Vec<Arc<Overload>>>,
    by_id: HashMap<String, Arc<Overload>>,
}

impl FunctionRegistry {
    pub fn new() -> FunctionRegistry {
        FunctionRegistry::default()
    }

    pub fn register(
        &mut self,
        function: impl Into<String>,
        overload: Overload,
    ) -> Result<(), RegistryError> {
        if self.by_id.contains_key(&overload.id) {
            return Err(RegistryError::DuplicateOverloadId { id: overload.id });
        }
        let overload = Arc::new(overload);
        self.by_id
            .insert(overload.id.clone(), Arc::clone(&overload));
        self.by_name
            .entry(function.into())
            .or_default()
            .push(overload);
        Ok(())
    }

    pub fn find(&self, function: &str) -> &[Arc<Overload>] {
        self.by_name
            .get(function)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Arc<Overload>> {
        self.by_id.get(id)
    }
}
