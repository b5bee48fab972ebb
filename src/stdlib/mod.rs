//! The standard function library.
//!
//! Declarations (what the checker sees) and implementations (what the
//! evaluator dispatches) are registered separately so hosts can check
//! against the full surface while registering only the implementations they
//! ship. The overload ids used on both sides must agree; each submodule
//! keeps its declaration and implementation tables adjacent for that reason.

pub mod core;
pub mod encoders;
pub mod format;
pub mod optional;
pub mod strings;

use crate::decls::EnvBuilder;
use crate::errors::{DeclError, RegistryError};
use crate::registry::FunctionRegistry;
use crate::types::TypeRegistry;

/// Declare the whole standard surface: operators, conversions, the strings
/// and encoders extensions, and optional values.
pub fn standard_declarations<'t>(
    reg: &'t TypeRegistry<'t>,
    env: &mut EnvBuilder<'t>,
) -> Result<(), DeclError> {
    core::declare(reg, env)?;
    strings::declare(reg, env)?;
    encoders::declare(reg, env)?;
    optional::declare(reg, env)?;
    Ok(())
}

/// Register implementations for every declared standard overload.
pub fn standard_functions(funcs: &mut FunctionRegistry) -> Result<(), RegistryError> {
    core::register(funcs)?;
    strings::register(funcs)?;
    encoders::register(funcs)?;
    optional::register(funcs)?;
    Ok(())
}
