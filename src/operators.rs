//! Canonical names for the language's built-in operators.
//!
//! Operators are ordinary function calls in the AST; a front end rewrites
//! `a + b` into `_+_(a, b)` and so on. The mangled names below cannot collide
//! with user identifiers.

pub const ADD: &str = "_+_";
pub const SUBTRACT: &str = "_-_";
pub const MULTIPLY: &str = "_*_";
pub const DIVIDE: &str = "_/_";
pub const MODULO: &str = "_%_";
pub const NEGATE: &str = "-_";

pub const LOGICAL_AND: &str = "_&&_";
pub const LOGICAL_OR: &str = "_||_";
pub const LOGICAL_NOT: &str = "!_";
pub const CONDITIONAL: &str = "_?_:_";

pub const EQUALS: &str = "_==_";
pub const NOT_EQUALS: &str = "_!=_";
pub const LESS: &str = "_<_";
pub const LESS_EQUALS: &str = "_<=_";
pub const GREATER: &str = "_>_";
pub const GREATER_EQUALS: &str = "_>=_";

pub const INDEX: &str = "_[_]_";
pub const IN: &str = "@in";

/// Used by the comprehension expansions of `all` and `exists`: true for every
/// input except a strict boolean `false`, so errors and unknowns do not abort
/// a loop that could still short-circuit.
pub const NOT_STRICTLY_FALSE: &str = "@not_strictly_false";

/// Returns true when `function` is lowered to dedicated steps by the planner
/// rather than dispatched through the function registry.
pub fn is_planner_special(function: &str) -> bool {
    matches!(function, LOGICAL_AND | LOGICAL_OR | CONDITIONAL)
}
