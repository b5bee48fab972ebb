pub mod adapters;
#[allow(clippy::module_inception)]
pub mod registry;

pub use adapters::{binary, from_fn, ternary, unary, FromVal, IntoVal};
pub use registry::{FunctionRegistry, Overload, Strictness};
