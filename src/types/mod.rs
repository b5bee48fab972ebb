pub mod assignability;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod types;

pub use assignability::{is_assignable, is_assignable_all, substitute, type_params, Substitution};
pub use registry::TypeRegistry;
pub use types::Ty;
