pub mod container;
pub mod env;

pub use container::Container;
pub use env::{Env, EnvBuilder, FunctionDecl, OverloadDecl, VariableDecl};
