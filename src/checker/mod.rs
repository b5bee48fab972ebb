#[allow(clippy::module_inception)]
pub mod checker;
pub mod issues;

pub use checker::{check, CheckerOptions};
pub use issues::{
    CheckFailure, CheckedAst, Issue, Reference, Severity, ValidationResult,
};
