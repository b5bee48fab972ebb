use core::fmt::Display;

use hashbrown::HashMap;
use serde::Serialize;

use crate::ast::{Expr, ExprId};
use crate::types::Ty;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Deprecated,
}

/// One diagnostic produced while checking, anchored to an AST node.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    pub expr_id: ExprId,
}

impl Display for Issue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Information => "INFO",
            Severity::Deprecated => "DEPRECATED",
        };
        write!(f, "{}: {} (expr {})", tag, self.message, self.expr_id)
    }
}

/// What a name-bearing node resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A declared variable, by fully qualified name.
    Variable { name: String },
    /// A function call with its candidate overloads. `name` is the resolved
    /// (possibly container-qualified) function name, which differs from the
    /// call's own function name when a member-style call turned out to be a
    /// namespaced global.
    Function {
        name: String,
        overload_ids: Vec<String>,
    },
}

/// The checker's output: the input tree plus its annotation maps.
///
/// Both maps are complete for every node that participates in evaluation;
/// nodes folded into a qualified-name reference (the operand chain of a
/// select that resolved as one variable) stay unannotated because the
/// planner never descends into them.
#[derive(Debug, Clone)]
pub struct CheckedAst<'t> {
    pub expr: Expr,
    pub types: HashMap<ExprId, &'t Ty<'t>>,
    pub references: HashMap<ExprId, Reference>,
}

impl<'t> CheckedAst<'t> {
    /// The annotated type of the root expression.
    pub fn result_type(&self) -> Option<&'t Ty<'t>> {
        self.types.get(&self.expr.id).copied()
    }
}

/// A check that did not produce a usable AST.
#[derive(Debug, Clone)]
pub struct CheckFailure {
    pub issues: Vec<Issue>,
}

impl Display for CheckFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckFailure {}

/// The outcome of a check: an annotated AST when no error-severity issue was
/// recorded, and the collected issues either way.
#[derive(Debug)]
pub struct ValidationResult<'t> {
    ast: Option<CheckedAst<'t>>,
    issues: Vec<Issue>,
}

impl<'t> ValidationResult<'t> {
    pub(crate) fn new(ast: CheckedAst<'t>, issues: Vec<Issue>) -> ValidationResult<'t> {
        let valid = !issues.iter().any(|i| i.severity == Severity::Error);
        ValidationResult {
            ast: valid.then_some(ast),
            issues,
        }
    }

    /// Whether the tree checked without errors. Warnings and informational
    /// issues do not invalidate a result.
    pub fn is_valid(&self) -> bool {
        self.ast.is_some()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn ast(&self) -> Option<&CheckedAst<'t>> {
        self.ast.as_ref()
    }

    pub fn into_ast(self) -> Result<CheckedAst<'t>, CheckFailure> {
        match self.ast {
            Some(ast) => Ok(ast),
            None => Err(CheckFailure {
                issues: self.issues,
            }),
        }
    }
}
