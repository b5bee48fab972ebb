//! The abstract syntax tree consumed by the checker.
//!
//! Trees arrive from an external front end; every node carries a stable
//! integer id assigned at parse time, which the checker's annotation maps and
//! the evaluator's diagnostics key on. [`SourceBuilder`] allocates ids for
//! hosts (and tests) that construct trees programmatically.
//!
//! Higher-order operations (`all`, `exists`, `map`, `filter`, `bind`) do not
//! exist at this level: front ends macro-expand them into the single
//! comprehension form. [`macros`] provides the canonical expansions.

use chrono::{DateTime, TimeDelta, Utc};

pub type ExprId = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Duration(TimeDelta),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Const(Constant),

    /// A possibly dotted identifier (`a`, or `.a` for a container-absolute
    /// reference).
    Ident(String),

    /// Field selection; with `test_only` the node answers presence instead
    /// of producing the field value (the `has()` macro).
    Select {
        operand: Box<Expr>,
        field: String,
        test_only: bool,
    },

    /// A function call, member-style when `target` is present.
    Call {
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },

    /// A list literal. Elements at `optional_indices` must evaluate to
    /// optional values and are spliced out when absent.
    List {
        elements: Vec<Expr>,
        optional_indices: Vec<usize>,
    },

    /// A map literal.
    Map { entries: Vec<MapEntry> },

    /// A struct literal over a named message type. The core has no type
    /// provider, so these check and plan as errors; the shape is consumed
    /// for hosts that post-process the tree.
    Struct {
        type_name: String,
        fields: Vec<FieldEntry>,
    },

    /// The single looping construct.
    Comprehension(Box<Comprehension>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub id: ExprId,
    pub key: Expr,
    pub value: Expr,
    /// When set, the value must be an optional; absent entries are omitted.
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub id: ExprId,
    pub field: String,
    pub value: Expr,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub iter_var: String,
    pub iter_range: Expr,
    pub accu_var: String,
    pub accu_init: Expr,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

impl Expr {
    /// Number of nodes in this subtree. The checker charges its complexity
    /// budget per visited node; this gives front ends the same measure up
    /// front.
    pub fn node_count(&self) -> usize {
        let children = match &self.kind {
            ExprKind::Const(_) | ExprKind::Ident(_) => 0,
            ExprKind::Select { operand, .. } => operand.node_count(),
            ExprKind::Call { target, args, .. } => {
                target.as_ref().map(|t| t.node_count()).unwrap_or(0)
                    + args.iter().map(|a| a.node_count()).sum::<usize>()
            }
            ExprKind::List { elements, .. } => elements.iter().map(|e| e.node_count()).sum(),
            ExprKind::Map { entries } => entries
                .iter()
                .map(|e| e.key.node_count() + e.value.node_count())
                .sum(),
            ExprKind::Struct { fields, .. } => {
                fields.iter().map(|f| f.value.node_count()).sum()
            }
            ExprKind::Comprehension(c) => {
                c.iter_range.node_count()
                    + c.accu_init.node_count()
                    + c.loop_condition.node_count()
                    + c.loop_step.node_count()
                    + c.result.node_count()
            }
        };
        children + 1
    }
}

/// Allocates expression nodes with monotonically increasing ids, the way a
/// front end would while parsing one source string.
#[derive(Debug, Default)]
pub struct SourceBuilder {
    next_id: ExprId,
}

impl SourceBuilder {
    pub fn new() -> SourceBuilder {
        SourceBuilder { next_id: 0 }
    }

    pub fn next_id(&mut self) -> ExprId {
        self.next_id += 1;
        self.next_id
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
        }
    }

    pub fn const_null(&mut self) -> Expr {
        self.expr(ExprKind::Const(Constant::Null))
    }

    pub fn const_bool(&mut self, v: bool) -> Expr {
        self.expr(ExprKind::Const(Constant::Bool(v)))
    }

    pub fn const_int(&mut self, v: i64) -> Expr {
        self.expr(ExprKind::Const(Constant::Int(v)))
    }

    pub fn const_uint(&mut self, v: u64) -> Expr {
        self.expr(ExprKind::Const(Constant::Uint(v)))
    }

    pub fn const_double(&mut self, v: f64) -> Expr {
        self.expr(ExprKind::Const(Constant::Double(v)))
    }

    pub fn const_string(&mut self, v: impl Into<String>) -> Expr {
        self.expr(ExprKind::Const(Constant::String(v.into())))
    }

    pub fn const_bytes(&mut self, v: impl Into<Vec<u8>>) -> Expr {
        self.expr(ExprKind::Const(Constant::Bytes(v.into())))
    }

    pub fn const_duration(&mut self, v: TimeDelta) -> Expr {
        self.expr(ExprKind::Const(Constant::Duration(v)))
    }

    pub fn const_timestamp(&mut self, v: DateTime<Utc>) -> Expr {
        self.expr(ExprKind::Const(Constant::Timestamp(v)))
    }

    pub fn ident(&mut self, name: impl Into<String>) -> Expr {
        self.expr(ExprKind::Ident(name.into()))
    }

    pub fn select(&mut self, operand: Expr, field: impl Into<String>) -> Expr {
        self.expr(ExprKind::Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only: false,
        })
    }

    /// The `has()` form of selection.
    pub fn test(&mut self, operand: Expr, field: impl Into<String>) -> Expr {
        self.expr(ExprKind::Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only: true,
        })
    }

    pub fn global_call(&mut self, function: impl Into<String>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            target: None,
            function: function.into(),
            args,
        })
    }

    pub fn member_call(
        &mut self,
        target: Expr,
        function: impl Into<String>,
        args: Vec<Expr>,
    ) -> Expr {
        self.expr(ExprKind::Call {
            target: Some(Box::new(target)),
            function: function.into(),
            args,
        })
    }

    pub fn list(&mut self, elements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::List {
            elements,
            optional_indices: Vec::new(),
        })
    }

    pub fn list_with_optionals(
        &mut self,
        elements: Vec<Expr>,
        optional_indices: Vec<usize>,
    ) -> Expr {
        self.expr(ExprKind::List {
            elements,
            optional_indices,
        })
    }

    pub fn map(&mut self, pairs: Vec<(Expr, Expr)>) -> Expr {
        let entries = pairs
            .into_iter()
            .map(|(key, value)| MapEntry {
                id: self.next_id(),
                key,
                value,
                optional: false,
            })
            .collect();
        self.expr(ExprKind::Map { entries })
    }

    pub fn map_entries(&mut self, entries: Vec<MapEntry>) -> Expr {
        self.expr(ExprKind::Map { entries })
    }

    pub fn map_entry(&mut self, key: Expr, value: Expr, optional: bool) -> MapEntry {
        MapEntry {
            id: self.next_id(),
            key,
            value,
            optional,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn comprehension(
        &mut self,
        iter_var: impl Into<String>,
        iter_range: Expr,
        accu_var: impl Into<String>,
        accu_init: Expr,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Expr {
        self.expr(ExprKind::Comprehension(Box::new(Comprehension {
            iter_var: iter_var.into(),
            iter_range,
            accu_var: accu_var.into(),
            accu_init,
            loop_condition,
            loop_step,
            result,
        })))
    }
}

/// The canonical parse-time expansions of the higher-order macros.
pub mod macros {
    use super::{Expr, SourceBuilder};
    use crate::operators;

    /// The hidden accumulator name used by the expansions. Front ends reject
    /// user identifiers of this shape, so it cannot be shadowed.
    pub const ACCU_VAR: &str = "__result__";

    /// `range.all(x, predicate)`: every element satisfies the predicate.
    pub fn all(b: &mut SourceBuilder, range: Expr, var: &str, predicate: Expr) -> Expr {
        let init = b.const_bool(true);
        let accu = b.ident(ACCU_VAR);
        let condition = b.global_call(operators::NOT_STRICTLY_FALSE, vec![accu]);
        let accu = b.ident(ACCU_VAR);
        let step = b.global_call(operators::LOGICAL_AND, vec![accu, predicate]);
        let result = b.ident(ACCU_VAR);
        b.comprehension(var, range, ACCU_VAR, init, condition, step, result)
    }

    /// `range.exists(x, predicate)`: some element satisfies the predicate.
    pub fn exists(b: &mut SourceBuilder, range: Expr, var: &str, predicate: Expr) -> Expr {
        let init = b.const_bool(false);
        let accu = b.ident(ACCU_VAR);
        let negated = b.global_call(operators::LOGICAL_NOT, vec![accu]);
        let condition = b.global_call(operators::NOT_STRICTLY_FALSE, vec![negated]);
        let accu = b.ident(ACCU_VAR);
        let step = b.global_call(operators::LOGICAL_OR, vec![accu, predicate]);
        let result = b.ident(ACCU_VAR);
        b.comprehension(var, range, ACCU_VAR, init, condition, step, result)
    }

    /// `range.exists_one(x, predicate)`: exactly one element satisfies it.
    pub fn exists_one(b: &mut SourceBuilder, range: Expr, var: &str, predicate: Expr) -> Expr {
        let init = b.const_int(0);
        let condition = b.const_bool(true);
        let accu = b.ident(ACCU_VAR);
        let one = b.const_int(1);
        let incremented = b.global_call(operators::ADD, vec![accu, one]);
        let accu = b.ident(ACCU_VAR);
        let step = b.global_call(operators::CONDITIONAL, vec![predicate, incremented, accu]);
        let accu = b.ident(ACCU_VAR);
        let one = b.const_int(1);
        let result = b.global_call(operators::EQUALS, vec![accu, one]);
        b.comprehension(var, range, ACCU_VAR, init, condition, step, result)
    }

    /// `range.map(x, transform)`: the list of transformed elements.
    pub fn map(b: &mut SourceBuilder, range: Expr, var: &str, transform: Expr) -> Expr {
        let init = b.list(vec![]);
        let condition = b.const_bool(true);
        let accu = b.ident(ACCU_VAR);
        let singleton = b.list(vec![transform]);
        let step = b.global_call(operators::ADD, vec![accu, singleton]);
        let result = b.ident(ACCU_VAR);
        b.comprehension(var, range, ACCU_VAR, init, condition, step, result)
    }

    /// `range.filter(x, predicate)`: the list of elements passing the
    /// predicate.
    pub fn filter(b: &mut SourceBuilder, range: Expr, var: &str, predicate: Expr) -> Expr {
        let init = b.list(vec![]);
        let condition = b.const_bool(true);
        let accu = b.ident(ACCU_VAR);
        let element = b.ident(var);
        let singleton = b.list(vec![element]);
        let appended = b.global_call(operators::ADD, vec![accu, singleton]);
        let accu = b.ident(ACCU_VAR);
        let step = b.global_call(operators::CONDITIONAL, vec![predicate, appended, accu]);
        let result = b.ident(ACCU_VAR);
        b.comprehension(var, range, ACCU_VAR, init, condition, step, result)
    }

    /// `bind(name, init, body)`: a lazily initialized alias. The shape — an
    /// empty iteration range with a constant-false loop condition — is what
    /// the planner recognizes and lowers to slot-memoized initialization.
    pub fn bind(b: &mut SourceBuilder, name: &str, init: Expr, body: Expr) -> Expr {
        let range = b.list(vec![]);
        let condition = b.const_bool(false);
        let step = b.ident(name);
        b.comprehension("#unused", range, name, init, condition, step, body)
    }
}
