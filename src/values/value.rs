use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::ast::ExprId;
use crate::values::map::MapVal;

/// A runtime value.
///
/// Errors and unknowns are first-class: strict operations propagate them
/// instead of failing, which is what lets logical operators short-circuit
/// around them and partial evaluation carry unresolved attributes through.
///
/// Containers share their contents by reference count. The language forbids
/// cyclic values, so plain `Arc` trees suffice.
#[derive(Debug, Clone)]
pub enum Val {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    Duration(TimeDelta),
    Timestamp(DateTime<Utc>),
    List(Arc<[Val]>),
    Map(Arc<MapVal>),
    Struct(Arc<StructVal>),
    /// A first-class type witness, identified by its rendered name.
    Type(Arc<str>),
    Error(Arc<ErrorVal>),
    Unknown(Arc<UnknownSet>),
    /// Carrier for optional list elements and map entries; `None` splices
    /// out of the enclosing literal.
    Optional(Option<Arc<Val>>),
}

/// The discriminant of a [`Val`], used for runtime overload dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    List,
    Map,
    Struct,
    Type,
    Error,
    Unknown,
    Optional,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Duration => "duration",
            Kind::Timestamp => "timestamp",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Struct => "struct",
            Kind::Type => "type",
            Kind::Error => "error",
            Kind::Unknown => "unknown",
            Kind::Optional => "optional_type",
        }
    }
}

/// A propagating evaluation failure, attributed to the AST node it arose at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorVal {
    pub message: String,
    pub expr_id: ExprId,
}

/// A propagating set of attribute paths whose resolution was deferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSet {
    pub attributes: BTreeSet<String>,
}

impl UnknownSet {
    pub fn single(attribute: impl Into<String>) -> Self {
        let mut attributes = BTreeSet::new();
        attributes.insert(attribute.into());
        UnknownSet { attributes }
    }

    pub fn union(&self, other: &UnknownSet) -> UnknownSet {
        let mut attributes = self.attributes.clone();
        attributes.extend(other.attributes.iter().cloned());
        UnknownSet { attributes }
    }
}

/// A named field record, opaque to the core. Hosts construct these for
/// activation data; the evaluator only selects and presence-tests fields.
#[derive(Debug, Clone)]
pub struct StructVal {
    pub type_name: Arc<str>,
    fields: Vec<(Arc<str>, Val)>,
}

impl StructVal {
    pub fn new(type_name: impl Into<Arc<str>>, fields: Vec<(Arc<str>, Val)>) -> Self {
        StructVal {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Val> {
        self.fields
            .iter()
            .find(|(f, _)| f.as_ref() == name)
            .map(|(_, v)| v)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn fields(&self) -> &[(Arc<str>, Val)] {
        &self.fields
    }
}

impl Val {
    pub fn string(s: impl Into<Arc<str>>) -> Val {
        Val::String(s.into())
    }

    pub fn bytes(b: impl Into<Arc<[u8]>>) -> Val {
        Val::Bytes(b.into())
    }

    pub fn list(elems: Vec<Val>) -> Val {
        Val::List(elems.into())
    }

    pub fn error(expr_id: ExprId, message: impl Into<String>) -> Val {
        Val::Error(Arc::new(ErrorVal {
            message: message.into(),
            expr_id,
        }))
    }

    pub fn unknown(attribute: impl Into<String>) -> Val {
        Val::Unknown(Arc::new(UnknownSet::single(attribute)))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Val::Null => Kind::Null,
            Val::Bool(_) => Kind::Bool,
            Val::Int(_) => Kind::Int,
            Val::Uint(_) => Kind::Uint,
            Val::Double(_) => Kind::Double,
            Val::String(_) => Kind::String,
            Val::Bytes(_) => Kind::Bytes,
            Val::Duration(_) => Kind::Duration,
            Val::Timestamp(_) => Kind::Timestamp,
            Val::List(_) => Kind::List,
            Val::Map(_) => Kind::Map,
            Val::Struct(_) => Kind::Struct,
            Val::Type(_) => Kind::Type,
            Val::Error(_) => Kind::Error,
            Val::Unknown(_) => Kind::Unknown,
            Val::Optional(_) => Kind::Optional,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Val::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Val::Unknown(_))
    }

    /// The language's default for the value's kind: false, zeros, empty
    /// containers, the zero duration, the Unix epoch.
    pub fn is_zero_value(&self) -> bool {
        match self {
            Val::Null => true,
            Val::Bool(b) => !b,
            Val::Int(i) => *i == 0,
            Val::Uint(u) => *u == 0,
            Val::Double(d) => *d == 0.0,
            Val::String(s) => s.is_empty(),
            Val::Bytes(b) => b.is_empty(),
            Val::Duration(d) => d.is_zero(),
            Val::Timestamp(t) => t.timestamp() == 0 && t.timestamp_subsec_nanos() == 0,
            Val::List(l) => l.is_empty(),
            Val::Map(m) => m.is_empty(),
            Val::Struct(s) => s.fields().is_empty(),
            Val::Optional(o) => o.is_none(),
            Val::Type(_) | Val::Error(_) | Val::Unknown(_) => false,
        }
    }

    /// Structural equality with cross-type numeric comparison.
    ///
    /// Int, uint, and double values compare by mathematical value; NaN is
    /// never equal. Cross-kind comparisons of non-numeric values are false.
    /// Error and unknown operands are the caller's concern: strict dispatch
    /// propagates them before equality is consulted.
    pub fn equals(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Null, Val::Null) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::String(a), Val::String(b)) => a == b,
            (Val::Bytes(a), Val::Bytes(b)) => a == b,
            (Val::Duration(a), Val::Duration(b)) => a == b,
            (Val::Timestamp(a), Val::Timestamp(b)) => a == b,
            (Val::Type(a), Val::Type(b)) => a == b,
            (Val::List(a), Val::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Val::Map(a), Val::Map(b)) => a.equals(b),
            (Val::Struct(a), Val::Struct(b)) => {
                a.type_name == b.type_name
                    && a.fields().len() == b.fields().len()
                    && a.fields().iter().all(|(name, v)| {
                        b.field(name).map(|other| v.equals(other)).unwrap_or(false)
                    })
            }
            (Val::Optional(a), Val::Optional(b)) => match (a, b) {
                (None, None) => true,
                (Some(x), Some(y)) => x.equals(y),
                _ => false,
            },
            _ => numeric_equals(self, other).unwrap_or(false),
        }
    }
}

/// Cross-type numeric equality; `None` when either side is not numeric.
fn numeric_equals(a: &Val, b: &Val) -> Option<bool> {
    match (a, b) {
        (Val::Int(x), Val::Int(y)) => Some(x == y),
        (Val::Uint(x), Val::Uint(y)) => Some(x == y),
        (Val::Double(x), Val::Double(y)) => Some(x == y),
        (Val::Int(x), Val::Uint(y)) | (Val::Uint(y), Val::Int(x)) => {
            Some(*x >= 0 && *x as u64 == *y)
        }
        (Val::Int(x), Val::Double(y)) | (Val::Double(y), Val::Int(x)) => {
            Some(y.is_finite() && *y == *x as f64 && y.fract() == 0.0)
        }
        (Val::Uint(x), Val::Double(y)) | (Val::Double(y), Val::Uint(x)) => {
            Some(y.is_finite() && *y == *x as f64 && y.fract() == 0.0)
        }
        _ => None,
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Error(a), Val::Error(b)) => a == b,
            (Val::Unknown(a), Val::Unknown(b)) => a == b,
            _ => self.equals(other),
        }
    }
}
