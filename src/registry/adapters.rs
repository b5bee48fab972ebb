//! Typed adapters between native host types and the value sum.
//!
//! The evaluator has no knowledge of host types: it dispatches on value
//! kinds. These adapters add and remove the kinds at the boundary so host
//! functions can be written against `i64`, `&str`, and friends. A conversion
//! mismatch surfaces as an error value, never a panic.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::registry::registry::Overload;
use crate::values::{Kind, MapVal, Val};

/// Native types extractable from a value.
pub trait FromVal: Sized {
    /// The kind this extraction requires, `None` for any.
    const KIND: Option<Kind>;
    fn from_val(v: &Val) -> Option<Self>;
}

impl FromVal for i64 {
    const KIND: Option<Kind> = Some(Kind::Int);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromVal for u64 {
    const KIND: Option<Kind> = Some(Kind::Uint);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Uint(u) => Some(*u),
            _ => None,
        }
    }
}

impl FromVal for f64 {
    const KIND: Option<Kind> = Some(Kind::Double);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Double(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromVal for bool {
    const KIND: Option<Kind> = Some(Kind::Bool);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromVal for Arc<str> {
    const KIND: Option<Kind> = Some(Kind::String);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromVal for Arc<[u8]> {
    const KIND: Option<Kind> = Some(Kind::Bytes);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FromVal for Arc<[Val]> {
    const KIND: Option<Kind> = Some(Kind::List);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::List(l) => Some(l.clone()),
            _ => None,
        }
    }
}

impl FromVal for Arc<MapVal> {
    const KIND: Option<Kind> = Some(Kind::Map);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Map(m) => Some(m.clone()),
            _ => None,
        }
    }
}

impl FromVal for TimeDelta {
    const KIND: Option<Kind> = Some(Kind::Duration);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromVal for DateTime<Utc> {
    const KIND: Option<Kind> = Some(Kind::Timestamp);
    fn from_val(v: &Val) -> Option<Self> {
        match v {
            Val::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Accept any value unexamined.
impl FromVal for Val {
    const KIND: Option<Kind> = None;
    fn from_val(v: &Val) -> Option<Self> {
        Some(v.clone())
    }
}

/// Native types convertible into a value.
pub trait IntoVal {
    fn into_val(self) -> Val;
}

impl IntoVal for Val {
    fn into_val(self) -> Val {
        self
    }
}

impl IntoVal for i64 {
    fn into_val(self) -> Val {
        Val::Int(self)
    }
}

impl IntoVal for u64 {
    fn into_val(self) -> Val {
        Val::Uint(self)
    }
}

impl IntoVal for f64 {
    fn into_val(self) -> Val {
        Val::Double(self)
    }
}

impl IntoVal for bool {
    fn into_val(self) -> Val {
        Val::Bool(self)
    }
}

impl IntoVal for String {
    fn into_val(self) -> Val {
        Val::String(self.into())
    }
}

impl IntoVal for &str {
    fn into_val(self) -> Val {
        Val::String(self.into())
    }
}

impl IntoVal for Vec<u8> {
    fn into_val(self) -> Val {
        Val::Bytes(self.into())
    }
}

impl IntoVal for Vec<Val> {
    fn into_val(self) -> Val {
        Val::List(self.into())
    }
}

impl IntoVal for MapVal {
    fn into_val(self) -> Val {
        Val::Map(Arc::new(self))
    }
}

impl IntoVal for TimeDelta {
    fn into_val(self) -> Val {
        Val::Duration(self)
    }
}

impl IntoVal for DateTime<Utc> {
    fn into_val(self) -> Val {
        Val::Timestamp(self)
    }
}

fn adapter_mismatch(id: &str) -> Val {
    Val::error(0, format!("argument does not fit overload '{}'", id))
}

/// A strict unary overload over native types.
pub fn unary<A, R>(
    id: impl Into<String>,
    f: impl Fn(A) -> R + Send + Sync + 'static,
) -> Overload
where
    A: FromVal,
    R: IntoVal,
{
    let id = id.into();
    let inner_id = id.clone();
    Overload::strict(id, vec![A::KIND], move |args| {
        match A::from_val(&args[0]) {
            Some(a) => f(a).into_val(),
            None => adapter_mismatch(&inner_id),
        }
    })
}

/// A strict binary overload over native types.
pub fn binary<A, B, R>(
    id: impl Into<String>,
    f: impl Fn(A, B) -> R + Send + Sync + 'static,
) -> Overload
where
    A: FromVal,
    B: FromVal,
    R: IntoVal,
{
    let id = id.into();
    let inner_id = id.clone();
    Overload::strict(id, vec![A::KIND, B::KIND], move |args| {
        match (A::from_val(&args[0]), B::from_val(&args[1])) {
            (Some(a), Some(b)) => f(a, b).into_val(),
            _ => adapter_mismatch(&inner_id),
        }
    })
}

/// A strict ternary overload over native types.
pub fn ternary<A, B, C, R>(
    id: impl Into<String>,
    f: impl Fn(A, B, C) -> R + Send + Sync + 'static,
) -> Overload
where
    A: FromVal,
    B: FromVal,
    C: FromVal,
    R: IntoVal,
{
    let id = id.into();
    let inner_id = id.clone();
    Overload::strict(id, vec![A::KIND, B::KIND, C::KIND], move |args| {
        match (
            A::from_val(&args[0]),
            B::from_val(&args[1]),
            C::from_val(&args[2]),
        ) {
            (Some(a), Some(b), Some(c)) => f(a, b, c).into_val(),
            _ => adapter_mismatch(&inner_id),
        }
    })
}

/// A strict overload over raw values with explicit kinds, for signatures the
/// typed adapters cannot express.
pub fn from_fn(
    id: impl Into<String>,
    arg_kinds: Vec<Option<Kind>>,
    f: impl Fn(&[Val]) -> Val + Send + Sync + 'static,
) -> Overload {
    Overload::strict(id, arg_kinds, f)
}
