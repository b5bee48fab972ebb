//! Operators, equality, ordering, membership, sizing, and conversions.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::decls::{EnvBuilder, OverloadDecl};
use crate::errors::{DeclError, RegistryError};
use crate::operators as ops;
use crate::registry::{binary, from_fn, unary, FunctionRegistry, Overload};
use crate::types::{Ty, TypeRegistry};
use crate::values::{render, Kind, Val};

/// An error value to be attributed to the call site by the dispatcher.
pub(crate) fn err(message: impl Into<String>) -> Val {
    Val::error(0, message)
}

pub fn declare<'t>(reg: &'t TypeRegistry<'t>, env: &mut EnvBuilder<'t>) -> Result<(), DeclError> {
    let boolean = reg.bool();
    let int = reg.int();
    let uint = reg.uint();
    let double = reg.double();
    let string = reg.string();
    let bytes = reg.bytes();
    let duration = reg.duration();
    let timestamp = reg.timestamp();
    let t = reg.type_param("T");
    let k = reg.type_param("K");
    let v = reg.type_param("V");
    let list_t = reg.list(t);
    let map_kv = reg.map(k, v);

    // Logical operators. `&&`, `||`, and `?:` are lowered to dedicated
    // steps; their declarations exist for the checker alone.
    env.declare_function(
        ops::LOGICAL_AND,
        vec![OverloadDecl::global(
            "logical_and",
            vec![boolean, boolean],
            boolean,
        )],
    )?;
    env.declare_function(
        ops::LOGICAL_OR,
        vec![OverloadDecl::global(
            "logical_or",
            vec![boolean, boolean],
            boolean,
        )],
    )?;
    env.declare_function(
        ops::LOGICAL_NOT,
        vec![OverloadDecl::global("logical_not", vec![boolean], boolean)],
    )?;
    env.declare_function(
        ops::CONDITIONAL,
        vec![OverloadDecl::global(
            "conditional",
            vec![boolean, t, t],
            t,
        )],
    )?;
    env.declare_function(
        ops::NOT_STRICTLY_FALSE,
        vec![OverloadDecl::global(
            "not_strictly_false",
            vec![boolean],
            boolean,
        )],
    )?;

    // Equality.
    env.declare_function(
        ops::EQUALS,
        vec![OverloadDecl::global("equals", vec![t, t], boolean)],
    )?;
    env.declare_function(
        ops::NOT_EQUALS,
        vec![OverloadDecl::global("not_equals", vec![t, t], boolean)],
    )?;

    // Arithmetic.
    env.declare_function(
        ops::ADD,
        vec![
            OverloadDecl::global("add_int_int", vec![int, int], int),
            OverloadDecl::global("add_uint_uint", vec![uint, uint], uint),
            OverloadDecl::global("add_double_double", vec![double, double], double),
            OverloadDecl::global("add_string_string", vec![string, string], string),
            OverloadDecl::global("add_bytes_bytes", vec![bytes, bytes], bytes),
            OverloadDecl::global("add_list_list", vec![list_t, list_t], list_t),
            OverloadDecl::global("add_duration_duration", vec![duration, duration], duration),
            OverloadDecl::global(
                "add_duration_timestamp",
                vec![duration, timestamp],
                timestamp,
            ),
            OverloadDecl::global(
                "add_timestamp_duration",
                vec![timestamp, duration],
                timestamp,
            ),
        ],
    )?;
    env.declare_function(
        ops::SUBTRACT,
        vec![
            OverloadDecl::global("subtract_int_int", vec![int, int], int),
            OverloadDecl::global("subtract_uint_uint", vec![uint, uint], uint),
            OverloadDecl::global("subtract_double_double", vec![double, double], double),
            OverloadDecl::global(
                "subtract_duration_duration",
                vec![duration, duration],
                duration,
            ),
            OverloadDecl::global(
                "subtract_timestamp_duration",
                vec![timestamp, duration],
                timestamp,
            ),
            OverloadDecl::global(
                "subtract_timestamp_timestamp",
                vec![timestamp, timestamp],
                duration,
            ),
        ],
    )?;
    env.declare_function(
        ops::MULTIPLY,
        vec![
            OverloadDecl::global("multiply_int_int", vec![int, int], int),
            OverloadDecl::global("multiply_uint_uint", vec![uint, uint], uint),
            OverloadDecl::global("multiply_double_double", vec![double, double], double),
        ],
    )?;
    env.declare_function(
        ops::DIVIDE,
        vec![
            OverloadDecl::global("divide_int_int", vec![int, int], int),
            OverloadDecl::global("divide_uint_uint", vec![uint, uint], uint),
            OverloadDecl::global("divide_double_double", vec![double, double], double),
        ],
    )?;
    env.declare_function(
        ops::MODULO,
        vec![
            OverloadDecl::global("modulo_int_int", vec![int, int], int),
            OverloadDecl::global("modulo_uint_uint", vec![uint, uint], uint),
        ],
    )?;
    env.declare_function(
        ops::NEGATE,
        vec![
            OverloadDecl::global("negate_int", vec![int], int),
            OverloadDecl::global("negate_double", vec![double], double),
        ],
    )?;

    // Ordering. Numeric comparisons are cross-type.
    let ordered_pairs: [(&str, &'t Ty<'t>, &'t Ty<'t>); 14] = [
        ("int_int", int, int),
        ("uint_uint", uint, uint),
        ("double_double", double, double),
        ("int_uint", int, uint),
        ("uint_int", uint, int),
        ("int_double", int, double),
        ("double_int", double, int),
        ("uint_double", uint, double),
        ("double_uint", double, uint),
        ("string_string", string, string),
        ("bytes_bytes", bytes, bytes),
        ("bool_bool", boolean, boolean),
        ("duration_duration", duration, duration),
        ("timestamp_timestamp", timestamp, timestamp),
    ];
    for (function, prefix) in [
        (ops::LESS, "less"),
        (ops::LESS_EQUALS, "less_equals"),
        (ops::GREATER, "greater"),
        (ops::GREATER_EQUALS, "greater_equals"),
    ] {
        let overloads = ordered_pairs
            .iter()
            .map(|&(suffix, a, b)| {
                OverloadDecl::global(format!("{}_{}", prefix, suffix), vec![a, b], boolean)
            })
            .collect();
        env.declare_function(function, overloads)?;
    }

    // Indexing and membership.
    env.declare_function(
        ops::INDEX,
        vec![
            OverloadDecl::global("index_list", vec![list_t, int], t),
            OverloadDecl::global("index_map", vec![map_kv, k], v),
        ],
    )?;
    env.declare_function(
        ops::IN,
        vec![
            OverloadDecl::global("in_list", vec![t, list_t], boolean),
            OverloadDecl::global("in_map", vec![k, map_kv], boolean),
        ],
    )?;

    // Sizing, in both call styles.
    env.declare_function(
        "size",
        vec![
            OverloadDecl::global("size_string", vec![string], int),
            OverloadDecl::global("size_bytes", vec![bytes], int),
            OverloadDecl::global("size_list", vec![list_t], int),
            OverloadDecl::global("size_map", vec![map_kv], int),
            OverloadDecl::member("string_size", vec![string], int),
            OverloadDecl::member("bytes_size", vec![bytes], int),
            OverloadDecl::member("list_size", vec![list_t], int),
            OverloadDecl::member("map_size", vec![map_kv], int),
        ],
    )?;

    // Conversions.
    env.declare_function(
        "int",
        vec![
            OverloadDecl::global("int_to_int", vec![int], int),
            OverloadDecl::global("uint_to_int", vec![uint], int),
            OverloadDecl::global("double_to_int", vec![double], int),
            OverloadDecl::global("string_to_int", vec![string], int),
            OverloadDecl::global("timestamp_to_int", vec![timestamp], int),
            OverloadDecl::global("duration_to_int", vec![duration], int),
        ],
    )?;
    env.declare_function(
        "uint",
        vec![
            OverloadDecl::global("uint_to_uint", vec![uint], uint),
            OverloadDecl::global("int_to_uint", vec![int], uint),
            OverloadDecl::global("double_to_uint", vec![double], uint),
            OverloadDecl::global("string_to_uint", vec![string], uint),
        ],
    )?;
    env.declare_function(
        "double",
        vec![
            OverloadDecl::global("double_to_double", vec![double], double),
            OverloadDecl::global("int_to_double", vec![int], double),
            OverloadDecl::global("uint_to_double", vec![uint], double),
            OverloadDecl::global("string_to_double", vec![string], double),
        ],
    )?;
    env.declare_function(
        "string",
        vec![
            OverloadDecl::global("string_to_string", vec![string], string),
            OverloadDecl::global("int_to_string", vec![int], string),
            OverloadDecl::global("uint_to_string", vec![uint], string),
            OverloadDecl::global("double_to_string", vec![double], string),
            OverloadDecl::global("bool_to_string", vec![boolean], string),
            OverloadDecl::global("bytes_to_string", vec![bytes], string),
            OverloadDecl::global("duration_to_string", vec![duration], string),
            OverloadDecl::global("timestamp_to_string", vec![timestamp], string),
        ],
    )?;
    env.declare_function(
        "bytes",
        vec![
            OverloadDecl::global("bytes_to_bytes", vec![bytes], bytes),
            OverloadDecl::global("string_to_bytes", vec![string], bytes),
        ],
    )?;
    env.declare_function(
        "bool",
        vec![
            OverloadDecl::global("bool_to_bool", vec![boolean], boolean),
            OverloadDecl::global("string_to_bool", vec![string], boolean),
        ],
    )?;
    env.declare_function(
        "duration",
        vec![
            OverloadDecl::global("duration_to_duration", vec![duration], duration),
            OverloadDecl::global("string_to_duration", vec![string], duration),
            OverloadDecl::global("double_to_duration", vec![double], duration),
        ],
    )?;
    env.declare_function(
        "timestamp",
        vec![
            OverloadDecl::global("timestamp_to_timestamp", vec![timestamp], timestamp),
            OverloadDecl::global("string_to_timestamp", vec![string], timestamp),
            OverloadDecl::global("int_to_timestamp", vec![int], timestamp),
        ],
    )?;
    env.declare_function(
        "type",
        vec![OverloadDecl::global(
            "type_of",
            vec![t],
            reg.type_of(Some(t)),
        )],
    )?;
    env.declare_function(
        "dyn",
        vec![OverloadDecl::global("to_dyn", vec![t], reg.dyn_type())],
    )?;

    Ok(())
}

/// Total order over comparable values, `None` for incomparable pairs
/// (NaN against anything).
fn compare(a: &Val, b: &Val) -> Option<Ordering> {
    match (a, b) {
        (Val::Int(x), Val::Int(y)) => Some(x.cmp(y)),
        (Val::Uint(x), Val::Uint(y)) => Some(x.cmp(y)),
        (Val::Double(x), Val::Double(y)) => x.partial_cmp(y),
        (Val::Int(x), Val::Uint(y)) => Some(if *x < 0 {
            Ordering::Less
        } else {
            (*x as u64).cmp(y)
        }),
        (Val::Uint(x), Val::Int(y)) => Some(if *y < 0 {
            Ordering::Greater
        } else {
            x.cmp(&(*y as u64))
        }),
        (Val::Int(x), Val::Double(y)) => (*x as f64).partial_cmp(y),
        (Val::Double(x), Val::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Val::Uint(x), Val::Double(y)) => (*x as f64).partial_cmp(y),
        (Val::Double(x), Val::Uint(y)) => x.partial_cmp(&(*y as f64)),
        (Val::String(x), Val::String(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        (Val::Bytes(x), Val::Bytes(y)) => Some(x.cmp(y)),
        (Val::Bool(x), Val::Bool(y)) => Some(x.cmp(y)),
        (Val::Duration(x), Val::Duration(y)) => Some(x.cmp(y)),
        (Val::Timestamp(x), Val::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub fn register(funcs: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use Kind::*;

    // Logical operators dispatched through the registry. `&&`/`||`/`?:`
    // never reach it.
    funcs.register(ops::LOGICAL_NOT, unary("logical_not", |b: bool| !b))?;
    funcs.register(
        ops::NOT_STRICTLY_FALSE,
        Overload::lazy("not_strictly_false", 1, |args| {
            Val::Bool(!matches!(args[0], Val::Bool(false)))
        }),
    )?;

    funcs.register(
        ops::EQUALS,
        from_fn("equals", vec![None, None], |args| {
            Val::Bool(args[0].equals(&args[1]))
        }),
    )?;
    funcs.register(
        ops::NOT_EQUALS,
        from_fn("not_equals", vec![None, None], |args| {
            Val::Bool(!args[0].equals(&args[1]))
        }),
    )?;

    // Arithmetic, checked where the domain can overflow.
    funcs.register(
        ops::ADD,
        binary("add_int_int", |a: i64, b: i64| match a.checked_add(b) {
            Some(c) => Val::Int(c),
            None => err("integer overflow"),
        }),
    )?;
    funcs.register(
        ops::ADD,
        binary("add_uint_uint", |a: u64, b: u64| match a.checked_add(b) {
            Some(c) => Val::Uint(c),
            None => err("unsigned integer overflow"),
        }),
    )?;
    funcs.register(ops::ADD, binary("add_double_double", |a: f64, b: f64| a + b))?;
    funcs.register(
        ops::ADD,
        binary("add_string_string", |a: Arc<str>, b: Arc<str>| {
            format!("{}{}", a, b)
        }),
    )?;
    funcs.register(
        ops::ADD,
        binary("add_bytes_bytes", |a: Arc<[u8]>, b: Arc<[u8]>| {
            let mut out = a.to_vec();
            out.extend_from_slice(&b);
            out
        }),
    )?;
    funcs.register(
        ops::ADD,
        binary("add_list_list", |a: Arc<[Val]>, b: Arc<[Val]>| {
            let mut out = a.to_vec();
            out.extend(b.iter().cloned());
            out
        }),
    )?;
    funcs.register(
        ops::ADD,
        binary("add_duration_duration", |a: TimeDelta, b: TimeDelta| {
            match a.checked_add(&b) {
                Some(c) => Val::Duration(c),
                None => err("duration overflow"),
            }
        }),
    )?;
    funcs.register(
        ops::ADD,
        binary(
            "add_duration_timestamp",
            |a: TimeDelta, b: DateTime<Utc>| match b.checked_add_signed(a) {
                Some(c) => Val::Timestamp(c),
                None => err("timestamp overflow"),
            },
        ),
    )?;
    funcs.register(
        ops::ADD,
        binary(
            "add_timestamp_duration",
            |a: DateTime<Utc>, b: TimeDelta| match a.checked_add_signed(b) {
                Some(c) => Val::Timestamp(c),
                None => err("timestamp overflow"),
            },
        ),
    )?;

    funcs.register(
        ops::SUBTRACT,
        binary("subtract_int_int", |a: i64, b: i64| match a.checked_sub(b) {
            Some(c) => Val::Int(c),
            None => err("integer overflow"),
        }),
    )?;
    funcs.register(
        ops::SUBTRACT,
        binary("subtract_uint_uint", |a: u64, b: u64| {
            match a.checked_sub(b) {
                Some(c) => Val::Uint(c),
                None => err("unsigned integer overflow"),
            }
        }),
    )?;
    funcs.register(
        ops::SUBTRACT,
        binary("subtract_double_double", |a: f64, b: f64| a - b),
    )?;
    funcs.register(
        ops::SUBTRACT,
        binary(
            "subtract_duration_duration",
            |a: TimeDelta, b: TimeDelta| match a.checked_sub(&b) {
                Some(c) => Val::Duration(c),
                None => err("duration overflow"),
            },
        ),
    )?;
    funcs.register(
        ops::SUBTRACT,
        binary(
            "subtract_timestamp_duration",
            |a: DateTime<Utc>, b: TimeDelta| match a.checked_sub_signed(b) {
                Some(c) => Val::Timestamp(c),
                None => err("timestamp overflow"),
            },
        ),
    )?;
    funcs.register(
        ops::SUBTRACT,
        binary(
            "subtract_timestamp_timestamp",
            |a: DateTime<Utc>, b: DateTime<Utc>| Val::Duration(a - b),
        ),
    )?;

    funcs.register(
        ops::MULTIPLY,
        binary("multiply_int_int", |a: i64, b: i64| match a.checked_mul(b) {
            Some(c) => Val::Int(c),
            None => err("integer overflow"),
        }),
    )?;
    funcs.register(
        ops::MULTIPLY,
        binary("multiply_uint_uint", |a: u64, b: u64| {
            match a.checked_mul(b) {
                Some(c) => Val::Uint(c),
                None => err("unsigned integer overflow"),
            }
        }),
    )?;
    funcs.register(
        ops::MULTIPLY,
        binary("multiply_double_double", |a: f64, b: f64| a * b),
    )?;

    funcs.register(
        ops::DIVIDE,
        binary("divide_int_int", |a: i64, b: i64| {
            if b == 0 {
                return err("division by zero");
            }
            match a.checked_div(b) {
                Some(c) => Val::Int(c),
                None => err("integer overflow"),
            }
        }),
    )?;
    funcs.register(
        ops::DIVIDE,
        binary("divide_uint_uint", |a: u64, b: u64| {
            if b == 0 {
                return err("division by zero");
            }
            Val::Uint(a / b)
        }),
    )?;
    funcs.register(
        ops::DIVIDE,
        binary("divide_double_double", |a: f64, b: f64| a / b),
    )?;

    funcs.register(
        ops::MODULO,
        binary("modulo_int_int", |a: i64, b: i64| {
            if b == 0 {
                return err("modulus by zero");
            }
            match a.checked_rem(b) {
                Some(c) => Val::Int(c),
                None => err("integer overflow"),
            }
        }),
    )?;
    funcs.register(
        ops::MODULO,
        binary("modulo_uint_uint", |a: u64, b: u64| {
            if b == 0 {
                return err("modulus by zero");
            }
            Val::Uint(a % b)
        }),
    )?;

    funcs.register(
        ops::NEGATE,
        unary("negate_int", |a: i64| match a.checked_neg() {
            Some(c) => Val::Int(c),
            None => err("integer overflow"),
        }),
    )?;
    funcs.register(ops::NEGATE, unary("negate_double", |a: f64| -a))?;

    // Ordering.
    let kind_pairs: [(&str, Kind, Kind); 14] = [
        ("int_int", Int, Int),
        ("uint_uint", Uint, Uint),
        ("double_double", Double, Double),
        ("int_uint", Int, Uint),
        ("uint_int", Uint, Int),
        ("int_double", Int, Double),
        ("double_int", Double, Int),
        ("uint_double", Uint, Double),
        ("double_uint", Double, Uint),
        ("string_string", String, String),
        ("bytes_bytes", Bytes, Bytes),
        ("bool_bool", Bool, Bool),
        ("duration_duration", Duration, Duration),
        ("timestamp_timestamp", Timestamp, Timestamp),
    ];
    let preds: [(&str, &str, fn(Option<Ordering>) -> bool); 4] = [
        (ops::LESS, "less", |o| matches!(o, Some(Ordering::Less))),
        (ops::LESS_EQUALS, "less_equals", |o| {
            matches!(o, Some(Ordering::Less | Ordering::Equal))
        }),
        (ops::GREATER, "greater", |o| {
            matches!(o, Some(Ordering::Greater))
        }),
        (ops::GREATER_EQUALS, "greater_equals", |o| {
            matches!(o, Some(Ordering::Greater | Ordering::Equal))
        }),
    ];
    for (function, prefix, pred) in preds {
        for (suffix, ka, kb) in kind_pairs {
            funcs.register(
                function,
                from_fn(
                    format!("{}_{}", prefix, suffix),
                    vec![Some(ka), Some(kb)],
                    move |args| Val::Bool(pred(compare(&args[0], &args[1]))),
                ),
            )?;
        }
    }

    // Indexing and membership.
    funcs.register(
        ops::INDEX,
        binary("index_list", |l: Arc<[Val]>, i: i64| {
            if i < 0 || i as usize >= l.len() {
                return err(format!("index {} out of range (size {})", i, l.len()));
            }
            l[i as usize].clone()
        }),
    )?;
    funcs.register(
        ops::INDEX,
        from_fn("index_map", vec![Some(Map), None], |args| {
            let Val::Map(m) = &args[0] else {
                return err("expected a map");
            };
            match m.get(&args[1]) {
                Some(v) => v.clone(),
                None => err(format!(
                    "no such key: {}",
                    render::render_quoted(&args[1])
                )),
            }
        }),
    )?;
    funcs.register(
        ops::IN,
        from_fn("in_list", vec![None, Some(List)], |args| {
            let Val::List(l) = &args[1] else {
                return err("expected a list");
            };
            Val::Bool(l.iter().any(|e| e.equals(&args[0])))
        }),
    )?;
    funcs.register(
        ops::IN,
        from_fn("in_map", vec![None, Some(Map)], |args| {
            let Val::Map(m) = &args[1] else {
                return err("expected a map");
            };
            Val::Bool(m.contains(&args[0]))
        }),
    )?;

    // Sizing.
    let size_of = |v: &Val| -> Val {
        match v {
            Val::String(s) => Val::Int(s.chars().count() as i64),
            Val::Bytes(b) => Val::Int(b.len() as i64),
            Val::List(l) => Val::Int(l.len() as i64),
            Val::Map(m) => Val::Int(m.len() as i64),
            other => err(format!("size is undefined for {}", other.kind().name())),
        }
    };
    for (id, kind) in [
        ("size_string", String),
        ("size_bytes", Bytes),
        ("size_list", List),
        ("size_map", Map),
        ("string_size", String),
        ("bytes_size", Bytes),
        ("list_size", List),
        ("map_size", Map),
    ] {
        funcs.register(
            "size",
            from_fn(id, vec![Some(kind)], move |args| size_of(&args[0])),
        )?;
    }

    register_conversions(funcs)?;
    Ok(())
}

fn register_conversions(funcs: &mut FunctionRegistry) -> Result<(), RegistryError> {
    funcs.register("int", unary("int_to_int", |a: i64| a))?;
    funcs.register(
        "int",
        unary("uint_to_int", |a: u64| {
            if a > i64::MAX as u64 {
                err("integer overflow")
            } else {
                Val::Int(a as i64)
            }
        }),
    )?;
    funcs.register(
        "int",
        unary("double_to_int", |a: f64| {
            let truncated = a.trunc();
            if !truncated.is_finite()
                || truncated >= (i64::MAX as f64)
                || truncated <= (i64::MIN as f64)
            {
                err("integer overflow")
            } else {
                Val::Int(truncated as i64)
            }
        }),
    )?;
    funcs.register(
        "int",
        unary("string_to_int", |a: Arc<str>| match a.parse::<i64>() {
            Ok(v) => Val::Int(v),
            Err(_) => err(format!("cannot convert '{}' to int", a)),
        }),
    )?;
    funcs.register(
        "int",
        unary("timestamp_to_int", |a: DateTime<Utc>| a.timestamp()),
    )?;
    funcs.register(
        "int",
        unary("duration_to_int", |a: TimeDelta| a.num_seconds()),
    )?;

    funcs.register("uint", unary("uint_to_uint", |a: u64| a))?;
    funcs.register(
        "uint",
        unary("int_to_uint", |a: i64| {
            if a < 0 {
                err("unsigned integer overflow")
            } else {
                Val::Uint(a as u64)
            }
        }),
    )?;
    funcs.register(
        "uint",
        unary("double_to_uint", |a: f64| {
            let truncated = a.trunc();
            if !truncated.is_finite() || truncated < 0.0 || truncated >= (u64::MAX as f64) {
                err("unsigned integer overflow")
            } else {
                Val::Uint(truncated as u64)
            }
        }),
    )?;
    funcs.register(
        "uint",
        unary("string_to_uint", |a: Arc<str>| match a.parse::<u64>() {
            Ok(v) => Val::Uint(v),
            Err(_) => err(format!("cannot convert '{}' to uint", a)),
        }),
    )?;

    funcs.register("double", unary("double_to_double", |a: f64| a))?;
    funcs.register("double", unary("int_to_double", |a: i64| a as f64))?;
    funcs.register("double", unary("uint_to_double", |a: u64| a as f64))?;
    funcs.register(
        "double",
        unary("string_to_double", |a: Arc<str>| match a.parse::<f64>() {
            Ok(v) => Val::Double(v),
            Err(_) => err(format!("cannot convert '{}' to double", a)),
        }),
    )?;

    funcs.register(
        "string",
        unary("string_to_string", |a: Arc<str>| Val::String(a)),
    )?;
    funcs.register("string", unary("int_to_string", |a: i64| a.to_string()))?;
    funcs.register("string", unary("uint_to_string", |a: u64| a.to_string()))?;
    funcs.register(
        "string",
        unary("double_to_string", |a: f64| {
            render::render_plain(&Val::Double(a))
        }),
    )?;
    funcs.register("string", unary("bool_to_string", |a: bool| a.to_string()))?;
    funcs.register(
        "string",
        unary("bytes_to_string", |a: Arc<[u8]>| {
            match core::str::from_utf8(&a) {
                Ok(s) => Val::string(s),
                Err(_) => err("invalid UTF-8 in bytes-to-string conversion"),
            }
        }),
    )?;
    funcs.register(
        "string",
        unary("duration_to_string", |a: TimeDelta| {
            render::format_duration(&a)
        }),
    )?;
    funcs.register(
        "string",
        unary("timestamp_to_string", |a: DateTime<Utc>| {
            render::render_plain(&Val::Timestamp(a))
        }),
    )?;

    funcs.register(
        "bytes",
        unary("bytes_to_bytes", |a: Arc<[u8]>| Val::Bytes(a)),
    )?;
    funcs.register(
        "bytes",
        unary("string_to_bytes", |a: Arc<str>| a.as_bytes().to_vec()),
    )?;

    funcs.register("bool", unary("bool_to_bool", |a: bool| a))?;
    funcs.register(
        "bool",
        unary("string_to_bool", |a: Arc<str>| match a.as_ref() {
            "true" | "1" => Val::Bool(true),
            "false" | "0" => Val::Bool(false),
            _ => err(format!("cannot convert '{}' to bool", a)),
        }),
    )?;

    funcs.register(
        "duration",
        unary("duration_to_duration", |a: TimeDelta| a),
    )?;
    funcs.register(
        "duration",
        unary("string_to_duration", |a: Arc<str>| match parse_duration(&a) {
            Some(d) => Val::Duration(d),
            None => err(format!("cannot convert '{}' to duration", a)),
        }),
    )?;
    funcs.register(
        "duration",
        unary("double_to_duration", |a: f64| {
            let secs = a.trunc();
            let nanos = ((a - secs) * 1e9).round() as i64;
            match TimeDelta::new(secs as i64, 0) {
                Some(d) => match d.checked_add(&TimeDelta::nanoseconds(nanos)) {
                    Some(d) => Val::Duration(d),
                    None => err("duration overflow"),
                },
                None => err("duration overflow"),
            }
        }),
    )?;

    funcs.register(
        "timestamp",
        unary("timestamp_to_timestamp", |a: DateTime<Utc>| a),
    )?;
    funcs.register(
        "timestamp",
        unary("string_to_timestamp", |a: Arc<str>| {
            match DateTime::parse_from_rfc3339(&a) {
                Ok(t) => Val::Timestamp(t.to_utc()),
                Err(_) => err(format!("cannot convert '{}' to timestamp", a)),
            }
        }),
    )?;
    funcs.register(
        "timestamp",
        unary("int_to_timestamp", |a: i64| {
            match DateTime::<Utc>::from_timestamp(a, 0) {
                Some(t) => Val::Timestamp(t),
                None => err("timestamp out of range"),
            }
        }),
    )?;

    funcs.register(
        "type",
        from_fn("type_of", vec![None], |args| {
            Val::Type(args[0].kind().name().into())
        }),
    )?;
    funcs.register("dyn", from_fn("to_dyn", vec![None], |args| args[0].clone()))?;
    Ok(())
}

/// Parse a composite duration literal: `1h2m3s`, `1.5s`, `-500ms`, `250us`,
/// `10ns`. At least one segment is required.
fn parse_duration(s: &str) -> Option<TimeDelta> {
    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    if rest.is_empty() {
        return None;
    }
    let mut total = TimeDelta::zero();
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let number: f64 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];
        let (nanos_per_unit, unit_len) = if rest.starts_with("ms") {
            (1_000_000.0, 2)
        } else if rest.starts_with("us") {
            (1_000.0, 2)
        } else if rest.starts_with("ns") {
            (1.0, 2)
        } else if rest.starts_with('h') {
            (3_600_000_000_000.0, 1)
        } else if rest.starts_with('m') {
            (60_000_000_000.0, 1)
        } else if rest.starts_with('s') {
            (1_000_000_000.0, 1)
        } else {
            return None;
        };
        rest = &rest[unit_len..];
        let nanos = (number * nanos_per_unit).round() as i64;
        total = total.checked_add(&TimeDelta::nanoseconds(nanos))?;
    }
    Some(if negative { -total } else { total })
}
