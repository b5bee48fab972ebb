//! The strings extension: member-style text manipulation functions.

use std::sync::Arc;

use crate::decls::{EnvBuilder, OverloadDecl};
use crate::errors::{DeclError, RegistryError};
use crate::registry::{binary, from_fn, ternary, unary, FunctionRegistry};
use crate::stdlib::core::err;
use crate::stdlib::format::format_values;
use crate::types::TypeRegistry;
use crate::values::{Kind, Val};

pub fn declare<'t>(reg: &'t TypeRegistry<'t>, env: &mut EnvBuilder<'t>) -> Result<(), DeclError> {
    let boolean = reg.bool();
    let int = reg.int();
    let string = reg.string();
    let list_string = reg.list(string);
    let list_dyn = reg.list(reg.dyn_type());

    env.declare_function(
        "contains",
        vec![OverloadDecl::member(
            "contains_string",
            vec![string, string],
            boolean,
        )],
    )?;
    env.declare_function(
        "startsWith",
        vec![OverloadDecl::member(
            "starts_with_string",
            vec![string, string],
            boolean,
        )],
    )?;
    env.declare_function(
        "endsWith",
        vec![OverloadDecl::member(
            "ends_with_string",
            vec![string, string],
            boolean,
        )],
    )?;
    env.declare_function(
        "lowerAscii",
        vec![OverloadDecl::member(
            "string_lower_ascii",
            vec![string],
            string,
        )],
    )?;
    env.declare_function(
        "upperAscii",
        vec![OverloadDecl::member(
            "string_upper_ascii",
            vec![string],
            string,
        )],
    )?;
    env.declare_function(
        "split",
        vec![OverloadDecl::member(
            "string_split_string",
            vec![string, string],
            list_string,
        )],
    )?;
    env.declare_function(
        "join",
        vec![
            OverloadDecl::member("list_join", vec![list_string], string),
            OverloadDecl::member("list_join_string", vec![list_string, string], string),
        ],
    )?;
    env.declare_function(
        "replace",
        vec![
            OverloadDecl::member(
                "string_replace_string_string",
                vec![string, string, string],
                string,
            ),
            OverloadDecl::member(
                "string_replace_string_string_int",
                vec![string, string, string, int],
                string,
            ),
        ],
    )?;
    env.declare_function(
        "indexOf",
        vec![OverloadDecl::member(
            "string_index_of_string",
            vec![string, string],
            int,
        )],
    )?;
    env.declare_function(
        "substring",
        vec![
            OverloadDecl::member("string_substring_int", vec![string, int], string),
            OverloadDecl::member(
                "string_substring_int_int",
                vec![string, int, int],
                string,
            ),
        ],
    )?;
    env.declare_function(
        "trim",
        vec![OverloadDecl::member("string_trim", vec![string], string)],
    )?;
    env.declare_function(
        "charAt",
        vec![OverloadDecl::member(
            "string_char_at_int",
            vec![string, int],
            string,
        )],
    )?;
    env.declare_function(
        "format",
        vec![OverloadDecl::member(
            "string_format",
            vec![string, list_dyn],
            string,
        )],
    )?;
    Ok(())
}

pub fn register(funcs: &mut FunctionRegistry) -> Result<(), RegistryError> {
    funcs.register(
        "contains",
        binary("contains_string", |s: Arc<str>, sub: Arc<str>| {
            s.contains(sub.as_ref())
        }),
    )?;
    funcs.register(
        "startsWith",
        binary("starts_with_string", |s: Arc<str>, prefix: Arc<str>| {
            s.starts_with(prefix.as_ref())
        }),
    )?;
    funcs.register(
        "endsWith",
        binary("ends_with_string", |s: Arc<str>, suffix: Arc<str>| {
            s.ends_with(suffix.as_ref())
        }),
    )?;
    funcs.register(
        "lowerAscii",
        unary("string_lower_ascii", |s: Arc<str>| s.to_ascii_lowercase()),
    )?;
    funcs.register(
        "upperAscii",
        unary("string_upper_ascii", |s: Arc<str>| s.to_ascii_uppercase()),
    )?;
    funcs.register(
        "split",
        binary("string_split_string", |s: Arc<str>, sep: Arc<str>| {
            // An empty separator splits into one-codepoint strings, in
            // original order.
            let parts: Vec<Val> = if sep.is_empty() {
                s.chars().map(|c| Val::string(c.to_string())).collect()
            } else {
                s.split(sep.as_ref()).map(Val::string).collect()
            };
            parts
        }),
    )?;
    funcs.register(
        "join",
        from_fn("list_join", vec![Some(Kind::List)], |args| {
            join_list(&args[0], "")
        }),
    )?;
    funcs.register(
        "join",
        from_fn(
            "list_join_string",
            vec![Some(Kind::List), Some(Kind::String)],
            |args| {
                let Val::String(sep) = &args[1] else {
                    return err("expected a string separator");
                };
                join_list(&args[0], sep)
            },
        ),
    )?;
    funcs.register(
        "replace",
        ternary(
            "string_replace_string_string",
            |s: Arc<str>, from: Arc<str>, to: Arc<str>| s.replace(from.as_ref(), to.as_ref()),
        ),
    )?;
    funcs.register(
        "replace",
        from_fn(
            "string_replace_string_string_int",
            vec![
                Some(Kind::String),
                Some(Kind::String),
                Some(Kind::String),
                Some(Kind::Int),
            ],
            |args| {
                let (Val::String(s), Val::String(from), Val::String(to), Val::Int(n)) =
                    (&args[0], &args[1], &args[2], &args[3])
                else {
                    return err("expected (string, string, string, int)");
                };
                if *n < 0 {
                    return Val::string(s.replace(from.as_ref(), to.as_ref()));
                }
                Val::string(s.replacen(from.as_ref(), to.as_ref(), *n as usize))
            },
        ),
    )?;
    funcs.register(
        "indexOf",
        binary("string_index_of_string", |s: Arc<str>, sub: Arc<str>| {
            match s.find(sub.as_ref()) {
                // Byte offset converted to a codepoint offset.
                Some(at) => Val::Int(s[..at].chars().count() as i64),
                None => Val::Int(-1),
            }
        }),
    )?;
    funcs.register(
        "substring",
        binary("string_substring_int", |s: Arc<str>, start: i64| {
            substring(&s, start, i64::MAX)
        }),
    )?;
    funcs.register(
        "substring",
        ternary(
            "string_substring_int_int",
            |s: Arc<str>, start: i64, end: i64| substring(&s, start, end),
        ),
    )?;
    funcs.register("trim", unary("string_trim", |s: Arc<str>| s.trim().to_string()))?;
    funcs.register(
        "charAt",
        binary("string_char_at_int", |s: Arc<str>, at: i64| {
            if at < 0 {
                return err(format!("index {} out of range", at));
            }
            match s.chars().nth(at as usize) {
                Some(c) => Val::string(c.to_string()),
                None => err(format!("index {} out of range", at)),
            }
        }),
    )?;
    funcs.register(
        "format",
        from_fn(
            "string_format",
            vec![Some(Kind::String), Some(Kind::List)],
            |args| {
                let (Val::String(template), Val::List(values)) = (&args[0], &args[1]) else {
                    return err("expected (string, list)");
                };
                match format_values(template, values) {
                    Ok(s) => Val::string(s),
                    Err(message) => err(message),
                }
            },
        ),
    )?;
    Ok(())
}

fn join_list(list: &Val, sep: &str) -> Val {
    let Val::List(items) = list else {
        return err("expected a list");
    };
    let mut parts = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Val::String(s) => parts.push(s.to_string()),
            other => {
                return err(format!(
                    "join expects a list of strings, found {}",
                    other.kind().name()
                ))
            }
        }
    }
    Val::string(parts.join(sep))
}

/// Substring by codepoint indices; `end` clamps to the length.
fn substring(s: &str, start: i64, end: i64) -> Val {
    if start < 0 || end < start {
        return err(format!("invalid substring range {}..{}", start, end));
    }
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    if start > len {
        return err(format!("index {} out of range", start));
    }
    let end = end.min(len);
    Val::string(chars[start as usize..end as usize].iter().collect::<String>())
}
