//! Optional values: the carrier for optional list elements and map entries.

use std::sync::Arc;

use crate::decls::{EnvBuilder, OverloadDecl};
use crate::errors::{DeclError, RegistryError};
use crate::registry::{from_fn, FunctionRegistry};
use crate::stdlib::core::err;
use crate::types::TypeRegistry;
use crate::values::{Kind, Val};

pub fn declare<'t>(reg: &'t TypeRegistry<'t>, env: &mut EnvBuilder<'t>) -> Result<(), DeclError> {
    let t = reg.type_param("T");
    let optional_t = reg.optional(t);

    env.declare_function(
        "optional.of",
        vec![OverloadDecl::global("optional_of", vec![t], optional_t)],
    )?;
    env.declare_function(
        "optional.none",
        vec![OverloadDecl::global("optional_none", vec![], optional_t)],
    )?;
    env.declare_function(
        "hasValue",
        vec![OverloadDecl::member(
            "optional_has_value",
            vec![optional_t],
            reg.bool(),
        )],
    )?;
    env.declare_function(
        "value",
        vec![OverloadDecl::member(
            "optional_value",
            vec![optional_t],
            t,
        )],
    )?;
    env.declare_function(
        "orValue",
        vec![OverloadDecl::member(
            "optional_or_value",
            vec![optional_t, t],
            t,
        )],
    )?;
    Ok(())
}

pub fn register(funcs: &mut FunctionRegistry) -> Result<(), RegistryError> {
    funcs.register(
        "optional.of",
        from_fn("optional_of", vec![None], |args| {
            Val::Optional(Some(Arc::new(args[0].clone())))
        }),
    )?;
    funcs.register(
        "optional.none",
        from_fn("optional_none", vec![], |_| Val::Optional(None)),
    )?;
    funcs.register(
        "hasValue",
        from_fn("optional_has_value", vec![Some(Kind::Optional)], |args| {
            match &args[0] {
                Val::Optional(o) => Val::Bool(o.is_some()),
                _ => err("expected an optional"),
            }
        }),
    )?;
    funcs.register(
        "value",
        from_fn("optional_value", vec![Some(Kind::Optional)], |args| {
            match &args[0] {
                Val::Optional(Some(v)) => (**v).clone(),
                Val::Optional(None) => err("optional.none() dereference"),
                _ => err("expected an optional"),
            }
        }),
    )?;
    funcs.register(
        "orValue",
        from_fn(
            "optional_or_value",
            vec![Some(Kind::Optional), None],
            |args| match &args[0] {
                Val::Optional(Some(v)) => (**v).clone(),
                Val::Optional(None) => args[1].clone(),
                _ => err("expected an optional"),
            },
        ),
    )?;
    Ok(())
}
