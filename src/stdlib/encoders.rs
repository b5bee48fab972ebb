//! The encoders extension: base64 over bytes and strings.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::decls::{EnvBuilder, OverloadDecl};
use crate::errors::{DeclError, RegistryError};
use crate::registry::{unary, FunctionRegistry};
use crate::stdlib::core::err;
use crate::types::TypeRegistry;
use crate::values::Val;

pub fn declare<'t>(reg: &'t TypeRegistry<'t>, env: &mut EnvBuilder<'t>) -> Result<(), DeclError> {
    let string = reg.string();
    let bytes = reg.bytes();
    env.declare_function(
        "base64.encode",
        vec![OverloadDecl::global(
            "base64_encode_bytes",
            vec![bytes],
            string,
        )],
    )?;
    env.declare_function(
        "base64.decode",
        vec![OverloadDecl::global(
            "base64_decode_string",
            vec![string],
            bytes,
        )],
    )?;
    Ok(())
}

pub fn register(funcs: &mut FunctionRegistry) -> Result<(), RegistryError> {
    funcs.register(
        "base64.encode",
        unary("base64_encode_bytes", |b: Arc<[u8]>| STANDARD.encode(&b)),
    )?;
    funcs.register(
        "base64.decode",
        unary("base64_decode_string", |s: Arc<str>| {
            match STANDARD.decode(s.as_bytes()) {
                Ok(decoded) => Val::bytes(decoded),
                Err(_) => err("invalid base64 input"),
            }
        }),
    )?;
    Ok(())
}
