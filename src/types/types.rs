use core::fmt::Display;

use serde::Serialize;

/// A type in the expression language.
///
/// All `Ty` values are interned: composite variants hold references into the
/// arena of the [`TypeRegistry`](super::TypeRegistry) that created them, and
/// structurally equal types are pointer-equal within one registry.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty<'t> {
    // Primitives.
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,

    // Containers.
    List(&'t Ty<'t>),
    Map(&'t Ty<'t>, &'t Ty<'t>),

    // Host-defined parameterized types (e.g. `optional_type(T)`).
    Opaque {
        name: &'t str,
        params: &'t [&'t Ty<'t>],
    },

    // Function signatures, used only inside declarations.
    Function {
        result: &'t Ty<'t>,
        args: &'t [&'t Ty<'t>],
    },

    // A named type parameter within one overload signature.
    TypeParam(&'t str),

    // A named record, opaque to the core.
    Struct(&'t str),

    // Null-admitting wrapper over a primitive.
    Wrapper(&'t Ty<'t>),

    // First-class type witness. `Type(None)` is the type of all types;
    // `Type(Some(t))` is the type of the type value `t`.
    Type(Option<&'t Ty<'t>>),

    // The top type.
    Dyn,
}

impl<'t> Ty<'t> {
    /// Whether this type is or contains a type parameter.
    pub fn has_params(&self) -> bool {
        match self {
            Ty::TypeParam(_) => true,
            Ty::List(e) => e.has_params(),
            Ty::Map(k, v) => k.has_params() || v.has_params(),
            Ty::Opaque { params, .. } => params.iter().any(|p| p.has_params()),
            Ty::Function { result, args } => {
                result.has_params() || args.iter().any(|a| a.has_params())
            }
            Ty::Wrapper(p) => p.has_params(),
            Ty::Type(Some(p)) => p.has_params(),
            _ => false,
        }
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, Ty::Dyn)
    }
}

impl Display for Ty<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Ty::Null => write!(f, "null_type"),
            Ty::Bool => write!(f, "bool"),
            Ty::Int => write!(f, "int"),
            Ty::Uint => write!(f, "uint"),
            Ty::Double => write!(f, "double"),
            Ty::String => write!(f, "string"),
            Ty::Bytes => write!(f, "bytes"),
            Ty::Duration => write!(f, "duration"),
            Ty::Timestamp => write!(f, "timestamp"),
            Ty::List(elem) => write!(f, "list({})", elem),
            Ty::Map(key, value) => write!(f, "map({}, {})", key, value),
            Ty::Opaque { name, params } => {
                if params.is_empty() {
                    return write!(f, "{}", name);
                }
                write!(f, "{}(", name)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Ty::Function { result, args } => {
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ") -> {}", result)
            }
            Ty::TypeParam(name) => write!(f, "{}", name),
            Ty::Struct(name) => write!(f, "{}", name),
            Ty::Wrapper(p) => write!(f, "wrapper({})", p),
            Ty::Type(None) => write!(f, "type"),
            Ty::Type(Some(p)) => write!(f, "type({})", p),
            Ty::Dyn => write!(f, "dyn"),
        }
    }
}
