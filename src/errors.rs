use snafu::Snafu;

/// Errors surfaced synchronously while building a declaration environment.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeclError {
    #[snafu(display(
        "overload '{new_id}' on function '{function}' collides with overload '{existing_id}'"
    ))]
    OverloadCollision {
        function: String,
        new_id: String,
        existing_id: String,
    },

    #[snafu(display("overload id '{id}' redeclared with a different signature"))]
    OverloadRedeclared { id: String },

    #[snafu(display("variable '{name}' declared more than once"))]
    DuplicateVariable { name: String },

    #[snafu(display("type parameter '{name}' is not accepted by this environment"))]
    RejectedTypeParam { name: String },

    #[snafu(display("function '{function}' declared with no overloads"))]
    EmptyFunction { function: String },
}

/// Errors surfaced while registering runtime function implementations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RegistryError {
    #[snafu(display("an implementation for overload '{id}' is already registered"))]
    DuplicateOverloadId { id: String },
}

/// Errors surfaced while lowering a checked AST to a step program.
///
/// These indicate an incomplete input (missing annotations, unregistered
/// overloads), never a property of the evaluated data; data-dependent
/// failures are error values produced at evaluation time.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PlanError {
    #[snafu(display("expression {id} has no reference annotation for '{name}'"))]
    MissingReference { id: i64, name: String },

    #[snafu(display("no implementation registered for overload '{id}'"))]
    MissingOverload { id: String },

    #[snafu(display("struct construction requires a host type provider; '{type_name}' is opaque"))]
    OpaqueStruct { type_name: String },

    #[snafu(display("call at expression {id} was checked without any candidate overloads"))]
    EmptyCandidateSet { id: i64 },
}
