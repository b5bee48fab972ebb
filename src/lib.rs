//! Verdict is an embeddable evaluator for a small, side-effect-free policy
//! expression language. Hosts hand it an abstract syntax tree (produced by a
//! front end of their choosing), a declaration environment, and a function
//! registry; Verdict type-checks the tree, lowers it to a flat step program,
//! and executes that program against a per-call activation.
//!
//! The pipeline is strictly forward:
//!
//! ```text
//! AST -> check() -> CheckedAst -> plan() -> Program -> eval() -> Val
//! ```
//!
//! The checker output, environment, and planned program are immutable once
//! built and may be shared freely between concurrent evaluations; the
//! activation and evaluation frame are per-call.
//!
//! ```
//! use bumpalo::Bump;
//! use verdict::ast::SourceBuilder;
//! use verdict::checker::check;
//! use verdict::decls::EnvBuilder;
//! use verdict::interp::{eval, EvalOptions, MapActivation};
//! use verdict::planner::plan;
//! use verdict::registry::FunctionRegistry;
//! use verdict::types::TypeRegistry;
//! use verdict::values::Val;
//!
//! let arena = Bump::new();
//! let types = TypeRegistry::new(&arena);
//!
//! let mut env = EnvBuilder::new(types);
//! verdict::stdlib::standard_declarations(types, &mut env).unwrap();
//! env.declare_variable("request_size", types.int()).unwrap();
//! let env = env.build();
//!
//! let mut funcs = FunctionRegistry::new();
//! verdict::stdlib::standard_functions(&mut funcs).unwrap();
//!
//! // request_size + 2
//! let mut b = SourceBuilder::new();
//! let lhs = b.ident("request_size");
//! let rhs = b.const_int(2);
//! let expr = b.global_call("_+_", vec![lhs, rhs]);
//!
//! let checked = check(&env, &expr, &Default::default()).into_ast().unwrap();
//! let program = plan(&checked, &funcs).unwrap();
//!
//! let mut activation = MapActivation::new();
//! activation.insert("request_size", Val::Int(40));
//! let out = eval(&program, &activation, &EvalOptions::default()).unwrap();
//! assert_eq!(out, Val::Int(42));
//! ```

pub mod ast;
pub mod checker;
pub mod decls;
pub mod errors;
pub mod interp;
pub mod operators;
pub mod planner;
pub mod registry;
pub mod stdlib;
pub mod types;
pub mod values;

pub use types::{Ty, TypeRegistry};
pub use values::Val;
