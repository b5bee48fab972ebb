//! Shared harness for the integration tests: a standard environment plus
//! helpers running the full check -> plan -> eval pipeline.

#![allow(dead_code)]

use verdict::ast::Expr;
use verdict::checker::{check, CheckerOptions, ValidationResult};
use verdict::decls::{Env, EnvBuilder};
use verdict::interp::{eval, Activation, EvalOptions, MapActivation};
use verdict::planner::{plan, Program};
use verdict::registry::FunctionRegistry;
use verdict::stdlib;
use verdict::types::TypeRegistry;
use verdict::values::Val;

pub struct Harness<'t> {
    pub types: &'t TypeRegistry<'t>,
    pub env: Env<'t>,
    pub funcs: FunctionRegistry,
}

impl<'t> Harness<'t> {
    /// The standard library alone.
    pub fn new(types: &'t TypeRegistry<'t>) -> Harness<'t> {
        Self::with_env(types, |_, _| {})
    }

    /// The standard library plus caller-declared variables and functions.
    pub fn with_env(
        types: &'t TypeRegistry<'t>,
        configure: impl FnOnce(&'t TypeRegistry<'t>, &mut EnvBuilder<'t>),
    ) -> Harness<'t> {
        let mut env = EnvBuilder::new(types);
        stdlib::standard_declarations(types, &mut env).expect("standard declarations");
        configure(types, &mut env);
        let mut funcs = FunctionRegistry::new();
        stdlib::standard_functions(&mut funcs).expect("standard functions");
        Harness {
            types,
            env: env.build(),
            funcs,
        }
    }

    pub fn check(&self, expr: &Expr) -> ValidationResult<'t> {
        check(&self.env, expr, &CheckerOptions::default())
    }

    pub fn program(&self, expr: &Expr) -> Program {
        let ast = self.check(expr).into_ast().expect("expression must check");
        plan(&ast, &self.funcs).expect("expression must plan")
    }

    pub fn eval(&self, expr: &Expr) -> Val {
        self.eval_with(expr, &MapActivation::new())
    }

    pub fn eval_with(&self, expr: &Expr, activation: &dyn Activation) -> Val {
        eval(&self.program(expr), activation, &EvalOptions::default())
            .expect("no internal faults")
    }
}

/// Assert the value is an error value whose message contains `needle`.
pub fn assert_error_containing(v: &Val, needle: &str) {
    match v {
        Val::Error(e) => assert!(
            e.message.contains(needle),
            "error message '{}' does not contain '{}'",
            e.message,
            needle
        ),
        other => panic!("expected an error value, got {:?}", other),
    }
}
