mod cases;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bumpalo::Bump;
use pretty_assertions::assert_eq;
use verdict::ast::{macros, SourceBuilder};
use verdict::decls::OverloadDecl;
use verdict::interp::{eval, EvalOptions, MapActivation};
use verdict::operators;
use verdict::registry::Overload;
use verdict::types::TypeRegistry;
use verdict::values::{Kind, Val};

use cases::{assert_error_containing, Harness};

#[test]
fn bound_value_is_available_in_the_body() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // bind(tmp, 40, tmp + 2)
    let mut b = SourceBuilder::new();
    let init = b.const_int(40);
    let tmp = b.ident("tmp");
    let two = b.const_int(2);
    let body = b.global_call(operators::ADD, vec![tmp, two]);
    let expr = macros::bind(&mut b, "tmp", init, body);
    assert_eq!(h.eval(&expr), Val::Int(42));
}

#[test]
fn initializer_runs_at_most_once() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::with_env(types, |reg, env| {
        env.declare_function(
            "tick",
            vec![OverloadDecl::global("tick", vec![], reg.int())],
        )
        .unwrap();
    });

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut h = h;
    h.funcs
        .register(
            "tick",
            Overload::strict("tick", vec![], move |_| {
                Val::Int(seen.fetch_add(1, Ordering::SeqCst) as i64)
            }),
        )
        .unwrap();

    // bind(t, tick(), t + t): one initialization, two reads.
    let mut b = SourceBuilder::new();
    let init = b.global_call("tick", vec![]);
    let lhs = b.ident("t");
    let rhs = b.ident("t");
    let body = b.global_call(operators::ADD, vec![lhs, rhs]);
    let expr = macros::bind(&mut b, "t", init, body);

    assert_eq!(h.eval(&expr), Val::Int(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unreferenced_binding_never_initializes() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // bind(tmp, 1 / 0, 'ok'): the initializer would error, but nothing
    // reads it.
    let mut b = SourceBuilder::new();
    let one = b.const_int(1);
    let zero = b.const_int(0);
    let init = b.global_call(operators::DIVIDE, vec![one, zero]);
    let body = b.const_string("ok");
    let expr = macros::bind(&mut b, "tmp", init, body);
    assert_eq!(h.eval(&expr), Val::string("ok"));
}

#[test]
fn binding_errors_surface_at_the_reference() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let one = b.const_int(1);
    let zero = b.const_int(0);
    let init = b.global_call(operators::DIVIDE, vec![one, zero]);
    let tmp = b.ident("tmp");
    let two = b.const_int(2);
    let body = b.global_call(operators::ADD, vec![tmp, two]);
    let expr = macros::bind(&mut b, "tmp", init, body);
    assert_error_containing(&h.eval(&expr), "division by zero");
}

#[test]
fn cancellation_stops_loops() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let elems: Vec<_> = (0..10).map(|i| b.const_int(i)).collect();
    let range = b.list(elems);
    let x = b.ident("x");
    let zero = b.const_int(0);
    let pred = b.global_call(operators::GREATER_EQUALS, vec![x, zero]);
    let expr = macros::all(&mut b, range, "x", pred);

    let program = h.program(&expr);
    let cancel = Arc::new(AtomicBool::new(true));
    let options = EvalOptions {
        iteration_budget: 100_000,
        cancel: Some(Arc::clone(&cancel)),
    };
    let out = eval(&program, &MapActivation::new(), &options).unwrap();
    assert_error_containing(&out, "cancelled");
}

#[test]
fn host_functions_dispatch_by_kind() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::with_env(types, |reg, env| {
        env.declare_function(
            "describe",
            vec![
                OverloadDecl::global("describe_int", vec![reg.int()], reg.string()),
                OverloadDecl::global("describe_string", vec![reg.string()], reg.string()),
            ],
        )
        .unwrap();
    });

    let mut h = h;
    h.funcs
        .register(
            "describe",
            Overload::strict("describe_int", vec![Some(Kind::Int)], |_| {
                Val::string("int")
            }),
        )
        .unwrap();
    h.funcs
        .register(
            "describe",
            Overload::strict("describe_string", vec![Some(Kind::String)], |_| {
                Val::string("string")
            }),
        )
        .unwrap();

    let mut b = SourceBuilder::new();
    let arg = b.const_int(1);
    let expr = b.global_call("describe", vec![arg]);
    assert_eq!(h.eval(&expr), Val::string("int"));

    let mut b = SourceBuilder::new();
    let arg = b.const_string("s");
    let expr = b.global_call("describe", vec![arg]);
    assert_eq!(h.eval(&expr), Val::string("string"));
}
