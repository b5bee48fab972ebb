mod cases;

use bumpalo::Bump;
use pretty_assertions::assert_eq;
use verdict::ast::{macros, SourceBuilder};
use verdict::interp::{eval, EvalOptions, MapActivation};
use verdict::operators;
use verdict::types::TypeRegistry;
use verdict::values::Val;

use cases::{assert_error_containing, Harness};

fn int_list(b: &mut SourceBuilder, values: &[i64]) -> verdict::ast::Expr {
    let elems = values.iter().map(|&v| b.const_int(v)).collect();
    b.list(elems)
}

#[test]
fn exists_finds_a_large_square() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // [1, 2, 3].exists(x, x * x > 8): only the last element qualifies, so
    // the loop runs over the whole range before settling on true.
    let mut b = SourceBuilder::new();
    let range = int_list(&mut b, &[1, 2, 3]);
    let x1 = b.ident("x");
    let x2 = b.ident("x");
    let square = b.global_call(operators::MULTIPLY, vec![x1, x2]);
    let eight = b.const_int(8);
    let pred = b.global_call(operators::GREATER, vec![square, eight]);
    let expr = macros::exists(&mut b, range, "x", pred);

    assert!(h.check(&expr).is_valid());
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn all_rejects_on_first_failure_semantics() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // [1, 2, 3].all(x, x < 3) is false.
    let mut b = SourceBuilder::new();
    let range = int_list(&mut b, &[1, 2, 3]);
    let x = b.ident("x");
    let three = b.const_int(3);
    let pred = b.global_call(operators::LESS, vec![x, three]);
    let expr = macros::all(&mut b, range, "x", pred);
    assert_eq!(h.eval(&expr), Val::Bool(false));
}

#[test]
fn map_macro_transforms_every_element() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // [1, 2, 3].map(x, x * 2) == [2, 4, 6]
    let mut b = SourceBuilder::new();
    let range = int_list(&mut b, &[1, 2, 3]);
    let x = b.ident("x");
    let two = b.const_int(2);
    let doubled = b.global_call(operators::MULTIPLY, vec![x, two]);
    let expr = macros::map(&mut b, range, "x", doubled);

    assert_eq!(
        h.eval(&expr),
        Val::list(vec![Val::Int(2), Val::Int(4), Val::Int(6)])
    );
}

#[test]
fn filter_macro_keeps_matching_elements() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // [1, 2, 3, 4].filter(x, x % 2 == 0) == [2, 4]
    let mut b = SourceBuilder::new();
    let range = int_list(&mut b, &[1, 2, 3, 4]);
    let x = b.ident("x");
    let two = b.const_int(2);
    let rem = b.global_call(operators::MODULO, vec![x, two]);
    let zero = b.const_int(0);
    let pred = b.global_call(operators::EQUALS, vec![rem, zero]);
    let expr = macros::filter(&mut b, range, "x", pred);

    assert_eq!(h.eval(&expr), Val::list(vec![Val::Int(2), Val::Int(4)]));
}

#[test]
fn exists_one_counts_matches() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let range = int_list(&mut b, &[1, 2, 3]);
    let x = b.ident("x");
    let two = b.const_int(2);
    let pred = b.global_call(operators::EQUALS, vec![x, two]);
    let expr = macros::exists_one(&mut b, range, "x", pred);
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn map_iteration_follows_insertion_order() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // {'b': 1, 'a': 2}.map(k, k) == ['b', 'a']
    let mut b = SourceBuilder::new();
    let kb = b.const_string("b");
    let vb = b.const_int(1);
    let ka = b.const_string("a");
    let va = b.const_int(2);
    let range = b.map(vec![(kb, vb), (ka, va)]);
    let k = b.ident("k");
    let expr = macros::map(&mut b, range, "k", k);

    assert_eq!(
        h.eval(&expr),
        Val::list(vec![Val::string("b"), Val::string("a")])
    );
}

#[test]
fn empty_range_yields_the_accumulator_init() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let range = b.list(vec![]);
    let x = b.ident("x");
    let pred = b.global_call(operators::NOT_STRICTLY_FALSE, vec![x]);
    let expr = macros::all(&mut b, range, "x", pred);
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn erroring_range_propagates_the_error() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::with_env(types, |reg, env| {
        env.declare_variable("xs", reg.list(reg.int())).unwrap();
    });

    // xs is absent from the activation, so the range resolves to an error.
    let mut b = SourceBuilder::new();
    let range = b.ident("xs");
    let x = b.ident("x");
    let pred = b.global_call(operators::NOT_STRICTLY_FALSE, vec![x]);
    let expr = macros::exists(&mut b, range, "x", pred);

    assert_error_containing(&h.eval(&expr), "no such attribute 'xs'");
}

#[test]
fn iteration_budget_bounds_total_loop_work() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let range = int_list(&mut b, &(0..100).collect::<Vec<i64>>());
    let x = b.ident("x");
    let zero = b.const_int(0);
    let pred = b.global_call(operators::GREATER_EQUALS, vec![x, zero]);
    let expr = macros::all(&mut b, range, "x", pred);

    let program = h.program(&expr);
    let options = EvalOptions {
        iteration_budget: 10,
        cancel: None,
    };
    let out = eval(&program, &MapActivation::new(), &options).unwrap();
    assert_error_containing(&out, "iteration budget");
}

#[test]
fn nested_comprehensions_scope_their_variables() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // [1, 2].all(x, [1, 2].exists(y, y >= x))
    let mut b = SourceBuilder::new();
    let inner_range = int_list(&mut b, &[1, 2]);
    let y = b.ident("y");
    let x = b.ident("x");
    let inner_pred = b.global_call(operators::GREATER_EQUALS, vec![y, x]);
    let inner = macros::exists(&mut b, inner_range, "y", inner_pred);
    let outer_range = int_list(&mut b, &[1, 2]);
    let expr = macros::all(&mut b, outer_range, "x", inner);

    assert_eq!(h.eval(&expr), Val::Bool(true));
}
