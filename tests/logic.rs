mod cases;

use bumpalo::Bump;
use pretty_assertions::assert_eq;
use verdict::ast::SourceBuilder;
use verdict::operators;
use verdict::types::TypeRegistry;
use verdict::values::Val;

use cases::{assert_error_containing, Harness};

/// An expression that evaluates to an error value: 1 / 0 == 1.
fn erroring_bool(b: &mut SourceBuilder) -> verdict::ast::Expr {
    let one = b.const_int(1);
    let zero = b.const_int(0);
    let division = b.global_call(operators::DIVIDE, vec![one, zero]);
    let one = b.const_int(1);
    b.global_call(operators::EQUALS, vec![division, one])
}

#[test]
fn false_and_error_is_false() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let lhs = b.const_bool(false);
    let rhs = erroring_bool(&mut b);
    let expr = b.global_call(operators::LOGICAL_AND, vec![lhs, rhs]);
    assert_eq!(h.eval(&expr), Val::Bool(false));
}

#[test]
fn error_and_false_is_false() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // Commutative: the deciding operand may be on the right.
    let mut b = SourceBuilder::new();
    let lhs = erroring_bool(&mut b);
    let rhs = b.const_bool(false);
    let expr = b.global_call(operators::LOGICAL_AND, vec![lhs, rhs]);
    assert_eq!(h.eval(&expr), Val::Bool(false));
}

#[test]
fn true_or_error_is_true() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let lhs = b.const_bool(true);
    let rhs = erroring_bool(&mut b);
    let expr = b.global_call(operators::LOGICAL_OR, vec![lhs, rhs]);
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn error_and_true_stays_an_error() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let lhs = erroring_bool(&mut b);
    let rhs = b.const_bool(true);
    let expr = b.global_call(operators::LOGICAL_AND, vec![lhs, rhs]);
    assert_error_containing(&h.eval(&expr), "division by zero");
}

#[test]
fn conditional_evaluates_only_the_selected_branch() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // true ? 1 : (1 / 0) — the error branch never runs.
    let mut b = SourceBuilder::new();
    let cond = b.const_bool(true);
    let then = b.const_int(1);
    let one = b.const_int(1);
    let zero = b.const_int(0);
    let other = b.global_call(operators::DIVIDE, vec![one, zero]);
    let expr = b.global_call(operators::CONDITIONAL, vec![cond, then, other]);
    assert_eq!(h.eval(&expr), Val::Int(1));
}

#[test]
fn conditional_propagates_a_failed_condition() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let cond = erroring_bool(&mut b);
    let then = b.const_int(1);
    let other = b.const_int(2);
    let expr = b.global_call(operators::CONDITIONAL, vec![cond, then, other]);
    assert_error_containing(&h.eval(&expr), "division by zero");
}

#[test]
fn not_and_equality() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let lhs = b.const_string("a");
    let rhs = b.const_string("b");
    let eq = b.global_call(operators::EQUALS, vec![lhs, rhs]);
    let expr = b.global_call(operators::LOGICAL_NOT, vec![eq]);
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn membership_over_lists_and_maps() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let needle = b.const_int(2);
    let one = b.const_int(1);
    let two = b.const_int(2);
    let haystack = b.list(vec![one, two]);
    let expr = b.global_call(operators::IN, vec![needle, haystack]);
    assert_eq!(h.eval(&expr), Val::Bool(true));

    let mut b = SourceBuilder::new();
    let needle = b.const_string("k");
    let key = b.const_string("k");
    let value = b.const_int(1);
    let map = b.map(vec![(key, value)]);
    let expr = b.global_call(operators::IN, vec![needle, map]);
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn duplicate_map_key_is_an_error_value() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let k1 = b.const_string("k");
    let v1 = b.const_int(1);
    let k2 = b.const_string("k");
    let v2 = b.const_int(2);
    let expr = b.map(vec![(k1, v1), (k2, v2)]);
    assert_error_containing(&h.eval(&expr), "duplicate map key");
}
