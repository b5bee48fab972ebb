mod cases;

use bumpalo::Bump;
use pretty_assertions::assert_eq;
use verdict::ast::SourceBuilder;
use verdict::checker::Reference;
use verdict::operators;
use verdict::types::TypeRegistry;
use verdict::values::Val;

use cases::{assert_error_containing, Harness};

#[test]
fn one_plus_two_is_three() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let one = b.const_int(1);
    let two = b.const_int(2);
    let expr = b.global_call(operators::ADD, vec![one, two]);

    let result = h.check(&expr);
    assert!(result.is_valid());
    let ast = result.into_ast().unwrap();
    assert!(core::ptr::eq(ast.result_type().unwrap(), types.int()));
    assert_eq!(
        ast.references.get(&expr.id),
        Some(&Reference::Function {
            name: operators::ADD.to_string(),
            overload_ids: vec!["add_int_int".to_string()],
        })
    );

    assert_eq!(h.eval(&expr), Val::Int(3));
}

#[test]
fn string_concatenation() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let lhs = b.const_string("foo");
    let rhs = b.const_string("bar");
    let expr = b.global_call(operators::ADD, vec![lhs, rhs]);
    assert_eq!(h.eval(&expr), Val::string("foobar"));
}

#[test]
fn division_by_zero_is_an_error_value() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let lhs = b.const_int(1);
    let rhs = b.const_int(0);
    let expr = b.global_call(operators::DIVIDE, vec![lhs, rhs]);
    assert_error_containing(&h.eval(&expr), "division by zero");
}

#[test]
fn integer_overflow_is_an_error_value() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let lhs = b.const_int(i64::MAX);
    let rhs = b.const_int(1);
    let expr = b.global_call(operators::ADD, vec![lhs, rhs]);
    assert_error_containing(&h.eval(&expr), "overflow");
}

#[test]
fn cross_type_numeric_comparison() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // 2 < 2.5
    let mut b = SourceBuilder::new();
    let lhs = b.const_int(2);
    let rhs = b.const_double(2.5);
    let expr = b.global_call(operators::LESS, vec![lhs, rhs]);
    assert_eq!(h.eval(&expr), Val::Bool(true));

    // 3u == 3.0
    let mut b = SourceBuilder::new();
    let lhs = b.const_uint(3);
    let rhs = b.const_double(3.0);
    let expr = b.global_call(operators::EQUALS, vec![lhs, rhs]);
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn negation_and_modulo() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let seven = b.const_int(7);
    let three = b.const_int(3);
    let rem = b.global_call(operators::MODULO, vec![seven, three]);
    let expr = b.global_call(operators::NEGATE, vec![rem]);
    assert_eq!(h.eval(&expr), Val::Int(-1));
}

#[test]
fn list_concatenation_and_indexing() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // ([1] + [2, 3])[2] == 3
    let mut b = SourceBuilder::new();
    let one = b.const_int(1);
    let left = b.list(vec![one]);
    let two = b.const_int(2);
    let three = b.const_int(3);
    let right = b.list(vec![two, three]);
    let joined = b.global_call(operators::ADD, vec![left, right]);
    let index = b.const_int(2);
    let expr = b.global_call(operators::INDEX, vec![joined, index]);
    assert_eq!(h.eval(&expr), Val::Int(3));
}

#[test]
fn out_of_range_index_is_an_error_value() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let one = b.const_int(1);
    let list = b.list(vec![one]);
    let index = b.const_int(5);
    let expr = b.global_call(operators::INDEX, vec![list, index]);
    assert_error_containing(&h.eval(&expr), "out of range");
}

#[test]
fn dyn_operands_defer_overload_choice_to_runtime() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // dyn([1, 2]).size(): statically every size overload applies; the
    // evaluator picks by the concrete value's kind.
    let mut b = SourceBuilder::new();
    let one = b.const_int(1);
    let two = b.const_int(2);
    let list = b.list(vec![one, two]);
    let dynamic = b.global_call("dyn", vec![list]);
    let expr = b.member_call(dynamic, "size", vec![]);

    let ast = h.check(&expr).into_ast().unwrap();
    let Some(Reference::Function { overload_ids, .. }) = ast.references.get(&expr.id) else {
        panic!("expected a function reference");
    };
    assert!(overload_ids.len() > 1);

    assert_eq!(h.eval(&expr), Val::Int(2));
}

#[test]
fn size_in_both_call_styles() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let s = b.const_string("héllo");
    let expr = b.global_call("size", vec![s]);
    assert_eq!(h.eval(&expr), Val::Int(5));

    let mut b = SourceBuilder::new();
    let s = b.const_string("héllo");
    let expr = b.member_call(s, "size", vec![]);
    assert_eq!(h.eval(&expr), Val::Int(5));
}
