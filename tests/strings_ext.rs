mod cases;

use bumpalo::Bump;
use chrono::TimeDelta;
use pretty_assertions::assert_eq;
use verdict::ast::SourceBuilder;
use verdict::operators;
use verdict::types::TypeRegistry;
use verdict::values::Val;

use cases::{assert_error_containing, Harness};

#[test]
fn lower_ascii_round_trip() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // 'UPPER lower'.lowerAscii() == 'upper lower'
    let mut b = SourceBuilder::new();
    let s = b.const_string("UPPER lower");
    let lowered = b.member_call(s, "lowerAscii", vec![]);
    let expected = b.const_string("upper lower");
    let expr = b.global_call(operators::EQUALS, vec![lowered, expected]);
    assert_eq!(h.eval(&expr), Val::Bool(true));
}

#[test]
fn split_with_empty_separator_yields_codepoints() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let s = b.const_string("hello world!");
    let sep = b.const_string("");
    let expr = b.member_call(s, "split", vec![sep]);

    let out = h.eval(&expr);
    let Val::List(parts) = &out else {
        panic!("expected a list, got {:?}", out);
    };
    assert_eq!(parts.len(), 12);
    assert_eq!(parts[0], Val::string("h"));
    assert_eq!(parts[5], Val::string(" "));
    assert_eq!(parts[11], Val::string("!"));
}

#[test]
fn split_and_join_are_inverse() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let s = b.const_string("a,b,c");
    let sep = b.const_string(",");
    let parts = b.member_call(s, "split", vec![sep]);
    let dash = b.const_string("-");
    let expr = b.member_call(parts, "join", vec![dash]);
    assert_eq!(h.eval(&expr), Val::string("a-b-c"));
}

#[test]
fn replace_index_of_substring_char_at() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let s = b.const_string("hello hello");
    let from = b.const_string("hello");
    let to = b.const_string("hi");
    let once = b.const_int(1);
    let expr = b.member_call(s, "replace", vec![from, to, once]);
    assert_eq!(h.eval(&expr), Val::string("hi hello"));

    let mut b = SourceBuilder::new();
    let s = b.const_string("tacocat");
    let sub = b.const_string("cat");
    let expr = b.member_call(s, "indexOf", vec![sub]);
    assert_eq!(h.eval(&expr), Val::Int(4));

    let mut b = SourceBuilder::new();
    let s = b.const_string("tacocat");
    let start = b.const_int(0);
    let end = b.const_int(4);
    let expr = b.member_call(s, "substring", vec![start, end]);
    assert_eq!(h.eval(&expr), Val::string("taco"));

    let mut b = SourceBuilder::new();
    let s = b.const_string("tacocat");
    let at = b.const_int(4);
    let expr = b.member_call(s, "charAt", vec![at]);
    assert_eq!(h.eval(&expr), Val::string("c"));
}

#[test]
fn format_renders_fixed_duration() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // '%f'.format([duration]) with 123.000000456s.
    let mut b = SourceBuilder::new();
    let template = b.const_string("%f");
    let d = b.const_duration(TimeDelta::new(123, 456).unwrap());
    let args = b.list(vec![d]);
    let expr = b.member_call(template, "format", vec![args]);
    assert_eq!(h.eval(&expr), Val::string("123.000000456s"));
}

#[test]
fn format_mixes_clauses() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let template = b.const_string("%s=%d (%x)");
    let name = b.const_string("mask");
    let dec = b.const_int(255);
    let hex = b.const_int(255);
    let args = b.list(vec![name, dec, hex]);
    let expr = b.member_call(template, "format", vec![args]);
    assert_eq!(h.eval(&expr), Val::string("mask=255 (ff)"));
}

#[test]
fn format_rejects_unknown_clause() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let template = b.const_string("%v");
    let one = b.const_int(1);
    let args = b.list(vec![one]);
    let expr = b.member_call(template, "format", vec![args]);
    assert_error_containing(&h.eval(&expr), "unrecognized formatting clause");
}

#[test]
fn conversions_round_trip() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    // int('42') + 1 == 43
    let mut b = SourceBuilder::new();
    let s = b.const_string("42");
    let parsed = b.global_call("int", vec![s]);
    let one = b.const_int(1);
    let expr = b.global_call(operators::ADD, vec![parsed, one]);
    assert_eq!(h.eval(&expr), Val::Int(43));

    // string(2.5) == '2.5'
    let mut b = SourceBuilder::new();
    let d = b.const_double(2.5);
    let expr = b.global_call("string", vec![d]);
    assert_eq!(h.eval(&expr), Val::string("2.5"));

    // duration('1h2m') as seconds.
    let mut b = SourceBuilder::new();
    let s = b.const_string("1h2m");
    let d = b.global_call("duration", vec![s]);
    let expr = b.global_call("int", vec![d]);
    assert_eq!(h.eval(&expr), Val::Int(3720));

    // bad conversions are error values.
    let mut b = SourceBuilder::new();
    let s = b.const_string("not a number");
    let expr = b.global_call("int", vec![s]);
    assert_error_containing(&h.eval(&expr), "cannot convert");
}

#[test]
fn string_rendering_of_errors() {
    let arena = Bump::new();
    let types = TypeRegistry::new(&arena);
    let h = Harness::new(types);

    let mut b = SourceBuilder::new();
    let one = b.const_int(1);
    let zero = b.const_int(0);
    let expr = b.global_call(operators::DIVIDE, vec![one, zero]);
    let out = h.eval(&expr);
    assert_eq!(
        verdict::values::render::render_plain(&out),
        "<error: division by zero>"
    );
}
