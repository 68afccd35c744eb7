use jsstyle::rules::{CommaDangle, Dangle};
use pretty_assertions::assert_eq;
mod common;

#[test]
fn trailing_comma_is_removed_from_object() {
    let input = "var foo = { bar: 'baz', }";
    let out = common::fix(CommaDangle::new(Dangle::Never), input);
    assert_eq!(out, "var foo = { bar: 'baz' }");
}

#[test]
fn never_reports_every_list_kind() {
    let input = "f(a, b,);\n[1, 2,];\nfunction g(x,) {}\n";
    let ids = common::ids(CommaDangle::new(Dangle::Never), input);
    assert_eq!(ids, ["unexpected", "unexpected", "unexpected"]);
}

#[test]
fn always_adds_missing_comma() {
    let out = common::fix(CommaDangle::new(Dangle::Always), "[1, 2]");
    assert_eq!(out, "[1, 2,]");
}

#[test]
fn always_multiline_only_touches_multiline_lists() {
    let rule = CommaDangle::new(Dangle::AlwaysMultiline);
    assert_eq!(common::fix(rule, "[1, 2,]"), "[1, 2]");
    assert_eq!(common::fix(rule, "[\n  1,\n  2\n]"), "[\n  1,\n  2,\n]");
}

#[test]
fn rest_elements_never_get_a_comma() {
    let input = "const [a, ...rest] = xs;";
    assert_eq!(common::fix(CommaDangle::new(Dangle::Always), input), input);
}

#[test]
fn holes_are_left_alone() {
    let input = "[a,,];";
    assert!(common::ids(CommaDangle::new(Dangle::Never), input).is_empty());
}
