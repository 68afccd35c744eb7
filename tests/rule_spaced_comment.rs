use jsstyle::rules::{SpacedComment, Spacing};
use pretty_assertions::assert_eq;
mod common;

fn rule(toml_options: &str) -> SpacedComment {
    let v: toml::Value = toml::from_str(&format!("o = {toml_options}")).unwrap();
    SpacedComment::from_options(v.get("o")).unwrap()
}

#[test]
fn always_inserts_a_space() {
    let always = SpacedComment::from_options(None).unwrap();
    assert_eq!(always.style, Spacing::Always);
    assert_eq!(common::fix(always.clone(), "//hello\n"), "// hello\n");
    assert_eq!(common::fix(always, "/*x*/ a;"), "/* x*/ a;");
}

#[test]
fn doc_comments_and_markers_pass() {
    let input = "/** doc */\n//! note\na;\n";
    assert_eq!(common::ids(rule(r#"{ markers = ["!"] }"#), input), Vec::<String>::new());
    assert_eq!(common::ids(rule("\"always\""), input), ["expectedSpaceAfter"]);
}

#[test]
fn never_removes_the_space() {
    assert_eq!(common::fix(rule("\"never\""), "// hi\n"), "//hi\n");
    assert_eq!(common::fix(rule(r#"{ style = "never" }"#), "/** doc*/"), "/**doc*/");
}

#[test]
fn exception_lines_are_allowed() {
    let dashes = rule(r#"{ exceptions = ["-"] }"#);
    assert!(common::ids(dashes.clone(), "//-------\n").is_empty());
    assert_eq!(common::ids(dashes, "//-x\n"), ["expectedExceptionAfter"]);
}

#[test]
fn balanced_block_comments() {
    let balanced = rule("{ balanced = true }");
    assert_eq!(common::fix(balanced, "/*x*/"), "/* x */");
}
