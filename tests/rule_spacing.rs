use jsstyle::rules::{CommaSpacing, KeySpacing, KeywordSpacing, SemiSpacing, SpaceInfixOps};
use pretty_assertions::assert_eq;
mod common;

#[test]
fn commas_get_space_after_not_before() {
    assert_eq!(common::fix(CommaSpacing::default(), "f(a ,b);"), "f(a, b);");
}

#[test]
fn comma_before_closer_is_fine() {
    assert!(common::ids(CommaSpacing::default(), "f(a,);").is_empty());
}

#[test]
fn comma_messages_say_which_side() {
    let messages: Vec<_> = common::diagnostics(CommaSpacing::default(), "f(a ,b);")
        .into_iter()
        .map(|d| d.message)
        .collect();
    assert_eq!(
        messages,
        [
            "There should be no space before ','.",
            "A space is required after ','."
        ]
    );
}

#[test]
fn semicolons() {
    assert_eq!(common::fix(SemiSpacing::default(), "a ;b;"), "a; b;");
    assert!(common::ids(SemiSpacing::default(), "for (;;) {}").is_empty());
}

#[test]
fn infix_operators_are_spaced() {
    let rule = SpaceInfixOps::default();
    assert_eq!(common::fix(rule, "a=b+c;"), "a = b + c;");
    assert_eq!(common::fix(rule, "let x=1;"), "let x = 1;");
    assert_eq!(common::fix(rule, "y = x?1:2;"), "y = x ? 1 : 2;");
    assert_eq!(common::fix(rule, "a+=1;"), "a += 1;");
}

#[test]
fn int32_hint_allows_bar_zero() {
    let rule = SpaceInfixOps { int32_hint: true };
    assert!(common::ids(rule, "x = a|0;").is_empty());
    assert_eq!(common::ids(SpaceInfixOps::default(), "x = a|0;"), ["missingSpace"]);
}

#[test]
fn keywords_are_spaced_from_punctuation() {
    let out = common::fix(KeywordSpacing::default(), "if(a){}else{}");
    assert_eq!(out, "if (a){} else {}");
}

#[test]
fn keyword_overrides_apply_per_keyword() {
    let v: toml::Value = toml::from_str("o = { overrides = { if = { after = false } } }").unwrap();
    let rule = KeywordSpacing::from_options(v.get("o")).unwrap();
    assert_eq!(common::fix(rule, "if (a) {}"), "if(a) {}");
}

#[test]
fn function_call_parens_are_not_keyword_spacing() {
    assert!(common::ids(KeywordSpacing::default(), "var f = function() {};").is_empty());
}

#[test]
fn key_spacing_in_objects_and_patterns() {
    let rule = KeySpacing::default();
    assert_eq!(common::fix(rule, "var o = {a:1, b : 2};"), "var o = {a: 1, b: 2};");
    assert_eq!(common::fix(rule, "var {a:x} = o;"), "var {a: x} = o;");
}

#[test]
fn key_spacing_message_names_the_key() {
    let d = &common::diagnostics(KeySpacing::default(), "var o = {a:1};")[0];
    assert_eq!(d.message, "Missing space before value for key 'a'.");
}

#[test]
fn key_spacing_aligns_values() {
    let v: toml::Value = toml::from_str("o = { align = \"value\" }").unwrap();
    let rule = KeySpacing::from_options(v.get("o")).unwrap();
    let input = "var o = {\n  a: 1,\n  bbb: 2,\n};";
    assert_eq!(common::fix(rule, input), "var o = {\n  a:   1,\n  bbb: 2,\n};");
}
