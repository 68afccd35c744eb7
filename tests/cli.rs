use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
mod common;

fn jsstyle() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jsstyle"));
    cmd.env_remove("JSSTYLE_LOG");
    cmd
}

#[test]
fn stdin_problems_are_reported_stylish() {
    let out = common::run_cli_on_str(&[], "var a = [1,]\n").unwrap();
    assert_eq!(out.status.code(), Some(1));
    insta::assert_snapshot!(String::from_utf8(out.stdout).unwrap(), @r"
    <stdin>
      1:11  error  Unexpected trailing comma.  comma_dangle

    ✖ 1 problem (1 error, 0 warnings)
      1 problem potentially fixable with the `--fix` option.
    ");
}

#[test]
fn stdin_fix_prints_the_fixed_text() {
    let out = common::run_cli_on_str(&["--fix"], "var a = [1,]\n").unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "var a = [1]\n");
}

#[test]
fn clean_input_exits_zero_silently() {
    jsstyle()
        .write_stdin("var a = [1];\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn parse_errors_are_fatal_diagnostics() {
    jsstyle()
        .write_stdin("let = ;\n")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Parsing error"));
}

#[test]
fn fix_rewrites_files_in_place() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.js");
    let b = dir.path().join("b.js");
    fs::write(&a, "f(x ,y);\n").unwrap();
    fs::write(&b, "ok();\n").unwrap();

    jsstyle()
        .current_dir(dir.path())
        .args(["--fix", "*.js"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&a).unwrap(), "f(x, y);\n");
    assert_eq!(fs::read_to_string(&b).unwrap(), "ok();\n");
}

#[test]
fn config_file_selects_rules_and_json_output() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("jsstyle.toml"),
        "[rules]\neol_last = \"warn\"\npadded_blocks = { level = \"error\", options = \"never\" }\n",
    )
    .unwrap();
    fs::write(dir.path().join("src.js"), "{\n\na();\n}").unwrap();

    let out = jsstyle()
        .current_dir(dir.path())
        .args(["--format", "json", "src.js"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rules: Vec<_> = v[0]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["rule"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(rules, ["padded_blocks", "eol_last"]);
    assert_eq!(v[0]["errorCount"], 1);
    assert_eq!(v[0]["warningCount"], 1);
}

#[test]
fn quiet_hides_warnings() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("style.toml");
    fs::write(&config, "[rules]\neol_last = \"warn\"\n").unwrap();
    jsstyle()
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .write_stdin("a;")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn bad_config_is_a_tooling_failure() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("style.toml");
    fs::write(&config, "[rules]\nno_such_rule = \"error\"\n").unwrap();
    jsstyle()
        .arg("--config")
        .arg(&config)
        .write_stdin("a;\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown rule `no_such_rule`"));
}

#[test]
fn missing_files_are_tooling_failures() {
    let dir = TempDir::new().unwrap();
    jsstyle()
        .current_dir(dir.path())
        .arg("nope.js")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.js"));
}
