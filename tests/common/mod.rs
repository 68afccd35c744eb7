#![allow(dead_code)]

use anyhow::Result;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use jsstyle::grammar::JsParser;
use jsstyle::rules::Rule;
use jsstyle::{Diagnostic, Linter, Severity};

pub fn linter_with(rules: Vec<Box<dyn Rule>>) -> Linter {
    let mut linter = Linter::new(JsParser::new());
    for rule in rules {
        linter.register(rule, Severity::Error).unwrap();
    }
    linter
}

/// Fixed text of `input` under a single rule.
pub fn fix(rule: impl Rule + 'static, input: &str) -> String {
    linter_with(vec![Box::new(rule)]).verify_and_fix(input).output
}

/// Message ids `rule` reports for `input`, in report order.
pub fn ids(rule: impl Rule + 'static, input: &str) -> Vec<String> {
    linter_with(vec![Box::new(rule)])
        .verify(input)
        .diagnostics
        .iter()
        .filter_map(|d| d.message_id.clone())
        .collect()
}

pub fn diagnostics(rule: impl Rule + 'static, input: &str) -> Vec<Diagnostic> {
    linter_with(vec![Box::new(rule)]).verify(input).diagnostics
}

pub fn run_cli_on_str(args: &[&str], input: &str) -> Result<Output> {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jsstyle"));
    cmd.args(args)
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    child.stdin.take().unwrap().write_all(input.as_bytes())?;
    Ok(child.wait_with_output()?)
}
