use std::any::Any;
use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::Config;
use crate::diagnostic::{Diagnostic, Severity, ToolingError};
use crate::engine::{Fix, Position, SourceCode, SourceLocation, Span, TextMeasure, WalkEvent, apply_fixes};
use crate::grammar::{ParseError, SourceParser};
use crate::rules::{self, Filtered, Listener, Rule, RuleContext, Selector, SelectorError};

pub const DEFAULT_MAX_PASSES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinterOptions {
    /// Upper bound on lint-and-fix passes per file.
    pub max_passes: usize,
    pub measure: TextMeasure,
}

impl Default for LinterOptions {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            measure: TextMeasure::default(),
        }
    }
}

struct Registered {
    rule: Box<dyn Rule>,
    severity: Severity,
}

/// Runs a set of rules over source text and merges their fixes.
pub struct Linter {
    parser: Box<dyn SourceParser>,
    rules: Vec<Registered>,
    options: LinterOptions,
}

/// Result of linting one text once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    /// Sorted by start position; ties keep rule registration order.
    pub diagnostics: Vec<Diagnostic>,
    pub tooling_errors: Vec<ToolingError>,
}

impl Verification {
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixOutcome {
    pub output: String,
    /// Some fix was applied in at least one pass.
    pub fixed: bool,
    pub passes: usize,
    /// Fixes applied over all passes.
    pub applied: usize,
    /// Problems left in `output`.
    pub diagnostics: Vec<Diagnostic>,
    pub tooling_errors: Vec<ToolingError>,
}

impl FixOutcome {
    /// A single lint of `text` with nothing applied.
    #[must_use]
    pub fn unfixed(text: &str, verdict: Verification) -> Self {
        Self {
            output: text.to_string(),
            fixed: false,
            passes: 1,
            applied: 0,
            diagnostics: verdict.diagnostics,
            tooling_errors: verdict.tooling_errors,
        }
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// `None` when the file could not be read.
    pub source: Option<String>,
    pub outcome: FixOutcome,
}

impl FileReport {
    /// The fixed text differs from what was read.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.source
            .as_deref()
            .is_some_and(|s| self.outcome.fixed && s != self.outcome.output)
    }
}

/// One listener of one rule, live for a single file pass.
struct Active<'r> {
    rule: usize,
    selector: Selector,
    listener: Listener<'r>,
}

impl Linter {
    pub fn new(parser: impl SourceParser + 'static) -> Self {
        Self {
            parser: Box::new(parser),
            rules: Vec::new(),
            options: LinterOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: LinterOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &LinterOptions {
        &self.options
    }

    /// Builds the configured rules in name order.
    pub fn from_config(parser: impl SourceParser + 'static, config: &Config) -> Result<Self> {
        ensure!(config.max_passes >= 1, "max_passes must be at least 1");
        let mut linter = Self::new(parser).with_options(LinterOptions {
            max_passes: config.max_passes,
            measure: TextMeasure::new(config.tab_width),
        });
        for (name, setting) in &config.rules {
            let severity = setting.level();
            if severity == Severity::Off {
                continue;
            }
            let mut rule = rules::create(name, setting.options())?;
            let skip = setting.skip_messages();
            if !skip.is_empty() {
                for id in skip {
                    ensure!(
                        rule.meta().message(id).is_some(),
                        "rule `{name}` has no message `{id}`"
                    );
                }
                rule = Box::new(Filtered::new(rule, skip.iter().cloned()));
            }
            linter
                .register(rule, severity)
                .with_context(|| format!("cannot register rule `{name}`"))?;
        }
        Ok(linter)
    }

    /// Adds a rule after checking that all of its selectors compile. Rules
    /// at [`Severity::Off`] are dropped.
    pub fn register(&mut self, rule: Box<dyn Rule>, severity: Severity) -> Result<&mut Self, SelectorError> {
        for selector in rule.create().selectors() {
            Selector::compile(selector, self.parser.as_ref())?;
        }
        if severity != Severity::Off {
            self.rules.push(Registered { rule, severity });
        }
        Ok(self)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.rule.meta().name)
    }

    /// Lints `text` once.
    pub fn verify(&self, text: &str) -> Verification {
        match self.parser.parse(text) {
            Ok(source) => self.run_rules(&source),
            Err(ParseError::Syntax {
                message,
                offset,
                line,
                column,
            }) => {
                let at = Position::new(line, column);
                Verification {
                    diagnostics: vec![Diagnostic {
                        rule: None,
                        message_id: None,
                        message: format!("Parsing error: {message}"),
                        severity: Severity::Error,
                        span: Span::at(offset),
                        loc: SourceLocation { start: at, end: at },
                        fix: None,
                        fatal: true,
                    }],
                    tooling_errors: Vec::new(),
                }
            }
            Err(e) => Verification {
                diagnostics: Vec::new(),
                tooling_errors: vec![ToolingError {
                    path: None,
                    rule: None,
                    message: e.to_string(),
                }],
            },
        }
    }

    /// Lints and fixes until nothing more applies or the pass budget runs
    /// out. Fixes that conflict in one pass are retried in the next.
    pub fn verify_and_fix(&self, text: &str) -> FixOutcome {
        let mut output = text.to_string();
        let mut passes = 0;
        let mut applied = 0;
        let mut fixed_any = false;
        let mut tooling_errors = Vec::new();

        let (mut verdict, last_fixed) = loop {
            passes += 1;
            let verdict = self.verify(&output);
            let fixes: Vec<&Fix> = verdict
                .diagnostics
                .iter()
                .filter_map(|d| d.fix.as_ref())
                .collect();

            let mut pass_fixed = false;
            if !fixes.is_empty() {
                match apply_fixes(&output, &fixes) {
                    Ok(result) => {
                        debug!(
                            pass = passes,
                            problems = verdict.diagnostics.len(),
                            accepted = result.accepted.len(),
                            deferred = result.deferred.len(),
                            "fix pass"
                        );
                        pass_fixed = result.fixed();
                        applied += result.accepted.len();
                        output = result.output;
                    }
                    Err(e) => tooling_errors.push(ToolingError {
                        path: None,
                        rule: None,
                        message: e.to_string(),
                    }),
                }
            }
            fixed_any |= pass_fixed;
            if !pass_fixed || passes >= self.options.max_passes {
                break (verdict, pass_fixed);
            }
            tooling_errors.extend(verdict.tooling_errors);
        };

        if last_fixed {
            tooling_errors.append(&mut verdict.tooling_errors);
            verdict = self.verify(&output);
            if passes >= self.options.max_passes {
                debug!(passes, "pass budget exhausted");
            }
        }
        tooling_errors.append(&mut verdict.tooling_errors);
        dedup_tooling_errors(&mut tooling_errors);

        FixOutcome {
            output,
            fixed: fixed_any,
            passes,
            applied,
            diagnostics: verdict.diagnostics,
            tooling_errors,
        }
    }

    /// Lints (and with `fix`, fixes) every path in parallel. Files are not
    /// written back.
    pub fn lint_paths(&self, paths: &[PathBuf], fix: bool) -> Vec<FileReport> {
        paths.par_iter().map(|p| self.lint_file(p, fix)).collect()
    }

    fn lint_file(&self, path: &Path, fix: bool) -> FileReport {
        let source = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                return FileReport {
                    path: path.to_path_buf(),
                    source: None,
                    outcome: FixOutcome {
                        output: String::new(),
                        fixed: false,
                        passes: 0,
                        applied: 0,
                        diagnostics: Vec::new(),
                        tooling_errors: vec![ToolingError {
                            path: Some(path.to_path_buf()),
                            rule: None,
                            message: format!("cannot read file: {e}"),
                        }],
                    },
                };
            }
        };
        let mut outcome = if fix {
            self.verify_and_fix(&source)
        } else {
            FixOutcome::unfixed(&source, self.verify(&source))
        };
        for err in &mut outcome.tooling_errors {
            err.path.get_or_insert_with(|| path.to_path_buf());
        }
        FileReport {
            path: path.to_path_buf(),
            source: Some(source),
            outcome,
        }
    }

    fn run_rules(&self, source: &SourceCode) -> Verification {
        let kinds = self.parser.node_kind_count();
        let mut enter: Vec<Vec<usize>> = vec![Vec::new(); kinds];
        let mut exit: Vec<Vec<usize>> = vec![Vec::new(); kinds];
        let mut active: Vec<Active<'_>> = Vec::new();
        let mut failed = vec![false; self.rules.len()];
        let mut problems: Vec<Vec<Diagnostic>> = vec![Vec::new(); self.rules.len()];
        let mut tooling_errors = Vec::new();

        for (ri, reg) in self.rules.iter().enumerate() {
            for (text, listener) in reg.rule.create().into_listeners() {
                let selector = match Selector::compile(text, self.parser.as_ref()) {
                    Ok(s) => s,
                    Err(e) => {
                        failed[ri] = true;
                        tooling_errors.push(rule_failure(reg.rule.meta().name, e.to_string()));
                        break;
                    }
                };
                let idx = active.len();
                let table = if selector.is_exit() { &mut exit } else { &mut enter };
                for kind in selector.kinds() {
                    match kind {
                        Some(k) => {
                            if let Some(row) = table.get_mut(k.index()) {
                                push_once(row, idx);
                            }
                        }
                        None => table.iter_mut().for_each(|row| push_once(row, idx)),
                    }
                }
                active.push(Active {
                    rule: ri,
                    selector,
                    listener,
                });
            }
        }

        for event in source.ast().walk() {
            let (node, table) = match event {
                WalkEvent::Enter(n) => (n, &enter),
                WalkEvent::Exit(n) => (n, &exit),
            };
            let Some(row) = table.get(node.kind().index()) else {
                continue;
            };
            for &li in row {
                let Active {
                    rule,
                    selector,
                    listener,
                } = &mut active[li];
                let rule = *rule;
                if failed[rule] || !selector.matches(node) {
                    continue;
                }
                let reg = &self.rules[rule];
                let meta = reg.rule.meta();
                let mut cx = RuleContext::new(
                    source,
                    meta,
                    reg.severity,
                    &self.options.measure,
                    &mut problems[rule],
                );
                let message = match panic::catch_unwind(AssertUnwindSafe(|| listener(node, &mut cx))) {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => format!("{e:#}"),
                    Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
                };
                warn!(rule = meta.name, %message, "rule failed; its problems for this file are dropped");
                failed[rule] = true;
                problems[rule].clear();
                tooling_errors.push(rule_failure(meta.name, message));
            }
        }

        let mut diagnostics: Vec<Diagnostic> = problems.into_iter().flatten().collect();
        diagnostics.sort_by_key(|d| (d.loc.start.line, d.loc.start.column));
        Verification {
            diagnostics,
            tooling_errors,
        }
    }
}

fn push_once(row: &mut Vec<usize>, idx: usize) {
    if row.last() != Some(&idx) {
        row.push(idx);
    }
}

fn rule_failure(rule: &str, message: String) -> ToolingError {
    ToolingError {
        path: None,
        rule: Some(rule.to_string()),
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Drops repeats of the same failure across passes, keeping first-seen order.
fn dedup_tooling_errors(errors: &mut Vec<ToolingError>) {
    let mut seen = HashSet::new();
    errors.retain(|e| seen.insert(e.clone()));
}
