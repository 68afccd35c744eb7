use std::fmt::{self, Write as _};

use owo_colors::{OwoColorize, Style};
use serde::Serialize;

use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::TextMeasure;
use crate::linter::FileReport;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Stylish,
    Json,
}

pub fn render(format: Format, reports: &[FileReport], color: bool) -> anyhow::Result<String> {
    Ok(match format {
        Format::Stylish => stylish(reports, color)?,
        Format::Json => json(reports)?,
    })
}

fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn pad(text: &str, width: usize, measure: &TextMeasure) -> String {
    let fill = width.saturating_sub(measure.display_width(text));
    format!("{text}{}", " ".repeat(fill))
}

/// Human readable report, one block per file with problems.
pub fn stylish(reports: &[FileReport], color: bool) -> Result<String, fmt::Error> {
    let measure = TextMeasure::default();
    let mut out = String::new();
    let (mut errors, mut warnings, mut fixable) = (0, 0, 0);

    for report in reports {
        let diagnostics = &report.outcome.diagnostics;
        if diagnostics.is_empty() {
            continue;
        }
        let rows: Vec<[String; 4]> = diagnostics
            .iter()
            .map(|d| {
                [
                    format!("{}:{}", d.loc.start.line, d.loc.start.column + 1),
                    d.severity.to_string(),
                    d.message.clone(),
                    d.rule.clone().unwrap_or_default(),
                ]
            })
            .collect();
        let widths: Vec<usize> = (0..3)
            .map(|i| {
                rows.iter()
                    .map(|r| measure.display_width(&r[i]))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        writeln!(out, "{}", paint(&report.path.display().to_string(), Style::new().underline(), color))?;
        for (d, row) in diagnostics.iter().zip(&rows) {
            let severity_style = match d.severity {
                Severity::Error => Style::new().red(),
                _ => Style::new().yellow(),
            };
            writeln!(
                out,
                "  {}  {}  {}  {}",
                paint(&pad(&row[0], widths[0], &measure), Style::new().dimmed(), color),
                paint(&pad(&row[1], widths[1], &measure), severity_style, color),
                pad(&row[2], widths[2], &measure),
                paint(&row[3], Style::new().dimmed(), color),
            )?;
        }
        out.push('\n');

        errors += diagnostics.iter().filter(|d| d.is_error()).count();
        warnings += diagnostics.iter().filter(|d| !d.is_error()).count();
        fixable += diagnostics.iter().filter(|d| d.fix.is_some()).count();
    }

    let total = errors + warnings;
    if total == 0 {
        return Ok(out);
    }
    let summary = format!(
        "\u{2716} {total} {} ({errors} {}, {warnings} {})",
        plural(total, "problem"),
        plural(errors, "error"),
        plural(warnings, "warning"),
    );
    let style = if errors > 0 {
        Style::new().red().bold()
    } else {
        Style::new().yellow().bold()
    };
    writeln!(out, "{}", paint(&summary, style, color))?;
    if fixable > 0 {
        writeln!(
            out,
            "  {fixable} {} potentially fixable with the `--fix` option.",
            plural(fixable, "problem"),
        )?;
    }
    Ok(out)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonFile<'a> {
    file_path: String,
    messages: &'a [Diagnostic],
    error_count: usize,
    warning_count: usize,
    fixable_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
}

/// One JSON object per file; `output` is present when fixes changed it.
pub fn json(reports: &[FileReport]) -> serde_json::Result<String> {
    let files: Vec<JsonFile<'_>> = reports
        .iter()
        .map(|r| {
            let messages = r.outcome.diagnostics.as_slice();
            let errors = messages.iter().filter(|d| d.is_error()).count();
            JsonFile {
                file_path: r.path.display().to_string(),
                messages,
                error_count: errors,
                warning_count: messages.len() - errors,
                fixable_count: messages.iter().filter(|d| d.fix.is_some()).count(),
                output: r.changed().then_some(r.outcome.output.as_str()),
            }
        })
        .collect();
    serde_json::to_string_pretty(&files)
}
