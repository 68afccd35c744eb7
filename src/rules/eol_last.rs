use anyhow::Result;
use serde::Deserialize;

use crate::engine::{Position, SourceLocation, Span};
use crate::rules::{Report, Rule, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "eol_last",
    description: "Require or disallow newline at the end of files",
    fixable: true,
    messages: &[
        ("missing", "Newline required at end of file but not found."),
        ("unexpected", "Newline not allowed at end of file."),
    ],
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EolLast {
    #[default]
    Always,
    Never,
    /// `always`, appending `\n`.
    Unix,
    /// `always`, appending `\r\n`.
    Windows,
}

impl EolLast {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        parse_options(META.name, options)
    }
}

impl Rule for EolLast {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        let mode = *self;
        Visitor::new().on("program", move |_, cx| {
            let buffer = cx.buffer();
            let text = buffer.text();
            if text.is_empty() {
                return Ok(());
            }
            let lines = buffer.line_count();
            let ends_with_newline = text.ends_with('\n');

            if mode != Self::Never && !ends_with_newline {
                let end = Position::new(lines, buffer.line_text(lines).map_or(0, str::len));
                let eol = if mode == Self::Windows { "\r\n" } else { "\n" };
                let len = text.len();
                cx.report(
                    Report::new(Span::at(len), "missing")
                        .with_loc(SourceLocation { start: end, end })
                        .fix(move |f| f.insert_text_after_range(Span::new(0, len), eol)),
                )?;
            } else if mode == Self::Never && ends_with_newline {
                let mut start = text.len();
                while let Some(head) = text[..start]
                    .strip_suffix("\r\n")
                    .or_else(|| text[..start].strip_suffix('\n'))
                {
                    start = head.len();
                }
                let start_line = lines.saturating_sub(1).max(1);
                let loc = SourceLocation {
                    start: Position::new(start_line, buffer.line_text(start_line).map_or(0, str::len)),
                    end: Position::new(lines, 0),
                };
                let span = Span::new(start, text.len());
                cx.report(
                    Report::new(span, "unexpected")
                        .with_loc(loc)
                        .fix(move |f| f.remove_range(span)),
                )?;
            }
            Ok(())
        })
    }
}
