use std::collections::BTreeSet;

use anyhow::Result;
use serde::Deserialize;

use crate::engine::{Position, SourceLocation, Span, Spanned};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "no_trailing_spaces",
    description: "Disallow trailing whitespace at the end of lines",
    fixable: true,
    messages: &[("trailingSpace", "Trailing spaces not allowed.")],
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoTrailingSpaces {
    pub skip_blank_lines: bool,
    pub ignore_comments: bool,
}

impl NoTrailingSpaces {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        parse_options(META.name, options)
    }
}

impl Rule for NoTrailingSpaces {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        Visitor::new().on("program", |_, cx| self.check(cx))
    }
}

const fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{a0}' | '\u{2000}'..='\u{200b}' | '\u{3000}')
}

impl NoTrailingSpaces {
    fn check(&self, cx: &mut RuleContext<'_>) -> Result<()> {
        let buffer = cx.buffer();
        let comment_lines: BTreeSet<usize> = if self.ignore_comments {
            cx.tokens()
                .all_comments()
                .iter()
                .flat_map(|c| c.loc.start.line..=c.loc.end.line)
                .collect()
        } else {
            BTreeSet::new()
        };

        for line in 1..=buffer.line_count() {
            let (Some(start), Some(text)) = (buffer.line_start(line), buffer.line_text(line)) else {
                continue;
            };
            let trimmed = text.trim_end_matches(is_blank);
            if trimmed.len() == text.len() {
                continue;
            }
            let span = Span::new(start + trimmed.len(), start + text.len());
            if inside_literal(cx, span) {
                continue;
            }
            if self.skip_blank_lines && trimmed.is_empty() {
                continue;
            }
            if comment_lines.contains(&line) {
                continue;
            }
            let loc = SourceLocation {
                start: Position::new(line, trimmed.len()),
                end: Position::new(line, text.len()),
            };
            cx.report(
                Report::new(span, "trailingSpace")
                    .with_loc(loc)
                    .fix(move |f| f.remove_range(span)),
            )?;
        }
        Ok(())
    }
}

/// Whitespace that is part of a template or string value.
fn inside_literal(cx: &RuleContext<'_>, span: Span) -> bool {
    let Some(node) = cx.source().node_by_range_index(span.start) else {
        return false;
    };
    std::iter::once(node)
        .chain(node.ancestors())
        .find(|n| n.is("template_substitution") || n.is("template_string") || n.is("string"))
        .filter(|n| !n.is("template_substitution"))
        .is_some_and(|lit| {
            let outer = lit.span();
            outer.start < span.start && span.end < outer.end
        })
}
