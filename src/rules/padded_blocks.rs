use anyhow::Result;
use serde::Deserialize;

use crate::engine::{CursorOptions, Node, SourceLocation, Span, Token};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "padded_blocks",
    description: "Require or disallow padding within blocks",
    fixable: true,
    messages: &[
        ("alwaysPadBlock", "Block must be padded by blank lines."),
        ("neverPadBlock", "Block must not be padded by blank lines."),
    ],
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    Always,
    Never,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Table {
    blocks: Option<Padding>,
    classes: Option<Padding>,
    switches: Option<Padding>,
    allow_single_line_blocks: bool,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            blocks: None,
            classes: None,
            switches: None,
            allow_single_line_blocks: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Options {
    All(Padding),
    Table(Table),
}

impl Default for Options {
    fn default() -> Self {
        Self::All(Padding::Always)
    }
}

/// Unset kinds of block are not checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaddedBlocks {
    pub blocks: Option<Padding>,
    pub classes: Option<Padding>,
    pub switches: Option<Padding>,
    pub allow_single_line_blocks: bool,
}

impl Default for PaddedBlocks {
    fn default() -> Self {
        Self::new(Padding::Always)
    }
}

impl PaddedBlocks {
    #[must_use]
    pub const fn new(padding: Padding) -> Self {
        Self {
            blocks: Some(padding),
            classes: Some(padding),
            switches: Some(padding),
            allow_single_line_blocks: true,
        }
    }

    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        Ok(match parse_options::<Options>(META.name, options)? {
            Options::All(padding) => Self::new(padding),
            Options::Table(t) => Self {
                blocks: t.blocks,
                classes: t.classes,
                switches: t.switches,
                allow_single_line_blocks: t.allow_single_line_blocks,
            },
        })
    }
}

impl Rule for PaddedBlocks {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        let allow = self.allow_single_line_blocks;
        let mut v = Visitor::new();
        if let Some(padding) = self.blocks {
            v = v.on("statement_block", move |node, cx| check(cx, node, padding, allow));
        }
        if let Some(padding) = self.classes {
            v = v.on("class_body", move |node, cx| check(cx, node, padding, allow));
        }
        if let Some(padding) = self.switches {
            v = v.on("switch_body", move |node, cx| check(cx, node, padding, allow));
        }
        v
    }
}

fn is_padding(first: &Token, second: &Token) -> bool {
    second.loc.start.line.saturating_sub(first.loc.end.line) >= 2
}

fn check(cx: &mut RuleContext<'_>, node: Node<'_>, padding: Padding, allow_single_line: bool) -> Result<()> {
    if node.child_count() == 0 {
        return Ok(());
    }
    let tokens = cx.tokens();
    let all = CursorOptions::new().with_comments();
    let (Some(open), Some(close)) = (
        tokens.first_token(node, CursorOptions::new()),
        tokens.last_token(node, CursorOptions::new()),
    ) else {
        return Ok(());
    };

    // Comments sharing a line with a brace count as part of it.
    let Some(mut first) = tokens.token_after(open, all) else {
        return Ok(());
    };
    let mut before_first = open;
    while first.is_comment() && first.loc.start.line == before_first.loc.end.line {
        before_first = first;
        let Some(next) = tokens.token_after(first, all) else {
            return Ok(());
        };
        first = next;
    }
    let Some(mut last) = tokens.token_before(close, all) else {
        return Ok(());
    };
    let mut after_last = close;
    while last.is_comment() && last.loc.end.line == after_last.loc.start.line {
        after_last = last;
        let Some(prev) = tokens.token_before(last, all) else {
            return Ok(());
        };
        last = prev;
    }

    if allow_single_line && before_first.is_on_same_line(after_last) {
        return Ok(());
    }
    let top = is_padding(before_first, first);
    let bottom = is_padding(last, after_last);
    let top_loc = SourceLocation {
        start: before_first.loc.start,
        end: first.loc.start,
    };
    let bottom_loc = SourceLocation {
        start: last.loc.end,
        end: after_last.loc.start,
    };

    match padding {
        Padding::Always => {
            if !top {
                cx.report(
                    Report::new(node, "alwaysPadBlock")
                        .with_loc(top_loc)
                        .fix(move |f| f.insert_text_after(before_first, f.newline())),
                )?;
            }
            if !bottom {
                cx.report(
                    Report::new(node, "alwaysPadBlock")
                        .with_loc(bottom_loc)
                        .fix(move |f| f.insert_text_before(after_last, f.newline())),
                )?;
            }
        }
        Padding::Never => {
            if top {
                let start = before_first.span.end;
                let end = first.span.start - first.loc.start.column;
                cx.report(
                    Report::new(node, "neverPadBlock")
                        .with_loc(top_loc)
                        .fix(move |f| f.replace_text_range(Span::new(start, end), f.newline())),
                )?;
            }
            if bottom {
                let start = last.span.end;
                let end = after_last.span.start - after_last.loc.start.column;
                cx.report(
                    Report::new(node, "neverPadBlock")
                        .with_loc(bottom_loc)
                        .fix(move |f| f.replace_text_range(Span::new(start, end), f.newline())),
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_options_leave_unset_kinds_alone() {
        let v: toml::Value =
            toml::from_str("options = { classes = \"never\", allow_single_line_blocks = false }").unwrap();
        let rule = PaddedBlocks::from_options(v.get("options")).unwrap();
        assert_eq!(rule.classes, Some(Padding::Never));
        assert_eq!(rule.blocks, None);
        assert!(!rule.allow_single_line_blocks);
        assert_eq!(rule.create().len(), 1);
    }
}
