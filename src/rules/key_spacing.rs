use anyhow::Result;
use serde::Deserialize;

use crate::engine::{CursorOptions, Node, SourceLocation, Span, Spanned};
use crate::rules::shape::{KeyValue, key_value};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "key_spacing",
    description: "Enforce consistent spacing between keys and values in object literal properties",
    fixable: true,
    messages: &[
        ("extraKey", "Extra space after {{computed}}key '{{key}}'."),
        ("extraValue", "Extra space before value for {{computed}}key '{{key}}'."),
        ("missingKey", "Missing space after {{computed}}key '{{key}}'."),
        ("missingValue", "Missing space before value for {{computed}}key '{{key}}'."),
    ],
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Strict,
    Minimum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Value,
    Colon,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeySpacing {
    pub before_colon: bool,
    pub after_colon: bool,
    pub mode: Mode,
    /// Vertically align the members of multi-line objects.
    pub align: Option<Align>,
}

impl Default for KeySpacing {
    fn default() -> Self {
        Self {
            before_colon: false,
            after_colon: true,
            mode: Mode::Strict,
            align: None,
        }
    }
}

impl KeySpacing {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        parse_options(META.name, options)
    }
}

impl Rule for KeySpacing {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        if self.align.is_some() {
            return Visitor::new().on("object", |node, cx| {
                if node.is_on_single_line() {
                    for member in node.children().filter_map(key_value) {
                        self.verify_spacing(cx, member.as_ref())?;
                    }
                    return Ok(());
                }
                self.verify_alignment(cx, node)
            });
        }
        Visitor::new().on("pair, pair_pattern", |node, cx| match key_value(node) {
            Some(member) => self.verify_spacing(cx, member.as_ref()),
            None => Ok(()),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Key,
    Value,
}

/// Whitespace around one member's colon.
struct Around {
    colon: Span,
    before: Span,
    after: Span,
    before_loc: SourceLocation,
    after_loc: SourceLocation,
}

fn around<'a>(cx: &RuleContext<'a>, member: &dyn KeyValue<'a>) -> Option<Around> {
    let source = cx.source();
    let colon = member.colon(source)?;
    let tokens = source.tokens();
    let prev = tokens.token_before(colon, CursorOptions::new().with_comments())?;
    let next = tokens.token_after(colon, CursorOptions::new().with_comments())?;
    Some(Around {
        colon: colon.span,
        before: Span::new(prev.span.end, colon.span.start),
        after: Span::new(colon.span.end, next.span.start),
        before_loc: prev.loc,
        after_loc: next.loc,
    })
}

impl KeySpacing {
    fn verify_spacing<'a>(&self, cx: &mut RuleContext<'a>, member: &dyn KeyValue<'a>) -> Result<()> {
        let Some(ws) = around(cx, member) else {
            return Ok(());
        };
        self.check(cx, member, &ws, Side::Key, usize::from(self.before_colon))?;
        self.check(cx, member, &ws, Side::Value, usize::from(self.after_colon))
    }

    fn verify_alignment<'a>(&self, cx: &mut RuleContext<'a>, object: Node<'a>) -> Result<()> {
        for group in groups(cx, object) {
            let members: Vec<_> = group.into_iter().filter_map(key_value).collect();
            let Some(first) = members.first() else {
                continue;
            };
            let last = &members[members.len() - 1];
            if first.node().loc().start.line == last.node().loc().end.line {
                for m in &members {
                    self.verify_spacing(cx, m.as_ref())?;
                }
                continue;
            }
            self.verify_group(cx, &members)?;
        }
        Ok(())
    }

    fn verify_group<'a>(
        &self,
        cx: &mut RuleContext<'a>,
        members: &[Box<dyn KeyValue<'a> + 'a>],
    ) -> Result<()> {
        let widths: Vec<usize> = members.iter().map(|m| key_width(cx, m.as_ref())).collect();
        let align = self.align.unwrap_or(Align::Value);
        let target = widths.iter().copied().max().unwrap_or(0)
            + usize::from(match align {
                Align::Colon => self.before_colon,
                Align::Value => self.after_colon,
            });

        for (m, width) in members.iter().zip(widths) {
            let Some(ws) = around(cx, m.as_ref()) else {
                continue;
            };
            let pad = target.saturating_sub(width);
            match align {
                Align::Value => {
                    self.check(cx, m.as_ref(), &ws, Side::Key, usize::from(self.before_colon))?;
                    self.check(cx, m.as_ref(), &ws, Side::Value, pad)?;
                }
                Align::Colon => {
                    self.check(cx, m.as_ref(), &ws, Side::Key, pad)?;
                    self.check(cx, m.as_ref(), &ws, Side::Value, usize::from(self.after_colon))?;
                }
            }
        }
        Ok(())
    }

    fn check<'a>(
        &self,
        cx: &mut RuleContext<'a>,
        member: &dyn KeyValue<'a>,
        ws: &Around,
        side: Side,
        expected: usize,
    ) -> Result<()> {
        let gap = match side {
            Side::Key => ws.before,
            Side::Value => ws.after,
        };
        let text = cx.source().text_of(gap);
        let actual = text.chars().count();
        let strict = self.mode == Mode::Strict;
        let wrong = if actual > expected {
            strict || expected == 0
        } else {
            actual < expected
        };
        let breaks = text.contains(['\n', '\r', '\u{2028}', '\u{2029}']);
        if !wrong || (expected > 0 && breaks) {
            return Ok(());
        }

        let extra = actual > expected;
        let count = actual.abs_diff(expected);
        let id = match (side, extra) {
            (Side::Key, true) => "extraKey",
            (Side::Value, true) => "extraValue",
            (Side::Key, false) => "missingKey",
            (Side::Value, false) => "missingValue",
        };
        let colon_loc = cx.buffer().location_of(ws.colon)?;
        let loc = match (side, extra) {
            (Side::Key, true) => SourceLocation {
                start: ws.before_loc.end,
                end: colon_loc.start,
            },
            (Side::Value, true) => SourceLocation {
                start: colon_loc.start,
                end: ws.after_loc.start,
            },
            (Side::Key, false) => ws.before_loc,
            (Side::Value, false) => ws.after_loc,
        };
        let removal = if side == Side::Key {
            let len: usize = text.chars().take(count).map(char::len_utf8).sum();
            Span::new(gap.start, gap.start + len)
        } else {
            let len: usize = text.chars().rev().take(count).map(char::len_utf8).sum();
            Span::new(gap.end - len, gap.end)
        };
        let anchor = match side {
            Side::Key => member.key().span(),
            Side::Value => member.value().span(),
        };
        let key = member.key_name(cx.source());
        let computed = if member.is_computed() { "computed " } else { "" };
        let report = Report::new(anchor, id)
            .with_loc(loc)
            .data("computed", computed)
            .data("key", key);
        cx.report(report.fix(move |f| {
            if extra {
                f.remove_range(removal)
            } else if side == Side::Key {
                f.insert_text_before_range(gap, " ".repeat(count))
            } else {
                f.insert_text_after_range(gap, " ".repeat(count))
            }
        }))?;
        Ok(())
    }
}

/// Text width from the member's first token to the end of its key.
fn key_width<'a>(cx: &RuleContext<'a>, member: &dyn KeyValue<'a>) -> usize {
    let tokens = cx.tokens();
    let start = tokens
        .first_token(member.node(), CursorOptions::new())
        .map_or(member.span().start, |t| t.span.start);
    let end = member
        .colon(cx.source())
        .and_then(|c| tokens.token_before(c, CursorOptions::new()))
        .map_or(member.key().span().end, |t| t.span.end);
    cx.measure()
        .grapheme_count(cx.source().text_of(Span::new(start, end.max(start))))
}

/// Splits an object's members into runs on adjacent lines. Comments on the
/// lines in between keep a run going.
fn groups<'a>(cx: &RuleContext<'a>, object: Node<'a>) -> Vec<Vec<Node<'a>>> {
    let tokens = cx.tokens();
    let mut out: Vec<Vec<Node<'a>>> = Vec::new();
    for member in object.children() {
        let continues = out.last().and_then(|g| g.last()).is_some_and(|&prev| {
            let group_end = prev.loc().start.line;
            let start = key_value(member)
                .and_then(|kv| kv.colon(cx.source()))
                .and_then(|c| tokens.token_after(c, CursorOptions::new()))
                .map_or(member.loc().start.line, |t| t.loc.start.line);
            if start.saturating_sub(group_end) <= 1 {
                return true;
            }
            let comments = tokens.comments_before(member);
            let (Some(first), Some(last)) = (comments.first(), comments.last()) else {
                return false;
            };
            first.loc.start.line.saturating_sub(group_end) <= 1
                && start.saturating_sub(last.loc.end.line) <= 1
                && comments
                    .windows(2)
                    .all(|w| w[1].loc.start.line.saturating_sub(w[0].loc.end.line) <= 1)
        });
        match out.last_mut() {
            Some(group) if continues => group.push(member),
            _ => out.push(vec![member]),
        }
    }
    out
}
