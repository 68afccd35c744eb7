use anyhow::Result;
use serde::Deserialize;

use crate::engine::{Span, Token, TokenKind};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "spaced_comment",
    description: "Enforce consistent spacing after the `//` or `/*` in a comment",
    fixable: true,
    messages: &[
        ("unexpectedSpaceAfterMarker", "Unexpected space or tab after marker ({{refChar}}) in comment."),
        ("expectedExceptionAfter", "Expected exception block, space or tab after '{{refChar}}' in comment."),
        ("unexpectedSpaceBefore", "Unexpected space or tab before '*/' in comment."),
        ("unexpectedSpaceAfter", "Unexpected space or tab after '{{refChar}}' in comment."),
        ("expectedSpaceBefore", "Expected space or tab before '*/' in comment."),
        ("expectedSpaceAfter", "Expected space or tab after '{{refChar}}' in comment."),
    ],
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    #[default]
    Always,
    Never,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpacedComment {
    pub style: Spacing,
    /// Prefixes allowed right after `//` or `/*`, such as `!` or `/`. `*` is
    /// always one, for doc comments.
    pub markers: Vec<String>,
    /// Characters a comment may consist of instead of starting with a space,
    /// such as `-` in `//------`.
    pub exceptions: Vec<String>,
    /// Also check the space before `*/`.
    pub balanced: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Options {
    Style(Spacing),
    Table(SpacedComment),
}

impl Default for Options {
    fn default() -> Self {
        Self::Style(Spacing::Always)
    }
}

impl SpacedComment {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        let mut rule = match parse_options::<Options>(META.name, options)? {
            Options::Style(style) => Self {
                style,
                ..Self::default()
            },
            Options::Table(rule) => rule,
        };
        if !rule.markers.iter().any(|m| m == "*") {
            rule.markers.push("*".to_string());
        }
        Ok(rule)
    }
}

impl Rule for SpacedComment {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        Visitor::new().on("program", |_, cx| {
            for comment in cx.tokens().all_comments() {
                self.check(cx, comment)?;
            }
            Ok(())
        })
    }
}

fn is_space_or_tab(c: char) -> bool {
    c == ' ' || c == '\t'
}

impl SpacedComment {
    fn marker_of<'v>(&self, value: &'v str) -> Option<&'v str> {
        self.markers
            .iter()
            .find(|m| value.starts_with(m.as_str()))
            .map(|m| &value[..m.len()])
    }

    /// `rest` starts with whitespace, or is one or more repetitions of an
    /// exception running to the end of the line.
    fn begins_well(&self, rest: &str) -> bool {
        if rest.starts_with(char::is_whitespace) {
            return true;
        }
        let line = rest.split(['\n', '\r']).next().unwrap_or_default();
        self.exceptions.iter().any(|e| {
            !e.is_empty() && !line.is_empty() && line.len() % e.len() == 0 && line.matches(e.as_str()).count() * e.len() == line.len()
        })
    }

    fn check(&self, cx: &mut RuleContext<'_>, comment: &Token) -> Result<()> {
        let raw = cx.source().text_of(comment);
        let (opener, block) = match comment.kind {
            TokenKind::LineComment if raw.starts_with("//") => ("//", false),
            TokenKind::BlockComment => ("/*", true),
            _ => return Ok(()),
        };
        let value = comment.value.as_str();
        if value.is_empty() || self.markers.iter().any(|m| m == value) {
            return Ok(());
        }
        let body = comment.span.start + opener.len();
        let marker = self.marker_of(value);

        match self.style {
            Spacing::Always => {
                let ok = self.begins_well(value)
                    || marker.is_some_and(|m| self.begins_well(&value[m.len()..]));
                if !ok {
                    let end = body + marker.map_or(0, str::len);
                    let id = if self.exceptions.is_empty() {
                        "expectedSpaceAfter"
                    } else {
                        "expectedExceptionAfter"
                    };
                    cx.report(
                        Report::new(comment, id)
                            .data("refChar", format!("{opener}{}", marker.unwrap_or_default()))
                            .fix(move |f| f.insert_text_after_range(Span::new(comment.span.start, end), " ")),
                    )?;
                }
                if block && self.balanced && !value.ends_with(char::is_whitespace) {
                    let end = comment.span.end - 2;
                    cx.report(
                        Report::new(comment, "expectedSpaceBefore")
                            .fix(move |f| f.insert_text_after_range(Span::new(comment.span.start, end), " ")),
                    )?;
                }
            }
            Spacing::Never => {
                let after_marker = marker
                    .map(|m| &value[m.len()..])
                    .filter(|rest| rest.starts_with(is_space_or_tab));
                let found = match after_marker {
                    Some(rest) => Some(("unexpectedSpaceAfterMarker", value.len() - rest.len(), marker)),
                    None if value.starts_with(is_space_or_tab) => Some(("unexpectedSpaceAfter", 0, None)),
                    None => None,
                };
                if let Some((id, lead, kept)) = found {
                    let rest = &value[lead..];
                    let spaces = rest.len() - rest.trim_start_matches(is_space_or_tab).len();
                    let span = Span::new(comment.span.start, body + lead + spaces);
                    let replacement = format!("{opener}{}", kept.unwrap_or_default());
                    let ref_char = kept.map_or_else(|| opener.to_string(), str::to_string);
                    cx.report(
                        Report::new(comment, id)
                            .data("refChar", ref_char)
                            .fix(move |f| f.replace_text_range(span, replacement)),
                    )?;
                }
                if block && self.balanced {
                    let trailing = value.len() - value.trim_end_matches(is_space_or_tab).len();
                    if trailing > 0 {
                        let end = comment.span.end - 2;
                        let span = Span::new(end - trailing, end);
                        cx.report(
                            Report::new(comment, "unexpectedSpaceBefore")
                                .fix(move |f| f.remove_range(span)),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_is_always_a_marker() {
        let rule = SpacedComment::from_options(None).unwrap();
        assert_eq!(rule.markers, ["*"]);
        assert_eq!(rule.marker_of("* doc"), Some("*"));
        assert!(rule.begins_well(" x"));
        assert!(!rule.begins_well("x"));
    }

    #[test]
    fn exceptions_must_fill_the_line() {
        let v: toml::Value = toml::from_str("options = { exceptions = [\"-\"] }").unwrap();
        let rule = SpacedComment::from_options(v.get("options")).unwrap();
        assert!(rule.begins_well("-----"));
        assert!(!rule.begins_well("--x"));
    }
}
