use anyhow::Result;
use serde::Deserialize;

use crate::engine::{Span, Token, TokenKind};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "comma_spacing",
    description: "Enforce consistent spacing before and after commas",
    fixable: true,
    messages: &[
        ("missing", "A space is required {{loc}} ','."),
        ("unexpected", "There should be no space {{loc}} ','."),
    ],
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommaSpacing {
    pub before: bool,
    pub after: bool,
}

impl Default for CommaSpacing {
    fn default() -> Self {
        Self {
            before: false,
            after: true,
        }
    }
}

impl CommaSpacing {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        parse_options(META.name, options)
    }
}

impl Rule for CommaSpacing {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        Visitor::new().on("program:exit", |_, cx| self.check_all(cx))
    }
}

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

impl CommaSpacing {
    fn check_all(&self, cx: &mut RuleContext<'_>) -> Result<()> {
        let stream = cx.tokens().tokens_and_comments();
        for (i, comma) in stream.iter().enumerate() {
            if !comma.is_punctuator(",") {
                continue;
            }
            let left = i
                .checked_sub(1)
                .map(|j| &stream[j])
                .filter(|t| !t.is_punctuator(","));
            let right = stream.get(i + 1).filter(|t| !t.is_punctuator(","));

            if let Some(left) = left
                && left.is_on_same_line(comma)
                && self.before != cx.source().is_space_between(left, comma)
            {
                self.report(cx, comma, left, Side::Before)?;
            }

            let Some(right) = right else { continue };
            if matches!(right.value.as_str(), ")" | "]" | "}") && right.kind == TokenKind::Punctuator {
                continue;
            }
            if !self.after && right.kind == TokenKind::LineComment {
                continue;
            }
            if comma.is_on_same_line(right) && self.after != cx.source().is_space_between(comma, right) {
                self.report(cx, comma, right, Side::After)?;
            }
        }
        Ok(())
    }

    fn report(&self, cx: &mut RuleContext<'_>, comma: &Token, other: &Token, side: Side) -> Result<()> {
        let (want, loc) = match side {
            Side::Before => (self.before, "before"),
            Side::After => (self.after, "after"),
        };
        let id = if want { "missing" } else { "unexpected" };
        let gap = match side {
            Side::Before => Span::new(other.span.end, comma.span.start),
            Side::After => Span::new(comma.span.end, other.span.start),
        };
        let comma = comma.span;
        cx.report(Report::new(comma, id).data("loc", loc).fix(move |f| match (want, side) {
            (true, Side::Before) => f.insert_text_before(comma, " "),
            (true, Side::After) => f.insert_text_after(comma, " "),
            (false, _) => f.replace_text_range(gap, ""),
        }))?;
        Ok(())
    }
}
