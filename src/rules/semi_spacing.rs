use anyhow::Result;
use serde::Deserialize;

use crate::engine::{CursorOptions, Span, Token};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "semi_spacing",
    description: "Enforce consistent spacing before and after semicolons",
    fixable: true,
    messages: &[
        ("unexpectedWhitespaceBefore", "Unexpected whitespace before semicolon."),
        ("unexpectedWhitespaceAfter", "Unexpected whitespace after semicolon."),
        ("missingWhitespaceBefore", "Missing whitespace before semicolon."),
        ("missingWhitespaceAfter", "Missing whitespace after semicolon."),
    ],
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemiSpacing {
    pub before: bool,
    pub after: bool,
}

impl Default for SemiSpacing {
    fn default() -> Self {
        Self {
            before: false,
            after: true,
        }
    }
}

impl SemiSpacing {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        parse_options(META.name, options)
    }
}

impl Rule for SemiSpacing {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        Visitor::new().on("program:exit", |_, cx| {
            for semi in cx.tokens().tokens() {
                if semi.is_punctuator(";") {
                    self.check(cx, semi)?;
                }
            }
            Ok(())
        })
    }
}

impl SemiSpacing {
    fn check(&self, cx: &mut RuleContext<'_>, semi: &Token) -> Result<()> {
        let tokens = cx.tokens();
        let source = cx.source();
        let before = tokens
            .token_before(semi, CursorOptions::new())
            .filter(|t| t.is_on_same_line(semi));
        let after = tokens
            .token_after(semi, CursorOptions::new())
            .filter(|t| semi.is_on_same_line(t));

        // empty clauses of `for (;;)` and empty statements
        if before.is_some_and(|t| t.is_punctuator("(") || t.is_punctuator(";")) {
            return Ok(());
        }

        if let Some(prev) = before {
            let spaced = source.is_space_between(prev, semi);
            let gap = Span::new(prev.span.end, semi.span.start);
            let clean = !tokens.comments_exist_between(prev, semi);
            if spaced && !self.before {
                let mut report = Report::new(semi, "unexpectedWhitespaceBefore");
                if clean {
                    report = report.fix(move |f| f.remove_range(gap));
                }
                cx.report(report)?;
            } else if !spaced && self.before {
                let at = semi.span;
                cx.report(
                    Report::new(semi, "missingWhitespaceBefore")
                        .fix(move |f| f.insert_text_before(at, " ")),
                )?;
            }
        }

        let Some(next) = after else { return Ok(()) };
        if before.is_none() || next.is_punctuator(")") || next.is_punctuator("}") {
            return Ok(());
        }
        let spaced = source.is_space_between(semi, next);
        let gap = Span::new(semi.span.end, next.span.start);
        let clean = !tokens.comments_exist_between(semi, next);
        if spaced && !self.after {
            let mut report = Report::new(semi, "unexpectedWhitespaceAfter");
            if clean {
                report = report.fix(move |f| f.remove_range(gap));
            }
            cx.report(report)?;
        } else if !spaced && self.after {
            let at = semi.span;
            cx.report(
                Report::new(semi, "missingWhitespaceAfter").fix(move |f| f.insert_text_after(at, " ")),
            )?;
        }
        Ok(())
    }
}
