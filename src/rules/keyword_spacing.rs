use std::collections::BTreeMap;

use anyhow::Result;
use serde::Deserialize;

use crate::engine::{CursorOptions, Span, Token, TokenKind};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "keyword_spacing",
    description: "Enforce consistent spacing before and after keywords",
    fixable: true,
    messages: &[
        ("expectedBefore", "Expected space(s) before \"{{value}}\"."),
        ("expectedAfter", "Expected space(s) after \"{{value}}\"."),
        ("unexpectedBefore", "Unexpected space(s) before \"{{value}}\"."),
        ("unexpectedAfter", "Unexpected space(s) after \"{{value}}\"."),
    ],
};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "finally", "for", "from", "function",
    "get", "if", "import", "in", "instanceof", "let", "new", "of", "return", "set", "static",
    "super", "switch", "this", "throw", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Keywords whose following `(` belongs to another rule.
const CALL_LIKE: &[&str] = &["function", "super", "import", "this"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Override {
    pub before: Option<bool>,
    pub after: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeywordSpacing {
    pub before: bool,
    pub after: bool,
    pub overrides: BTreeMap<String, Override>,
}

impl Default for KeywordSpacing {
    fn default() -> Self {
        Self {
            before: true,
            after: true,
            overrides: BTreeMap::new(),
        }
    }
}

impl KeywordSpacing {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        parse_options(META.name, options)
    }

    fn wants(&self, keyword: &str) -> (bool, bool) {
        let o = self.overrides.get(keyword).copied().unwrap_or_default();
        (o.before.unwrap_or(self.before), o.after.unwrap_or(self.after))
    }
}

impl Rule for KeywordSpacing {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        Visitor::new().on("program", |_, cx| {
            for token in cx.tokens().tokens() {
                if token.kind == TokenKind::Keyword && KEYWORDS.contains(&token.value.as_str()) {
                    self.check(cx, token)?;
                }
            }
            Ok(())
        })
    }
}

fn checks_type(t: &Token) -> bool {
    matches!(t.kind, TokenKind::String | TokenKind::Template | TokenKind::RegularExpression)
}

fn matters_before(prev: &Token) -> bool {
    if prev.kind == TokenKind::Template {
        return prev.value != "${";
    }
    checks_type(prev)
        || (prev.kind == TokenKind::Punctuator && matches!(prev.value.as_str(), ")" | "]" | "}" | ">"))
}

fn matters_after(next: &Token) -> bool {
    if next.kind == TokenKind::Template {
        return next.value != "}";
    }
    checks_type(next)
        || (next.kind == TokenKind::Punctuator
            && matches!(
                next.value.as_str(),
                "(" | "[" | "{" | "<" | "~" | "!" | "+" | "++" | "-" | "--"
            ))
}

impl KeywordSpacing {
    fn check(&self, cx: &mut RuleContext<'_>, token: &Token) -> Result<()> {
        let (before, after) = self.wants(&token.value);
        let tokens = cx.tokens();
        let source = cx.source();

        if let Some(prev) = tokens.token_before(token, CursorOptions::new())
            && matters_before(prev)
            && prev.is_on_same_line(token)
        {
            let spaced = source.is_space_between(prev, token);
            let at = token.span;
            if before && !spaced {
                cx.report(
                    Report::new(token, "expectedBefore")
                        .data("value", token.value.clone())
                        .fix(move |f| f.insert_text_before(at, " ")),
                )?;
            } else if !before && spaced {
                let gap = Span::new(prev.span.end, token.span.start);
                let mut report = Report::new(token, "unexpectedBefore").data("value", token.value.clone());
                if !tokens.comments_exist_between(prev, token) {
                    report = report.fix(move |f| f.remove_range(gap));
                }
                cx.report(report)?;
            }
        }

        if let Some(next) = tokens.token_after(token, CursorOptions::new())
            && matters_after(next)
            && token.is_on_same_line(next)
            && !(next.is_punctuator("(") && CALL_LIKE.contains(&token.value.as_str()))
        {
            let spaced = source.is_space_between(token, next);
            let at = token.span;
            if after && !spaced {
                cx.report(
                    Report::new(token, "expectedAfter")
                        .data("value", token.value.clone())
                        .fix(move |f| f.insert_text_after(at, " ")),
                )?;
            } else if !after && spaced {
                let gap = Span::new(token.span.end, next.span.start);
                let mut report = Report::new(token, "unexpectedAfter").data("value", token.value.clone());
                if !tokens.comments_exist_between(token, next) {
                    report = report.fix(move |f| f.remove_range(gap));
                }
                cx.report(report)?;
            }
        }
        Ok(())
    }
}
