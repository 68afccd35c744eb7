use std::collections::BTreeMap;

use anyhow::Result;
use serde::Deserialize;

use crate::engine::{SourceLocation, Span, TokenKind};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "no_multi_spaces",
    description: "Disallow multiple spaces",
    fixable: true,
    messages: &[("multipleSpaces", "Multiple spaces found before '{{displayValue}}'.")],
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoMultiSpaces {
    pub ignore_eol_comments: bool,
    /// Node kinds inside which runs of spaces are allowed. Merged over
    /// `{ pair = true }`.
    pub exceptions: BTreeMap<String, bool>,
}

impl Default for NoMultiSpaces {
    fn default() -> Self {
        Self {
            ignore_eol_comments: false,
            exceptions: BTreeMap::from([("pair".to_string(), true)]),
        }
    }
}

impl NoMultiSpaces {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        let mut rule: Self = parse_options(META.name, options)?;
        rule.exceptions.entry("pair".to_string()).or_insert(true);
        Ok(rule)
    }
}

impl Rule for NoMultiSpaces {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        Visitor::new().on("program", |_, cx| self.check(cx))
    }
}

impl NoMultiSpaces {
    fn check(&self, cx: &mut RuleContext<'_>) -> Result<()> {
        let stream = cx.tokens().tokens_and_comments();
        let source = cx.source();
        for (i, pair) in stream.windows(2).enumerate() {
            let (left, right) = (&pair[0], &pair[1]);
            if left.loc.end.line < right.loc.start.line {
                continue;
            }
            let gap = Span::new(left.span.end, right.span.start);
            if !source.text_of(gap).contains("  ") {
                continue;
            }
            if self.ignore_eol_comments
                && right.is_comment()
                && stream
                    .get(i + 2)
                    .is_none_or(|after| right.loc.end.line < after.loc.start.line)
            {
                continue;
            }
            let allowed = source
                .node_by_range_index(right.span.start.saturating_sub(1))
                .is_some_and(|n| self.exceptions.get(n.kind_name()).copied().unwrap_or(false));
            if allowed {
                continue;
            }

            let display = match right.kind {
                TokenKind::BlockComment => format!("/*{}*/", right.value),
                TokenKind::LineComment => format!("//{}", right.value),
                _ => right.value.clone(),
            };
            cx.report(
                Report::new(right, "multipleSpaces")
                    .with_loc(SourceLocation {
                        start: left.loc.end,
                        end: right.loc.start,
                    })
                    .data("displayValue", display)
                    .fix(move |f| f.replace_text_range(gap, " ")),
            )?;
        }
        Ok(())
    }
}
