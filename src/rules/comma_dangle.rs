use anyhow::Result;
use serde::Deserialize;

use crate::engine::{CursorOptions, Node, Token};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "comma_dangle",
    description: "Require or disallow trailing commas",
    fixable: true,
    messages: &[
        ("unexpected", "Unexpected trailing comma."),
        ("missing", "Missing trailing comma."),
    ],
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dangle {
    #[default]
    Never,
    Always,
    AlwaysMultiline,
    OnlyMultiline,
    Ignore,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerContext {
    pub arrays: Dangle,
    pub objects: Dangle,
    pub imports: Dangle,
    pub exports: Dangle,
    pub functions: Dangle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Options {
    All(Dangle),
    PerContext(PerContext),
}

impl Default for Options {
    fn default() -> Self {
        Self::All(Dangle::Never)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CommaDangle {
    pub options: PerContext,
}

impl CommaDangle {
    #[must_use]
    pub const fn new(mode: Dangle) -> Self {
        Self {
            options: PerContext {
                arrays: mode,
                objects: mode,
                imports: mode,
                exports: mode,
                functions: mode,
            },
        }
    }

    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        Ok(match parse_options::<Options>(META.name, options)? {
            Options::All(mode) => Self::new(mode),
            Options::PerContext(options) => Self { options },
        })
    }
}

impl Rule for CommaDangle {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        let o = self.options;
        Visitor::new()
            .on("array, array_pattern", move |node, cx| check(node, cx, o.arrays))
            .on("object, object_pattern", move |node, cx| check(node, cx, o.objects))
            .on("named_imports", move |node, cx| check(node, cx, o.imports))
            .on("export_clause", move |node, cx| check(node, cx, o.exports))
            .on("arguments, formal_parameters", move |node, cx| {
                check(node, cx, o.functions)
            })
    }
}

fn check(node: Node<'_>, cx: &mut RuleContext<'_>, mode: Dangle) -> Result<()> {
    let tokens = cx.tokens();
    // only bracketed lists
    let Some(closing) = tokens.last_token(node, CursorOptions::new()) else {
        return Ok(());
    };
    if !matches!(closing.value.as_str(), ")" | "]" | "}") {
        return Ok(());
    }
    let Some(last_item) = node.children().next_back() else {
        return Ok(());
    };
    let Some(item_end) = tokens.last_token(last_item, CursorOptions::new()) else {
        return Ok(());
    };
    let Some(after) = tokens.token_after(item_end, CursorOptions::new()) else {
        return Ok(());
    };

    let comma = after.is_punctuator(",").then_some(after);
    if let Some(comma) = comma
        && tokens
            .token_after(comma, CursorOptions::new())
            .is_some_and(|t| t.is_punctuator(","))
    {
        // trailing hole: `[a,,]`
        return Ok(());
    }
    let trailing = comma.unwrap_or(item_end);
    let multiline = tokens
        .token_after(trailing, CursorOptions::new())
        .is_some_and(|next| next.loc.end.line != trailing.loc.end.line);

    match mode {
        Dangle::Always => force(cx, last_item, item_end, comma)?,
        Dangle::AlwaysMultiline if multiline => force(cx, last_item, item_end, comma)?,
        Dangle::AlwaysMultiline => forbid(cx, comma)?,
        Dangle::OnlyMultiline if !multiline => forbid(cx, comma)?,
        Dangle::Never => forbid(cx, comma)?,
        Dangle::OnlyMultiline | Dangle::Ignore => {}
    }
    Ok(())
}

fn forbid(cx: &mut RuleContext<'_>, comma: Option<&Token>) -> Result<()> {
    let Some(comma) = comma else {
        return Ok(());
    };
    let tokens = cx.tokens();
    let before = tokens.token_before(comma, CursorOptions::new());
    let after = tokens.token_after(comma, CursorOptions::new());
    cx.report(Report::new(comma, "unexpected").fix(move |f| {
        // Claiming both neighbours keeps other fixes off this stretch.
        let mut edits = vec![f.remove(comma)];
        edits.extend(before.map(|t| f.insert_text_before(t, "")));
        edits.extend(after.map(|t| f.insert_text_after(t, "")));
        edits
    }))?;
    Ok(())
}

fn force(
    cx: &mut RuleContext<'_>,
    last_item: Node<'_>,
    item_end: &Token,
    comma: Option<&Token>,
) -> Result<()> {
    if comma.is_some() || last_item.is("rest_pattern") {
        return Ok(());
    }
    let Some(next) = cx.tokens().token_after(item_end, CursorOptions::new()) else {
        return Ok(());
    };
    let loc = next.loc;
    let span = item_end.span;
    cx.report(
        Report::new(span, "missing")
            .with_loc(crate::engine::SourceLocation {
                start: item_end.loc.end,
                end: loc.start,
            })
            .fix(move |f| [f.insert_text_after(span, ","), f.insert_text_before(next, "")]),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_accept_strings_and_tables() {
        let v: toml::Value = toml::from_str("options = \"always-multiline\"").unwrap();
        let rule = CommaDangle::from_options(v.get("options")).unwrap();
        assert_eq!(rule.options.arrays, Dangle::AlwaysMultiline);

        let v: toml::Value = toml::from_str("options = { arrays = \"always\" }").unwrap();
        let rule = CommaDangle::from_options(v.get("options")).unwrap();
        assert_eq!(rule.options.arrays, Dangle::Always);
        assert_eq!(rule.options.objects, Dangle::Never);

        let v: toml::Value = toml::from_str("options = \"sometimes\"").unwrap();
        assert!(CommaDangle::from_options(v.get("options")).is_err());
    }
}
