use anyhow::Result;
use serde::Deserialize;

use crate::engine::{CursorOptions, Node, Token};
use crate::rules::{Report, Rule, RuleContext, RuleMeta, Visitor, parse_options};

const META: RuleMeta = RuleMeta {
    name: "space_infix_ops",
    description: "Require spacing around infix operators",
    fixable: true,
    messages: &[("missingSpace", "Operator '{{operator}}' must be spaced.")],
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpaceInfixOps {
    /// Allows `a|0`, the asm.js int32 coercion.
    pub int32_hint: bool,
}

impl SpaceInfixOps {
    pub fn from_options(options: Option<&toml::Value>) -> Result<Self> {
        parse_options(META.name, options)
    }
}

impl Rule for SpaceInfixOps {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn create(&self) -> Visitor<'_> {
        let int32_hint = self.int32_hint;
        Visitor::new()
            .on("binary_expression, augmented_assignment_expression", move |node, cx| {
                let Some(op) = node.field_info("operator") else {
                    return Ok(());
                };
                let Some(token) = cx.tokens().token_by_range_start(op.span.start, false) else {
                    return Ok(());
                };
                if int32_hint && op.kind == "|" && cx.source().text_of(node).ends_with("|0") {
                    return Ok(());
                }
                check_operator(cx, token)
            })
            .on(
                "assignment_expression, assignment_pattern, object_assignment_pattern",
                |node, cx| check_between(cx, node, "left", "right", "="),
            )
            .on("variable_declarator[value]", |node, cx| {
                check_between(cx, node, "name", "value", "=")
            })
            .on("field_definition[value]", |node, cx| {
                check_between(cx, node, "property", "value", "=")
            })
            .on("ternary_expression", |node, cx| {
                check_between(cx, node, "condition", "consequence", "?")?;
                check_between(cx, node, "consequence", "alternative", ":")
            })
    }
}

fn check_between(
    cx: &mut RuleContext<'_>,
    node: Node<'_>,
    left: &str,
    right: &str,
    op: &str,
) -> Result<()> {
    let (Some(left), Some(right)) = (node.field(left), node.field(right)) else {
        return Ok(());
    };
    let is_op = |t: &Token| t.is_punctuator(op);
    let found = cx
        .tokens()
        .first_token_between(left, right, CursorOptions::new().filter(&is_op));
    match found {
        Some(token) => check_operator(cx, token),
        None => Ok(()),
    }
}

fn check_operator(cx: &mut RuleContext<'_>, op: &Token) -> Result<()> {
    let tokens = cx.tokens();
    let source = cx.source();
    let (Some(prev), Some(next)) = (
        tokens.token_before(op, CursorOptions::new()),
        tokens.token_after(op, CursorOptions::new()),
    ) else {
        return Ok(());
    };
    if source.is_space_between(prev, op) && source.is_space_between(op, next) {
        return Ok(());
    }

    let mut text = String::new();
    if prev.span.end == op.span.start {
        text.push(' ');
    }
    text.push_str(&op.value);
    if next.span.start == op.span.end {
        text.push(' ');
    }
    let span = op.span;
    cx.report(
        Report::new(op, "missingSpace")
            .data("operator", op.value.clone())
            .fix(move |f| f.replace_text_range(span, text)),
    )?;
    Ok(())
}
