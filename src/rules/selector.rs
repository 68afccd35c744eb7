use thiserror::Error;

use crate::engine::{Node, NodeKind};
use crate::grammar::SourceParser;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector `{selector}`")]
    Empty { selector: &'static str },
    #[error("unknown node kind `{kind}` in selector `{selector}`")]
    UnknownKind {
        selector: &'static str,
        kind: &'static str,
    },
    #[error("malformed selector `{selector}`: {reason}")]
    Syntax {
        selector: &'static str,
        reason: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Attr {
    Has(&'static str),
    Lacks(&'static str),
    Is(&'static str, &'static str),
}

impl Attr {
    fn matches(&self, node: Node<'_>) -> bool {
        match *self {
            Self::Has(field) => node.has_field(field),
            Self::Lacks(field) => !node.has_field(field),
            Self::Is(field, kind) => node.field_info(field).is_some_and(|f| f.kind == kind),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Simple {
    /// `None` is the `*` wildcard.
    kind: Option<NodeKind>,
    attrs: Vec<Attr>,
}

/// A compiled listener selector. Kind names are resolved to [`NodeKind`]s
/// once, so dispatch never compares strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: &'static str,
    alternatives: Vec<Simple>,
    exit: bool,
}

impl Selector {
    /// Grammar: `kind`, `*`, `kind[field]`, `kind[!field]`, `kind[field=kind]`,
    /// alternatives joined with `,`, and an optional trailing `:exit`.
    pub fn compile(
        source: &'static str,
        parser: &dyn SourceParser,
    ) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        let (body, exit) = match trimmed.strip_suffix(":exit") {
            Some(body) => (body, true),
            None => (trimmed, false),
        };
        if body.trim().is_empty() {
            return Err(SelectorError::Empty { selector: source });
        }

        let alternatives = body
            .split(',')
            .map(|alt| compile_simple(source, alt.trim(), parser))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source,
            alternatives,
            exit,
        })
    }

    #[must_use]
    pub const fn source(&self) -> &'static str {
        self.source
    }

    #[must_use]
    pub const fn is_exit(&self) -> bool {
        self.exit
    }

    /// Kinds this selector can fire on; `None` in the output means "every kind".
    pub fn kinds(&self) -> impl Iterator<Item = Option<NodeKind>> + '_ {
        self.alternatives.iter().map(|s| s.kind)
    }

    #[must_use]
    pub fn matches(&self, node: Node<'_>) -> bool {
        self.alternatives.iter().any(|s| {
            s.kind.is_none_or(|k| k == node.kind()) && s.attrs.iter().all(|a| a.matches(node))
        })
    }
}

fn compile_simple(
    selector: &'static str,
    alt: &'static str,
    parser: &dyn SourceParser,
) -> Result<Simple, SelectorError> {
    let syntax = |reason| SelectorError::Syntax { selector, reason };
    if alt.is_empty() {
        return Err(syntax("empty alternative"));
    }

    let (name, mut rest) = alt.find('[').map_or((alt, ""), |i| alt.split_at(i));
    let name = name.trim();
    if name.contains(|c: char| c.is_whitespace() || c == ':' || c == ']') {
        return Err(syntax("unexpected character in node kind"));
    }
    let kind = if name == "*" {
        None
    } else {
        Some(
            parser
                .node_kind(name)
                .ok_or(SelectorError::UnknownKind { selector, kind: name })?,
        )
    };

    let mut attrs = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(|| syntax("expected `[`"))?;
        let close = inner.find(']').ok_or_else(|| syntax("unclosed `[`"))?;
        let attr = inner[..close].trim();
        rest = inner[close + 1..].trim_start();
        if attr.is_empty() {
            return Err(syntax("empty attribute"));
        }
        attrs.push(if let Some(field) = attr.strip_prefix('!') {
            Attr::Lacks(field.trim())
        } else if let Some((field, kind)) = attr.split_once('=') {
            Attr::Is(field.trim(), kind.trim())
        } else {
            Attr::Has(attr)
        });
    }

    Ok(Simple { kind, attrs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::JsParser;

    #[test]
    fn compiles_alternatives_and_exit() {
        let p = JsParser::new();
        let sel = Selector::compile("statement_block, class_body:exit", &p).unwrap();
        assert!(sel.is_exit());
        assert_eq!(sel.kinds().count(), 2);
        let star = Selector::compile("*", &p).unwrap();
        assert_eq!(star.kinds().collect::<Vec<_>>(), [None]);
    }

    #[test]
    fn rejects_unknown_kinds_and_bad_syntax() {
        let p = JsParser::new();
        assert_eq!(
            Selector::compile("blok", &p).unwrap_err(),
            SelectorError::UnknownKind {
                selector: "blok",
                kind: "blok"
            }
        );
        assert!(matches!(
            Selector::compile("pair[key", &p),
            Err(SelectorError::Syntax { .. })
        ));
        assert!(matches!(
            Selector::compile(" :exit", &p),
            Err(SelectorError::Empty { .. })
        ));
        assert!(matches!(
            Selector::compile("pair,", &p),
            Err(SelectorError::Syntax { .. })
        ));
    }

    #[test]
    fn attributes_filter_on_fields() {
        let p = JsParser::new();
        let src = p.parse("x = a + b; y = a * b;").unwrap();
        let plus = Selector::compile("binary_expression[operator=+]", &p).unwrap();
        let hits: Vec<_> = src
            .ast()
            .descendants_of_kind("binary_expression")
            .filter(|n| plus.matches(*n))
            .collect();
        assert_eq!(hits.len(), 1);
        let no_value = Selector::compile("binary_expression[!value]", &p).unwrap();
        assert!(no_value.matches(hits[0]));
        let has_left = Selector::compile("binary_expression[left]", &p).unwrap();
        assert!(has_left.matches(hits[0]));
    }
}
