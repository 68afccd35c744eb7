//! Read-only views giving differently shaped nodes one common interface.

use crate::engine::{CursorOptions, Node, SourceCode, Span, Spanned, Token};

/// A `key: value` member, whether it builds an object or destructures one.
pub trait KeyValue<'a>: Spanned {
    fn node(&self) -> Node<'a>;

    fn key(&self) -> Node<'a>;

    /// Node whose first token follows the colon.
    fn value(&self) -> Node<'a>;

    /// `[expr]` keys.
    fn is_computed(&self) -> bool {
        self.key().is("computed_property_name")
    }

    /// The `:` separating key and value.
    fn colon(&self, source: &'a SourceCode) -> Option<&'a Token> {
        let is_colon = |t: &Token| t.is_punctuator(":");
        source
            .tokens()
            .first_token_between(self.key(), self.value(), CursorOptions::new().filter(&is_colon))
    }

    /// Display name used in messages: identifier text, string contents, or
    /// the bracketed expression's text.
    fn key_name(&self, source: &SourceCode) -> String {
        let key = self.key();
        let text = source.text_of(key);
        if self.is_computed() {
            let inner = text.strip_prefix('[').and_then(|t| t.strip_suffix(']'));
            return inner.unwrap_or(text).trim().to_string();
        }
        if key.is("string") && text.len() >= 2 {
            return text[1..text.len() - 1].to_string();
        }
        text.to_string()
    }
}

/// A `pair` in an object literal.
#[derive(Clone, Copy, Debug)]
pub struct Property<'a> {
    node: Node<'a>,
    key: Node<'a>,
    value: Node<'a>,
}

impl<'a> KeyValue<'a> for Property<'a> {
    fn node(&self) -> Node<'a> {
        self.node
    }

    fn key(&self) -> Node<'a> {
        self.key
    }

    fn value(&self) -> Node<'a> {
        self.value
    }
}

/// A `pair_pattern` in a destructuring pattern; `{ a: b = 1 }` binds `b` with
/// default `1`.
#[derive(Clone, Copy, Debug)]
pub struct PatternProperty<'a> {
    node: Node<'a>,
    key: Node<'a>,
    target: Node<'a>,
}

impl<'a> PatternProperty<'a> {
    /// The bound name or nested pattern, without its default.
    #[must_use]
    pub fn binding(&self) -> Node<'a> {
        if self.target.is("assignment_pattern") {
            self.target.field("left").unwrap_or(self.target)
        } else {
            self.target
        }
    }

    #[must_use]
    pub fn default_value(&self) -> Option<Node<'a>> {
        self.target
            .is("assignment_pattern")
            .then(|| self.target.field("right"))
            .flatten()
    }
}

impl<'a> KeyValue<'a> for PatternProperty<'a> {
    fn node(&self) -> Node<'a> {
        self.node
    }

    fn key(&self) -> Node<'a> {
        self.key
    }

    fn value(&self) -> Node<'a> {
        self.target
    }
}

impl Spanned for Property<'_> {
    fn span(&self) -> Span {
        self.node.span()
    }
}

impl Spanned for PatternProperty<'_> {
    fn span(&self) -> Span {
        self.node.span()
    }
}

/// Views `node` as a key-value member when it is one.
#[must_use]
pub fn key_value<'a>(node: Node<'a>) -> Option<Box<dyn KeyValue<'a> + 'a>> {
    let key = node.field("key")?;
    let value = node.field("value")?;
    match node.kind_name() {
        "pair" => Some(Box::new(Property { node, key, value })),
        "pair_pattern" => Some(Box::new(PatternProperty {
            node,
            key,
            target: value,
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{JsParser, SourceParser};

    #[test]
    fn both_shapes_expose_key_colon_value() {
        let src = JsParser::new()
            .parse("const { 'a b': c = 1 } = { [k]: 2 };")
            .unwrap();
        let members: Vec<_> = src
            .ast()
            .walk()
            .filter_map(|ev| match ev {
                crate::engine::WalkEvent::Enter(n) => key_value(n),
                crate::engine::WalkEvent::Exit(_) => None,
            })
            .collect();
        assert_eq!(members.len(), 2);

        assert_eq!(members[0].node().kind_name(), "pair_pattern");
        assert_eq!(members[0].key_name(&src), "a b");
        assert!(!members[0].is_computed());
        assert!(members[0].colon(&src).is_some());

        assert!(members[1].is_computed());
        assert_eq!(members[1].key_name(&src), "k");
        assert_eq!(src.text_of(members[1].value()), "2");
    }

    #[test]
    fn pattern_defaults_are_split_out() {
        let src = JsParser::new().parse("let { a: b = 1 } = o;").unwrap();
        let node = src.ast().descendants_of_kind("pair_pattern").next().unwrap();
        let prop = PatternProperty {
            node,
            key: node.field("key").unwrap(),
            target: node.field("value").unwrap(),
        };
        assert_eq!(src.text_of(prop.binding()), "b");
        assert_eq!(src.text_of(prop.default_value().unwrap()), "1");
    }
}
