use std::fmt;

pub mod ast;
pub mod error;
pub mod fix;
pub mod measure;
pub mod source;
pub mod tokens;

pub use ast::{Ast, Field, Node, NodeId, NodeKind, WalkEvent};
pub use error::EngineError;
pub use fix::{Applied, Edit, Fix, Fixer, IntoEdits, apply_fixes};
pub use measure::TextMeasure;
pub use source::{LineEnding, Position, SourceBuffer, SourceLocation, Span, Spanned};
pub use tokens::{CursorOptions, Token, TokenKind, TokenStore};

/// Everything rules may look at for one parsed file. Built once per parse and
/// never mutated; rules change text only by proposing fixes.
pub struct SourceCode {
    buffer: SourceBuffer,
    tokens: TokenStore,
    ast: Ast,
}

impl fmt::Display for SourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.buffer.text())
    }
}

impl fmt::Debug for SourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCode")
            .field("len", &self.buffer.len())
            .field("tokens", &self.tokens.tokens().len())
            .field("comments", &self.tokens.all_comments().len())
            .field("nodes", &self.ast.len())
            .finish()
    }
}

impl SourceCode {
    /// Fails when the token or comment lists are out of order.
    pub fn new(
        buffer: SourceBuffer,
        tokens: Vec<Token>,
        comments: Vec<Token>,
        ast: Ast,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            buffer,
            tokens: TokenStore::new(tokens, comments)?,
            ast,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    #[must_use]
    pub const fn buffer(&self) -> &SourceBuffer {
        &self.buffer
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    #[must_use]
    pub const fn ast(&self) -> &Ast {
        &self.ast
    }

    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.ast.root()
    }

    #[must_use]
    pub fn node_by_range_index(&self, offset: usize) -> Option<Node<'_>> {
        self.ast.node_by_range_index(offset)
    }

    /// Raw text covered by `anchor`. Spans come from this file's tokens and
    /// nodes; a span outside the text is a rule bug and asserts in debug
    /// builds, falling back to `""` in release.
    pub fn text_of(&self, anchor: impl Spanned) -> &str {
        let span = anchor.span();
        let text = self.buffer.text_slice(span);
        debug_assert!(text.is_ok(), "span {span:?} outside the source text");
        text.unwrap_or_default()
    }

    /// True when the gap between `left` and `right` holds whitespace or a comment.
    pub fn is_space_between(&self, left: impl Spanned, right: impl Spanned) -> bool {
        let (l, r) = (left.span(), right.span());
        let (start, end) = if l.end <= r.start {
            (l.end, r.start)
        } else {
            (r.end, l.start)
        };
        if start >= end {
            return false;
        }
        let gap = Span::new(start, end);
        self.text_of(gap).chars().any(char::is_whitespace)
            || self
                .tokens
                .comments_exist_between(Span::at(start), Span::at(end))
    }
}
