use thiserror::Error;
use tree_sitter::{Language, Parser};

use crate::engine::{
    Ast, EngineError, Field, NodeId, NodeKind, SourceBuffer, SourceCode, Span, Token, TokenKind,
};

#[must_use]
pub fn language() -> Language {
    tree_sitter_javascript::LANGUAGE.into()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Parsing error: {message}")]
    Syntax {
        message: String,
        offset: usize,
        line: usize,
        column: usize,
    },
    #[error("parser setup failed: {0}")]
    Setup(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// The upstream collaborator: turns text into a [`SourceCode`] and names the
/// node kinds selectors may refer to.
pub trait SourceParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<SourceCode, ParseError>;

    fn node_kind(&self, name: &str) -> Option<NodeKind>;

    /// Upper bound (exclusive) of every [`NodeKind`] index this parser emits.
    fn node_kind_count(&self) -> usize;
}

/// Node kinds lexed as one token even though the grammar gives them children.
const ATOMIC: &[&str] = &["string", "regex"];

#[derive(Clone)]
pub struct JsParser {
    language: Language,
}

impl Default for JsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JsParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: language(),
        }
    }

    fn tree(&self, text: &str) -> Result<tree_sitter::Tree, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::Setup(e.to_string()))?;
        parser
            .parse(text, None)
            .ok_or_else(|| ParseError::Setup("parser returned no tree".into()))
    }

    /// S-expression of the concrete tree, for debugging grammars.
    #[cfg(feature = "debug-tree")]
    pub fn dump_tree(&self, text: &str) -> Result<String, ParseError> {
        Ok(self.tree(text)?.root_node().to_sexp())
    }
}

impl SourceParser for JsParser {
    fn parse(&self, text: &str) -> Result<SourceCode, ParseError> {
        let tree = self.tree(text)?;
        let root = tree.root_node();
        let buffer = SourceBuffer::new(text);
        if root.has_error() {
            return Err(syntax_error(root, &buffer));
        }

        let mut b = Builder {
            language: &self.language,
            buffer: &buffer,
            tokens: Vec::new(),
            comments: Vec::new(),
            ast: Ast::new(),
        };
        b.visit(root, None, Context::Normal)?;
        let Builder {
            tokens,
            comments,
            ast,
            ..
        } = b;
        Ok(SourceCode::new(buffer, tokens, comments, ast)?)
    }

    fn node_kind(&self, name: &str) -> Option<NodeKind> {
        match self.language.id_for_node_kind(name, true) {
            0 => None,
            id => Some(NodeKind(id)),
        }
    }

    fn node_kind_count(&self) -> usize {
        self.language.node_kind_count()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Normal,
    Template,
    Substitution,
}

struct Builder<'a> {
    language: &'a Language,
    buffer: &'a SourceBuffer,
    tokens: Vec<Token>,
    comments: Vec<Token>,
    ast: Ast,
}

impl Builder<'_> {
    fn visit(
        &mut self,
        node: tree_sitter::Node,
        parent: Option<NodeId>,
        cx: Context,
    ) -> Result<Option<NodeId>, EngineError> {
        let kind = node.kind();
        let mut span = Span::new(node.start_byte(), node.end_byte());
        if parent.is_none() {
            span = Span::new(0, self.buffer.len());
        }

        if kind == "comment" || kind == "html_comment" {
            self.push_comment(span)?;
            return Ok(None);
        }
        if span.is_empty() && parent.is_some() {
            return Ok(None);
        }

        let id = if node.is_named() {
            let kind_id = NodeKind(self.language.id_for_node_kind(kind, true));
            let loc = self.buffer.location_of(span)?;
            Some(self.ast.push(kind_id, kind, span, loc, parent))
        } else {
            None
        };

        if node.child_count() == 0 || ATOMIC.contains(&kind) {
            if parent.is_none() {
                return Ok(id);
            }
            let token_kind = match cx {
                Context::Template => TokenKind::Template,
                Context::Substitution if !node.is_named() => TokenKind::Template,
                _ => classify(kind, node.is_named(), self.buffer.text_slice(span)?),
            };
            let value = self.buffer.text_slice(span)?;
            self.tokens
                .push(Token::new(token_kind, value, span, self.buffer)?);
            return Ok(id);
        }

        let inner = match kind {
            "template_string" => Context::Template,
            "template_substitution" => Context::Substitution,
            _ => Context::Normal,
        };
        let owner = id.or(parent);
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                let field = cursor.field_name();
                let child_id = self.visit(child, owner, inner)?;
                if let (Some(name), Some(holder)) = (field, id) {
                    self.ast.add_field(holder, Field {
                        name,
                        kind: child.kind(),
                        span: Span::new(child.start_byte(), child.end_byte()),
                        node: child_id,
                    });
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        Ok(id)
    }

    fn push_comment(&mut self, span: Span) -> Result<(), EngineError> {
        let raw = self.buffer.text_slice(span)?;
        let (kind, value) = if let Some(body) = raw.strip_prefix("//") {
            (TokenKind::LineComment, body)
        } else if let Some(body) = raw.strip_prefix("/*") {
            (TokenKind::BlockComment, body.strip_suffix("*/").unwrap_or(body))
        } else if let Some(body) = raw.strip_prefix("<!--") {
            (TokenKind::LineComment, body)
        } else {
            (TokenKind::LineComment, raw.strip_prefix("-->").unwrap_or(raw))
        };
        self.comments
            .push(Token::new(kind, value, span, self.buffer)?);
        Ok(())
    }
}

fn classify(kind: &str, named: bool, text: &str) -> TokenKind {
    let word = text
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$' || c == '#');
    if !named {
        return if word {
            TokenKind::Keyword
        } else {
            TokenKind::Punctuator
        };
    }
    match kind {
        "this" | "super" | "import" => TokenKind::Keyword,
        "true" | "false" => TokenKind::Boolean,
        "null" => TokenKind::Null,
        "number" => TokenKind::Numeric,
        "string" => TokenKind::String,
        "regex" => TokenKind::RegularExpression,
        "jsx_text" => TokenKind::JsxText,
        "hash_bang_line" => TokenKind::Shebang,
        _ if word => TokenKind::Identifier,
        _ => TokenKind::Punctuator,
    }
}

fn syntax_error(root: tree_sitter::Node, buffer: &SourceBuffer) -> ParseError {
    let bad = first_error(root).unwrap_or(root);
    let offset = bad.start_byte();
    let message = if bad.is_missing() {
        format!("missing `{}`", bad.kind())
    } else {
        let text = buffer
            .text_slice(Span::new(bad.start_byte(), bad.end_byte()))
            .unwrap_or_default();
        match text.split_whitespace().next() {
            Some(t) => format!("unexpected `{t}`"),
            None => "unexpected end of input".to_string(),
        }
    };
    let pos = buffer
        .loc_from_index(offset)
        .unwrap_or(crate::engine::Position::new(1, 0));
    ParseError::Syntax {
        message,
        offset,
        line: pos.line,
        column: pos.column,
    }
}

fn first_error(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).find_map(first_error)
}
