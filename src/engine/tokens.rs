// src/engine/tokens.rs
use serde::Serialize;

use super::EngineError;
use super::source::{SourceBuffer, SourceLocation, Span, Spanned};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Punctuator,
    String,
    Numeric,
    Boolean,
    Null,
    Template,
    RegularExpression,
    JsxText,
    Shebang,
    LineComment,
    BlockComment,
}

impl TokenKind {
    #[must_use]
    pub const fn is_comment(self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }
}

/// A lexical token or a comment. For comments `value` is the body without
/// the `//`, `/*` and `*/` delimiters; for everything else it is the raw text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
    pub loc: SourceLocation,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        value: impl Into<String>,
        span: Span,
        buffer: &SourceBuffer,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            kind,
            value: value.into(),
            span,
            loc: buffer.location_of(span)?,
        })
    }

    #[must_use]
    pub const fn is_comment(&self) -> bool {
        self.kind.is_comment()
    }

    #[must_use]
    pub fn is_punctuator(&self, value: &str) -> bool {
        self.kind == TokenKind::Punctuator && self.value == value
    }

    /// Both tokens end/start on the same line.
    #[must_use]
    pub const fn is_on_same_line(&self, next: &Self) -> bool {
        self.loc.end.line == next.loc.start.line
    }
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span
    }
}

/// Options shared by every directional query.
#[derive(Clone, Copy, Default)]
pub struct CursorOptions<'f> {
    pub include_comments: bool,
    pub skip: usize,
    pub filter: Option<&'f dyn Fn(&Token) -> bool>,
}

impl<'f> CursorOptions<'f> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_comments(mut self) -> Self {
        self.include_comments = true;
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: &'f dyn Fn(&Token) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }

    fn accepts(&self, token: &Token) -> bool {
        self.filter.is_none_or(|f| f(token))
    }
}

/// Ordered, randomly addressable index over one file's tokens and comments.
#[derive(Clone, Debug, Default)]
pub struct TokenStore {
    tokens: Vec<Token>,
    comments: Vec<Token>,
    merged: Vec<Token>,
}

impl TokenStore {
    /// Both lists must be sorted by start offset and pairwise disjoint.
    pub fn new(tokens: Vec<Token>, comments: Vec<Token>) -> Result<Self, EngineError> {
        check_order(&tokens, "token")?;
        check_order(&comments, "comment")?;

        let mut merged = Vec::with_capacity(tokens.len() + comments.len());
        let (mut t, mut c) = (tokens.iter().peekable(), comments.iter().peekable());
        loop {
            let next = match (t.peek(), c.peek()) {
                (Some(a), Some(b)) if a.span.start <= b.span.start => t.next(),
                (Some(_), Some(_)) | (None, Some(_)) => c.next(),
                (Some(_), None) => t.next(),
                (None, None) => break,
            };
            if let Some(tok) = next {
                merged.push(tok.clone());
            }
        }
        check_order(&merged, "token or comment")?;

        Ok(Self {
            tokens,
            comments,
            merged,
        })
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn all_comments(&self) -> &[Token] {
        &self.comments
    }

    #[must_use]
    pub fn tokens_and_comments(&self) -> &[Token] {
        &self.merged
    }

    fn stream(&self, include_comments: bool) -> &[Token] {
        if include_comments {
            &self.merged
        } else {
            &self.tokens
        }
    }

    /// Token whose span contains `offset`; `None` inside whitespace or comments.
    #[must_use]
    pub fn token_at(&self, offset: usize) -> Option<&Token> {
        let i = self.tokens.partition_point(|t| t.span.end <= offset);
        self.tokens.get(i).filter(|t| t.span.contains(offset))
    }

    #[must_use]
    pub fn token_by_range_start(&self, offset: usize, include_comments: bool) -> Option<&Token> {
        let s = self.stream(include_comments);
        let i = s.partition_point(|t| t.span.start < offset);
        s.get(i).filter(|t| t.span.start == offset)
    }

    // Walks backward over tokens ending at or before `bound` and starting at or
    // after `floor`.
    fn scan_back<'s>(
        &'s self,
        bound: usize,
        floor: usize,
        opts: &CursorOptions<'_>,
    ) -> impl Iterator<Item = &'s Token> {
        let s = self.stream(opts.include_comments);
        let hi = s.partition_point(|t| t.span.end <= bound);
        s[..hi]
            .iter()
            .rev()
            .take_while(move |t| t.span.start >= floor)
            .filter(move |t| opts.accepts(t))
    }

    // Walks forward over tokens starting at or after `bound` and ending at or
    // before `ceiling`.
    fn scan_forward<'s>(
        &'s self,
        bound: usize,
        ceiling: usize,
        opts: &CursorOptions<'_>,
    ) -> impl Iterator<Item = &'s Token> {
        let s = self.stream(opts.include_comments);
        let lo = s.partition_point(|t| t.span.start < bound);
        s[lo..]
            .iter()
            .take_while(move |t| t.span.end <= ceiling)
            .filter(move |t| opts.accepts(t))
    }

    pub fn token_before(&self, anchor: impl Spanned, opts: CursorOptions<'_>) -> Option<&Token> {
        let span = anchor.span();
        self.scan_back(span.start, 0, &opts).nth(opts.skip)
    }

    pub fn token_after(&self, anchor: impl Spanned, opts: CursorOptions<'_>) -> Option<&Token> {
        let span = anchor.span();
        self.scan_forward(span.end, usize::MAX, &opts).nth(opts.skip)
    }

    /// Up to `count` tokens before `anchor`, in source order.
    pub fn tokens_before(
        &self,
        anchor: impl Spanned,
        count: usize,
        opts: CursorOptions<'_>,
    ) -> Vec<&Token> {
        let span = anchor.span();
        let mut out: Vec<&Token> = self
            .scan_back(span.start, 0, &opts)
            .skip(opts.skip)
            .take(count)
            .collect();
        out.reverse();
        out
    }

    pub fn tokens_after(
        &self,
        anchor: impl Spanned,
        count: usize,
        opts: CursorOptions<'_>,
    ) -> Vec<&Token> {
        let span = anchor.span();
        self.scan_forward(span.end, usize::MAX, &opts)
            .skip(opts.skip)
            .take(count)
            .collect()
    }

    pub fn first_token(&self, node: impl Spanned, opts: CursorOptions<'_>) -> Option<&Token> {
        let span = node.span();
        self.scan_forward(span.start, span.end, &opts).nth(opts.skip)
    }

    pub fn last_token(&self, node: impl Spanned, opts: CursorOptions<'_>) -> Option<&Token> {
        let span = node.span();
        self.scan_back(span.end, span.start, &opts).nth(opts.skip)
    }

    pub fn first_tokens(
        &self,
        node: impl Spanned,
        count: usize,
        opts: CursorOptions<'_>,
    ) -> Vec<&Token> {
        let span = node.span();
        self.scan_forward(span.start, span.end, &opts)
            .skip(opts.skip)
            .take(count)
            .collect()
    }

    pub fn last_tokens(
        &self,
        node: impl Spanned,
        count: usize,
        opts: CursorOptions<'_>,
    ) -> Vec<&Token> {
        let span = node.span();
        let mut out: Vec<&Token> = self
            .scan_back(span.end, span.start, &opts)
            .skip(opts.skip)
            .take(count)
            .collect();
        out.reverse();
        out
    }

    /// Every token inside `node`.
    pub fn tokens_in(&self, node: impl Spanned, opts: CursorOptions<'_>) -> Vec<&Token> {
        let span = node.span();
        self.scan_forward(span.start, span.end, &opts)
            .skip(opts.skip)
            .collect()
    }

    /// Tokens strictly between `left` and `right`, in order. Empty when none.
    pub fn tokens_between(
        &self,
        left: impl Spanned,
        right: impl Spanned,
        opts: CursorOptions<'_>,
    ) -> Vec<&Token> {
        let (l, r) = (left.span(), right.span());
        self.scan_forward(l.end, r.start, &opts)
            .skip(opts.skip)
            .collect()
    }

    pub fn first_token_between(
        &self,
        left: impl Spanned,
        right: impl Spanned,
        opts: CursorOptions<'_>,
    ) -> Option<&Token> {
        let (l, r) = (left.span(), right.span());
        self.scan_forward(l.end, r.start, &opts).nth(opts.skip)
    }

    pub fn last_token_between(
        &self,
        left: impl Spanned,
        right: impl Spanned,
        opts: CursorOptions<'_>,
    ) -> Option<&Token> {
        let (l, r) = (left.span(), right.span());
        self.scan_back(r.start, l.end, &opts).nth(opts.skip)
    }

    /// Comments directly preceding `anchor` with no token in between.
    pub fn comments_before(&self, anchor: impl Spanned) -> Vec<&Token> {
        let span = anchor.span();
        let mut out: Vec<&Token> = self.merged[..self.merged.partition_point(|t| t.span.end <= span.start)]
            .iter()
            .rev()
            .take_while(|t| t.is_comment())
            .collect();
        out.reverse();
        out
    }

    /// Comments directly following `anchor` with no token in between.
    pub fn comments_after(&self, anchor: impl Spanned) -> Vec<&Token> {
        let span = anchor.span();
        self.merged[self.merged.partition_point(|t| t.span.start < span.end)..]
            .iter()
            .take_while(|t| t.is_comment())
            .collect()
    }

    pub fn comments_inside(&self, node: impl Spanned) -> Vec<&Token> {
        let span = node.span();
        let lo = self.comments.partition_point(|c| c.span.start < span.start);
        self.comments[lo..]
            .iter()
            .take_while(|c| c.span.end <= span.end)
            .collect()
    }

    pub fn comments_exist_between(&self, left: impl Spanned, right: impl Spanned) -> bool {
        let (l, r) = (left.span(), right.span());
        let lo = self.comments.partition_point(|c| c.span.start < l.end);
        self.comments
            .get(lo)
            .is_some_and(|c| c.span.end <= r.start)
    }
}

fn check_order(list: &[Token], name: &'static str) -> Result<(), EngineError> {
    for (index, pair) in list.windows(2).enumerate() {
        if pair[1].span.start < pair[0].span.end || pair[1].span.start < pair[0].span.start {
            return Err(EngineError::UnorderedTokens {
                list: name,
                index: index + 1,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // `a = b // c` with a trailing comment
    fn store() -> (SourceBuffer, TokenStore) {
        let buf = SourceBuffer::new("a = b; // c\nd");
        let tok = |kind, start, end| {
            Token::new(kind, &buf.text()[start..end], Span::new(start, end), &buf).unwrap()
        };
        let tokens = vec![
            tok(TokenKind::Identifier, 0, 1),
            tok(TokenKind::Punctuator, 2, 3),
            tok(TokenKind::Identifier, 4, 5),
            tok(TokenKind::Punctuator, 5, 6),
            tok(TokenKind::Identifier, 12, 13),
        ];
        let comments = vec![Token::new(TokenKind::LineComment, " c", Span::new(7, 11), &buf).unwrap()];
        let store = TokenStore::new(tokens, comments).unwrap();
        (buf, store)
    }

    #[test]
    fn neighbours_are_symmetric() {
        let (_, s) = store();
        for pair in s.tokens().windows(2) {
            assert_eq!(s.token_after(&pair[0], CursorOptions::new()), Some(&pair[1]));
            assert_eq!(s.token_before(&pair[1], CursorOptions::new()), Some(&pair[0]));
        }
    }

    #[test]
    fn boundaries_and_skip_return_none() {
        let (_, s) = store();
        let last = s.tokens().last().unwrap();
        assert!(s.token_after(last, CursorOptions::new()).is_none());
        let first = &s.tokens()[0];
        assert!(s.token_before(first, CursorOptions::new()).is_none());
        let second = &s.tokens()[1];
        assert!(s.token_before(second, CursorOptions::new().skip(1)).is_none());
        let never = |_: &Token| false;
        assert!(s.token_after(first, CursorOptions::new().filter(&never)).is_none());
    }

    #[test]
    fn comments_join_the_stream_on_request() {
        let (_, s) = store();
        let semi = &s.tokens()[3];
        assert_eq!(s.token_after(semi, CursorOptions::new()).unwrap().value, "d");
        let next = s.token_after(semi, CursorOptions::new().with_comments()).unwrap();
        assert_eq!(next.kind, TokenKind::LineComment);
        assert_eq!(s.comments_after(semi).len(), 1);
        assert!(s.comments_exist_between(semi, &s.tokens()[4]));
        assert!(!s.comments_exist_between(&s.tokens()[0], semi));
    }

    #[test]
    fn token_at_ignores_gaps() {
        let (_, s) = store();
        assert_eq!(s.token_at(4).unwrap().value, "b");
        assert!(s.token_at(3).is_none());
        assert!(s.token_at(8).is_none());
        assert_eq!(s.token_by_range_start(7, true).unwrap().kind, TokenKind::LineComment);
        assert!(s.token_by_range_start(7, false).is_none());
    }

    #[test]
    fn bounded_queries() {
        let (_, s) = store();
        let whole = Span::new(0, 6);
        assert_eq!(s.first_token(whole, CursorOptions::new()).unwrap().value, "a");
        assert_eq!(s.last_token(whole, CursorOptions::new()).unwrap().value, ";");
        assert_eq!(s.last_tokens(whole, 2, CursorOptions::new()).len(), 2);
        let between = s.tokens_between(&s.tokens()[0], &s.tokens()[3], CursorOptions::new());
        let values: Vec<&str> = between.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, ["=", "b"]);
        assert!(s.tokens_between(&s.tokens()[2], &s.tokens()[3], CursorOptions::new()).is_empty());
        let is_ident = |t: &Token| t.kind == TokenKind::Identifier;
        let found = s.token_before(&s.tokens()[4], CursorOptions::new().filter(&is_ident));
        assert_eq!(found.unwrap().value, "b");
    }

    #[test]
    fn unsorted_input_is_rejected() {
        let buf = SourceBuffer::new("ab");
        let a = Token::new(TokenKind::Identifier, "a", Span::new(0, 1), &buf).unwrap();
        let b = Token::new(TokenKind::Identifier, "b", Span::new(1, 2), &buf).unwrap();
        let err = TokenStore::new(vec![b, a], Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnorderedTokens { index: 1, .. }));
    }
}
