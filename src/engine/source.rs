// src/engine/source.rs
use serde::Serialize;

use super::EngineError;

/// Half-open byte interval `[start, end)` into a source buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty span sitting at `offset`.
    #[must_use]
    pub const fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub const fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    #[must_use]
    pub const fn contains_span(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Anything that occupies a span of the source: tokens, comments, nodes.
pub trait Spanned {
    fn span(&self) -> Span;
}

impl Spanned for Span {
    fn span(&self) -> Span {
        *self
    }
}

impl<T: Spanned + ?Sized> Spanned for &T {
    fn span(&self) -> Span {
        (**self).span()
    }
}

/// 1-based line, 0-based byte column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    /// Any CRLF in the text makes the file CRLF.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::Crlf
        } else {
            Self::Lf
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// Immutable source text plus its line-start table.
#[derive(Clone, Debug)]
pub struct SourceBuffer {
    text: String,
    line_starts: Vec<usize>,
    line_ending: LineEnding,
}

impl SourceBuffer {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_ending = LineEnding::detect(&text);
        Self::with_line_ending(text, line_ending)
    }

    #[must_use]
    pub fn with_line_ending(text: impl Into<String>, line_ending: LineEnding) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Self {
            text,
            line_starts,
            line_ending,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where `line` (1-based) starts.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|i| self.line_starts.get(i))
            .copied()
    }

    /// Byte offset where the content of `line` ends, terminator excluded.
    #[must_use]
    pub fn line_content_end(&self, line: usize) -> Option<usize> {
        let start = self.line_start(line)?;
        let Some(&next) = self.line_starts.get(line) else {
            return Some(self.text.len());
        };
        let bytes = &self.text.as_bytes()[start..next];
        let term = if bytes.ends_with(b"\r\n") {
            2
        } else if bytes.ends_with(b"\n") || bytes.ends_with(b"\r") {
            1
        } else {
            // U+2028 / U+2029
            3
        };
        Some(next - term)
    }

    /// Text of `line` without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = self.line_start(line)?;
        let end = self.line_content_end(line)?;
        Some(&self.text[start..end])
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        (1..=self.line_count()).filter_map(|l| self.line_text(l))
    }

    pub fn loc_from_index(&self, offset: usize) -> Result<Position, EngineError> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return Err(EngineError::OffsetOutOfRange {
                offset,
                len: self.text.len(),
            });
        }
        let idx = self.line_starts.partition_point(|&s| s <= offset) - 1;
        Ok(Position {
            line: idx + 1,
            column: offset - self.line_starts[idx],
        })
    }

    pub fn index_from_loc(&self, loc: Position) -> Result<usize, EngineError> {
        let out_of_range = || EngineError::LocationOutOfRange {
            line: loc.line,
            column: loc.column,
        };
        let start = self.line_start(loc.line).ok_or_else(out_of_range)?;
        let offset = start.checked_add(loc.column).ok_or_else(out_of_range)?;
        let in_line = match self.line_starts.get(loc.line) {
            Some(&next) => offset < next,
            None => offset <= self.text.len(),
        };
        if !in_line || !self.text.is_char_boundary(offset) {
            return Err(out_of_range());
        }
        Ok(offset)
    }

    pub fn text_slice(&self, span: Span) -> Result<&str, EngineError> {
        self.text
            .get(span.start..span.end)
            .ok_or(EngineError::SpanOutOfRange {
                start: span.start,
                end: span.end,
                len: self.text.len(),
            })
    }

    pub fn location_of(&self, span: Span) -> Result<SourceLocation, EngineError> {
        Ok(SourceLocation {
            start: self.loc_from_index(span.start)?,
            end: self.loc_from_index(span.end)?,
        })
    }

    /// Position right after `loc`; wraps to the next line at end of line.
    /// `None` for a position `index_from_loc` rejects, or at end of text.
    #[must_use]
    pub fn next_location(&self, loc: Position) -> Option<Position> {
        let offset = self.index_from_loc(loc).ok()?;
        let end = self.line_content_end(loc.line)?;
        if offset < end {
            let step = self.text[offset..].chars().next().map_or(1, char::len_utf8);
            return Some(Position::new(loc.line, loc.column + step));
        }
        (loc.line < self.line_count()).then(|| Position::new(loc.line + 1, 0))
    }

    pub(crate) fn check_span(&self, span: Span) -> Result<(), EngineError> {
        check_edit_span(&self.text, span)
    }
}

/// An edit span must be ordered, inside `text`, and on char boundaries.
pub(crate) fn check_edit_span(text: &str, span: Span) -> Result<(), EngineError> {
    if span.start > span.end
        || span.end > text.len()
        || !text.is_char_boundary(span.start)
        || !text.is_char_boundary(span.end)
    {
        return Err(EngineError::InvalidEdit {
            start: span.start,
            end: span.end,
            len: text.len(),
        });
    }
    Ok(())
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut starts = vec![0];
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                i += 2;
                starts.push(i);
            }
            b'\r' | b'\n' => {
                i += 1;
                starts.push(i);
            }
            // U+2028 LINE SEPARATOR / U+2029 PARAGRAPH SEPARATOR
            0xE2 if bytes.get(i + 1) == Some(&0x80)
                && matches!(bytes.get(i + 2), Some(0xA8 | 0xA9)) =>
            {
                i += 3;
                starts.push(i);
            }
            _ => i += 1,
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_column_zero_is_after_the_pair() {
        let buf = SourceBuffer::new("a\r\nb\r\n");
        assert_eq!(buf.line_ending(), LineEnding::Crlf);
        assert_eq!(buf.loc_from_index(3).unwrap(), Position::new(2, 0));
        // the `\n` of the pair still belongs to line 1
        assert_eq!(buf.loc_from_index(2).unwrap(), Position::new(1, 2));
        assert_eq!(buf.line_text(1), Some("a"));
        assert_eq!(buf.line_count(), 3);
    }

    #[test]
    fn offsets_round_trip() {
        let text = "let é = 1;\r\n\tfoo()\nbar\u{2028}baz\r";
        let buf = SourceBuffer::new(text);
        for offset in (0..=text.len()).filter(|&o| text.is_char_boundary(o)) {
            let loc = buf.loc_from_index(offset).unwrap();
            assert_eq!(buf.index_from_loc(loc).unwrap(), offset, "{loc:?}");
        }
    }

    #[test]
    fn out_of_range_locations_fail() {
        let buf = SourceBuffer::new("ab\ncd");
        assert_eq!(buf.index_from_loc(Position::new(1, 2)).unwrap(), 2);
        assert!(matches!(
            buf.index_from_loc(Position::new(1, 3)),
            Err(EngineError::LocationOutOfRange { line: 1, column: 3 })
        ));
        assert!(buf.index_from_loc(Position::new(0, 0)).is_err());
        assert!(buf.index_from_loc(Position::new(3, 0)).is_err());
        assert_eq!(buf.index_from_loc(Position::new(2, 2)).unwrap(), 5);
        assert!(buf.loc_from_index(6).is_err());
    }

    #[test]
    fn next_location_crosses_lines() {
        let buf = SourceBuffer::new("ab\r\nc");
        assert_eq!(
            buf.next_location(Position::new(1, 1)),
            Some(Position::new(1, 2))
        );
        assert_eq!(
            buf.next_location(Position::new(1, 2)),
            Some(Position::new(2, 0))
        );
        assert_eq!(buf.next_location(Position::new(2, 1)), None);
    }

    #[test]
    fn next_location_rejects_invalid_positions() {
        let buf = SourceBuffer::new("é");
        assert_eq!(buf.next_location(Position::new(1, 0)), Some(Position::new(1, 2)));
        assert_eq!(buf.next_location(Position::new(1, 1)), None);

        let buf = SourceBuffer::new("ab\ncd");
        assert_eq!(buf.next_location(Position::new(1, 99)), None);
        assert_eq!(buf.next_location(Position::new(1, usize::MAX)), None);
        assert_eq!(buf.next_location(Position::new(9, 0)), None);
    }

    #[test]
    fn slices_and_spans() {
        let buf = SourceBuffer::new("var x;");
        assert_eq!(buf.text_slice(Span::new(4, 5)).unwrap(), "x");
        assert!(buf.text_slice(Span::new(4, 9)).is_err());
        assert!(Span::new(1, 3).overlaps(Span::new(2, 4)));
        assert!(!Span::new(1, 3).overlaps(Span::new(3, 4)));
        assert_eq!(Span::new(5, 6).cover(Span::at(2)), Span::new(2, 6));
    }
}
