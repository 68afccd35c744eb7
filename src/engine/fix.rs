// src/engine/fix.rs
use ropey::Rope;
use serde::Serialize;

use super::EngineError;
use super::source::{SourceBuffer, Span, Spanned, check_edit_span};

/// Proposed replacement of `span` with `text`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub span: Span,
    pub text: String,
}

impl Edit {
    #[must_use]
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }
}

/// What a fix closure may hand back: one edit or several.
pub trait IntoEdits {
    fn into_edits(self) -> Vec<Edit>;
}

impl IntoEdits for Edit {
    fn into_edits(self) -> Vec<Edit> {
        vec![self]
    }
}

impl IntoEdits for Vec<Edit> {
    fn into_edits(self) -> Vec<Edit> {
        self
    }
}

impl<const N: usize> IntoEdits for [Edit; N] {
    fn into_edits(self) -> Vec<Edit> {
        self.into()
    }
}

impl IntoEdits for Option<Edit> {
    fn into_edits(self) -> Vec<Edit> {
        self.into_iter().collect()
    }
}

/// Capability handed to fix closures. It only describes edits; nothing is
/// applied until the merge step.
#[derive(Clone, Copy)]
pub struct Fixer<'a> {
    buffer: &'a SourceBuffer,
}

impl<'a> Fixer<'a> {
    #[must_use]
    pub const fn new(buffer: &'a SourceBuffer) -> Self {
        Self { buffer }
    }

    /// Line break sequence of the file being fixed.
    #[must_use]
    pub const fn newline(&self) -> &'static str {
        self.buffer.line_ending().as_str()
    }

    pub fn insert_text_before(&self, anchor: impl Spanned, text: impl Into<String>) -> Edit {
        self.insert_text_before_range(anchor.span(), text)
    }

    pub fn insert_text_after(&self, anchor: impl Spanned, text: impl Into<String>) -> Edit {
        self.insert_text_after_range(anchor.span(), text)
    }

    pub fn insert_text_before_range(&self, span: Span, text: impl Into<String>) -> Edit {
        Edit::new(Span::at(span.start), text)
    }

    pub fn insert_text_after_range(&self, span: Span, text: impl Into<String>) -> Edit {
        Edit::new(Span::at(span.end), text)
    }

    pub fn replace_text(&self, anchor: impl Spanned, text: impl Into<String>) -> Edit {
        Edit::new(anchor.span(), text)
    }

    pub fn replace_text_range(&self, span: Span, text: impl Into<String>) -> Edit {
        Edit::new(span, text)
    }

    pub fn remove(&self, anchor: impl Spanned) -> Edit {
        Edit::new(anchor.span(), "")
    }

    pub fn remove_range(&self, span: Span) -> Edit {
        Edit::new(span, "")
    }
}

/// The edits of one report, merged into one replacement over their hull.
/// Either the whole fix is applied or none of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub span: Span,
    pub text: String,
}

impl Fix {
    /// Validates `edits` against `buffer` and merges them. `Ok(None)` when
    /// there is nothing to do.
    pub fn from_edits(buffer: &SourceBuffer, mut edits: Vec<Edit>) -> Result<Option<Self>, EngineError> {
        for e in &edits {
            buffer.check_span(e.span)?;
        }
        if edits.is_empty() {
            return Ok(None);
        }
        edits.sort_by_key(|e| (e.span.start, e.span.end));
        if edits.len() == 1 {
            let e = edits.remove(0);
            return Ok(Some(Self {
                span: e.span,
                text: e.text,
            }));
        }

        let start = edits[0].span.start;
        let end = edits.iter().map(|e| e.span.end).max().unwrap_or(start);
        let text = buffer.text();
        let mut out = String::new();
        let mut cursor = start;
        for e in &edits {
            if e.span.start < cursor {
                return Err(EngineError::OverlappingEdits {
                    start: e.span.start,
                    end: e.span.end,
                });
            }
            out.push_str(&text[cursor..e.span.start]);
            out.push_str(&e.text);
            cursor = e.span.end;
        }
        out.push_str(&text[cursor..end]);
        Ok(Some(Self {
            span: Span::new(start, end),
            text: out,
        }))
    }
}

/// Outcome of one merge-and-apply step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub output: String,
    /// Indices (into the input slice) of the fixes that were applied.
    pub accepted: Vec<usize>,
    /// Indices of fixes that conflicted with an accepted one.
    pub deferred: Vec<usize>,
}

impl Applied {
    #[must_use]
    pub fn fixed(&self) -> bool {
        !self.accepted.is_empty()
    }
}

/// Applies the non-conflicting subset of `fixes` to `text`.
///
/// Fixes are stably sorted by `(start, end)` and accepted left to right; a fix
/// whose start is not strictly after the end of the last accepted fix is
/// deferred, so touching fixes conflict as well.
///
/// Every fix is checked against `text` first; one malformed span fails the
/// whole step before anything is applied.
pub fn apply_fixes(text: &str, fixes: &[&Fix]) -> Result<Applied, EngineError> {
    for fix in fixes {
        check_edit_span(text, fix.span)?;
    }
    let mut order: Vec<usize> = (0..fixes.len()).collect();
    order.sort_by_key(|&i| (fixes[i].span.start, fixes[i].span.end));

    let mut accepted = Vec::new();
    let mut deferred = Vec::new();
    let mut last_end: Option<usize> = None;
    for i in order {
        let span = fixes[i].span;
        if last_end.is_some_and(|end| span.start <= end) {
            tracing::trace!(start = span.start, end = span.end, "fix deferred");
            deferred.push(i);
            continue;
        }
        last_end = Some(span.end);
        accepted.push(i);
    }

    let mut rope = Rope::from_str(text);
    for &i in accepted.iter().rev() {
        let fix = fixes[i];
        let start_char = rope.try_byte_to_char(fix.span.start).map_err(|_| invalid(fix, text))?;
        let end_char = rope.try_byte_to_char(fix.span.end).map_err(|_| invalid(fix, text))?;
        rope.remove(start_char..end_char);
        if !fix.text.is_empty() {
            rope.insert(start_char, &fix.text);
        }
    }

    Ok(Applied {
        output: rope.to_string(),
        accepted,
        deferred,
    })
}

const fn invalid(fix: &Fix, text: &str) -> EngineError {
    EngineError::InvalidEdit {
        start: fix.span.start,
        end: fix.span.end,
        len: text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fix(buffer: &SourceBuffer, edits: Vec<Edit>) -> Fix {
        Fix::from_edits(buffer, edits).unwrap().unwrap()
    }

    #[test]
    fn edits_merge_over_their_hull() {
        let buf = SourceBuffer::new("[a, b,]");
        let f = Fixer::new(&buf);
        let merged = fix(
            &buf,
            vec![
                f.remove_range(Span::new(5, 6)),
                f.insert_text_before_range(Span::new(4, 5), ""),
                f.insert_text_after_range(Span::new(6, 7), ""),
            ],
        );
        assert_eq!(merged.span, Span::new(4, 7));
        assert_eq!(merged.text, "b]");
    }

    #[test]
    fn malformed_edits_fail_fast() {
        let buf = SourceBuffer::new("abc");
        let err = Fix::from_edits(&buf, vec![Edit::new(Span::new(2, 9), "")]).unwrap_err();
        assert_eq!(err, EngineError::InvalidEdit { start: 2, end: 9, len: 3 });
        let err = Fix::from_edits(&buf, vec![Edit::new(Span::new(2, 1), "")]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidEdit { .. }));
        let overlapping = vec![Edit::new(Span::new(0, 2), "x"), Edit::new(Span::new(1, 3), "y")];
        assert!(matches!(
            Fix::from_edits(&buf, overlapping),
            Err(EngineError::OverlappingEdits { .. })
        ));
        assert_eq!(Fix::from_edits(&buf, Vec::new()).unwrap(), None);
    }

    #[test]
    fn conflicting_fixes_defer_deterministically() {
        let text = "abcdef";
        let first = Fix { span: Span::new(1, 3), text: "X".into() };
        let overlapping = Fix { span: Span::new(2, 4), text: "Y".into() };
        let touching = Fix { span: Span::new(3, 3), text: "Z".into() };
        let later = Fix { span: Span::new(5, 6), text: String::new() };
        for _ in 0..3 {
            let applied = apply_fixes(text, &[&later, &overlapping, &first, &touching]).unwrap();
            assert_eq!(applied.output, "aXde");
            assert_eq!(applied.accepted, [2, 0]);
            assert_eq!(applied.deferred, [1, 3]);
        }
    }

    #[test]
    fn applies_around_multibyte_text() {
        let text = "é=1";
        let f = Fix { span: Span::new(2, 3), text: " = ".into() };
        assert_eq!(apply_fixes(text, &[&f]).unwrap().output, "é = 1");
    }

    #[test]
    fn malformed_fixes_are_rejected_before_applying() {
        let text = "é!";
        let inside_char = Fix { span: Span::new(1, 2), text: "x".into() };
        let fine = Fix { span: Span::new(2, 3), text: "?".into() };
        assert_eq!(
            apply_fixes(text, &[&fine, &inside_char]).unwrap_err(),
            EngineError::InvalidEdit { start: 1, end: 2, len: 3 }
        );

        let past_end = Fix { span: Span::new(2, 7), text: String::new() };
        assert!(matches!(
            apply_fixes(text, &[&past_end]),
            Err(EngineError::InvalidEdit { .. })
        ));
        let reversed = Fix { span: Span::new(3, 2), text: String::new() };
        assert!(matches!(
            apply_fixes(text, &[&reversed]),
            Err(EngineError::InvalidEdit { .. })
        ));
    }
}
