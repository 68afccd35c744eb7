use thiserror::Error;

/// Contract violations inside the engine. These are bugs in a parser adapter
/// or a rule, never a recoverable condition for the file being linted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{list} #{index} starts before the end of its predecessor")]
    UnorderedTokens { list: &'static str, index: usize },

    #[error("offset {offset} is outside the buffer (len {len}) or not on a char boundary")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("location {line}:{column} is outside the buffer")]
    LocationOutOfRange { line: usize, column: usize },

    #[error("span {start}..{end} is outside the buffer (len {len})")]
    SpanOutOfRange { start: usize, end: usize, len: usize },

    #[error("malformed edit {start}..{end} for a buffer of len {len}")]
    InvalidEdit { start: usize, end: usize, len: usize },

    #[error("edits of one fix overlap at {start}..{end}")]
    OverlappingEdits { start: usize, end: usize },

    #[error("rule `{rule}` has no message with id `{id}`")]
    UnknownMessageId { rule: String, id: String },

    #[error("rule `{rule}` reported a fix but is not declared fixable")]
    FixNotDeclared { rule: String },
}
