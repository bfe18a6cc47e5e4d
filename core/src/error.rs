use thiserror::Error;

/// Errors raised while turning raw span records into a [`crate::Trace`].
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace contains no spans")]
    EmptyTrace,

    #[error("no trace found in document")]
    NoTrace,

    #[error("trace {0} not found in document")]
    TraceNotFound(String),

    #[error("duplicate span id {0}")]
    DuplicateSpan(String),

    #[error("span {0} is part of a parent cycle")]
    ParentCycle(String),

    #[error("span {span_id} belongs to trace {found}, expected {expected}")]
    TraceIdMismatch {
        span_id: String,
        expected: String,
        found: String,
    },

    #[error("malformed trace document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Rejected view range commits.
#[derive(Debug, Error, PartialEq)]
pub enum ViewRangeError {
    #[error("view range start {start} is after end {end}")]
    Inverted { start: f64, end: f64 },

    #[error("view range bound is not a number")]
    NotANumber,
}
