use serde::{Deserialize, Serialize};

/// The seven caller-facing error kinds every component's structured error
/// maps onto at its boundary (see `EngineError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidThought,
    AccessDenied,
    EmbeddingFailed,
    ExtractionFailed,
    IndexInconsistency,
    DeadlineExceeded,
    NotFound,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InvalidThought => "INVALID_THOUGHT",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::EmbeddingFailed => "EMBEDDING_FAILED",
            ErrorCode::ExtractionFailed => "EXTRACTION_FAILED",
            ErrorCode::IndexInconsistency => "INDEX_INCONSISTENCY",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::NotFound => "NOT_FOUND",
        };
        write!(f, "{}", s)
    }
}

/// Implemented by every structured error enum in the workspace so that the
/// outermost caller-facing surface can map to one of the seven kinds above
/// without matching on each component's internals.
pub trait EngineError: std::error::Error {
    fn error_code(&self) -> ErrorCode;
}
