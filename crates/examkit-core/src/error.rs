//! Error types shared across examkit.
//!
//! `BackendError` lives in `examkit-core` rather than the client crate so the
//! session controller can downcast and classify delivery failures for retry
//! decisions without string matching.

use thiserror::Error;

/// Errors that can occur when talking to the LMS backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The access token was rejected and could not be refreshed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested module, lesson, or exam does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the request (4xx other than 401/404).
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend returned a server error.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),
}

impl BackendError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            BackendError::AuthenticationFailed(_)
                | BackendError::NotFound(_)
                | BackendError::Rejected { .. }
                | BackendError::Decode(_)
        )
    }
}

/// Why an exam could not be loaded into a session.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The lesson could not be fetched.
    #[error("failed to load exam: {0:#}")]
    Fetch(anyhow::Error),

    /// The lesson exists but is a regular lesson, not an exam.
    #[error("lesson {lesson_id} is not an exam lesson")]
    NotAnExam { lesson_id: u64 },
}

impl LoadError {
    /// Returns `true` if the backend reported the lesson as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            LoadError::Fetch(e) => matches!(
                e.downcast_ref::<BackendError>(),
                Some(BackendError::NotFound(_))
            ),
            LoadError::NotAnExam { .. } => false,
        }
    }
}

/// Illegal operations on an exam session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("exam has already been started")]
    AlreadyStarted,

    #[error("exam is not running")]
    NotRunning,
}

/// Strict structured-content failures.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The content is not valid JSON.
    #[error("content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The content is JSON but not an array of questions.
    #[error("content is JSON but not a question array")]
    NotAnArray,

    /// A question element does not match the schema.
    #[error("question #{position} is invalid: {message}")]
    InvalidQuestion { position: usize, message: String },
}

/// Reasons an exam draft cannot be written out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("an exam needs at least one question")]
    NoQuestions,

    #[error("question {position} has no text")]
    EmptyQuestion { position: usize },

    #[error("question {position} has no options")]
    NoOptions { position: usize },

    /// Multiple-choice questions need exactly one correct option.
    #[error("question {position} has {count} correct options, expected exactly one")]
    CorrectOptionCount { position: usize, count: usize },
}
