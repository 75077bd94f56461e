//! Error types for the remote authority and the session orchestrator.
//!
//! `ApiError` is defined here, in `examsit-core`, so the session can
//! classify remote failures structurally (conflict vs. genuine failure)
//! without string matching against messages.

use thiserror::Error;

/// Errors produced by an [`AssessmentApi`](crate::api::AssessmentApi)
/// implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server reports the operation already happened (section already
    /// finalized, already started, attempt already created). Benign: the
    /// caller reconciles against the progress snapshot instead of failing.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The server returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns `true` if the server says the operation already happened.
    /// Conflicts are treated as success by the finalize path.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }
}

/// Errors surfaced by the session orchestrator.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Manual submit attempted before every question was answered.
    /// Blocked locally; no network call is made.
    #[error("answered {answered} of {total} questions; all answers are required")]
    IncompleteAnswers { answered: usize, total: usize },

    /// The single-attempt policy forbids starting another attempt.
    /// Callers should redirect to the already-produced result.
    #[error("assessment already taken; a result exists for this student")]
    AttemptClosed,

    /// An operation that needs an active section was called without one.
    #[error("no active section")]
    NoActiveSection,

    /// The snapshot named a section the catalog does not know about.
    #[error("section {0} not found in catalog")]
    UnknownSection(i64),

    /// An answer arrived while the section was finalizing or after its
    /// timer expired.
    #[error("section is locked; answers can no longer be recorded")]
    SectionLocked,

    /// The remote authority failed for a reason other than a conflict.
    #[error(transparent)]
    Api(#[from] ApiError),
}
