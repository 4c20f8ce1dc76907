//! Error taxonomy for the document analysis pipeline.
//!
//! Submission rejections, service-reported failures, timeouts and caller
//! cancellation are distinct variants so the serving layer can map each to a
//! different HTTP status instead of a generic failure toast.

use thiserror::Error;

/// Terminal failure of one `analyze` call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The service rejected the submission outright, or accepted it without
    /// returning an operation handle. `status` is 0 when the request never
    /// reached the service.
    #[error("analysis submission failed ({status}): {body}")]
    Submission { status: u16, body: String },

    /// The service explicitly reported `status: "failed"` for the operation.
    #[error("analysis service reported failure: {reason}")]
    PollFailed { reason: String },

    /// The tick budget ran out without ever observing a terminal status.
    #[error("analysis did not complete within {ticks} polls")]
    TimedOut { ticks: u32 },

    /// The caller abandoned the operation. Not a service failure.
    #[error("analysis cancelled by caller")]
    Cancelled,
}

/// A single poll attempt that failed below the protocol level.
///
/// These are recoverable: the poll controller swallows them and retries on the
/// next tick, escalating to [`AnalysisError::TimedOut`] only when the budget
/// is exhausted.
#[derive(Debug, Error)]
pub enum PollTransportError {
    #[error("poll request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("poll returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("poll returned unrecognized status token: {0:?}")]
    UnknownStatus(String),
}
