//! Asynchronous document analysis protocol client.
//!
//! Defines the [`AnalysisTransport`] trait and shared protocol types so the
//! poll controller can be driven by the real HTTP transport or by a scripted
//! fake in tests.

pub mod azure;
pub mod poller;
pub mod raw;

use crate::error::{AnalysisError, PollTransportError};
use raw::RawAnalyzeResult;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// One document submission. Created per caller action, discarded after submit.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file_bytes: Vec<u8>,
    /// Service model identifier, e.g. `prebuilt-invoice`.
    pub model_id: String,
}

/// Opaque URI identifying an in-flight operation, extracted from the submit
/// response. Owned by the poll controller for the duration of one analysis.
#[derive(Debug, Clone)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

/// Classification of a single successful poll response.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Running,
    Succeeded(RawAnalyzeResult),
    Failed { reason: String },
}

/// Transport seam between the poll controller and the remote service.
#[async_trait::async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// Submit a document for analysis, yielding the operation handle.
    async fn submit(&self, request: &AnalysisRequest) -> Result<OperationHandle, AnalysisError>;

    /// Poll an in-flight operation once. Transport-level failures are
    /// recoverable; the controller retries them on the next tick.
    async fn poll(&self, handle: &OperationHandle) -> Result<PollOutcome, PollTransportError>;
}

/// Cooperative cancellation for an in-flight analysis.
///
/// Clonable; any clone can cancel. The poll controller checks it before each
/// wait and before each poll, so cancellation takes effect without waiting for
/// the next network call.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once cancellation is requested. Used inside `select!` against
    /// the inter-tick sleep so a cancel releases the wait immediately.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for checks the current value first, so a token cancelled
        // before this call resolves immediately.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Coarse analysis phase, derived from real poll state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    Submitted,
    Polling,
    Succeeded,
    Failed,
}

/// Progress snapshot published on each state change.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub phase: AnalysisPhase,
    pub ticks_elapsed: u32,
    pub max_ticks: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_token_releases_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!handle.is_finished());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should resolve after cancel")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_wait_resolves_immediately() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("already-cancelled token should not block");
    }
}
