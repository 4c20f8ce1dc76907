//! Poll/await controller driving a submitted operation to a terminal state.
//!
//! One analysis owns one handle and one loop; concurrent analyses never share
//! state. The loop is the only place with timing semantics: one cooperative
//! wait per tick, a fixed tick budget, and transport-error tolerance.

use super::{
    AnalysisPhase, AnalysisProgress, AnalysisRequest, AnalysisTransport, CancelToken, PollOutcome,
};
use crate::document::NormalizedDocument;
use crate::error::AnalysisError;
use crate::normalize::normalize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Tick interval and budget for the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_ticks: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_ticks: 30,
        }
    }
}

/// Drives submit → poll → normalize for one document at a time.
pub struct Analyzer {
    transport: Arc<dyn AnalysisTransport>,
    poll: PollConfig,
}

impl Analyzer {
    pub fn new(transport: Arc<dyn AnalysisTransport>, poll: PollConfig) -> Self {
        Self { transport, poll }
    }

    /// Run one full analysis. Resolves with the normalized document, or with
    /// one of the typed failures from [`AnalysisError`].
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<NormalizedDocument, AnalysisError> {
        self.analyze_inner(request, cancel, None).await
    }

    /// Like [`Self::analyze`], publishing coarse progress on `progress` as
    /// the loop advances.
    pub async fn analyze_with_progress(
        &self,
        request: AnalysisRequest,
        cancel: &CancelToken,
        progress: &watch::Sender<AnalysisProgress>,
    ) -> Result<NormalizedDocument, AnalysisError> {
        self.analyze_inner(request, cancel, Some(progress)).await
    }

    async fn analyze_inner(
        &self,
        request: AnalysisRequest,
        cancel: &CancelToken,
        progress: Option<&watch::Sender<AnalysisProgress>>,
    ) -> Result<NormalizedDocument, AnalysisError> {
        let model_id = request.model_id.clone();
        let raw = self.run_to_completion(request, cancel, progress).await?;
        Ok(normalize(raw, &model_id))
    }

    async fn run_to_completion(
        &self,
        request: AnalysisRequest,
        cancel: &CancelToken,
        progress: Option<&watch::Sender<AnalysisProgress>>,
    ) -> Result<super::raw::RawAnalyzeResult, AnalysisError> {
        let max_ticks = self.poll.max_ticks;

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let handle = self.transport.submit(&request).await?;
        drop(request);
        self.publish(progress, AnalysisPhase::Submitted, 0);

        for tick in 1..=max_ticks {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            self.publish(progress, AnalysisPhase::Polling, tick);

            match self.transport.poll(&handle).await {
                Ok(PollOutcome::Succeeded(raw)) => {
                    info!("analysis succeeded after {} polls", tick);
                    self.publish(progress, AnalysisPhase::Succeeded, tick);
                    return Ok(raw);
                }
                Ok(PollOutcome::Failed { reason }) => {
                    self.publish(progress, AnalysisPhase::Failed, tick);
                    return Err(AnalysisError::PollFailed { reason });
                }
                Ok(PollOutcome::Running) => {
                    debug!("analysis still running (tick {}/{})", tick, max_ticks);
                }
                // Transient transport blips are retried on the next tick;
                // only the tick budget bounds them.
                Err(err) => {
                    warn!("poll transport error (tick {}/{}): {}", tick, max_ticks, err);
                }
            }

            if tick == max_ticks {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                _ = tokio::time::sleep(self.poll.interval) => {}
            }
        }

        self.publish(progress, AnalysisPhase::Failed, max_ticks);
        Err(AnalysisError::TimedOut { ticks: max_ticks })
    }

    fn publish(
        &self,
        progress: Option<&watch::Sender<AnalysisProgress>>,
        phase: AnalysisPhase,
        ticks_elapsed: u32,
    ) {
        if let Some(tx) = progress {
            tx.send_replace(AnalysisProgress {
                phase,
                ticks_elapsed,
                max_ticks: self.poll.max_ticks,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::raw::RawAnalyzeResult;
    use crate::analysis::OperationHandle;
    use crate::error::PollTransportError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// What a scripted poll tick should do.
    enum Step {
        Running,
        Succeed,
        Fail(&'static str),
        TransportError,
    }

    struct ScriptedTransport {
        steps: Vec<Step>,
        polls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                polls: AtomicU32::new(0),
            }
        }

        fn poll_count(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl AnalysisTransport for ScriptedTransport {
        async fn submit(
            &self,
            _request: &AnalysisRequest,
        ) -> Result<OperationHandle, AnalysisError> {
            Ok(OperationHandle::new("fake://operation"))
        }

        async fn poll(
            &self,
            _handle: &OperationHandle,
        ) -> Result<PollOutcome, PollTransportError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) as usize;
            // Past the end of the script, keep reporting running.
            match self.steps.get(n).unwrap_or(&Step::Running) {
                Step::Running => Ok(PollOutcome::Running),
                Step::Succeed => Ok(PollOutcome::Succeeded(sample_raw())),
                Step::Fail(reason) => Ok(PollOutcome::Failed {
                    reason: reason.to_string(),
                }),
                Step::TransportError => Err(PollTransportError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    fn sample_raw() -> RawAnalyzeResult {
        serde_json::from_value(serde_json::json!({
            "content": "Hello world",
            "pages": [{
                "pageNumber": 1,
                "lines": [{"content": "Hello world", "confidence": 0.9}]
            }]
        }))
        .unwrap()
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            file_bytes: vec![0x25, 0x50, 0x44, 0x46],
            model_id: "prebuilt-read".to_string(),
        }
    }

    fn fast_config(max_ticks: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            max_ticks,
        }
    }

    #[tokio::test]
    async fn test_resolves_after_running_ticks() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Step::Running,
            Step::Running,
            Step::Running,
            Step::Running,
            Step::Running,
            Step::Succeed,
        ]));
        let analyzer = Analyzer::new(transport.clone(), fast_config(30));

        let document = analyzer
            .analyze(request(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(transport.poll_count(), 6);
        assert_eq!(document.raw_text, "Hello world");
    }

    #[tokio::test]
    async fn test_times_out_after_exact_budget() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let analyzer = Analyzer::new(transport.clone(), fast_config(30));

        let err = analyzer
            .analyze(request(), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::TimedOut { ticks: 30 }));
        assert_eq!(transport.poll_count(), 30);
    }

    #[tokio::test]
    async fn test_transient_transport_errors_tolerated() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Step::TransportError,
            Step::TransportError,
            Step::TransportError,
            Step::Succeed,
        ]));
        let analyzer = Analyzer::new(transport.clone(), fast_config(30));

        let document = analyzer
            .analyze(request(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(transport.poll_count(), 4);
        assert_eq!(document.stats.page_count, 1);
    }

    #[tokio::test]
    async fn test_service_failure_is_terminal() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Step::Running,
            Step::Fail("InvalidContent"),
        ]));
        let analyzer = Analyzer::new(transport.clone(), fast_config(30));

        let err = analyzer
            .analyze(request(), &CancelToken::new())
            .await
            .unwrap_err();

        match err {
            AnalysisError::PollFailed { reason } => assert_eq!(reason, "InvalidContent"),
            other => panic!("expected PollFailed, got {:?}", other),
        }
        assert_eq!(transport.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_cancel_mid_wait_stops_polling() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let analyzer = Analyzer::new(
            transport.clone(),
            PollConfig {
                interval: Duration::from_millis(200),
                max_ticks: 30,
            },
        );

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = analyzer.analyze(request(), &cancel).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));

        // One poll before the first wait, none after cancellation.
        let polls_at_cancel = transport.poll_count();
        assert_eq!(polls_at_cancel, 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.poll_count(), polls_at_cancel);
    }

    #[tokio::test]
    async fn test_cancel_before_start_skips_submit() {
        let transport = Arc::new(ScriptedTransport::new(vec![Step::Succeed]));
        let analyzer = Analyzer::new(transport.clone(), fast_config(30));

        let cancel = CancelToken::new();
        cancel.cancel();

        let err = analyzer.analyze(request(), &cancel).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(transport.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_reflects_real_ticks() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Step::Running,
            Step::Running,
            Step::Succeed,
        ]));
        let analyzer = Analyzer::new(transport, fast_config(30));

        let (tx, rx) = watch::channel(AnalysisProgress {
            phase: AnalysisPhase::Submitted,
            ticks_elapsed: 0,
            max_ticks: 30,
        });

        analyzer
            .analyze_with_progress(request(), &CancelToken::new(), &tx)
            .await
            .unwrap();

        let last = *rx.borrow();
        assert_eq!(last.phase, AnalysisPhase::Succeeded);
        assert_eq!(last.ticks_elapsed, 3);
        assert_eq!(last.max_ticks, 30);
    }
}
