//! HTTP transport for the Azure-style document analysis service.

use super::raw::PollEnvelope;
use super::{AnalysisRequest, AnalysisTransport, OperationHandle, PollOutcome};
use crate::config::ServiceConfig;
use crate::error::{AnalysisError, PollTransportError};
use tracing::{debug, info};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// Stateless submit/poll client. Retains nothing between calls; the file
/// bytes are not kept after `submit` returns.
pub struct AzureTransport {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl AzureTransport {
    pub fn new(client: reqwest::Client, config: ServiceConfig) -> Self {
        Self { client, config }
    }

    fn submit_url(&self, model_id: &str) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            model_id,
            self.config.api_version
        )
    }
}

#[async_trait::async_trait]
impl AnalysisTransport for AzureTransport {
    async fn submit(&self, request: &AnalysisRequest) -> Result<OperationHandle, AnalysisError> {
        let url = self.submit_url(&request.model_id);
        info!(
            "AzureTransport: submitting {} bytes to model {}",
            request.file_bytes.len(),
            request.model_id
        );

        let resp = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(request.file_bytes.clone())
            .send()
            .await
            .map_err(|e| AnalysisError::Submission {
                status: 0,
                body: format!("transport error: {}", e),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::Submission {
                status: status.as_u16(),
                body,
            });
        }

        // HeaderMap lookup is case-insensitive, so intermediaries that
        // rewrite header casing are not a problem.
        let location = resp
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::Submission {
                status: status.as_u16(),
                body: "missing Operation-Location response header".to_string(),
            })?;

        debug!("AzureTransport: operation started at {}", location);
        Ok(OperationHandle::new(location))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<PollOutcome, PollTransportError> {
        let resp = self
            .client
            .get(handle.url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PollTransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: PollEnvelope = resp.json().await?;
        debug!("AzureTransport: poll status={}", envelope.status);

        match envelope.status.as_str() {
            "succeeded" => Ok(PollOutcome::Succeeded(
                envelope.analyze_result.unwrap_or_default(),
            )),
            "failed" => {
                let reason = envelope
                    .error
                    .map(|e| {
                        if e.message.is_empty() {
                            e.code
                        } else {
                            e.message
                        }
                    })
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "unknown error".to_string());
                Ok(PollOutcome::Failed { reason })
            }
            // The service reports notStarted before the job is picked up.
            "running" | "notStarted" => Ok(PollOutcome::Running),
            other => Err(PollTransportError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> AzureTransport {
        AzureTransport::new(
            reqwest::Client::new(),
            ServiceConfig {
                endpoint: "https://example.cognitiveservices.azure.com/".to_string(),
                api_key: "k".to_string(),
                api_version: "2023-07-31".to_string(),
            },
        )
    }

    #[test]
    fn test_submit_url_shape() {
        let url = transport().submit_url("prebuilt-invoice");
        assert_eq!(
            url,
            "https://example.cognitiveservices.azure.com/formrecognizer/documentModels/prebuilt-invoice:analyze?api-version=2023-07-31"
        );
    }

    #[test]
    fn test_poll_envelope_parses_terminal_states() {
        let succeeded: PollEnvelope = serde_json::from_str(
            r#"{"status":"succeeded","analyzeResult":{"content":"hi","pages":[]}}"#,
        )
        .unwrap();
        assert_eq!(succeeded.status, "succeeded");
        assert_eq!(succeeded.analyze_result.unwrap().content, "hi");

        let failed: PollEnvelope = serde_json::from_str(
            r#"{"status":"failed","error":{"code":"InvalidRequest","message":"bad pdf"}}"#,
        )
        .unwrap();
        assert_eq!(failed.error.unwrap().message, "bad pdf");
    }
}
