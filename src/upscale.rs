//! Image upscaling proxy client.
//!
//! A single call-and-wait wrapper around a third-party upscaling model host.
//! No polling, no retries; the contract is one request, one response.

use crate::config::UpscaleConfig;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Supported upscale factors.
pub const ALLOWED_SCALES: [u8; 3] = [2, 4, 8];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleRequest {
    /// Base64-encoded source image.
    pub image_data: String,
    #[serde(default = "default_scale")]
    pub scale: u8,
}

fn default_scale() -> u8 {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upscaled_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Validate an upscale factor against the supported set.
pub fn validate_scale(scale: u8) -> bool {
    ALLOWED_SCALES.contains(&scale)
}

pub struct UpscaleClient {
    client: reqwest::Client,
    config: UpscaleConfig,
}

impl UpscaleClient {
    pub fn new(client: reqwest::Client, config: UpscaleConfig) -> Self {
        Self { client, config }
    }

    /// Send one upscale request and wait for the model host's answer.
    pub async fn upscale(&self, request: &UpscaleRequest) -> Result<UpscaleResponse> {
        // Reject garbage before spending a network call on it.
        let decoded = BASE64
            .decode(&request.image_data)
            .context("imageData is not valid base64")?;

        info!(
            "UpscaleClient: upscaling {} byte image at {}x",
            decoded.len(),
            request.scale
        );

        let body = serde_json::json!({
            "imageData": request.image_data,
            "scale": request.scale,
        });

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("upscale request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("upscale host error ({}): {}", status, text);
        }

        let response: UpscaleResponse = resp
            .json()
            .await
            .context("failed to parse upscale response")?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_validation() {
        assert!(validate_scale(2));
        assert!(validate_scale(4));
        assert!(validate_scale(8));
        assert!(!validate_scale(1));
        assert!(!validate_scale(3));
        assert!(!validate_scale(16));
    }

    #[test]
    fn test_request_defaults_scale() {
        let req: UpscaleRequest = serde_json::from_str(r#"{"imageData": "aGk="}"#).unwrap();
        assert_eq!(req.scale, 4);
    }

    #[test]
    fn test_response_roundtrip() {
        let resp: UpscaleResponse = serde_json::from_str(
            r#"{"success": true, "upscaledImage": "https://cdn.example/out.png"}"#,
        )
        .unwrap();
        assert!(resp.success);
        assert_eq!(
            resp.upscaled_image.as_deref(),
            Some("https://cdn.example/out.png")
        );
        assert!(resp.error.is_none());
    }
}
