//! Service configuration and model-name mapping.
//!
//! Everything is loaded once at startup from the environment (`.env` supported
//! via `dotenvy` in `main`) and passed explicitly into the clients that need
//! it. No ambient credential state.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;

/// Default API version for the document analysis service.
pub const DEFAULT_API_VERSION: &str = "2023-07-31";

/// Connection settings for the remote document analysis service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL, e.g. `https://example.cognitiveservices.azure.com`.
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

impl ServiceConfig {
    /// Read connection settings from the environment.
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var("DOCINTEL_ENDPOINT")
            .context("DOCINTEL_ENDPOINT environment variable not set")?;
        let api_key = env::var("DOCINTEL_API_KEY")
            .context("DOCINTEL_API_KEY environment variable not set")?;
        let api_version =
            env::var("DOCINTEL_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            endpoint,
            api_key,
            api_version,
        })
    }
}

/// Connection settings for the image upscaling model host.
#[derive(Debug, Clone)]
pub struct UpscaleConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl UpscaleConfig {
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var("UPSCALE_ENDPOINT")
            .context("UPSCALE_ENDPOINT environment variable not set")?;
        let api_key =
            env::var("UPSCALE_API_KEY").context("UPSCALE_API_KEY environment variable not set")?;

        Ok(Self { endpoint, api_key })
    }
}

/// Mapping from caller-facing logical model names to the service's model
/// identifier strings.
#[derive(Debug, Clone)]
pub struct ModelMap {
    entries: HashMap<String, String>,
}

impl Default for ModelMap {
    fn default() -> Self {
        let entries = [
            ("invoice", "prebuilt-invoice"),
            ("receipt", "prebuilt-receipt"),
            ("form", "prebuilt-document"),
            ("id", "prebuilt-idDocument"),
            ("business-card", "prebuilt-businessCard"),
            ("mixed", "prebuilt-read"),
            ("print", "prebuilt-read"),
            ("handwriting", "prebuilt-read"),
            ("financial", "prebuilt-document"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { entries }
    }
}

impl ModelMap {
    /// Resolve a logical model name to the service model identifier.
    pub fn resolve(&self, logical: &str) -> Option<&str> {
        self.entries.get(logical).map(String::as_str)
    }

    /// All logical model names, sorted for stable listing.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_models() {
        let map = ModelMap::default();
        assert_eq!(map.resolve("invoice"), Some("prebuilt-invoice"));
        assert_eq!(map.resolve("handwriting"), Some("prebuilt-read"));
        assert_eq!(map.resolve("financial"), Some("prebuilt-document"));
    }

    #[test]
    fn test_unknown_model_is_none() {
        let map = ModelMap::default();
        assert_eq!(map.resolve("tarot-cards"), None);
    }

    #[test]
    fn test_names_sorted() {
        let names = ModelMap::default().names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 9);
    }
}
