//! HTTP adapter for the verification endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;

use super::error::VerifyError;
use super::{ProofVerifier, VerifyOutcome, VerifyRequest};

/// Fixed endpoint path, relative to the base URL.
const VERIFY_PATH: &str = "/api/verify";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body shape for non-success responses.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVerifier {
    pub fn new(base_url: impl Into<String>) -> Result<Self, VerifyError> {
        Self::with_config(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_config(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VerifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| VerifyError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn verify_url(&self) -> String {
        format!("{}{VERIFY_PATH}", self.base_url)
    }
}

#[async_trait]
impl ProofVerifier for HttpVerifier {
    async fn verify(&self, req: &VerifyRequest) -> Result<VerifyOutcome, VerifyError> {
        let response = self.client.post(self.verify_url()).json(req).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(VerifyError::endpoint(message, Some(status.as_u16())));
        }

        serde_json::from_str(&body).map_err(|e| VerifyError::InvalidResponse(e.to_string()))
    }
}
