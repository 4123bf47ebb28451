//! Client for the remote proof-verification endpoint.

pub mod error;
pub mod http;

use serde::{Deserialize, Serialize};

pub use error::VerifyError;
pub use http::HttpVerifier;

/// JSON body for a verification request.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub run_id: String,
    pub proof_b64: String,
    pub public_inputs_b64: String,
}

/// Successful endpoint response. Only `verified` is trusted for state; the
/// message is informational.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOutcome {
    pub verified: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// One verification call per run. Implementations issue exactly one request
/// and never retry on their own.
#[async_trait::async_trait]
pub trait ProofVerifier: Send + Sync {
    async fn verify(&self, req: &VerifyRequest) -> Result<VerifyOutcome, VerifyError>;
}
