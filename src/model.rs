//! Persisted data model for evaluation runs.
//!
//! These types mirror the JSON blobs other clients of the shared store read
//! and write, so field names and optionality are part of the wire contract.
//! Unknown fields on a detail blob are preserved across rewrites.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Severity
// =============================================================================

/// Ordinal risk level attached to individual policy constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Limited,
    Moderate,
    Severe,
}

impl Severity {
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Limited),
            1 => Some(Self::Moderate),
            2 => Some(Self::Severe),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Limited => "Limited",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }
}

/// Display label for a raw severity value. Anything outside the closed set
/// {0, 1, 2} renders as unknown.
pub fn severity_label(raw: Option<u8>) -> &'static str {
    raw.and_then(Severity::from_raw)
        .map(Severity::label)
        .unwrap_or("—")
}

// =============================================================================
// Ledger entry
// =============================================================================

/// One entry in the bounded recent-runs ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub ts: i64,
}

impl RunSummary {
    /// Build a summary for a freshly submitted run, stamped with the current
    /// time. An empty display name falls back to the run id.
    pub fn new(run_id: impl Into<String>, status: Option<String>, name: Option<String>) -> Self {
        let run_id = run_id.into();
        let name = match name {
            Some(n) if !n.trim().is_empty() => Some(n),
            _ => Some(run_id.clone()),
        };
        Self {
            run_id,
            name,
            status,
            ts: now_epoch_ms(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.run_id)
    }
}

// =============================================================================
// Detail blob
// =============================================================================

/// Run status as stored: older writers persisted a bare boolean, newer ones
/// a "PASS"/"FAIL" string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Text(String),
    Flag(bool),
}

/// Public output payload of an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOutput {
    pub overall_pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_threshold: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_inputs: Option<serde_json::Value>,
}

/// Opaque proof material, passed through unmodified to the remote verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_inputs_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
}

impl ProofBundle {
    /// Both proof fields, when present and non-empty. A run is verifiable
    /// only if this returns `Some`.
    pub fn material(&self) -> Option<(&str, &str)> {
        match (self.proof_b64.as_deref(), self.public_inputs_b64.as_deref()) {
            (Some(p), Some(i)) if !p.is_empty() && !i.is_empty() => Some((p, i)),
            _ => None,
        }
    }
}

/// Per-constraint verdict from the evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintResult {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_max_severity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<bool>,
}

/// Where the dataset for a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    File,
    Paste,
}

impl DatasetSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::File => "Uploaded file",
            Self::Paste => "Pasted JSON",
        }
    }
}

/// Client-side submission metadata attached by the wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub dataset_source: DatasetSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_size: Option<u64>,
}

/// Full stored result payload for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RawStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_output: Option<PublicOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_results: Option<Vec<ConstraintResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientInfo>,
    /// Absent until a verification attempt completes; set only from an
    /// explicit endpoint response, never speculatively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Fields written by other collaborators survive a rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RunDetail {
    /// Proof material when present; `None` statically refuses verification.
    pub fn proof_material(&self) -> Option<(&str, &str)> {
        self.proof.as_ref().and_then(ProofBundle::material)
    }

    /// Status string for display: stored booleans coerce to PASS/FAIL, a
    /// missing status falls back to the public output's overall verdict.
    pub fn status_label(&self) -> String {
        match &self.status {
            Some(RawStatus::Text(s)) if !s.is_empty() => s.to_uppercase(),
            Some(RawStatus::Flag(true)) => "PASS".to_string(),
            Some(RawStatus::Flag(false)) => "FAIL".to_string(),
            _ => match &self.public_output {
                Some(out) if out.overall_pass => "PASS".to_string(),
                Some(_) => "FAIL".to_string(),
                None => "—".to_string(),
            },
        }
    }
}

pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_labels_close_the_set() {
        assert_eq!(severity_label(Some(0)), "Limited");
        assert_eq!(severity_label(Some(1)), "Moderate");
        assert_eq!(severity_label(Some(2)), "Severe");
        assert_eq!(severity_label(Some(7)), "—");
        assert_eq!(severity_label(None), "—");
    }

    #[test]
    fn summary_name_defaults_to_run_id() {
        let s = RunSummary::new("abc123", Some("PASS".into()), Some("   ".into()));
        assert_eq!(s.display_name(), "abc123");
        let s = RunSummary::new("abc123", None, Some("nightly".into()));
        assert_eq!(s.display_name(), "nightly");
    }

    #[test]
    fn proof_material_requires_both_fields() {
        let mut proof = ProofBundle {
            proof_b64: Some("cHJvb2Y=".into()),
            public_inputs_b64: None,
            system: None,
            curve: None,
        };
        assert!(proof.material().is_none());
        proof.public_inputs_b64 = Some(String::new());
        assert!(proof.material().is_none());
        proof.public_inputs_b64 = Some("aW5wdXRz".into());
        assert_eq!(proof.material(), Some(("cHJvb2Y=", "aW5wdXRz")));
    }

    #[test]
    fn status_label_coerces_legacy_booleans() {
        let detail: RunDetail = serde_json::from_str(r#"{"status": true}"#).unwrap();
        assert_eq!(detail.status_label(), "PASS");
        let detail: RunDetail = serde_json::from_str(r#"{"status": "fail"}"#).unwrap();
        assert_eq!(detail.status_label(), "FAIL");
        let detail: RunDetail =
            serde_json::from_str(r#"{"public_output": {"overall_pass": true}}"#).unwrap();
        assert_eq!(detail.status_label(), "PASS");
        let detail: RunDetail = serde_json::from_str("{}").unwrap();
        assert_eq!(detail.status_label(), "—");
    }

    #[test]
    fn detail_round_trip_preserves_unknown_fields() {
        let raw = r#"{"status":"PASS","verified":true,"server_note":"kept"}"#;
        let detail: RunDetail = serde_json::from_str(raw).unwrap();
        let out = serde_json::to_value(&detail).unwrap();
        assert_eq!(out["server_note"], "kept");
        assert_eq!(out["verified"], true);
    }
}
