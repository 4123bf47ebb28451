//! Pure projections of the ledger and run details for rendering.
//!
//! Nothing in here touches the store or the network; hosts load entries,
//! build a view, and render it. Row state lives in [`VerifyState`] and is
//! projected into labels here, never inferred back from rendered output.

use std::time::Duration;

use chrono::{Local, TimeZone};

use crate::engine::VerifyEvent;
use crate::model::{RawStatus, RunDetail, RunSummary};
use crate::state::VerifyState;
use crate::store::RunStore;

/// At most this many rows are rendered; the count label still reflects the
/// full filtered size.
pub const VISIBLE_LIMIT: usize = 20;

/// Terminal progress banners self-clear after this long.
pub const BANNER_CLEAR_DELAY: Duration = Duration::from_secs(2);

// =============================================================================
// Ledger view
// =============================================================================

/// A ledger entry paired with its detail blob, when one exists.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub summary: RunSummary,
    pub detail: Option<RunDetail>,
}

impl LedgerEntry {
    /// Load the full ledger with details, most recent first.
    pub async fn load_all(store: &RunStore) -> Vec<LedgerEntry> {
        let mut entries = Vec::new();
        for summary in store.list_summaries().await {
            let detail = store.get_detail(&summary.run_id).await;
            entries.push(LedgerEntry { summary, detail });
        }
        entries
    }
}

/// Which empty message to show when no rows render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// No runs exist at all; the host restores its default empty copy.
    NoRuns,
    /// Runs exist but none match the current filter.
    NoMatches,
}

impl EmptyState {
    /// Replacement copy, where this state overrides the host's default.
    pub fn copy(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::NoRuns => None,
            Self::NoMatches => Some((
                "No matches",
                "Try a different search or clear the filter.",
            )),
        }
    }
}

/// One rendered row.
#[derive(Debug, Clone)]
pub struct RowView {
    pub run_id: String,
    /// Display name, only when it differs from the run id.
    pub name: Option<String>,
    pub status_label: String,
    pub status_class: &'static str,
    pub ts_label: String,
    pub state: VerifyState,
    pub verify_label: &'static str,
    pub verify_enabled: bool,
    pub copy_proof_enabled: bool,
    pub copy_inputs_enabled: bool,
}

impl RowView {
    /// Row as first rendered, state derived from the stored `verified` flag.
    pub fn build(entry: &LedgerEntry) -> Self {
        let stored = entry.detail.as_ref().and_then(|d| d.verified);
        Self::with_state(entry, VerifyState::from_stored(stored), false)
    }

    /// Row re-rendered after a state transition. `silent` marks a batch-pass
    /// failure, which keeps the retry control at its plain label.
    pub fn with_state(entry: &LedgerEntry, state: VerifyState, silent: bool) -> Self {
        let summary = &entry.summary;
        let (status_label, status_class) = status_chip(entry);
        let name = summary
            .name
            .clone()
            .filter(|n| !n.is_empty() && n != &summary.run_id);
        let proof = entry.detail.as_ref().and_then(|d| d.proof.as_ref());
        let copy_proof_enabled = proof
            .and_then(|p| p.proof_b64.as_deref())
            .is_some_and(|s| !s.is_empty());
        let copy_inputs_enabled = proof
            .and_then(|p| p.public_inputs_b64.as_deref())
            .is_some_and(|s| !s.is_empty());

        Self {
            run_id: summary.run_id.clone(),
            name,
            status_label,
            status_class,
            ts_label: format_ts(summary.ts),
            verify_label: verify_label(&state, silent),
            verify_enabled: state.action_enabled(),
            copy_proof_enabled,
            copy_inputs_enabled,
            state,
        }
    }
}

/// Filtered, capped projection of the ledger.
#[derive(Debug, Clone)]
pub struct LedgerView {
    pub rows: Vec<RowView>,
    /// Full filtered size, not just the rendered slice.
    pub total_matches: usize,
    pub empty: Option<EmptyState>,
    pub count_label: String,
    pub verify_all_enabled: bool,
    pub clear_enabled: bool,
}

impl LedgerView {
    /// Case-insensitive substring filter over run id and display name; an
    /// empty filter passes everything. Entry order is preserved.
    pub fn build(entries: &[LedgerEntry], filter: &str) -> Self {
        let query = filter.trim().to_lowercase();
        let matched: Vec<&LedgerEntry> = entries
            .iter()
            .filter(|e| query.is_empty() || summary_matches(&e.summary, &query))
            .collect();

        let total_matches = matched.len();
        let rows: Vec<RowView> = matched
            .iter()
            .take(VISIBLE_LIMIT)
            .map(|e| RowView::build(e))
            .collect();

        let empty = if total_matches > 0 {
            None
        } else if query.is_empty() {
            Some(EmptyState::NoRuns)
        } else {
            Some(EmptyState::NoMatches)
        };

        let count_label = if total_matches > 0 {
            format!(
                "Showing {} of {} runs",
                total_matches.min(VISIBLE_LIMIT),
                total_matches
            )
        } else {
            String::new()
        };

        Self {
            rows,
            total_matches,
            empty,
            count_label,
            verify_all_enabled: total_matches > 0,
            clear_enabled: !entries.is_empty(),
        }
    }

    /// Run ids of the rendered rows, in display order. This is the set a
    /// batch pass captures.
    pub fn visible_run_ids(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.run_id.clone()).collect()
    }
}

fn summary_matches(summary: &RunSummary, query: &str) -> bool {
    summary.run_id.to_lowercase().contains(query)
        || summary
            .name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(query))
}

fn status_chip(entry: &LedgerEntry) -> (String, &'static str) {
    let raw = entry
        .summary
        .status
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            entry
                .detail
                .as_ref()
                .and_then(|d| d.status.as_ref())
                .map(|s| match s {
                    RawStatus::Text(t) => t.clone(),
                    RawStatus::Flag(true) => "PASS".to_string(),
                    RawStatus::Flag(false) => "FAIL".to_string(),
                })
        })
        .map(|s| s.to_uppercase())
        .filter(|s| !s.is_empty());

    match raw.as_deref() {
        Some("PASS") => ("PASS".to_string(), "pass"),
        Some("FAIL") => ("FAIL".to_string(), "fail"),
        Some(other) => (other.to_string(), "unknown"),
        None => ("—".to_string(), "unknown"),
    }
}

fn verify_label(state: &VerifyState, silent: bool) -> &'static str {
    match state {
        VerifyState::Verified => "Verified",
        VerifyState::MissingProof => "Missing proof",
        VerifyState::Failed { .. } if !silent => "Verify again",
        _ => "Verify",
    }
}

fn format_ts(ts: i64) -> String {
    if ts <= 0 {
        return "—".to_string();
    }
    match Local.timestamp_millis_opt(ts).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "—".to_string(),
    }
}

// =============================================================================
// Progress banner
// =============================================================================

/// Banner text for an engine event, `None` when the banner is untouched.
/// Terminal messages self-clear after [`BANNER_CLEAR_DELAY`].
pub fn banner_text(event: &VerifyEvent) -> Option<String> {
    match event {
        VerifyEvent::Progress { done, total } => Some(format!("Verifying {done}/{total}…")),
        VerifyEvent::BatchCompleted { .. } => Some("Verification complete".to_string()),
        VerifyEvent::HistoryCleared => Some("History cleared".to_string()),
        VerifyEvent::RowStateChanged { .. } => None,
    }
}

// =============================================================================
// Detail page
// =============================================================================

/// One constraint card on the detail page.
#[derive(Debug, Clone)]
pub struct ConstraintCard {
    pub title: String,
    pub verdict: &'static str,
    pub verdict_class: &'static str,
    pub severity_label: &'static str,
    pub allowed_label: &'static str,
}

/// Projection of a single run's detail blob.
#[derive(Debug, Clone)]
pub struct DetailView {
    pub run_id: String,
    pub status_label: String,
    pub status_class: &'static str,
    /// Summary line: dataset, severities, commitment, verified flag.
    pub meta_line: String,
    /// Proof system and curve, when recorded.
    pub proof_meta: String,
    pub constraints: Vec<ConstraintCard>,
    pub has_public_output: bool,
    pub has_proof: bool,
}

impl DetailView {
    pub fn build(run_id: &str, detail: &RunDetail) -> Self {
        let status_label = detail.status_label();
        let status_class = match status_label.as_str() {
            "PASS" => "pass",
            "FAIL" => "fail",
            _ => "unknown",
        };

        let mut meta = Vec::new();
        if let Some(client) = &detail.client {
            let mut line = format!("Dataset: {}", client.dataset_source.label());
            if let Some(name) = client.dataset_name.as_deref().filter(|n| !n.is_empty()) {
                line.push_str(" · ");
                line.push_str(name);
            }
            meta.push(line);
        }
        if let Some(out) = &detail.public_output {
            if out.max_severity.is_some() {
                meta.push(format!(
                    "Max severity: {}",
                    crate::model::severity_label(out.max_severity)
                ));
            }
            if out.policy_threshold.is_some() {
                meta.push(format!(
                    "Threshold: {}",
                    crate::model::severity_label(out.policy_threshold)
                ));
            }
            if let Some(commitment) = out.commitment.as_deref().filter(|c| !c.is_empty()) {
                meta.push(format!("Commitment: {commitment}"));
            }
        }
        if let Some(verified) = detail.verified {
            meta.push(format!(
                "Verified: {}",
                if verified { "Yes" } else { "No" }
            ));
        }

        let mut proof_meta = Vec::new();
        if let Some(proof) = &detail.proof {
            if let Some(system) = proof.system.as_deref() {
                proof_meta.push(format!("System: {system}"));
            }
            if let Some(curve) = proof.curve.as_deref() {
                proof_meta.push(format!("Curve: {curve}"));
            }
        }

        let constraints = detail
            .constraint_results
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| {
                let (verdict, verdict_class) = match c.pass {
                    Some(true) => ("PASS", "pass"),
                    Some(false) => ("FAIL", "fail"),
                    None => ("—", "unknown"),
                };
                ConstraintCard {
                    title: c
                        .title
                        .clone()
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| c.id.clone()),
                    verdict,
                    verdict_class,
                    severity_label: crate::model::severity_label(c.severity),
                    allowed_label: crate::model::severity_label(c.allowed_max_severity),
                }
            })
            .collect();

        Self {
            run_id: run_id.to_string(),
            status_label,
            status_class,
            meta_line: meta.join(" · "),
            proof_meta: proof_meta.join(" · "),
            constraints,
            has_public_output: detail.public_output.is_some(),
            has_proof: detail.proof.is_some(),
        }
    }
}

// =============================================================================
// Clipboard
// =============================================================================

/// Transient label shown on the triggering control after a copy.
pub const COPY_ACK_LABEL: &str = "Copied";

/// The acknowledgment reverts after this long.
pub const COPY_ACK_DELAY: Duration = Duration::from_millis(1200);

/// Host clipboard seam. Failure is silent.
pub trait ClipboardSink: Send + Sync {
    fn copy_text(&self, text: &str) -> bool;
}

/// Clipboard that drops everything; copies simply do not acknowledge.
pub struct NoopClipboard;

impl ClipboardSink for NoopClipboard {
    fn copy_text(&self, _text: &str) -> bool {
        false
    }
}

/// Best-effort copy. Returns the acknowledgment label to flash on the
/// control, or `None` when nothing was copied.
pub fn copy_to_clipboard(sink: &dyn ClipboardSink, text: &str) -> Option<&'static str> {
    if text.is_empty() {
        return None;
    }
    sink.copy_text(text).then_some(COPY_ACK_LABEL)
}
