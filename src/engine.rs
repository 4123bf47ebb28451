//! Single-run verification and the sequential batch orchestrator.
//!
//! Core loop for a batch pass:
//! 1. Capture the currently visible rows; the set is fixed for the batch.
//! 2. Verify one run at a time, in display order, so at most one request is
//!    ever in flight against the remote verifier.
//! 3. Count every row as done, failures included, and report progress after
//!    each completion.
//! 4. Finish with a completion event regardless of how many rows failed.
//!
//! There is no cancellation: a started batch runs over its captured set. The
//! host keeps the trigger control disabled for the duration, which is the
//! only guard against overlapping batches. A manual verify racing a batch on
//! the same row is last-write-wins against the store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::state::VerifyState;
use crate::store::{RunStore, StoreError};
use crate::verifier::{ProofVerifier, VerifyRequest};

// =============================================================================
// Events
// =============================================================================

/// Notifications pushed to the host while verification work runs.
#[derive(Debug, Clone)]
pub enum VerifyEvent {
    /// A row's state machine moved; re-render that row.
    RowStateChanged {
        run_id: String,
        state: VerifyState,
        /// Part of a batch pass: failures stay on the row indicator only.
        silent: bool,
    },
    /// Batch progress: `done` of `total` rows have completed.
    Progress { done: usize, total: usize },
    /// The batch chain finished, failures included.
    BatchCompleted { total: usize },
    /// Clear-history finished.
    HistoryCleared,
}

/// Host-side sink for verification events.
#[async_trait]
pub trait VerifyObserver: Send + Sync {
    async fn on_event(&self, event: VerifyEvent);
}

/// Observer that drops every event.
pub struct NoopObserver;

#[async_trait]
impl VerifyObserver for NoopObserver {
    async fn on_event(&self, _event: VerifyEvent) {}
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Clone)]
pub struct VerifyEngine {
    store: RunStore,
    verifier: Arc<dyn ProofVerifier>,
}

impl VerifyEngine {
    pub fn new(store: RunStore, verifier: Arc<dyn ProofVerifier>) -> Self {
        Self { store, verifier }
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Verify a single run and return its terminal state for this attempt.
    ///
    /// Runs without complete proof material are refused statically: no
    /// request is issued and the row lands in `MissingProof`. A successful
    /// endpoint response, pass or fail, is written back to the detail blob;
    /// transport failures leave the stored `verified` field untouched.
    pub async fn verify_run(
        &self,
        run_id: &str,
        silent: bool,
        observer: &dyn VerifyObserver,
    ) -> VerifyState {
        let detail = self.store.get_detail(run_id).await;
        let material = detail
            .as_ref()
            .and_then(|d| d.proof_material())
            .map(|(proof, inputs)| (proof.to_string(), inputs.to_string()));

        let Some((proof_b64, public_inputs_b64)) = material else {
            let state = VerifyState::MissingProof;
            self.emit_row(observer, run_id, state.clone(), silent).await;
            return state;
        };

        self.emit_row(observer, run_id, VerifyState::Pending, silent)
            .await;

        let req = VerifyRequest {
            run_id: run_id.to_string(),
            proof_b64,
            public_inputs_b64,
        };

        let state = match self.verifier.verify(&req).await {
            Ok(outcome) => {
                if let Err(err) = self.store.set_verified(run_id, outcome.verified).await {
                    tracing::warn!(run_id, error = %err, "verified flag write failed");
                }
                if outcome.verified {
                    VerifyState::Verified
                } else {
                    VerifyState::failed("Failed")
                }
            }
            Err(err) => VerifyState::failed(err.reason()),
        };

        self.emit_row(observer, run_id, state.clone(), silent).await;
        state
    }

    /// Verify the captured row set one at a time, in order. Individual
    /// failures are counted as done and the chain proceeds; rows added to
    /// the view mid-batch are not picked up.
    pub async fn verify_all(&self, run_ids: &[String], observer: &dyn VerifyObserver) {
        if run_ids.is_empty() {
            return;
        }

        let total = run_ids.len();
        let mut done = 0;
        observer.on_event(VerifyEvent::Progress { done, total }).await;

        for run_id in run_ids {
            let _ = self.verify_run(run_id, true, observer).await;
            done += 1;
            observer.on_event(VerifyEvent::Progress { done, total }).await;
        }

        observer.on_event(VerifyEvent::BatchCompleted { total }).await;
    }

    /// Remove every detail blob referenced by the ledger, then the ledger
    /// itself.
    pub async fn clear_history(
        &self,
        observer: &dyn VerifyObserver,
    ) -> Result<(), StoreError> {
        self.store.clear_all().await?;
        observer.on_event(VerifyEvent::HistoryCleared).await;
        Ok(())
    }

    async fn emit_row(
        &self,
        observer: &dyn VerifyObserver,
        run_id: &str,
        state: VerifyState,
        silent: bool,
    ) {
        observer
            .on_event(VerifyEvent::RowStateChanged {
                run_id: run_id.to_string(),
                state,
                silent,
            })
            .await;
    }
}
