#![forbid(unsafe_code)]

//! # noema-ledger
//!
//! Run ledger and batch proof-verification engine for the Noema evaluation
//! client.
//!
//! Evaluation runs arrive from a remote policy-evaluation service and are
//! recorded locally: a bounded ledger of run summaries plus one detail blob
//! per run, in a shared key-value store other clients also read. Each run
//! with proof material can be checked against a remote verification
//! endpoint; a batch pass walks the visible rows strictly one at a time,
//! reporting progress and tolerating per-row failures. Row status is an
//! explicit state machine and every rendered surface is a pure projection
//! of it.

pub mod engine;
pub mod model;
pub mod state;
pub mod store;
pub mod verifier;
pub mod view;

pub use engine::{NoopObserver, VerifyEngine, VerifyEvent, VerifyObserver};
pub use model::{RunDetail, RunSummary, Severity};
pub use state::VerifyState;
pub use store::{KvStore, MemoryKvStore, RunStore, SqliteKvStore, StoreError};
pub use verifier::{HttpVerifier, ProofVerifier, VerifyError, VerifyOutcome, VerifyRequest};
pub use view::{DetailView, LedgerEntry, LedgerView, RowView};
