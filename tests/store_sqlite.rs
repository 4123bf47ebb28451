use std::sync::Arc;

use noema_ledger::model::{ProofBundle, RunDetail, RunSummary};
use noema_ledger::store::{KvStore, RunStore, SqliteKvStore, LEDGER_CAP, LEDGER_KEY};
use tempfile::tempdir;

fn summary(run_id: &str, ts: i64) -> RunSummary {
    RunSummary {
        run_id: run_id.to_string(),
        name: Some(run_id.to_string()),
        status: Some("PASS".to_string()),
        ts,
    }
}

fn bare_detail() -> RunDetail {
    serde_json::from_str("{}").unwrap()
}

fn detail_with_proof() -> RunDetail {
    RunDetail {
        proof: Some(ProofBundle {
            proof_b64: Some("cHJvb2Y=".into()),
            public_inputs_b64: Some("aW5wdXRz".into()),
            system: None,
            curve: None,
        }),
        ..bare_detail()
    }
}

fn open_store(dir: &tempfile::TempDir) -> (RunStore, Arc<SqliteKvStore>) {
    let kv = Arc::new(SqliteKvStore::new(dir.path().join("runs.sqlite")).unwrap());
    (RunStore::new(kv.clone()), kv)
}

#[tokio::test]
async fn ledger_truncates_to_the_fifty_newest() {
    let dir = tempdir().unwrap();
    let (store, _) = open_store(&dir);

    for i in 0..55 {
        store
            .record_run(summary(&format!("run-{i:02}"), 1000 + i), &bare_detail())
            .await
            .unwrap();
    }

    let runs = store.list_summaries().await;
    assert_eq!(runs.len(), LEDGER_CAP);
    assert_eq!(runs[0].run_id, "run-54");
    assert_eq!(runs[49].run_id, "run-05");
    // The five oldest fell off the tail.
    assert!(!runs.iter().any(|r| r.run_id == "run-04"));
}

#[tokio::test]
async fn list_summaries_returns_most_recent_first() {
    let dir = tempdir().unwrap();
    let (store, _) = open_store(&dir);

    store.record_run(summary("old", 1000), &bare_detail()).await.unwrap();
    store.record_run(summary("new", 2000), &bare_detail()).await.unwrap();

    let runs = store.list_summaries().await;
    assert_eq!(runs[0].run_id, "new");
    assert_eq!(runs[1].run_id, "old");
}

#[tokio::test]
async fn corrupt_ledger_reads_as_empty() {
    let dir = tempdir().unwrap();
    let (store, kv) = open_store(&dir);

    kv.put(LEDGER_KEY, "not json at all").await.unwrap();
    assert!(store.list_summaries().await.is_empty());

    // Valid JSON that is not an array is corruption too.
    kv.put(LEDGER_KEY, r#"{"run_id":"r1"}"#).await.unwrap();
    assert!(store.list_summaries().await.is_empty());
}

#[tokio::test]
async fn corrupt_detail_reads_as_absent() {
    let dir = tempdir().unwrap();
    let (store, kv) = open_store(&dir);

    kv.put(&RunStore::detail_key("r1"), "{{{").await.unwrap();
    assert!(store.get_detail("r1").await.is_none());
    assert!(store.get_detail("never-written").await.is_none());
}

#[tokio::test]
async fn set_verified_is_a_silent_noop_on_missing_detail() {
    let dir = tempdir().unwrap();
    let (store, kv) = open_store(&dir);

    store.set_verified("ghost", true).await.unwrap();
    assert!(kv.get(&RunStore::detail_key("ghost")).await.unwrap().is_none());
}

#[tokio::test]
async fn set_verified_rewrites_only_the_flag() {
    let dir = tempdir().unwrap();
    let (store, _) = open_store(&dir);

    store
        .record_run(summary("r1", 1000), &detail_with_proof())
        .await
        .unwrap();
    assert!(store.get_detail("r1").await.unwrap().verified.is_none());

    store.set_verified("r1", true).await.unwrap();
    let detail = store.get_detail("r1").await.unwrap();
    assert_eq!(detail.verified, Some(true));
    assert!(detail.proof_material().is_some());

    // Subsequent calls may overwrite it again.
    store.set_verified("r1", false).await.unwrap();
    assert_eq!(store.get_detail("r1").await.unwrap().verified, Some(false));
}

#[tokio::test]
async fn clear_all_cascades_details_then_drops_the_ledger() {
    let dir = tempdir().unwrap();
    let (store, kv) = open_store(&dir);

    for i in 0..3 {
        store
            .record_run(summary(&format!("run-{i}"), 1000 + i), &bare_detail())
            .await
            .unwrap();
    }

    store.clear_all().await.unwrap();

    assert!(store.list_summaries().await.is_empty());
    assert!(kv.get(LEDGER_KEY).await.unwrap().is_none());
    for i in 0..3 {
        let key = RunStore::detail_key(&format!("run-{i}"));
        assert!(kv.get(&key).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn clear_all_leaves_unreferenced_details_behind() {
    // Only details the ledger references are cascaded; orphaned blobs from
    // other write paths are out of scope for history clearing.
    let dir = tempdir().unwrap();
    let (store, kv) = open_store(&dir);

    store.record_run(summary("listed", 1000), &bare_detail()).await.unwrap();
    kv.put(&RunStore::detail_key("orphan"), "{}").await.unwrap();

    store.clear_all().await.unwrap();

    assert!(kv.get(&RunStore::detail_key("listed")).await.unwrap().is_none());
    assert!(kv.get(&RunStore::detail_key("orphan")).await.unwrap().is_some());
}

#[tokio::test]
async fn key_layout_matches_the_shared_contract() {
    let dir = tempdir().unwrap();
    let (store, kv) = open_store(&dir);

    store.record_run(summary("abc123", 1000), &bare_detail()).await.unwrap();

    let ledger_raw = kv.get("noema_recent_runs").await.unwrap().unwrap();
    let ledger: serde_json::Value = serde_json::from_str(&ledger_raw).unwrap();
    assert_eq!(ledger[0]["run_id"], "abc123");
    assert!(kv.get("noema_run_abc123").await.unwrap().is_some());
}
