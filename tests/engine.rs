use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use scanhive::config::EngineConfig;
use scanhive::db::{Database, ResultStore};
use scanhive::errors::ScanhiveError;
use scanhive::models::finding::Severity;
use scanhive::models::log_entry::LogLevel;
use scanhive::models::scan::{CreateScanRequest, ScanConfiguration, ScanRecord, ScanStatus, ScanType};
use scanhive::pipeline::{ExecutionPlan, Phase, ScanCatalog, ScanManager};
use scanhive::tools::{ScriptAdapter, ToolAdapter};

fn script(name: &str, body: &str) -> Arc<dyn ToolAdapter> {
    Arc::new(ScriptAdapter::shell(name, body))
}

fn engine(catalog: ScanCatalog) -> (Arc<Database>, ScanManager) {
    let db = Arc::new(Database::in_memory().unwrap());
    let store: Arc<dyn ResultStore> = db.clone();
    let manager = ScanManager::new(store, Arc::new(catalog), Arc::new(EngineConfig::default()));
    (db, manager)
}

fn single(body: &str) -> ScanCatalog {
    ScanCatalog::empty().with_plan(ScanType::Quick, ExecutionPlan::Single(script("fake-scanner", body)))
}

fn request(scan_type: &str, configuration: serde_json::Value) -> CreateScanRequest {
    CreateScanRequest {
        name: String::new(),
        target: "127.0.0.1".to_string(),
        scan_type: scan_type.to_string(),
        configuration,
    }
}

async fn wait_for_terminal(manager: &ScanManager, id: &str) -> ScanRecord {
    for _ in 0..500 {
        let record = manager.get_scan(id).await.unwrap();
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("scan {} did not reach a terminal state", id);
}

async fn wait_until<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn quick_scan_completes_with_full_progress() {
    let (db, manager) = engine(single(
        r#"echo '{"title":"Open port 22/tcp","severity":"info","location":"127.0.0.1:22"}'"#,
    ));

    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    assert_eq!(pending.status, ScanStatus::Pending);
    assert_eq!(pending.name, "quick - 127.0.0.1");

    let done = wait_for_terminal(&manager, &pending.id).await;
    assert_eq!(done.status, ScanStatus::Completed);
    assert_eq!(done.progress, 100);
    assert!(done.error_message.is_none());
    let started = done.started_at.unwrap();
    let completed = done.completed_at.unwrap();
    assert!(started <= completed);

    let findings = db.select_findings(&done.id).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].location, "127.0.0.1:22");

    let logs = db.select_logs(&done.id, None).unwrap();
    let last = logs.last().unwrap();
    assert!(last.message.starts_with("Scan completed with 1 findings"));
    assert!(logs.windows(2).all(|w| w[0].seq < w[1].seq));
    assert!(!manager.is_active(&done.id));
}

#[tokio::test]
async fn observed_status_and_progress_are_monotonic() {
    let (_db, manager) = engine(single(
        r#"for i in 1 2 3 4 5; do echo "{\"title\":\"item $i\"}"; sleep 0.05; done"#,
    ));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();

    let mut seen = vec![(pending.status, pending.progress)];
    loop {
        let record = manager.get_scan(&pending.id).await.unwrap();
        seen.push((record.status, record.progress));
        if record.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for pair in seen.windows(2) {
        let ((from, p1), (to, p2)) = (pair[0], pair[1]);
        // A fast scan may pass through running between two polls.
        let skipped_running = from == ScanStatus::Pending && ScanStatus::Running.can_transition_to(to);
        assert!(from == to || from.can_transition_to(to) || skipped_running, "{} -> {}", from, to);
        assert!(p1 <= p2, "progress went from {} to {}", p1, p2);
    }
    assert_eq!(seen.last().unwrap().0, ScanStatus::Completed);
}

#[tokio::test]
async fn nonzero_exit_with_parseable_output_completes() {
    let (db, manager) = engine(single(
        r#"printf '{"title":"a"}\n{"title":"b","severity":"high"}\n{"title":"c"}\n'; exit 3"#,
    ));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;

    assert_eq!(done.status, ScanStatus::Completed);
    let findings = db.select_findings(&done.id).unwrap();
    assert_eq!(findings.len(), 3);
    assert_eq!(findings[0].severity, Severity::High);

    let logs = db.select_logs(&done.id, None).unwrap();
    assert!(logs
        .iter()
        .any(|l| l.level == LogLevel::Warning && l.message.contains("exited with status 3")));
}

#[tokio::test]
async fn nonzero_exit_without_output_fails() {
    let (db, manager) = engine(single("echo 'connection refused' >&2; exit 2"));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;

    assert_eq!(done.status, ScanStatus::Failed);
    let message = done.error_message.unwrap();
    assert!(message.contains("fake-scanner"));
    assert!(message.contains("status 2"));

    let logs = db.select_logs(&done.id, None).unwrap();
    assert!(logs
        .iter()
        .any(|l| l.level == LogLevel::Error && l.message.contains("connection refused")));
    assert!(db.select_findings(&done.id).unwrap().is_empty());
}

#[tokio::test]
async fn missing_program_fails_as_unavailable() {
    let adapter: Arc<dyn ToolAdapter> = Arc::new(ScriptAdapter::new("ghost", "scanhive-no-such-tool", &[]));
    let catalog = ScanCatalog::empty().with_plan(ScanType::Quick, ExecutionPlan::Single(adapter));
    let (_db, manager) = engine(catalog);

    let tools = manager.available_tools();
    assert_eq!(tools.len(), 1);
    assert!(!tools[0].available);

    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;
    assert_eq!(done.status, ScanStatus::Failed);
    assert!(done.error_message.unwrap().contains("not installed"));
}

#[tokio::test]
async fn cancel_running_scan_stops_writes() {
    let (db, manager) = engine(single(
        r#"while true; do echo '{"title":"tick"}'; sleep 0.05; done"#,
    ));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let id = pending.id.clone();

    let store = db.clone();
    wait_until(|| !store.select_findings(&id).unwrap().is_empty()).await;

    assert!(manager.cancel(&id));
    let done = wait_for_terminal(&manager, &id).await;
    assert_eq!(done.status, ScanStatus::Cancelled);
    assert_eq!(done.error_message.as_deref(), Some("cancelled by user"));
    assert!(done.completed_at.is_some());

    let findings = db.select_findings(&id).unwrap().len();
    let logs = db.select_logs(&id, None).unwrap().len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(db.select_findings(&id).unwrap().len(), findings);
    assert_eq!(db.select_logs(&id, None).unwrap().len(), logs);
    assert_eq!(manager.get_scan(&id).await.unwrap().status, ScanStatus::Cancelled);
    assert_eq!(manager.active_count(), 0);
}

#[tokio::test]
async fn cancel_of_terminal_scan_is_a_no_op() {
    let (_db, manager) = engine(single(r#"echo '{"title":"done"}'"#));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;
    wait_until(|| !manager.is_active(&done.id)).await;

    assert!(!manager.cancel(&done.id));
    let after = manager.get_scan(&done.id).await.unwrap();
    assert_eq!(after.status, ScanStatus::Completed);
    assert_eq!(after.completed_at, done.completed_at);
    assert!(after.error_message.is_none());
}

#[tokio::test]
async fn timeout_is_reported_separately_from_user_cancel() {
    let (_db, manager) = engine(single("sleep 30"));
    let pending = manager
        .create_scan(request("quick", json!({ "timeout_secs": 1 })))
        .await
        .unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;

    assert_eq!(done.status, ScanStatus::Cancelled);
    assert_eq!(done.error_message.as_deref(), Some("timed out after 1s"));
}

#[tokio::test]
async fn timeout_fires_while_background_helper_holds_stderr() {
    let (_db, manager) = engine(single(r#"sleep 20 >/dev/null & echo '{"title":"x"}'"#));
    let pending = manager
        .create_scan(request("quick", json!({ "timeout_secs": 1 })))
        .await
        .unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;

    assert_eq!(done.status, ScanStatus::Cancelled);
    assert_eq!(done.error_message.as_deref(), Some("timed out after 1s"));
    wait_until(|| !manager.is_active(&done.id)).await;
}

#[tokio::test]
async fn user_cancel_after_tool_exits_with_stderr_held_open() {
    let (db, manager) = engine(single(r#"sleep 20 >/dev/null & echo '{"title":"x"}'"#));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let id = pending.id.clone();

    let store = db.clone();
    wait_until(|| !store.select_findings(&id).unwrap().is_empty()).await;

    assert!(manager.cancel(&id));
    let done = wait_for_terminal(&manager, &id).await;
    assert_eq!(done.status, ScanStatus::Cancelled);
    assert_eq!(done.error_message.as_deref(), Some("cancelled by user"));
}

#[tokio::test]
async fn cancel_of_just_created_scan_ends_cancelled() {
    let (_db, manager) = engine(single("sleep 30"));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();

    assert!(manager.cancel(&pending.id));
    let done = wait_for_terminal(&manager, &pending.id).await;
    assert_eq!(done.status, ScanStatus::Cancelled);
    assert_eq!(done.error_message.as_deref(), Some("cancelled by user"));
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn cancel_of_stored_pending_scan_without_execution_is_refused() {
    let (db, manager) = engine(single("sleep 30"));
    let record = ScanRecord::new_pending("", "127.0.0.1", ScanType::Quick, ScanConfiguration::new());
    db.insert_scan(&record).unwrap();

    assert!(!manager.cancel(&record.id));
    let stored = manager.get_scan(&record.id).await.unwrap();
    assert_eq!(stored.status, ScanStatus::Pending);
    assert!(stored.completed_at.is_none());
}

#[tokio::test]
async fn delete_cascades_and_scan_is_gone() {
    let (db, manager) = engine(single(r#"printf '{"title":"a"}\n{"title":"b"}\n'"#));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;
    assert_eq!(db.select_findings(&done.id).unwrap().len(), 2);

    assert!(manager.delete_scan(&done.id).await.unwrap());
    assert!(matches!(manager.get_scan(&done.id).await, Err(ScanhiveError::NotFound(_))));
    assert!(db.select_findings(&done.id).unwrap().is_empty());
    assert!(db.select_logs(&done.id, None).unwrap().is_empty());
    assert!(!manager.delete_scan(&done.id).await.unwrap());
}

#[tokio::test]
async fn delete_of_running_scan_cancels_it() {
    let (_db, manager) = engine(single("sleep 30"));
    let pending = manager.create_scan(request("quick", json!(null))).await.unwrap();
    let id = pending.id.clone();
    wait_until(|| manager.is_active(&id)).await;

    assert!(manager.delete_scan(&id).await.unwrap());
    assert!(!manager.is_active(&id));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(manager.get_scan(&id).await, Err(ScanhiveError::NotFound(_))));
}

#[tokio::test]
async fn duplicate_start_is_rejected() {
    let (db, manager) = engine(single("sleep 30"));
    let record = ScanRecord::new_pending("", "127.0.0.1", ScanType::Quick, ScanConfiguration::new());
    db.insert_scan(&record).unwrap();

    manager.start(&record).unwrap();
    let err = manager.start(&record).unwrap_err();
    assert!(matches!(err, ScanhiveError::Conflict(_)));
    assert!(manager.cancel(&record.id));
    wait_for_terminal(&manager, &record.id).await;
}

#[tokio::test]
async fn sequence_tolerates_a_failed_phase() {
    let phases = vec![
        Phase::new("a", script("alpha", r#"echo '{"title":"from a"}'"#), 30),
        Phase::new("b", script("beta", "exit 1"), 30),
        Phase::new("c", script("gamma", r#"printf '{"title":"c1"}\n{"title":"c2"}\n'"#), 40),
    ];
    let catalog = ScanCatalog::empty().with_plan(ScanType::FullRecon, ExecutionPlan::Sequence(phases));
    let (db, manager) = engine(catalog);

    let pending = manager.create_scan(request("full_recon", json!(null))).await.unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;
    assert_eq!(done.status, ScanStatus::Completed);
    assert_eq!(done.progress, 100);

    let findings = db.select_findings(&done.id).unwrap();
    let mut sources: Vec<&str> = findings.iter().map(|f| f.source.as_str()).collect();
    sources.sort();
    assert_eq!(sources, vec!["alpha", "gamma", "gamma"]);

    let logs = db.select_logs(&done.id, None).unwrap();
    assert!(logs
        .iter()
        .any(|l| l.level == LogLevel::Warning && l.message.contains("Phase b failed")));
}

#[tokio::test]
async fn sequence_with_no_successful_phase_fails() {
    let phases = vec![
        Phase::new("a", script("alpha", "exit 1"), 50),
        Phase::new("b", script("beta", "exit 2"), 50),
    ];
    let catalog = ScanCatalog::empty().with_plan(ScanType::FullWeb, ExecutionPlan::Sequence(phases));
    let (_db, manager) = engine(catalog);

    let pending = manager.create_scan(request("full_web", json!(null))).await.unwrap();
    let done = wait_for_terminal(&manager, &pending.id).await;
    assert_eq!(done.status, ScanStatus::Failed);
    assert!(done.error_message.unwrap().contains("no phase succeeded"));
}

#[tokio::test]
async fn invalid_requests_leave_no_record() {
    let (db, manager) = engine(single("true"));

    let err = manager.create_scan(request("portscan", json!(null))).await.unwrap_err();
    assert!(matches!(err, ScanhiveError::Validation(_)));

    // Known type, but not wired into this catalog.
    let err = manager.create_scan(request("vuln", json!(null))).await.unwrap_err();
    assert!(matches!(err, ScanhiveError::Validation(_)));

    let err = manager
        .create_scan(request("quick", json!({ "ports": "--script=evil" })))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanhiveError::Validation(_)));

    let mut bad_target = request("quick", json!(null));
    bad_target.target = "host\nname".to_string();
    assert!(manager.create_scan(bad_target).await.is_err());

    assert!(db.select_scans(&Default::default()).unwrap().is_empty());
}
