// ---------------------------------------------------------------------------
// Orchestration integration tests against an in-process stub backend
// ---------------------------------------------------------------------------

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use screcon_client::ApiClient;
use screcon_core::{CancellationToken, Orchestrator, Phase, RunEvent, ScanRequest};

/// Records every phase endpoint the orchestrator hits, in order, and lets a
/// test choose the vulnerability-scan payload or force a phase to fail.
#[derive(Clone)]
struct Stub {
    calls: Arc<Mutex<Vec<String>>>,
    vuln_response: Value,
    fail_phase: Option<&'static str>,
}

impl Stub {
    fn record(&self, name: &str) -> Result<(), StatusCode> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.fail_phase == Some(name) {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(())
    }
}

async fn phase_handler(
    State(stub): State<Stub>,
    Path((kind, _id)): Path<(String, i64)>,
) -> Result<Json<Value>, (StatusCode, String)> {
    stub.record(&kind)
        .map_err(|code| (code, format!("{kind} blew up")))?;
    if kind == "vuln" {
        return Ok(Json(stub.vuln_response.clone()));
    }
    Ok(Json(json!({"scan_id": 1})))
}

async fn lookup_handler(
    State(stub): State<Stub>,
    Path((kind, _id)): Path<(String, i64)>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let name = format!("lookup/{kind}");
    stub.record(&name)
        .map_err(|code| (code, format!("{name} blew up")))?;
    Ok(Json(json!({"scan_id": 1})))
}

async fn spawn_backend(stub: Stub) -> String {
    let session_stub = stub.clone();
    let routes = Router::new()
        .route(
            "/createscansession/{timing}/{ip}",
            get(move || {
                let stub = session_stub.clone();
                async move {
                    stub.calls.lock().unwrap().push("createsession".into());
                    Json(json!({"scan_id": 99}))
                }
            }),
        )
        .route("/scan/{kind}/{id}", get(phase_handler))
        .route("/lookup/{kind}/{id}", get(lookup_handler))
        .with_state(stub);
    let app = Router::new().nest("/api", routes);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn run(
    stub: Stub,
    phases: BTreeSet<Phase>,
) -> (Vec<String>, Vec<RunEvent>) {
    let calls = stub.calls.clone();
    let base = spawn_backend(stub).await;
    let client = ApiClient::new(base).unwrap();

    let request = ScanRequest {
        ip: "192.168.1.10".into(),
        timing: 5,
        phases,
    };

    let (tx, mut rx) = mpsc::channel(64);
    Orchestrator::run_streaming(&client, &request, tx, CancellationToken::new()).await;

    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    let calls = calls.lock().unwrap().clone();
    (calls, events)
}

fn stub(vuln_response: Value) -> Stub {
    Stub {
        calls: Arc::new(Mutex::new(Vec::new())),
        vuln_response,
        fail_phase: None,
    }
}

#[tokio::test]
async fn cves_selection_expands_and_runs_in_order() {
    let (calls, events) = run(
        stub(json!({"vulnerabilities": "CVE-2021-41773"})),
        BTreeSet::from([Phase::Cves]),
    )
    .await;

    assert_eq!(calls, vec!["createsession", "port", "vuln", "lookup/cves"]);

    // total = 3 expanded phases + session creation
    assert!(matches!(events.first(), Some(RunEvent::Started { total: 4 })));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, RunEvent::Completed { scan_id: 99 }))
    );
    let done_counts: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::StepDone { completed, .. } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(done_counts, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn empty_vuln_result_skips_lookups_but_completes() {
    let (calls, events) = run(
        stub(json!({"vulnerabilities": ""})),
        BTreeSet::from([Phase::Cves, Phase::Metamodules]),
    )
    .await;

    // Lookups never hit the backend
    assert_eq!(calls, vec!["createsession", "port", "vuln"]);

    // but both are counted done and the run completes
    assert!(matches!(events.last(), Some(RunEvent::Completed { .. })));
    let final_done = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::StepDone { completed, total } => Some((*completed, *total)),
            _ => None,
        })
        .next_back();
    assert_eq!(final_done, Some((5, 5)));
    assert!(events.iter().any(|e| matches!(
        e,
        RunEvent::Log(line) if line.contains("Skipping CVE lookup")
    )));
}

#[tokio::test]
async fn nested_vuln_shape_counts_as_found() {
    let (calls, _) = run(
        stub(json!({"vulnerabilityscan": {"vulnerabilities": "CVE-2019-0211"}})),
        BTreeSet::from([Phase::Cves]),
    )
    .await;
    assert_eq!(calls.last().map(String::as_str), Some("lookup/cves"));
}

#[tokio::test]
async fn first_failure_aborts_remaining_steps() {
    let mut s = stub(json!({"vulnerabilities": "x"}));
    s.fail_phase = Some("vuln");

    let (calls, events) = run(
        s,
        BTreeSet::from([Phase::Cves, Phase::Metamodules, Phase::Whatweb]),
    )
    .await;

    // vuln fails; cves/metamodules/whatweb never run
    assert_eq!(calls, vec!["createsession", "port", "vuln"]);

    let failure = events.iter().find_map(|e| match e {
        RunEvent::Failed(msg) => Some(msg.clone()),
        _ => None,
    });
    let failure = failure.expect("expected a Failed event");
    assert!(failure.contains("Vulnscan failed (500)"), "{failure}");
    assert!(failure.contains("vuln blew up"), "{failure}");

    // completed-step count froze at the point of failure
    let last_done = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::StepDone { completed, .. } => Some(*completed),
            _ => None,
        })
        .next_back();
    assert_eq!(last_done, Some(2));
    assert!(!events.iter().any(|e| matches!(e, RunEvent::Completed { .. })));
}

#[tokio::test]
async fn independent_phases_run_without_prerequisites() {
    let (calls, events) = run(
        stub(json!({})),
        BTreeSet::from([Phase::Whatweb, Phase::SmbShares, Phase::Subenum]),
    )
    .await;

    assert_eq!(
        calls,
        vec!["createsession", "subenum", "smbshares", "whatweb"]
    );
    assert!(matches!(events.last(), Some(RunEvent::Completed { .. })));
}
