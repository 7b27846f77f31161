// ---------------------------------------------------------------------------
// Client integration tests against an in-process stub backend
// ---------------------------------------------------------------------------

use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::json;

use screcon_client::{ApiClient, CancellationToken, ClientError};

/// Bind the stub router on an ephemeral port; returns the client base URL.
async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn api(routes: Router) -> Router {
    Router::new().nest("/api", routes)
}

#[tokio::test]
async fn list_scans_parses_collection() {
    let routes = Router::new().route(
        "/scans",
        get(|| async {
            Json(json!([
                {
                    "scan_id": 2,
                    "ip": "10.0.0.5",
                    "timing": 5,
                    "created_at": "2025-11-04T09:00:00",
                    "portscan": {"scan_result": "22,ssh", "scan_id": 2}
                },
                {"scan_id": 1, "ip": "10.0.0.4", "timing": 3, "created_at": "2025-11-03T08:00:00"}
            ]))
        }),
    );
    let base = spawn_backend(api(routes)).await;

    let client = ApiClient::new(base).unwrap();
    let cancel = CancellationToken::new();
    let scans = client.list_scans(&cancel).await.unwrap();

    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0].scan_id, 2);
    assert_eq!(scans[0].portscan_raw(), Some("22,ssh"));
    assert!(scans[1].portscan.is_none());
}

#[tokio::test]
async fn delete_scan_accepts_empty_body() {
    let routes = Router::new().route(
        "/deletescan/{id}",
        delete(|Path(id): Path<i64>| async move {
            assert_eq!(id, 42);
            StatusCode::OK
        }),
    );
    let base = spawn_backend(api(routes)).await;

    let client = ApiClient::new(base).unwrap();
    client
        .delete_scan(42, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn non_2xx_surfaces_status_and_body() {
    let routes = Router::new().route(
        "/scan/port/{id}",
        get(|| async { (StatusCode::BAD_GATEWAY, "scanner container down") }),
    );
    let base = spawn_backend(api(routes)).await;

    let client = ApiClient::new(base).unwrap();
    let err = client
        .run_portscan(1, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClientError::RequestFailed {
            action,
            status,
            body,
        } => {
            assert_eq!(action, "Portscan");
            assert_eq!(status, 502);
            assert_eq!(body, "scanner container down");
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn create_scan_session_returns_id() {
    let routes = Router::new().route(
        "/createscansession/{timing}/{ip}",
        get(|Path((timing, ip)): Path<(u8, String)>| async move {
            assert_eq!(timing, 5);
            assert_eq!(ip, "192.168.1.10");
            Json(json!({"scan_id": 17}))
        }),
    );
    let base = spawn_backend(api(routes)).await;

    let client = ApiClient::new(base).unwrap();
    let id = client
        .create_scan_session("192.168.1.10", 5, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(id, 17);
}

#[tokio::test]
async fn create_scan_session_encodes_target_segment() {
    // axum decodes the percent-encoded segment back to the raw target
    let routes = Router::new().route(
        "/createscansession/{timing}/{ip}",
        get(|Path((_, ip)): Path<(u8, String)>| async move {
            assert_eq!(ip, "fe80::1");
            Json(json!({"scan_id": 3}))
        }),
    );
    let base = spawn_backend(api(routes)).await;

    let client = ApiClient::new(base).unwrap();
    let id = client
        .create_scan_session("fe80::1", 5, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(id, 3);
}

#[tokio::test]
async fn create_scan_session_missing_id_maps_to_error() {
    let routes = Router::new().route(
        "/createscansession/{timing}/{ip}",
        get(|| async { Json(json!({"error": "target unreachable"})) }),
    );
    let base = spawn_backend(api(routes)).await;

    let client = ApiClient::new(base).unwrap();
    let err = client
        .create_scan_session("10.0.0.9", 5, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClientError::MissingScanId { message } => {
            assert_eq!(message.as_deref(), Some("target unreachable"));
        }
        other => panic!("expected MissingScanId, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_stops_an_outstanding_call() {
    // The handler never answers within the test window; only the
    // cancellation branch can complete.
    let routes = Router::new().route(
        "/scan/vuln/{id}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Json(json!({}))
        }),
    );
    let base = spawn_backend(api(routes)).await;

    let client = ApiClient::new(base).unwrap();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = client.run_vulnscan(1, &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}
