// ---------------------------------------------------------------------------
// SCRecon backend HTTP client
// ---------------------------------------------------------------------------
//
// One operation per backend endpoint, each a single JSON-over-HTTP round
// trip. No retries and no client-side timeout: a hung backend call hangs the
// step until the caller cancels it.

mod error;

pub use error::ClientError;
pub use tokio_util::sync::CancellationToken;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use screcon_types::Scan;

/// Default backend base URL (the dashboard is same-origin in production;
/// the TUI talks to the backend directly).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Typed client for the SCRecon REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client against `base_url` (no trailing slash, e.g.
    /// `http://host:8000/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("screcon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Transport {
                action: "Client setup",
                source,
            })?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { http, base_url })
    }

    /// Fetch the full scan collection.
    pub async fn list_scans(&self, cancel: &CancellationToken) -> Result<Vec<Scan>, ClientError> {
        let value = self
            .request_json(Method::GET, "/scans".into(), "Fetch scans", cancel)
            .await?;
        serde_json::from_value(value).map_err(|e| ClientError::BadPayload {
            action: "Fetch scans",
            detail: e.to_string(),
        })
    }

    /// Delete one scan session and all of its phase results.
    pub async fn delete_scan(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        self.request_empty(
            Method::DELETE,
            format!("/deletescan/{scan_id}"),
            "Delete scan",
            cancel,
        )
        .await
    }

    /// Create a new scan session for `ip` and return its id.
    pub async fn create_scan_session(
        &self,
        ip: &str,
        timing: u8,
        cancel: &CancellationToken,
    ) -> Result<i64, ClientError> {
        let path = format!("/createscansession/{timing}/{}", encode_segment(ip));
        let value = self
            .request_json(Method::GET, path, "Create scan session", cancel)
            .await?;

        match value.get("scan_id").and_then(Value::as_i64) {
            Some(id) => Ok(id),
            None => Err(ClientError::MissingScanId {
                message: value
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
        }
    }

    pub async fn run_portscan(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(format!("/scan/port/{scan_id}"), "Portscan", cancel)
            .await
    }

    pub async fn run_bannergrab(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(format!("/scan/banner/{scan_id}"), "Bannergrab", cancel)
            .await
    }

    pub async fn run_vulnscan(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(format!("/scan/vuln/{scan_id}"), "Vulnscan", cancel)
            .await
    }

    pub async fn run_subenum(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(
            format!("/scan/subenum/{scan_id}"),
            "Subdomain enumeration",
            cancel,
        )
        .await
    }

    pub async fn run_smbshares(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(format!("/scan/smbshares/{scan_id}"), "SMB shares", cancel)
            .await
    }

    pub async fn run_whatweb(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(format!("/scan/whatweb/{scan_id}"), "WhatWeb", cancel)
            .await
    }

    pub async fn lookup_cves(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(format!("/lookup/cves/{scan_id}"), "CVE lookup", cancel)
            .await
    }

    pub async fn lookup_metamodules(
        &self,
        scan_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.phase(
            format!("/lookup/metamodules/{scan_id}"),
            "Metasploit module lookup",
            cancel,
        )
        .await
    }

    async fn phase(
        &self,
        path: String,
        action: &'static str,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        self.request_json(Method::GET, path, action, cancel).await
    }

    /// Single round trip returning the parsed JSON body. Races the request
    /// against the cancellation token so a cancelled caller stops waiting
    /// immediately (the backend may still finish the phase server-side).
    async fn request_json(
        &self,
        method: Method,
        path: String,
        action: &'static str,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, action, "backend request");

        let fut = async {
            let resp = self
                .http
                .request(method, &url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|source| ClientError::Transport { action, source })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ClientError::RequestFailed {
                    action,
                    status: status.as_u16(),
                    body,
                });
            }

            resp.json::<Value>()
                .await
                .map_err(|source| ClientError::Transport { action, source })
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            res = fut => res,
        }
    }

    /// Like [`request_json`](Self::request_json) but for endpoints that
    /// return an empty body on success.
    async fn request_empty(
        &self,
        method: Method,
        path: String,
        action: &'static str,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, action, "backend request");

        let fut = async {
            let resp = self
                .http
                .request(method, &url)
                .send()
                .await
                .map_err(|source| ClientError::Transport { action, source })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ClientError::RequestFailed {
                    action,
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(())
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            res = fut => res,
        }
    }
}

/// Percent-encode a path segment. Targets are IPs or hostnames, so the
/// reserved set is small; '%' must be replaced first to avoid
/// double-encoding.
fn encode_segment(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('#', "%23")
        .replace('&', "%26")
        .replace('+', "%2B")
        .replace('=', "%3D")
        .replace(':', "%3A")
}
