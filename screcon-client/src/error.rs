use thiserror::Error;

/// Failures a backend call can surface to the dashboard.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered with a non-2xx status.
    #[error("{action} failed ({status}): {body}")]
    RequestFailed {
        action: &'static str,
        status: u16,
        body: String,
    },

    /// Session creation answered 2xx but carried no `scan_id`. The
    /// backend's own `error` string is surfaced when present.
    #[error("{}", message.as_deref().unwrap_or("Missing scan_id from backend."))]
    MissingScanId { message: Option<String> },

    /// The operation was aborted by the caller. Never shown as a
    /// user-facing error.
    #[error("operation cancelled")]
    Cancelled,

    /// Connection, protocol, or body-read failure.
    #[error("{action} failed: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// 2xx response whose JSON did not match the expected shape.
    #[error("{action}: unexpected response shape: {detail}")]
    BadPayload {
        action: &'static str,
        detail: String,
    },
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
