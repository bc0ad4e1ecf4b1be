//! HTTP transport implementation.
//!
//! Payloads are POSTed as JSON with a blocking `reqwest` client. A request
//! that does not complete within the configured timeout is reported as
//! [`SyncError::Timeout`]; any other failure to get a response is a
//! retryable transport error.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{SyncTransport, TransportResponse};
use locker_sync_protocol::SyncPayload;
use parking_lot::RwLock;
use reqwest::blocking::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("locker-sync/", env!("CARGO_PKG_VERSION"));

/// HTTP-based sync transport.
pub struct HttpTransport {
    endpoint: String,
    client: Client,
    last_error: RwLock<Option<String>>,
}

impl HttpTransport {
    /// Creates a transport posting to `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            last_error: RwLock::new(None),
        })
    }

    /// Creates a transport from the endpoint and timeout in `config`.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        Self::new(config.endpoint_url.clone(), config.request_timeout)
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn fail(&self, err: reqwest::Error) -> SyncError {
        *self.last_error.write() = Some(err.to_string());
        if err.is_timeout() {
            SyncError::Timeout
        } else if err.is_connect() {
            SyncError::transport_retryable(format!("connection failed: {err}"))
        } else {
            SyncError::transport_retryable(err.to_string())
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SyncTransport for HttpTransport {
    fn send(&self, payload: &SyncPayload) -> SyncResult<TransportResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .map_err(|e| self.fail(e))?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| self.fail(e))?;

        *self.last_error.write() = None;
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_uses_endpoint() {
        let config = SyncConfig::new("http://127.0.0.1:9/sync", "locker-a");
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.endpoint(), "http://127.0.0.1:9/sync");
        assert!(transport.last_error().is_none());
    }

    #[test]
    fn unreachable_server_is_retryable() {
        // Port 9 (discard) is closed on test machines.
        let transport =
            HttpTransport::new("http://127.0.0.1:9/sync", Duration::from_secs(2)).unwrap();
        let payload = SyncPayload {
            tracking_id: "T1".into(),
            locker_id: "locker-a".into(),
            status: "pending".into(),
            drop_off_timestamp: "2024-05-01T09:00:00.000000Z".into(),
            sync_attempt_timestamp: "2024-05-01T09:00:01.000000Z".into(),
            last_sync_attempt: 1,
        };

        let err = transport.send(&payload).unwrap_err();
        assert!(err.is_retryable());
        assert!(transport.last_error().is_some());
    }
}
