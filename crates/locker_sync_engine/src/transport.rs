//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use locker_sync_protocol::{SyncAck, SyncPayload, ACCEPTED_STATUS};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// What came back from the server for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true if the server reported the record as created.
    pub fn is_accepted(&self) -> bool {
        self.status == ACCEPTED_STATUS
    }
}

/// A sync transport delivers one payload to the server.
///
/// Implementations report what the server said; judging the answer is left
/// to the engine. Connection failures and timeouts are returned as
/// [`SyncError::Transport`] and [`SyncError::Timeout`].
pub trait SyncTransport: Send + Sync {
    /// Sends `payload` and returns the server's response.
    fn send(&self, payload: &SyncPayload) -> SyncResult<TransportResponse>;
}

/// A scripted reply for [`MockTransport`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with a fixed status and body.
    Respond(TransportResponse),
    /// Answer 201 with a valid acknowledgement for whatever was sent.
    EchoAck,
    /// Fail as if the connection was refused.
    ConnectionError(String),
    /// Fail as if the request timed out.
    Timeout,
}

impl MockReply {
    /// 201 with an acknowledgement for `tracking_id`.
    pub fn ack(tracking_id: &str) -> Self {
        Self::json(ACCEPTED_STATUS, &ack_body(tracking_id))
    }

    /// A status with an empty body.
    pub fn status(status: u16) -> Self {
        Self::Respond(TransportResponse::new(status, Vec::new()))
    }

    /// A status with a JSON (or any text) body.
    pub fn json(status: u16, body: &str) -> Self {
        Self::Respond(TransportResponse::new(status, body.as_bytes()))
    }
}

fn ack_body(tracking_id: &str) -> String {
    SyncAck::accepted(tracking_id)
        .encode()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// A mock transport for testing.
///
/// Replies are taken from a queue first, then from the default reply. Every
/// payload handed to [`SyncTransport::send`] is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: Mutex<VecDeque<MockReply>>,
    default_reply: Mutex<Option<MockReply>>,
    requests: Mutex<Vec<SyncPayload>>,
}

impl MockTransport {
    /// Creates a mock with no replies configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that acknowledges everything.
    pub fn acking() -> Self {
        let transport = Self::new();
        transport.set_default_reply(MockReply::EchoAck);
        transport
    }

    /// Queues a reply for the next unanswered request.
    pub fn push_reply(&self, reply: MockReply) {
        self.queued.lock().push_back(reply);
    }

    /// Sets the reply used once the queue is empty.
    pub fn set_default_reply(&self, reply: MockReply) {
        *self.default_reply.lock() = Some(reply);
    }

    /// Returns every payload sent so far.
    pub fn requests(&self) -> Vec<SyncPayload> {
        self.requests.lock().clone()
    }

    /// Returns the number of sends.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns how many sends carried `tracking_id`.
    pub fn requests_for(&self, tracking_id: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|p| p.tracking_id == tracking_id)
            .count()
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.queued
            .lock()
            .pop_front()
            .or_else(|| self.default_reply.lock().clone())
    }
}

impl SyncTransport for MockTransport {
    fn send(&self, payload: &SyncPayload) -> SyncResult<TransportResponse> {
        self.requests.lock().push(payload.clone());
        match self.next_reply() {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::EchoAck) => Ok(TransportResponse::new(
                ACCEPTED_STATUS,
                ack_body(&payload.tracking_id).into_bytes(),
            )),
            Some(MockReply::ConnectionError(message)) => {
                Err(SyncError::transport_retryable(message))
            }
            Some(MockReply::Timeout) => Err(SyncError::Timeout),
            None => Err(SyncError::transport_retryable("no mock reply set")),
        }
    }
}
