//! Server acknowledgement.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// The body the server returns with HTTP 201.
///
/// A 201 alone proves nothing about which record the server stored; the
/// agent only marks a record synced after [`SyncAck::verify`] passes for
/// that record's tracking id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAck {
    /// Whether the server durably stored the record.
    #[serde(default)]
    pub ack: bool,
    /// Tracking id the server stored.
    #[serde(default, alias = "tracking_id")]
    pub tracking_id: Option<String>,
    /// Server receipt time, informational only.
    #[serde(
        default,
        alias = "server_received_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_received_at: Option<String>,
}

impl SyncAck {
    /// Creates a positive acknowledgement for `tracking_id`.
    pub fn accepted(tracking_id: impl Into<String>) -> Self {
        Self {
            ack: true,
            tracking_id: Some(tracking_id.into()),
            server_received_at: None,
        }
    }

    /// Parses an acknowledgement body.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes to JSON bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Checks that this acknowledgement confirms `expected_tracking_id`.
    pub fn verify(&self, expected_tracking_id: &str) -> ProtocolResult<()> {
        if !self.ack {
            return Err(ProtocolError::NotAcknowledged);
        }
        match self.tracking_id.as_deref() {
            None => Err(ProtocolError::MissingTrackingId),
            Some(actual) if actual == expected_tracking_id => Ok(()),
            Some(actual) => Err(ProtocolError::TrackingIdMismatch {
                expected: expected_tracking_id.to_string(),
                actual: actual.to_string(),
            }),
        }
    }

    /// Decodes `bytes` and verifies it against `expected_tracking_id`.
    pub fn decode_verified(bytes: &[u8], expected_tracking_id: &str) -> ProtocolResult<Self> {
        let ack = Self::decode(bytes)?;
        ack.verify(expected_tracking_id)?;
        Ok(ack)
    }
}
