//! Outgoing sync payload.

use crate::error::ProtocolResult;
use chrono::{DateTime, Utc};
use locker_core::{format_timestamp, PackageRecord};
use serde::{Deserialize, Serialize};

/// The JSON body sent to the server for one record.
///
/// `last_sync_attempt` carries the attempt *count*, not a time. The name is
/// kept as-is because the server reads it under that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    /// Tracking id of the record.
    pub tracking_id: String,
    /// Locker that recorded the drop-off.
    pub locker_id: String,
    /// Record status at send time.
    pub status: String,
    /// Drop-off time, canonical ISO-8601 UTC.
    pub drop_off_timestamp: String,
    /// Time the payload was built, canonical ISO-8601 UTC.
    pub sync_attempt_timestamp: String,
    /// Attempt number of this send.
    pub last_sync_attempt: u32,
}

impl SyncPayload {
    /// Builds the payload for `record` as of `now`.
    ///
    /// The drop-off time is re-rendered in canonical form, so however the
    /// store held it the wire always carries a `T` separated UTC timestamp.
    pub fn encode(record: &PackageRecord, now: DateTime<Utc>) -> Self {
        Self {
            tracking_id: record.tracking_id.clone(),
            locker_id: record.locker_id.clone(),
            status: record.status.as_str().to_string(),
            drop_off_timestamp: format_timestamp(record.drop_off_timestamp),
            sync_attempt_timestamp: format_timestamp(now),
            last_sync_attempt: record.sync_attempt_count,
        }
    }

    /// Serializes to JSON bytes.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use locker_core::{parse_timestamp, PackageStatus};

    fn record() -> PackageRecord {
        PackageRecord {
            id: 7,
            tracking_id: "T1".into(),
            locker_id: "locker-a".into(),
            status: PackageStatus::Pending,
            drop_off_timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            sync_attempt_count: 3,
            last_sync_attempt: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 45, 0).unwrap()),
        }
    }

    #[test]
    fn encode_maps_record_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let payload = SyncPayload::encode(&record(), now);

        assert_eq!(payload.tracking_id, "T1");
        assert_eq!(payload.locker_id, "locker-a");
        assert_eq!(payload.status, "pending");
        assert_eq!(payload.drop_off_timestamp, "2024-05-01T09:30:00.000000Z");
        assert_eq!(payload.last_sync_attempt, 3);
    }

    #[test]
    fn attempt_timestamp_is_encode_time_not_last_attempt() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let payload = SyncPayload::encode(&record(), now);
        assert_eq!(payload.sync_attempt_timestamp, "2024-05-01T10:00:00.000000Z");
    }

    #[test]
    fn legacy_stored_time_goes_out_with_t_separator() {
        let mut r = record();
        r.drop_off_timestamp = parse_timestamp("2024-05-01 09:30:00").unwrap();
        let payload = SyncPayload::encode(&r, Utc::now());
        assert!(payload.drop_off_timestamp.contains('T'));
        assert!(!payload.drop_off_timestamp.contains(' '));
    }

    #[test]
    fn json_uses_wire_field_names() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let bytes = SyncPayload::encode(&record(), now).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "dropOffTimestamp",
                "lastSyncAttempt",
                "lockerId",
                "status",
                "syncAttemptTimestamp",
                "trackingId",
            ]
        );
        assert_eq!(value["lastSyncAttempt"], 3);
    }

    #[test]
    fn decodes_what_it_encodes() {
        let payload = SyncPayload::encode(&record(), Utc::now());
        let decoded = SyncPayload::from_json(&payload.to_json().unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }
}
