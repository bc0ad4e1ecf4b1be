//! # Locker Sync Engine
//!
//! Delivery of locally recorded drop-offs to the central server.
//!
//! This crate provides:
//! - Backoff policy between attempts of the same record
//! - One-pass reconciliation ([`SyncEngine::sync_once`])
//! - Manual recovery of stalled records ([`SyncEngine::retry_failed`])
//! - A fixed-interval [`Poller`] with cooperative shutdown
//! - HTTP transport over `reqwest` and a scriptable mock transport
//!
//! ## Key Invariants
//!
//! - The attempt count is persisted before every network call
//! - A record becomes `synced` only after an acknowledgement naming its
//!   tracking id
//! - A `synced` record is never sent again
//! - One record's failure never blocks the others in a pass
//! - Delivery is at-least-once; the server deduplicates by tracking id

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod config;
mod error;
mod http;
mod poller;
mod state;
mod transport;

pub use backoff::{BackoffSchedule, DEFAULT_BACKOFF_SECS};
pub use config::{SyncConfig, DEFAULT_ENDPOINT, DEFAULT_LOCKER_ID};
pub use error::{SyncError, SyncResult};
pub use http::HttpTransport;
pub use poller::{Poller, ShutdownSignal};
pub use state::{
    AttemptOutcome, RecordOutcome, RetryReport, SyncEngine, SyncPassResult, SyncStats,
};
pub use transport::{MockReply, MockTransport, SyncTransport, TransportResponse};
