//! # Locker Sync Protocol
//!
//! Wire types for the locker sync protocol.
//!
//! This crate provides:
//! - [`SyncPayload`], the JSON body POSTed for each record
//! - [`SyncAck`], the acknowledgement body the server answers with
//! - Acknowledgement verification against the record that was sent
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ack;
mod error;
mod payload;

pub use ack::SyncAck;
pub use error::{ProtocolError, ProtocolResult};
pub use payload::SyncPayload;

/// HTTP status the server answers with when it accepted a record.
pub const ACCEPTED_STATUS: u16 = 201;
