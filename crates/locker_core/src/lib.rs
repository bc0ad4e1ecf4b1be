//! # Locker Core
//!
//! Shared model for the locker sync agent.
//!
//! This crate provides:
//! - `PackageRecord`, the unit of synchronization
//! - `PackageStatus` and its string form
//! - Canonical timestamp formatting and legacy-tolerant parsing
//! - A `Clock` abstraction so time-dependent logic can be tested
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod error;
mod record;
pub mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use record::{generate_tracking_id, NewPackage, PackageRecord, PackageStatus};
pub use timestamp::{format_timestamp, parse_timestamp};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
