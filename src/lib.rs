// =============================================================================
// Lint Configuration
// =============================================================================

// Safety: no unsafe code anywhere in this crate
#![deny(unsafe_code)]
// Correctness: must handle all fallible operations
#![deny(unused_must_use)]
// Quality: pedantic but pragmatic
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
// Allowed with documented reasons
#![allow(clippy::missing_errors_doc)] // Error returns self-documenting via type
#![allow(clippy::module_name_repetitions)] // e.g., store::StoreStats is clearer
#![allow(clippy::must_use_candidate)] // Not all returned values need annotation
#![allow(clippy::cast_precision_loss)] // Intentional in metrics gauge conversions
#![allow(clippy::cast_possible_truncation)] // Intentional in size calculations
#![allow(clippy::cast_sign_loss)] // Intentional in size calculations

//! Library crate for grabwire - the bounded in-memory capture relay.
//!
//! Browser-side producers push captured element records in over a
//! WebSocket session; consumers read them back through a small JSON query
//! API. The store in the middle is deliberately modest: a fixed-capacity,
//! TTL-bounded map that favors predictable memory use over completeness.
//!
//! # Example
//!
//! ```
//! use grabwire::config::LimitSettings;
//! use grabwire::sanitize::sanitize;
//! use grabwire::store::types::RawRecord;
//!
//! let raw = RawRecord {
//!     id: Some("cap-1".into()),
//!     captured_at: Some(1_700_000_000_000),
//!     source_ref: Some("https://example.com".into()),
//!     label: Some("div.hero".into()),
//!     ..RawRecord::default()
//! };
//!
//! let record = sanitize(&raw, &LimitSettings::default()).unwrap();
//! assert_eq!(record.id, "cap-1");
//! assert_eq!(record.body, "");
//! ```

/// TOML configuration with CLI-friendly defaults.
pub mod config;

/// Centralized constants with documented rationale.
pub mod constants;

/// Structured errors with HTTP status mappings.
pub mod error;

/// Query facade shared by the consumer adapters.
pub mod facade;

/// HTTP surface: WebSocket ingest plus the JSON query API.
pub mod http;

/// Tracing subscriber setup.
pub mod logging;

/// Prometheus metrics registration and recording helpers.
pub mod metrics;

/// WebSocket wire protocol frames.
pub mod protocol;

/// Record validation, truncation, redaction, and scrubbing.
pub mod sanitize;

/// Producer session registry and broadcast fan-out.
pub mod sessions;

/// The bounded TTL store itself.
pub mod store;

pub use error::{Error, Result};
