//! Centralized constants for capture limits and defaults.
//!
//! All magic numbers in the relay should be defined here with
//! documented rationale. This enables:
//! - Auditing payload limits in one place
//! - Consistent limits across modules
//! - Easy tuning without code search

// Allow unused constants - they are intentionally defined for documentation
// and audit purposes, to be used as features are integrated.
#![allow(dead_code)]

// =============================================================================
// Payload Ceilings
// =============================================================================

/// Maximum stored body length in characters (50,000).
/// Captured `outerHTML` can be arbitrarily large; anything beyond this is cut
/// and marked rather than rejected.
pub const MAX_BODY_LEN: usize = 50_000;

/// Maximum stored excerpt length in characters (10,000).
pub const MAX_EXCERPT_LEN: usize = 10_000;

/// Maximum media payload length in characters (1,000,000).
/// Media is all-or-nothing: over the ceiling it is dropped entirely and the
/// record is flagged, never partially truncated.
pub const MAX_MEDIA_LEN: usize = 1_000_000;

/// Marker appended to a body or excerpt that was cut at its ceiling.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Length of the excerpt prefix included in summary listings.
pub const SUMMARY_EXCERPT_LEN: usize = 100;

// =============================================================================
// Redaction
// =============================================================================

/// Replacement value for attributes with sensitive-looking keys.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Attribute keys containing any of these substrings (case-insensitive)
/// have their values redacted wholesale.
pub const SENSITIVE_KEY_SUBSTRINGS: [&str; 5] = ["password", "token", "secret", "key", "auth"];

/// Accepted `sourceRef` prefixes. Captures come from a browser context, so
/// anything outside these schemes is rejected at sanitization.
pub const ALLOWED_SOURCE_PREFIXES: [&str; 4] = ["http://", "https://", "file://", "about:"];

// =============================================================================
// Store Defaults
// =============================================================================

/// Default capacity ceiling (live records).
/// When full, admitting one more evicts the oldest-admitted survivor.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default record time-to-live in milliseconds (1 hour).
pub const DEFAULT_TTL_MS: i64 = 3_600_000;

/// Default background sweep interval in milliseconds (5 minutes).
/// Bounds worst-case memory growth from entries that are never read.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 300_000;

// =============================================================================
// Server Defaults
// =============================================================================

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port candidates, tried in order until one binds.
/// The capture agent walks the same list when connecting.
pub const DEFAULT_PORTS: [u16; 3] = [9219, 9220, 9221];

/// Maximum accepted HTTP request body (2 MB).
/// Sized above the media ceiling so an oversized submit is rejected by the
/// sanitizer with a reason, not cut off mid-frame by the transport.
pub const MAX_HTTP_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Configuration file name under the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration directory under the user's home.
pub const CONFIG_DIR_NAME: &str = ".grabwire";

// =============================================================================
// Resource URIs
// =============================================================================

/// URI scheme for the resource-read surface.
pub const RESOURCE_SCHEME: &str = "capture://";

/// Well-known resource listing all live records.
pub const RESOURCE_LIST: &str = "capture://list";

/// Well-known resource for store statistics.
pub const RESOURCE_STATS: &str = "capture://stats";

/// Well-known resource for producer-channel liveness.
pub const RESOURCE_STATUS: &str = "capture://status";
