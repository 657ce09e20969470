//! Error types for the grabwire relay server.
//!
//! This module provides structured errors for server startup and session
//! handling, with HTTP status code mappings for API responses.

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Server errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No configured port could be bound.
    #[error("failed to bind listener on {attempted}: {source}")]
    Bind {
        /// The addresses that were tried, comma-separated.
        attempted: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Record not found.
    #[error("record not found: {id}")]
    RecordNotFound { id: String },

    /// Record has no media payload.
    #[error("record has no media: {id}")]
    NoMedia { id: String },

    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a bind error from the list of attempted addresses.
    pub fn bind(attempted: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            attempted: attempted.into(),
            source,
        }
    }

    /// Create a record not found error.
    pub fn record_not_found(id: impl Into<String>) -> Self {
        Self::RecordNotFound { id: id.into() }
    }

    /// Create a no-media error.
    pub fn no_media(id: impl Into<String>) -> Self {
        Self::NoMedia { id: id.into() }
    }

    /// Get the appropriate HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::RecordNotFound { .. } | Self::NoMedia { .. } => 404,
            Self::InvalidRequest(_) => 400,
            Self::Config(_) => 422,
            Self::Bind { .. } | Self::Internal(_) => 500,
        }
    }

    /// Get a client-safe error message (doesn't leak internal details).
    pub const fn client_message(&self) -> &str {
        match self {
            Self::RecordNotFound { .. } => "Record not found",
            Self::NoMedia { .. } => "Record has no media",
            Self::InvalidRequest(_) => "Invalid request",
            Self::Config(_) => "Configuration error",
            _ => "Internal server error",
        }
    }
}
