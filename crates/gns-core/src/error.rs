//! Unified error types for the GNS ecosystem.
//!
//! This module provides a common error type [`GnsError`] that can represent
//! errors from any part of the system. Domain-specific error types can be
//! converted to `GnsError` for uniform error handling at API boundaries.
//!
//! Only global configuration errors (bad score weights, an out-of-range
//! removal fraction) should halt an entire batch run; per-node and per-edge
//! conditions are recovered locally and tallied in
//! [`Diagnostics`](crate::Diagnostics) instead.

use thiserror::Error;

/// Unified error type for all GNS operations.
#[derive(Error, Debug)]
pub enum GnsError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors (fail fast, no partial result)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Max-flow / analysis errors
    #[error("Flow error: {0}")]
    Flow(String),

    /// Configuration errors (e.g. score weights not summing to 1.0)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors (unknown node id, broken topology)
    #[error("Network error: {0}")]
    Network(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GnsError.
pub type GnsResult<T> = Result<T, GnsError>;

impl From<anyhow::Error> for GnsError {
    fn from(err: anyhow::Error) -> Self {
        GnsError::Other(err.to_string())
    }
}

impl From<String> for GnsError {
    fn from(s: String) -> Self {
        GnsError::Other(s)
    }
}

impl From<&str> for GnsError {
    fn from(s: &str) -> Self {
        GnsError::Other(s.to_string())
    }
}
