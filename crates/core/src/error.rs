//! Error type shared by the display crates.

use thiserror::Error;

/// Errors surfaced by the display core.
///
/// Record-level validation failures never escape as errors; they drop the
/// offending record (see [`crate::validation`]). `Validation` is only returned
/// when a whole response is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// Fetch failed, the service answered with a non-success status, or the
    /// body could not be decoded.
    #[error("network error: {0}")]
    Network(String),
    /// The response decoded but carries nothing usable.
    #[error("validation error: {0}")]
    Validation(String),
}

impl DisplayError {
    /// Wraps any displayable transport error.
    pub fn network<E: std::fmt::Display>(e: E) -> Self {
        Self::Network(e.to_string())
    }

    /// Wraps a whole-response validation failure.
    pub fn validation<E: std::fmt::Display>(e: E) -> Self {
        Self::Validation(e.to_string())
    }
}
