//! Error severity and configuration errors.
//!
//! Severity levels classify how the rest of the system should react to a
//! failure: handler failures are recoverable and go through the retry path,
//! while contract violations (publishing while stopped, queue capacity
//! exceeded) are surfaced synchronously to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// - `Fatal`: unrecoverable, requires operator attention
/// - `Recoverable`: the operation failed but may be retried
/// - `Warning`: degraded functionality, operation continued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable error requiring immediate attention.
    Fatal,

    /// Error that can potentially be recovered from through retry or fallback.
    #[default]
    Recoverable,

    /// Non-critical issue that should be logged but doesn't prevent operation.
    Warning,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal (unrecoverable).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration error type covering invalid values and file access errors.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration value is invalid.
    #[error("[Config] Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field with the invalid value.
        field: String,
        /// Reason why the value is invalid.
        reason: String,
    },

    /// Configuration file could not be read.
    #[error("[Config] Failed to read file '{path}': {reason}")]
    FileReadError {
        /// Path to the configuration file.
        path: String,
        /// Reason for the read failure.
        reason: String,
    },

    /// Configuration file format is invalid.
    #[error("[Config] Invalid format in '{path}': {reason}")]
    InvalidFormat {
        /// Path to the configuration file.
        path: String,
        /// Reason for the format error.
        reason: String,
    },
}

impl ConfigError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }
}
