//! Error handling for hostforge

use crate::types::HostnameStatus;
use thiserror::Error;

/// Main error type for hostforge
#[derive(Error, Debug, Clone)]
pub enum HostForgeError {
    #[error("template not found: {id}")]
    TemplateNotFound { id: String },

    #[error("hostname not found: {id}")]
    HostnameNotFound { id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("hostname is not in {expected} status, current status: {current}")]
    StateConflict {
        expected: HostnameStatus,
        current: HostnameStatus,
    },

    #[error("no free hostname for template {template_id} after {attempts} attempts, last sequence tried: {last_sequence}")]
    AllocationExhausted {
        template_id: i64,
        last_sequence: i64,
        attempts: u32,
    },

    #[error("hostname '{name}' already exists")]
    DuplicateName { name: String },

    #[error("DNS resolution failed for '{hostname}': {message}")]
    Resolution { hostname: String, message: String },

    #[error("no existing hostnames found for template {template_id}")]
    DiscoveryFailed { template_id: i64 },

    #[error("store error: {message}")]
    Store { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HostForgeError {
    /// Create a template-not-found error
    pub fn template_not_found(id: impl ToString) -> Self {
        Self::TemplateNotFound { id: id.to_string() }
    }

    /// Create a hostname-not-found error
    pub fn hostname_not_found(id: impl ToString) -> Self {
        Self::HostnameNotFound { id: id.to_string() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a state-conflict error
    pub fn state_conflict(expected: HostnameStatus, current: HostnameStatus) -> Self {
        Self::StateConflict { expected, current }
    }

    /// Create a duplicate-name error
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create a resolution error
    pub fn resolution(hostname: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error means the looked-up record is absent
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound { .. } | Self::HostnameNotFound { .. }
        )
    }

    /// Check if retrying the same call can succeed.
    ///
    /// Allocation exhaustion is retryable because a fresh call re-reads the
    /// sequence state; validation and state-machine errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AllocationExhausted { .. } | Self::Resolution { .. } | Self::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for HostForgeError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for HostForgeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("Operation", 30)
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, HostForgeError>;

/// Helper macros for common error patterns
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::error::HostForgeError::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::HostForgeError::validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::HostForgeError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::HostForgeError::internal(format!($fmt, $($arg)*))
    };
}
