//! Unified error handling for the ride-tracker library.
//!
//! This module provides a consistent error type for all tracking operations.
//! No error here is fatal: every failure path leaves the session in a stable,
//! previously-reachable state.

use std::fmt;

/// Unified error type for tracking operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum TrackingError {
    /// A platform permission (location, camera) was refused. The dependent
    /// flow aborts and is never retried automatically.
    PermissionDenied { resource: String },
    /// User-correctable input problem (e.g. an empty route name at save
    /// time). Recovered locally; the prompt stays open.
    Validation { message: String },
    /// The location subsystem failed. The session keeps its current state
    /// and last-known metrics; no automatic resubscribe.
    Provider { message: String },
    /// The key-value store failed. Read failures are swallowed as "no prior
    /// data" by the loaders; write failures surface so the save can be
    /// retried.
    Storage { message: String },
    /// An operation was invoked in a session state that does not permit it.
    InvalidState { operation: String, status: String },
}

impl TrackingError {
    pub fn permission_denied(resource: &str) -> Self {
        TrackingError::PermissionDenied {
            resource: resource.to_string(),
        }
    }

    pub fn validation(message: &str) -> Self {
        TrackingError::Validation {
            message: message.to_string(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        TrackingError::Provider {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        TrackingError::Storage {
            message: message.into(),
        }
    }

    pub fn invalid_state(operation: &str, status: impl fmt::Debug) -> Self {
        TrackingError::InvalidState {
            operation: operation.to_string(),
            status: format!("{status:?}"),
        }
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::PermissionDenied { resource } => {
                write!(f, "Permission for {} was denied", resource)
            }
            TrackingError::Validation { message } => {
                write!(f, "Validation failed: {}", message)
            }
            TrackingError::Provider { message } => {
                write!(f, "Location provider error: {}", message)
            }
            TrackingError::Storage { message } => {
                write!(f, "Storage error: {}", message)
            }
            TrackingError::InvalidState { operation, status } => {
                write!(f, "Cannot {} while session is {}", operation, status)
            }
        }
    }
}

impl std::error::Error for TrackingError {}

/// Result type alias for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;
