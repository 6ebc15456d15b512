//! Error types for the Lumen engine
//!
//! This module defines the error types used throughout the engine core:
//! controller registration, resource loading and GPU resource creation.

use std::fmt;

/// Result type for Lumen engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen engine errors
///
/// Errors are `Clone` because the resource manager caches failed loads and
/// hands the same failure to every later caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (also used for poisoned locks)
    BackendError(String),

    /// Invalid resource usage (bad region, wrong buffer size, type mismatch)
    InvalidResource(String),

    /// Initialization failed (engine, config, subsystems)
    InitializationFailed(String),

    /// Something requested by name does not exist
    /// (unregistered controller, asset missing from every search path)
    NotFound(String),

    /// A name or identifier is already taken
    AlreadyExists(String),

    /// An asset description failed validation
    InvalidAsset {
        /// Resource identifier being loaded
        id: String,
        /// Offending field of the description
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// File system error while reading an asset
    Io {
        /// Path that could not be read
        path: String,
        /// Underlying I/O error message
        message: String,
    },

    /// A construction precondition was violated by the caller
    PreconditionFailed(String),
}

impl Error {
    /// Build an `Io` error from a path and a `std::io::Error`
    pub fn io(path: impl AsRef<std::path::Path>, error: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            message: error.to_string(),
        }
    }

    /// Build an `InvalidAsset` error
    pub fn invalid_asset(id: &str, field: &str, message: impl Into<String>) -> Self {
        Error::InvalidAsset {
            id: id.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            Error::InvalidAsset { id, field, message } => {
                write!(f, "Invalid asset '{}': {} ({})", id, message, field)
            }
            Error::Io { path, message } => write!(f, "I/O error on '{}': {}", path, message),
            Error::PreconditionFailed(msg) => write!(f, "Precondition failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
