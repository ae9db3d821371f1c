//! Error types for registry persistence

use std::fmt;

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while loading or saving the server registry
#[derive(Debug)]
pub enum RegistryError {
    /// I/O error (missing file, permissions, full disk, etc.)
    IoError(std::io::Error),

    /// The persisted registry is not valid JSON or has the wrong shape
    SerializationError(serde_json::Error),

    /// A latency sample was rejected before it reached the registry
    InvalidSample(f64),

    /// The named server is not part of the registry
    UnknownServer(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::IoError(err) => write!(f, "I/O error: {}", err),
            RegistryError::SerializationError(err) => {
                write!(f, "registry serialization error: {}", err)
            }
            RegistryError::InvalidSample(value) => {
                write!(f, "invalid latency sample: {}", value)
            }
            RegistryError::UnknownServer(name) => write!(f, "unknown server: {}", name),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::IoError(err) => Some(err),
            RegistryError::SerializationError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::IoError(err)
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::SerializationError(err)
    }
}
