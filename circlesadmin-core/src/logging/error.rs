//! Error types for the logging subsystem

use thiserror::Error;

/// Errors that can occur in the logging subsystem
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoggingError {
    /// A global subscriber is already installed or the filter is unusable
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// A level name that is not one of trace, debug, info, warn, error
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
}
