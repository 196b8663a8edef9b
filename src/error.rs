//! Error types for heap inspections
//!
//! Configuration problems are raised when an inspector is built, before any
//! traversal starts. Sink I/O failures abort a run in progress. Malformed
//! per-instance data is never an error: inspectors skip it and log at trace level.

use thiserror::Error;

/// Errors that can occur while configuring or running an inspection
#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Missing collaborator: {0} must be provided")]
    MissingCollaborator(&'static str),

    #[error("I/O error while writing the inspection report: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for inspection operations
pub type Result<T> = std::result::Result<T, InspectionError>;
