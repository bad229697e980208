//! Error types for capability domain validation.

use thiserror::Error;

/// Errors returned while constructing capability domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityDomainError {
    /// The capability name is empty after trimming.
    #[error("capability name must not be empty")]
    EmptyCapabilityName,

    /// The capability name contains characters outside `[a-z0-9_]`.
    #[error(
        "capability name '{0}' contains invalid characters (only lowercase alphanumeric and underscores allowed)"
    )]
    InvalidCapabilityName(String),

    /// The capability name exceeds the 100-character limit.
    #[error("capability name exceeds 100 character limit: {0}")]
    CapabilityNameTooLong(String),

    /// The operation name is empty after trimming.
    #[error("operation name must not be empty")]
    EmptyOperationName,

    /// The operation name contains whitespace.
    #[error("operation name '{0}' must not contain whitespace")]
    InvalidOperationName(String),

    /// The import path is empty after trimming.
    #[error("import path must not be empty")]
    EmptyImportPath,

    /// The import path has an empty segment, such as `walkers..quiz`.
    #[error("import path '{0}' contains an empty segment")]
    InvalidImportPath(String),

    /// The same capability was registered twice.
    #[error("capability '{0}' is already registered")]
    DuplicateCapability(String),
}

/// Error returned when a capability name was never registered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown capability: {0}")]
pub struct UnknownCapabilityError(pub String);
