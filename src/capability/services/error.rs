//! Service-level errors for capability resolution and dispatch.

use crate::capability::domain::{
    CapabilityName, OperationError, ResolutionFailure, UnknownCapabilityError,
};
use std::time::Duration;
use thiserror::Error;

/// Errors returned to callers of the cache and dispatcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The name was never registered.
    #[error(transparent)]
    UnknownCapability(#[from] UnknownCapabilityError),

    /// Every strategy failed; only reachable with fallback stubs disabled.
    #[error(transparent)]
    ResolutionFailed(#[from] ResolutionFailure),
}

/// Result type for capability services.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Failures of a single invocation.
///
/// These never propagate out of the dispatcher; they are rendered into the
/// message of an error [`InvocationResult`](crate::capability::domain::InvocationResult).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    /// The resolved capability exposes no operations.
    #[error("capability '{0}' exposes no operations")]
    NoOperationAvailable(CapabilityName),

    /// The selected operation failed.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// The capability could not be resolved.
    #[error(transparent)]
    Unresolved(#[from] ResolutionFailure),

    /// The operation panicked.
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// The operation did not finish within the invocation timeout.
    #[error("operation timed out after {} ms", .0.as_millis())]
    TimedOut(Duration),
}
