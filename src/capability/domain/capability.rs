//! The uniform capability contract and the handles that wrap it.
//!
//! Every resolution strategy produces something implementing
//! [`Capability`], so the dispatcher never needs to know whether a handle
//! came from a native module, a compiled artifact, or a fallback stub.

use super::OperationName;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Named arguments passed to a capability operation.
pub type Parameters = Map<String, Value>;

/// Errors raised by a capability while running an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    /// The capability does not expose the requested operation.
    #[error("operation '{0}' is not exposed by this capability")]
    UnknownOperation(OperationName),

    /// The parameters could not be passed to the operation.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The operation ran and reported a failure.
    #[error("{0}")]
    Failed(String),
}

impl OperationError {
    /// Creates a failure from any displayable error.
    pub fn failed(err: impl fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}

/// A resolved unit of functionality exposing named operations.
pub trait Capability: Send + Sync {
    /// Lists the operations this capability exposes, in discovery order.
    fn operations(&self) -> Vec<OperationName>;

    /// Runs `operation` with named `parameters`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError`] when the operation is unknown, the
    /// parameters are rejected, or the operation itself fails.
    fn invoke(&self, operation: &OperationName, parameters: &Parameters)
    -> Result<Value, OperationError>;
}

/// Shared reference to a resolved capability and its discovered operations.
///
/// The operation list is captured once at resolution time. Handles are
/// cheap to clone and never mutated after construction.
#[derive(Clone)]
pub struct CapabilityHandle {
    capability: Arc<dyn Capability>,
    operations: Arc<[OperationName]>,
}

impl CapabilityHandle {
    /// Wraps a capability, discovering its public operations.
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>) -> Self {
        let operations = capability
            .operations()
            .into_iter()
            .filter(|operation| !operation.is_private())
            .collect();
        Self {
            capability,
            operations,
        }
    }

    /// Returns the discovered operations in discovery order.
    #[must_use]
    pub fn operations(&self) -> &[OperationName] {
        &self.operations
    }

    /// Returns whether the handle exposes `operation`.
    #[must_use]
    pub fn exposes(&self, operation: &str) -> bool {
        self.operations.iter().any(|candidate| candidate == operation)
    }

    /// Returns whether both handles point at the same capability instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.capability, &other.capability)
    }

    /// Returns the underlying capability.
    #[must_use]
    pub fn capability(&self) -> Arc<dyn Capability> {
        Arc::clone(&self.capability)
    }
}

impl fmt::Debug for CapabilityHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CapabilityHandle")
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}
