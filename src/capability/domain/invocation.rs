//! The uniform result envelope returned by every dispatch.

use super::{CapabilityName, OperationName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether an invocation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// The operation ran and returned data.
    Success,
    /// Selection or invocation failed; see the message.
    Error,
}

/// Result of one dispatcher call, created fresh per call.
///
/// Serialises as `{status, data, capability_name, operation_invoked}` on
/// success and `{status, message, capability_name}` on error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    status: InvocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    capability_name: CapabilityName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation_invoked: Option<OperationName>,
}

impl InvocationResult {
    /// Creates a success envelope.
    #[must_use]
    pub const fn success(
        capability_name: CapabilityName,
        operation_invoked: OperationName,
        data: Value,
    ) -> Self {
        Self {
            status: InvocationStatus::Success,
            data: Some(data),
            message: None,
            capability_name,
            operation_invoked: Some(operation_invoked),
        }
    }

    /// Creates an error envelope.
    #[must_use]
    pub fn error(capability_name: CapabilityName, message: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Error,
            data: None,
            message: Some(message.into()),
            capability_name,
            operation_invoked: None,
        }
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> InvocationStatus {
        self.status
    }

    /// Returns whether the invocation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, InvocationStatus::Success)
    }

    /// Returns the operation's return value on success.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the error description on failure.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the capability that was addressed.
    #[must_use]
    pub const fn capability_name(&self) -> &CapabilityName {
        &self.capability_name
    }

    /// Returns the operation that ran, on success.
    #[must_use]
    pub const fn operation_invoked(&self) -> Option<&OperationName> {
        self.operation_invoked.as_ref()
    }
}
