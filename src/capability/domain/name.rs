//! Validated names for capabilities and their operations.

use super::CapabilityDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a capability name.
const MAX_CAPABILITY_NAME_LENGTH: usize = 100;

/// Validated capability name, such as `quiz_master`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityName(String);

impl CapabilityName {
    /// Creates a validated capability name.
    ///
    /// The input is trimmed and lowercased. Only characters in `[a-z0-9_]`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, CapabilityDomainError> {
        let normalized = value.into().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(CapabilityDomainError::EmptyCapabilityName);
        }

        let is_valid = normalized.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });
        if !is_valid {
            return Err(CapabilityDomainError::InvalidCapabilityName(normalized));
        }

        if normalized.len() > MAX_CAPABILITY_NAME_LENGTH {
            return Err(CapabilityDomainError::CapabilityNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the capability name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CapabilityName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for CapabilityName {
    type Error = CapabilityDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CapabilityName> for String {
    fn from(value: CapabilityName) -> Self {
        value.0
    }
}

/// Name of an operation exposed by a capability.
///
/// Names beginning with `_` are private: they can be constructed but are
/// never reported by operation discovery.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationName(String);

impl OperationName {
    /// Creates a validated operation name.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityDomainError`] when the name is empty or contains
    /// whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, CapabilityDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(CapabilityDomainError::EmptyOperationName);
        }

        if normalized.chars().any(char::is_whitespace) {
            return Err(CapabilityDomainError::InvalidOperationName(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns whether the operation is hidden from discovery.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.0.starts_with('_')
    }

    /// Returns the operation name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OperationName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for OperationName {
    type Error = CapabilityDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OperationName> for String {
    fn from(value: OperationName) -> Self {
        value.0
    }
}

impl PartialEq<str> for OperationName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for OperationName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
