//! Loader port: one way of turning a descriptor into a capability.

use crate::capability::domain::{Capability, CapabilityDescriptor, StrategyKind};
use std::sync::Arc;
use thiserror::Error;

/// Result type for resolution strategies.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// A single resolution strategy in the resolver pipeline.
///
/// Strategies are synchronous: they may read files and compile modules on
/// the calling thread.
#[cfg_attr(test, mockall::automock)]
pub trait ResolutionStrategy: Send + Sync {
    /// Returns which pipeline stage this strategy implements.
    fn kind(&self) -> StrategyKind;

    /// Attempts to load the capability described by `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when this strategy cannot produce a
    /// capability; the pipeline then falls through to the next strategy.
    fn resolve(&self, descriptor: &CapabilityDescriptor) -> ResolutionResult<Arc<dyn Capability>>;
}

/// Errors returned by resolution strategies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// The module could not be imported by path or bare name.
    #[error("cannot import '{module}': {reason}")]
    ImportFailure {
        /// Import path or bare module name that was tried.
        module: String,
        /// Reason string.
        reason: String,
    },

    /// No source artifact is registered or the file does not exist.
    #[error("source artifact unavailable: {0}")]
    SourceUnavailable(String),

    /// Runtime compilation of source artifacts is switched off.
    #[error("source execution is disabled by configuration")]
    SourceExecutionDisabled,

    /// A module was found but does not satisfy the walker module contract.
    #[error("invalid module '{module}': {reason}")]
    InvalidModule {
        /// Path of the offending module.
        module: String,
        /// Reason string.
        reason: String,
    },
}

impl ResolutionError {
    /// Creates an import failure.
    pub fn import_failure(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::ImportFailure {
            module: module.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an invalid-module error.
    pub fn invalid_module(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidModule {
            module: module.into(),
            reason: reason.to_string(),
        }
    }
}
