//! Resolution outcomes, per-strategy diagnostics, and health states.

use super::{CapabilityHandle, CapabilityName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The four resolution strategies, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Load a natively linked module by its import path.
    DirectImport,
    /// Search the module search path for a precompiled module.
    PathImport,
    /// Compile the registered source artifact at runtime.
    SourceExecution,
    /// Synthesise a degraded stub.
    Fallback,
}

impl StrategyKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectImport => "direct_import",
            Self::PathImport => "path_import",
            Self::SourceExecution => "source_execution",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A failed strategy attempt kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionAttempt {
    strategy: StrategyKind,
    error: String,
}

impl ResolutionAttempt {
    /// Records that `strategy` failed with `error`.
    #[must_use]
    pub fn failed(strategy: StrategyKind, error: impl fmt::Display) -> Self {
        Self {
            strategy,
            error: error.to_string(),
        }
    }

    /// Returns the strategy that failed.
    #[must_use]
    pub const fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Returns the failure description.
    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }
}

/// Error recorded when every strategy failed for a capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("all resolution strategies failed for capability '{name}'")]
pub struct ResolutionFailure {
    name: CapabilityName,
    attempts: Vec<ResolutionAttempt>,
}

impl ResolutionFailure {
    /// Creates a failure from the attempts made.
    #[must_use]
    pub const fn new(name: CapabilityName, attempts: Vec<ResolutionAttempt>) -> Self {
        Self { name, attempts }
    }

    /// Returns the capability name.
    #[must_use]
    pub const fn name(&self) -> &CapabilityName {
        &self.name
    }

    /// Returns every failed attempt.
    #[must_use]
    pub fn attempts(&self) -> &[ResolutionAttempt] {
        &self.attempts
    }
}

/// Discriminant of a [`ResolutionOutcome`], used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Resolved through an import strategy.
    Loaded,
    /// Resolved by compiling the source artifact.
    LoadedViaSource,
    /// Resolved to a fallback stub.
    LoadedViaFallback,
    /// No strategy produced a handle.
    Failed,
}

/// The single result of one resolution attempt for a capability.
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// Loaded by direct or path-injected import.
    Loaded(CapabilityHandle),
    /// Loaded by compiling the source artifact.
    LoadedViaSource(CapabilityHandle),
    /// Synthesised fallback stub.
    LoadedViaFallback(CapabilityHandle),
    /// Every strategy failed.
    Failed(ResolutionFailure),
}

impl ResolutionOutcome {
    /// Wraps a handle according to the strategy that produced it.
    #[must_use]
    pub const fn from_strategy(strategy: StrategyKind, handle: CapabilityHandle) -> Self {
        match strategy {
            StrategyKind::DirectImport | StrategyKind::PathImport => Self::Loaded(handle),
            StrategyKind::SourceExecution => Self::LoadedViaSource(handle),
            StrategyKind::Fallback => Self::LoadedViaFallback(handle),
        }
    }

    /// Returns the outcome discriminant.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Loaded(_) => OutcomeKind::Loaded,
            Self::LoadedViaSource(_) => OutcomeKind::LoadedViaSource,
            Self::LoadedViaFallback(_) => OutcomeKind::LoadedViaFallback,
            Self::Failed(_) => OutcomeKind::Failed,
        }
    }

    /// Returns the handle unless resolution failed.
    #[must_use]
    pub const fn handle(&self) -> Option<&CapabilityHandle> {
        match self {
            Self::Loaded(handle) | Self::LoadedViaSource(handle) | Self::LoadedViaFallback(handle) => {
                Some(handle)
            }
            Self::Failed(_) => None,
        }
    }

    /// Returns whether the outcome is a degraded fallback stub.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::LoadedViaFallback(_))
    }

    /// Maps the outcome onto the tri-state health model.
    #[must_use]
    pub const fn health(&self) -> CapabilityHealth {
        match self {
            Self::Loaded(_) | Self::LoadedViaSource(_) => CapabilityHealth::Healthy,
            Self::LoadedViaFallback(_) => CapabilityHealth::Degraded,
            Self::Failed(_) => CapabilityHealth::Failed,
        }
    }
}

/// A cached resolution: the outcome plus how and when it was reached.
#[derive(Debug, Clone)]
pub struct Resolution {
    outcome: ResolutionOutcome,
    attempts: Vec<ResolutionAttempt>,
    resolved_at: DateTime<Utc>,
}

impl Resolution {
    /// Creates a resolution record.
    #[must_use]
    pub const fn new(
        outcome: ResolutionOutcome,
        attempts: Vec<ResolutionAttempt>,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            outcome,
            attempts,
            resolved_at,
        }
    }

    /// Returns the outcome.
    #[must_use]
    pub const fn outcome(&self) -> &ResolutionOutcome {
        &self.outcome
    }

    /// Returns strategies that failed before the authoritative one.
    #[must_use]
    pub fn attempts(&self) -> &[ResolutionAttempt] {
        &self.attempts
    }

    /// Returns when the pipeline produced this resolution.
    #[must_use]
    pub const fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

/// Health of a capability as reported to the web layer.
///
/// `Degraded` separates fallback stubs from fully working capabilities;
/// the boolean view treats both as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityHealth {
    /// Resolved to a real implementation.
    Healthy,
    /// Resolved to a fallback stub.
    Degraded,
    /// Resolution failed.
    Failed,
    /// Not resolved yet.
    Unresolved,
}

impl CapabilityHealth {
    /// Returns whether a usable handle is cached.
    #[must_use]
    pub const fn is_present(self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}
