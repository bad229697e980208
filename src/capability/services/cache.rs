//! Memoised resolution per capability name.
//!
//! The cache owns one slot per registered name. Slots are created up front
//! from the frozen registry, so the map itself is never mutated and only the
//! per-name mutex is taken on lookup. The first caller for a name runs the
//! pipeline while holding that name's lock; concurrent callers for the same
//! name wait and then observe the cached resolution.

use super::{CapabilityError, CapabilityResult, ResolverPipeline};
use crate::capability::domain::{
    CapabilityDescriptor, CapabilityHandle, CapabilityHealth, CapabilityName, CapabilityRegistry,
    OutcomeKind, Resolution, ResolutionAttempt, ResolutionOutcome,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot = Mutex<Option<Resolution>>;

/// Process-wide memo of resolution outcomes, constructed explicitly.
pub struct CapabilityCache<C>
where
    C: Clock + Send + Sync,
{
    registry: Arc<CapabilityRegistry>,
    pipeline: Arc<ResolverPipeline<C>>,
    slots: HashMap<CapabilityName, Slot>,
}

impl<C> CapabilityCache<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty cache for every name in `registry`.
    #[must_use]
    pub fn new(registry: Arc<CapabilityRegistry>, pipeline: Arc<ResolverPipeline<C>>) -> Self {
        let slots = registry
            .names()
            .map(|name| (name.clone(), Mutex::new(None)))
            .collect();
        Self {
            registry,
            pipeline,
            slots,
        }
    }

    /// Returns the registry this cache resolves against.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Returns the pipeline used for resolution.
    #[must_use]
    pub fn pipeline(&self) -> &ResolverPipeline<C> {
        &self.pipeline
    }

    /// Returns the cached resolution for `name`, running the pipeline once
    /// if nothing is cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownCapability`] for unregistered names;
    /// the cache is left untouched in that case.
    pub fn resolve(&self, name: &str) -> CapabilityResult<Resolution> {
        let descriptor = self.registry.descriptor(name)?;
        Ok(self.resolve_descriptor(descriptor))
    }

    /// Returns a handle for `name`, resolving it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownCapability`] for unregistered names
    /// and [`CapabilityError::ResolutionFailed`] when the cached outcome is
    /// `Failed`.
    pub fn get_or_resolve(&self, name: &str) -> CapabilityResult<CapabilityHandle> {
        match self.resolve(name)?.outcome() {
            ResolutionOutcome::Failed(failure) => {
                Err(CapabilityError::ResolutionFailed(failure.clone()))
            }
            ResolutionOutcome::Loaded(handle)
            | ResolutionOutcome::LoadedViaSource(handle)
            | ResolutionOutcome::LoadedViaFallback(handle) => Ok(handle.clone()),
        }
    }

    /// Returns the cached outcome for `name` without resolving.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<ResolutionOutcome> {
        let descriptor = self.registry.descriptor(name).ok()?;
        self.cached(descriptor.name())
            .map(|resolution| resolution.outcome().clone())
    }

    /// Re-runs the pipeline for every registered name and swaps each entry.
    ///
    /// Handles obtained before the reload stay valid; later lookups see the
    /// new outcome. A name whose strategy panics keeps its previous entry and
    /// is left out of the report; the remaining names still reload.
    pub fn reload(&self) -> ReloadReport {
        tracing::info!(total = self.registry.len(), "reloading capabilities");
        let mut outcomes = BTreeMap::new();
        for descriptor in self.registry.descriptors() {
            let Some(slot) = self.slots.get(descriptor.name()) else {
                continue;
            };
            let mut guard = lock_slot(slot);
            let attempt =
                panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.resolve(descriptor)));
            let Ok(resolution) = attempt else {
                tracing::error!(capability = %descriptor.name(), "resolution panicked during reload");
                continue;
            };
            outcomes.insert(descriptor.name().clone(), resolution.outcome().kind());
            *guard = Some(resolution);
        }

        let report = ReloadReport { outcomes };
        tracing::info!(
            loaded = report.loaded_count(),
            total = report.total(),
            "capability reload complete"
        );
        report
    }

    /// Reports, per registered name, whether a usable handle exists.
    ///
    /// Unresolved names are resolved first. Fallback stubs count as present.
    #[must_use]
    pub fn health(&self) -> BTreeMap<CapabilityName, bool> {
        self.registry
            .descriptors()
            .map(|descriptor| {
                let resolution = self.resolve_descriptor(descriptor);
                (
                    descriptor.name().clone(),
                    resolution.outcome().health().is_present(),
                )
            })
            .collect()
    }

    /// Reports the cached health of every registered name without resolving.
    #[must_use]
    pub fn health_report(&self) -> HealthReport {
        let entries: Vec<HealthEntry> = self
            .registry
            .names()
            .map(|name| match self.cached(name) {
                Some(resolution) => HealthEntry {
                    name: name.clone(),
                    health: resolution.outcome().health(),
                    outcome: Some(resolution.outcome().kind()),
                    attempts: resolution.attempts().to_vec(),
                    resolved_at: Some(resolution.resolved_at()),
                },
                None => HealthEntry {
                    name: name.clone(),
                    health: CapabilityHealth::Unresolved,
                    outcome: None,
                    attempts: Vec::new(),
                    resolved_at: None,
                },
            })
            .collect();

        let report = HealthReport { entries };
        tracing::info!(
            loaded = report.present_count(),
            total = report.entries.len(),
            "capability health check"
        );
        report
    }

    /// Lists names with a cached, non-failed outcome.
    #[must_use]
    pub fn loaded(&self) -> Vec<(CapabilityName, OutcomeKind)> {
        self.registry
            .names()
            .filter_map(|name| {
                let kind = self.cached(name)?.outcome().kind();
                (kind != OutcomeKind::Failed).then(|| (name.clone(), kind))
            })
            .collect()
    }

    fn resolve_descriptor(&self, descriptor: &CapabilityDescriptor) -> Resolution {
        let Some(slot) = self.slots.get(descriptor.name()) else {
            return self.pipeline.resolve(descriptor);
        };

        let mut guard = lock_slot(slot);
        if let Some(resolution) = guard.as_ref() {
            return resolution.clone();
        }

        let resolution = self.pipeline.resolve(descriptor);
        *guard = Some(resolution.clone());
        resolution
    }

    fn cached(&self, name: &CapabilityName) -> Option<Resolution> {
        self.slots
            .get(name)
            .and_then(|slot| lock_slot(slot).clone())
    }
}

// A panic inside a strategy leaves the slot empty, so the poisoned value is
// still consistent and the next caller simply resolves again.
fn lock_slot(slot: &Slot) -> MutexGuard<'_, Option<Resolution>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome kinds produced by [`CapabilityCache::reload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    outcomes: BTreeMap<CapabilityName, OutcomeKind>,
}

impl ReloadReport {
    /// Returns the outcome kind per name.
    #[must_use]
    pub const fn outcomes(&self) -> &BTreeMap<CapabilityName, OutcomeKind> {
        &self.outcomes
    }

    /// Returns how many names resolved to a usable handle.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|kind| **kind != OutcomeKind::Failed)
            .count()
    }

    /// Returns how many names were reloaded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Health of a single capability with its resolution diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthEntry {
    /// Capability name.
    pub name: CapabilityName,
    /// Tri-state health.
    pub health: CapabilityHealth,
    /// Outcome kind, when resolved.
    pub outcome: Option<OutcomeKind>,
    /// Strategies that failed before the outcome was reached.
    pub attempts: Vec<ResolutionAttempt>,
    /// When the cached resolution was produced.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Snapshot of every registered capability's health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    entries: Vec<HealthEntry>,
}

impl HealthReport {
    /// Returns entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[HealthEntry] {
        &self.entries
    }

    /// Returns the entry for `name`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&HealthEntry> {
        self.entries.iter().find(|entry| entry.name.as_str() == name)
    }

    /// Counts healthy and degraded capabilities.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.health.is_present())
            .count()
    }
}
