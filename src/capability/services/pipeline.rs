//! Ordered resolution pipeline.

use crate::capability::{
    domain::{
        CapabilityDescriptor, CapabilityHandle, Resolution, ResolutionAttempt, ResolutionFailure,
        ResolutionOutcome, StrategyKind,
    },
    ports::ResolutionStrategy,
};
use mockable::Clock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Runs resolution strategies in order and stops at the first success.
pub struct ResolverPipeline<C>
where
    C: Clock + Send + Sync,
{
    strategies: Vec<Arc<dyn ResolutionStrategy>>,
    clock: Arc<C>,
    runs: AtomicU64,
}

impl<C> ResolverPipeline<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a pipeline over `strategies`, tried in the given order.
    #[must_use]
    pub const fn new(strategies: Vec<Arc<dyn ResolutionStrategy>>, clock: Arc<C>) -> Self {
        Self {
            strategies,
            clock,
            runs: AtomicU64::new(0),
        }
    }

    /// Returns the strategy kinds in pipeline order.
    #[must_use]
    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|strategy| strategy.kind()).collect()
    }

    /// Returns how many times the pipeline has run.
    #[must_use]
    pub fn resolution_count(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Resolves `descriptor` to exactly one outcome.
    ///
    /// Every failed strategy is logged and kept as a [`ResolutionAttempt`].
    /// The outcome is `Failed` only when no strategy succeeds.
    pub fn resolve(&self, descriptor: &CapabilityDescriptor) -> Resolution {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let name = descriptor.name();
        let mut attempts = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            match strategy.resolve(descriptor) {
                Ok(capability) => {
                    let outcome =
                        ResolutionOutcome::from_strategy(kind, CapabilityHandle::new(capability));
                    if outcome.is_fallback() {
                        tracing::warn!(capability = %name, "using fallback stub");
                    } else {
                        tracing::info!(capability = %name, strategy = %kind, "capability loaded");
                    }
                    return Resolution::new(outcome, attempts, self.clock.utc());
                }
                Err(err) => {
                    tracing::warn!(
                        capability = %name,
                        strategy = %kind,
                        error = %err,
                        "resolution strategy failed"
                    );
                    attempts.push(ResolutionAttempt::failed(kind, err));
                }
            }
        }

        tracing::error!(capability = %name, "every resolution strategy failed");
        let failure = ResolutionFailure::new(name.clone(), attempts.clone());
        Resolution::new(
            ResolutionOutcome::Failed(failure),
            attempts,
            self.clock.utc(),
        )
    }
}

impl<C> fmt::Debug for ResolverPipeline<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResolverPipeline")
            .field("strategies", &self.strategy_kinds())
            .field("runs", &self.resolution_count())
            .finish_non_exhaustive()
    }
}
