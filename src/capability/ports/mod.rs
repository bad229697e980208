//! Port contracts for capability resolution.

mod strategy;

#[cfg(test)]
pub use strategy::MockResolutionStrategy;
pub use strategy::{ResolutionError, ResolutionResult, ResolutionStrategy};
