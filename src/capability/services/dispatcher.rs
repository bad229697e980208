//! Operation selection and invocation.

use super::{CapabilityCache, CapabilityResult, InvocationError};
use crate::capability::domain::{
    CapabilityDescriptor, CapabilityHandle, CapabilityName, InvocationResult, OperationName,
    Parameters, ResolutionOutcome,
};
use mockable::Clock;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single invocation.
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point used by the web layer to run capability operations.
pub struct Dispatcher<C>
where
    C: Clock + Send + Sync,
{
    cache: Arc<CapabilityCache<C>>,
    timeout: Duration,
}

impl<C> Clone for Dispatcher<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            timeout: self.timeout,
        }
    }
}

impl<C> Dispatcher<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates a dispatcher over `cache` with the default timeout.
    #[must_use]
    pub const fn new(cache: Arc<CapabilityCache<C>>) -> Self {
        Self {
            cache,
            timeout: DEFAULT_INVOCATION_TIMEOUT,
        }
    }

    /// Sets the bound on a single invocation.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the cache behind this dispatcher.
    #[must_use]
    pub fn cache(&self) -> &CapabilityCache<C> {
        &self.cache
    }

    /// Lists the operations of `name`, resolving it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError`](super::CapabilityError) when the name is
    /// unknown or resolution failed.
    pub fn operations(&self, name: &str) -> CapabilityResult<Vec<OperationName>> {
        Ok(self.cache.get_or_resolve(name)?.operations().to_vec())
    }

    /// Resolves `name`, selects an operation and runs it.
    ///
    /// Only an unregistered name is reported as `Err`. Every other failure,
    /// including panics and timeouts inside the operation, becomes an error
    /// [`InvocationResult`].
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownCapability`](super::CapabilityError::UnknownCapability)
    /// when `name` was never registered.
    pub async fn invoke(
        &self,
        name: &str,
        operation_hint: Option<&str>,
        parameters: Parameters,
    ) -> CapabilityResult<InvocationResult> {
        let descriptor = self.cache.registry().descriptor(name)?.clone();
        let capability_name = descriptor.name().clone();
        tracing::debug!(capability = %capability_name, state = "resolving", "dispatch started");

        let cache = Arc::clone(&self.cache);
        let hint = operation_hint.map(str::to_owned);
        let task = tokio::task::spawn_blocking(move || {
            run_invocation(&cache, &descriptor, hint.as_deref(), &parameters)
        });

        let result = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                let reason = if join_error.is_panic() {
                    panic_message(&*join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                failed(&capability_name, &InvocationError::Panicked(reason))
            }
            Err(_) => failed(&capability_name, &InvocationError::TimedOut(self.timeout)),
        };
        Ok(result)
    }
}

/// Picks the operation to run.
///
/// The hint wins when the handle exposes it, then the descriptor's default,
/// then the first discovered operation.
#[must_use]
pub fn select_operation(
    handle: &CapabilityHandle,
    descriptor: &CapabilityDescriptor,
    hint: Option<&str>,
) -> Option<OperationName> {
    let exposed = |candidate: &str| {
        handle
            .operations()
            .iter()
            .find(|operation| *operation == candidate)
            .cloned()
    };

    hint.and_then(exposed)
        .or_else(|| {
            descriptor
                .default_operation()
                .and_then(|operation| exposed(operation.as_str()))
        })
        .or_else(|| handle.operations().first().cloned())
}

fn run_invocation<C>(
    cache: &CapabilityCache<C>,
    descriptor: &CapabilityDescriptor,
    hint: Option<&str>,
    parameters: &Parameters,
) -> InvocationResult
where
    C: Clock + Send + Sync,
{
    let name = descriptor.name();
    let resolution = match cache.resolve(name.as_str()) {
        Ok(resolution) => resolution,
        Err(err) => return InvocationResult::error(name.clone(), err.to_string()),
    };

    let handle = match resolution.outcome() {
        ResolutionOutcome::Failed(failure) => {
            return failed(name, &InvocationError::Unresolved(failure.clone()));
        }
        ResolutionOutcome::LoadedViaFallback(handle) => {
            tracing::debug!(capability = %name, state = "degraded", "resolved to fallback stub");
            handle
        }
        ResolutionOutcome::Loaded(handle) | ResolutionOutcome::LoadedViaSource(handle) => {
            tracing::debug!(capability = %name, state = "resolved", "capability resolved");
            handle
        }
    };

    tracing::debug!(capability = %name, state = "selecting_operation", hint, "selecting operation");
    let Some(operation) = select_operation(handle, descriptor, hint) else {
        return failed(name, &InvocationError::NoOperationAvailable(name.clone()));
    };

    tracing::debug!(capability = %name, state = "invoking", operation = %operation, "invoking operation");
    match handle.capability().invoke(&operation, parameters) {
        Ok(data) => {
            tracing::debug!(capability = %name, state = "succeeded", operation = %operation, "operation succeeded");
            InvocationResult::success(name.clone(), operation, data)
        }
        Err(err) => failed(name, &InvocationError::from(err)),
    }
}

fn failed(name: &CapabilityName, error: &InvocationError) -> InvocationResult {
    tracing::warn!(capability = %name, state = "invocation_failed", error = %error, "invocation failed");
    InvocationResult::error(name.clone(), error.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
