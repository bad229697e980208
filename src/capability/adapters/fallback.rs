//! Strategy 4: synthesised stubs that keep the system operable when every
//! real loading strategy failed.

use crate::capability::{
    domain::{
        Capability, CapabilityDescriptor, CapabilityName, OperationError, OperationName,
        Parameters, StrategyKind,
    },
    ports::{ResolutionResult, ResolutionStrategy},
};
use mockable::Clock;
use serde_json::{Value, json};
use std::sync::Arc;

/// Operation exposed when a descriptor has no fallback table.
pub const DEFAULT_FALLBACK_OPERATION: &str = "execute";

/// Status marker placed in every stub response.
pub const FALLBACK_STATUS: &str = "fallback";

/// Non-functional capability echoing each call back as a degraded result.
pub struct FallbackCapability<C>
where
    C: Clock + Send + Sync,
{
    name: CapabilityName,
    operations: Vec<OperationName>,
    clock: Arc<C>,
}

impl<C> FallbackCapability<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a stub for `descriptor`.
    ///
    /// # Errors
    ///
    /// Never fails for a valid descriptor; the default operation name is a
    /// static constant that always validates.
    pub fn for_descriptor(
        descriptor: &CapabilityDescriptor,
        clock: Arc<C>,
    ) -> Result<Self, OperationError> {
        let operations = if descriptor.fallback_operations().is_empty() {
            vec![OperationName::new(DEFAULT_FALLBACK_OPERATION).map_err(OperationError::failed)?]
        } else {
            descriptor.fallback_operations().to_vec()
        };

        Ok(Self {
            name: descriptor.name().clone(),
            operations,
            clock,
        })
    }
}

impl<C> Capability for FallbackCapability<C>
where
    C: Clock + Send + Sync,
{
    fn operations(&self) -> Vec<OperationName> {
        self.operations.clone()
    }

    fn invoke(
        &self,
        operation: &OperationName,
        parameters: &Parameters,
    ) -> Result<Value, OperationError> {
        if !self.operations.contains(operation) {
            return Err(OperationError::UnknownOperation(operation.clone()));
        }

        Ok(json!({
            "status": FALLBACK_STATUS,
            "capability": self.name,
            "operation": operation,
            "message": format!(
                "Capability {} is running in fallback mode (degraded)",
                self.name
            ),
            "parameters": parameters,
            "timestamp": self.clock.utc().to_rfc3339(),
        }))
    }
}

/// Terminal strategy producing a [`FallbackCapability`]; never fails.
pub struct FallbackStrategy<C>
where
    C: Clock + Send + Sync,
{
    clock: Arc<C>,
}

impl<C> FallbackStrategy<C>
where
    C: Clock + Send + Sync,
{
    /// Creates the strategy.
    #[must_use]
    pub const fn new(clock: Arc<C>) -> Self {
        Self { clock }
    }
}

impl<C> ResolutionStrategy for FallbackStrategy<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    fn resolve(&self, descriptor: &CapabilityDescriptor) -> ResolutionResult<Arc<dyn Capability>> {
        let stub = FallbackCapability::for_descriptor(descriptor, Arc::clone(&self.clock))
            .map_err(|err| {
                crate::capability::ports::ResolutionError::invalid_module(
                    descriptor.name().as_str(),
                    err,
                )
            })?;
        Ok(Arc::new(stub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::domain::ResourceLocator;
    use mockable::DefaultClock;

    fn descriptor(fallback: &[&str]) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            CapabilityName::new("motivator").expect("valid name"),
            ResourceLocator::new("walkers.motivator").expect("valid locator"),
        )
        .with_fallback_operations(
            fallback
                .iter()
                .map(|name| OperationName::new(*name).expect("valid operation")),
        )
    }

    #[test]
    fn stub_exposes_fallback_table() {
        let strategy = FallbackStrategy::new(Arc::new(DefaultClock));
        let stub = strategy
            .resolve(&descriptor(&["generate_motivational_message", "track_achievements"]))
            .expect("fallback never fails");

        let names: Vec<String> = stub.operations().into_iter().map(String::from).collect();
        assert_eq!(names, ["generate_motivational_message", "track_achievements"]);
    }

    #[test]
    fn stub_without_table_exposes_execute() {
        let strategy = FallbackStrategy::new(Arc::new(DefaultClock));
        let stub = strategy
            .resolve(&descriptor(&[]))
            .expect("fallback never fails");

        let names: Vec<String> = stub.operations().into_iter().map(String::from).collect();
        assert_eq!(names, [DEFAULT_FALLBACK_OPERATION]);
    }

    #[test]
    fn stub_echoes_operation_and_parameters() {
        let strategy = FallbackStrategy::new(Arc::new(DefaultClock));
        let stub = strategy
            .resolve(&descriptor(&["create_encouragement"]))
            .expect("fallback never fails");
        let mut parameters = Parameters::new();
        parameters.insert("x".to_owned(), json!(1));

        let response = stub
            .invoke(
                &OperationName::new("create_encouragement").expect("valid operation"),
                &parameters,
            )
            .expect("stub operations succeed");

        assert_eq!(response["status"], FALLBACK_STATUS);
        assert_eq!(response["operation"], "create_encouragement");
        assert_eq!(response["parameters"], json!({"x": 1}));
        let message = response["message"].as_str().expect("message is a string");
        assert!(message.contains("fallback"));
    }
}
