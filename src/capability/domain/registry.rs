//! Capability descriptors and the read-only registry built at startup.

use super::{
    CapabilityDomainError, CapabilityName, OperationName, ResourceLocator, UnknownCapabilityError,
};
use std::collections::HashMap;

/// A registered capability: its locator plus the static dispatch tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    name: CapabilityName,
    locator: ResourceLocator,
    default_operation: Option<OperationName>,
    fallback_operations: Vec<OperationName>,
}

impl CapabilityDescriptor {
    /// Creates a descriptor with no default operation and no fallback table.
    #[must_use]
    pub const fn new(name: CapabilityName, locator: ResourceLocator) -> Self {
        Self {
            name,
            locator,
            default_operation: None,
            fallback_operations: Vec::new(),
        }
    }

    /// Sets the entry operation used when callers give no usable hint.
    #[must_use]
    pub fn with_default_operation(mut self, operation: OperationName) -> Self {
        self.default_operation = Some(operation);
        self
    }

    /// Sets the operations a fallback stub exposes for this capability.
    #[must_use]
    pub fn with_fallback_operations(
        mut self,
        operations: impl IntoIterator<Item = OperationName>,
    ) -> Self {
        self.fallback_operations = operations.into_iter().collect();
        self
    }

    /// Returns the capability name.
    #[must_use]
    pub const fn name(&self) -> &CapabilityName {
        &self.name
    }

    /// Returns the resource locator.
    #[must_use]
    pub const fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Returns the default entry operation, if one is configured.
    #[must_use]
    pub const fn default_operation(&self) -> Option<&OperationName> {
        self.default_operation.as_ref()
    }

    /// Returns the fallback operation table (possibly empty).
    #[must_use]
    pub fn fallback_operations(&self) -> &[OperationName] {
        &self.fallback_operations
    }
}

/// Read-only mapping from capability names to descriptors.
///
/// Built once through [`CapabilityRegistryBuilder`]; there is no way to add
/// entries afterwards. Iteration follows registration order.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: Vec<CapabilityDescriptor>,
    index: HashMap<CapabilityName, usize>,
}

impl CapabilityRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// Looks up the resource locator for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCapabilityError`] when `name` was never registered.
    pub fn lookup(&self, name: &str) -> Result<&ResourceLocator, UnknownCapabilityError> {
        self.descriptor(name).map(CapabilityDescriptor::locator)
    }

    /// Looks up the full descriptor for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCapabilityError`] when `name` was never registered.
    pub fn descriptor(&self, name: &str) -> Result<&CapabilityDescriptor, UnknownCapabilityError> {
        let unknown = || UnknownCapabilityError(name.trim().to_owned());
        let validated = CapabilityName::new(name).map_err(|_| unknown())?;
        self.index
            .get(&validated)
            .and_then(|position| self.entries.get(*position))
            .ok_or_else(unknown)
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.descriptor(name).is_ok()
    }

    /// Iterates over registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.entries.iter().map(CapabilityDescriptor::name)
    }

    /// Iterates over descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.entries.iter()
    }

    /// Returns the number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder collecting registrations before the registry is frozen.
#[derive(Debug, Default)]
pub struct CapabilityRegistryBuilder {
    registry: CapabilityRegistry,
}

impl CapabilityRegistryBuilder {
    /// Registers `name` with `locator` and no dispatch tables.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityDomainError::DuplicateCapability`] when `name` is
    /// already registered.
    pub fn register(
        self,
        name: CapabilityName,
        locator: ResourceLocator,
    ) -> Result<Self, CapabilityDomainError> {
        self.register_descriptor(CapabilityDescriptor::new(name, locator))
    }

    /// Registers a complete descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityDomainError::DuplicateCapability`] when the name
    /// is already registered.
    pub fn register_descriptor(
        mut self,
        descriptor: CapabilityDescriptor,
    ) -> Result<Self, CapabilityDomainError> {
        if self.registry.index.contains_key(descriptor.name()) {
            return Err(CapabilityDomainError::DuplicateCapability(
                descriptor.name().to_string(),
            ));
        }

        let position = self.registry.entries.len();
        self.registry
            .index
            .insert(descriptor.name().clone(), position);
        self.registry.entries.push(descriptor);
        Ok(self)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> CapabilityRegistry {
        self.registry
    }
}
