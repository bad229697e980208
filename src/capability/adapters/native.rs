//! Natively linked capabilities and the direct-import strategy.
//!
//! A [`NativeModuleTable`] plays the role of an importable module tree: it
//! maps dotted import paths to factories compiled into the binary.

use crate::capability::{
    domain::{
        Capability, CapabilityDescriptor, OperationError, OperationName, Parameters,
        StrategyKind,
    },
    ports::{ResolutionError, ResolutionResult, ResolutionStrategy},
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type OperationFn = Arc<dyn Fn(&Parameters) -> Result<Value, OperationError> + Send + Sync>;

/// Capability assembled from named Rust closures.
#[derive(Clone, Default)]
pub struct NativeCapability {
    operations: Vec<(OperationName, OperationFn)>,
}

impl NativeCapability {
    /// Creates a capability with no operations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation; a later operation with the same name replaces the
    /// earlier one in place.
    #[must_use]
    pub fn with_operation<F>(mut self, name: OperationName, operation: F) -> Self
    where
        F: Fn(&Parameters) -> Result<Value, OperationError> + Send + Sync + 'static,
    {
        let operation: OperationFn = Arc::new(operation);
        if let Some(slot) = self
            .operations
            .iter_mut()
            .find(|(existing, _)| *existing == name)
        {
            slot.1 = operation;
        } else {
            self.operations.push((name, operation));
        }
        self
    }
}

impl fmt::Debug for NativeCapability {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&OperationName> = self.operations.iter().map(|(name, _)| name).collect();
        formatter
            .debug_struct("NativeCapability")
            .field("operations", &names)
            .finish()
    }
}

impl Capability for NativeCapability {
    fn operations(&self) -> Vec<OperationName> {
        self.operations.iter().map(|(name, _)| name.clone()).collect()
    }

    fn invoke(
        &self,
        operation: &OperationName,
        parameters: &Parameters,
    ) -> Result<Value, OperationError> {
        let (_, function) = self
            .operations
            .iter()
            .find(|(name, _)| name == operation)
            .ok_or_else(|| OperationError::UnknownOperation(operation.clone()))?;
        function(parameters)
    }
}

/// Factory producing a fresh capability instance on import.
pub type CapabilityFactory = Arc<dyn Fn() -> Arc<dyn Capability> + Send + Sync>;

/// Import-path keyed table of natively linked capabilities.
#[derive(Clone, Default)]
pub struct NativeModuleTable {
    modules: HashMap<String, CapabilityFactory>,
}

impl NativeModuleTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under a dotted import path.
    #[must_use]
    pub fn with_module<F>(mut self, import_path: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Capability> + Send + Sync + 'static,
    {
        self.modules.insert(import_path.into(), Arc::new(factory));
        self
    }

    /// Returns whether a module is registered under `import_path`.
    #[must_use]
    pub fn contains(&self, import_path: &str) -> bool {
        self.modules.contains_key(import_path)
    }

    /// Instantiates the module registered under `import_path`.
    #[must_use]
    pub fn import(&self, import_path: &str) -> Option<Arc<dyn Capability>> {
        self.modules.get(import_path).map(|factory| factory())
    }
}

impl fmt::Debug for NativeModuleTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&String> = self.modules.keys().collect();
        paths.sort();
        formatter
            .debug_struct("NativeModuleTable")
            .field("modules", &paths)
            .finish()
    }
}

/// Strategy 1: import a natively linked module by its primary import path.
#[derive(Debug, Clone, Default)]
pub struct DirectImportStrategy {
    table: Arc<NativeModuleTable>,
}

impl DirectImportStrategy {
    /// Creates a strategy over `table`.
    #[must_use]
    pub const fn new(table: Arc<NativeModuleTable>) -> Self {
        Self { table }
    }
}

impl ResolutionStrategy for DirectImportStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectImport
    }

    fn resolve(&self, descriptor: &CapabilityDescriptor) -> ResolutionResult<Arc<dyn Capability>> {
        let import_path = descriptor.locator().import_path();
        self.table.import(import_path).ok_or_else(|| {
            ResolutionError::import_failure(import_path, "no native module under this import path")
        })
    }
}
