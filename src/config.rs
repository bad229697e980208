//! Loader configuration and runtime assembly.
//!
//! Configuration is a JSON document read through `cap-std`. A representative
//! file is:
//!
//! ```json
//! {
//!   "artifact_dir": "walkers",
//!   "module_search_path": ["/opt/walkers/lib"],
//!   "source_execution": false,
//!   "fallback_stubs": true,
//!   "invocation_timeout_ms": 30000
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file. When
//! `capabilities` is omitted the reference deployment is registered.

use crate::capability::{
    adapters::{
        DirectImportStrategy, FallbackStrategy, NativeModuleTable, SearchPathStrategy,
        SourceStrategy, WalkerEngine, wasm::EngineError,
    },
    domain::{
        CapabilityDescriptor, CapabilityDomainError, CapabilityName, CapabilityRegistry,
        OperationName, ResourceLocator, WALKER_IMPORT_PREFIX, WALKER_SOURCE_EXTENSION,
        reference_registry,
    },
    ports::ResolutionStrategy,
    services::{CapabilityCache, Dispatcher, ResolverPipeline},
};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use camino::{Utf8Path, Utf8PathBuf};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ARTIFACT_DIR: &str = "walkers";
const DEFAULT_INVOCATION_TIMEOUT_MS: u64 = 30_000;

/// Errors raised while loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid JSON for [`LoaderConfig`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A capability entry failed validation.
    #[error(transparent)]
    Domain(#[from] CapabilityDomainError),

    /// The wasm engine could not be started.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The invocation timeout must be positive.
    #[error("invocation_timeout_ms must be greater than zero")]
    ZeroTimeout,
}

/// One capability entry overriding the reference deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityConfig {
    /// Capability name.
    pub name: String,
    /// Dotted import path; defaults to `walkers.<name>`.
    #[serde(default)]
    pub import_path: Option<String>,
    /// Source artifact; defaults to `<artifact_dir>/<name>.wat`.
    #[serde(default)]
    pub source: Option<Utf8PathBuf>,
    /// Entry operation used when a caller gives no usable hint.
    #[serde(default)]
    pub default_operation: Option<String>,
    /// Operations exposed by the fallback stub.
    #[serde(default)]
    pub fallback_operations: Vec<String>,
}

impl CapabilityConfig {
    fn descriptor(&self, artifact_dir: &Utf8Path) -> Result<CapabilityDescriptor, ConfigError> {
        let name = CapabilityName::new(self.name.as_str())?;
        let import_path = self
            .import_path
            .clone()
            .unwrap_or_else(|| format!("{WALKER_IMPORT_PREFIX}.{name}"));
        let source = self.source.as_ref().map_or_else(
            || artifact_dir.join(format!("{name}.{WALKER_SOURCE_EXTENSION}")),
            |path| artifact_dir.join(path),
        );
        let locator = ResourceLocator::new(import_path)?.with_source_path(source);
        let fallback = self
            .fallback_operations
            .iter()
            .map(|operation| OperationName::new(operation.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let descriptor = CapabilityDescriptor::new(name, locator).with_fallback_operations(fallback);
        Ok(match &self.default_operation {
            Some(operation) => {
                descriptor.with_default_operation(OperationName::new(operation.as_str())?)
            }
            None => descriptor,
        })
    }
}

/// Settings for the capability loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Directory holding walker source artifacts.
    pub artifact_dir: Utf8PathBuf,
    /// Extra directories searched for precompiled modules.
    pub module_search_path: Vec<Utf8PathBuf>,
    /// Allows compiling source artifacts at runtime.
    pub source_execution: bool,
    /// Appends the fallback stub strategy to the pipeline.
    pub fallback_stubs: bool,
    /// Bound on a single invocation, in milliseconds.
    pub invocation_timeout_ms: u64,
    /// Capability entries replacing the reference deployment.
    pub capabilities: Option<Vec<CapabilityConfig>>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            artifact_dir: Utf8PathBuf::from(DEFAULT_ARTIFACT_DIR),
            module_search_path: Vec::new(),
            source_execution: false,
            fallback_stubs: true,
            invocation_timeout_ms: DEFAULT_INVOCATION_TIMEOUT_MS,
            capabilities: None,
        }
    }
}

impl LoaderConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed or
    /// validated.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let io_error = |source: io::Error| ConfigError::Io {
            path: path.to_owned(),
            source,
        };
        let base_dir = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| io_error(io::Error::new(io::ErrorKind::InvalidInput, "not a file")))?;

        let contents = Dir::open_ambient_dir(base_dir, ambient_authority())
            .and_then(|dir| dir.read_to_string(file_name))
            .map_err(io_error)?;
        let parsed = Self::from_json(&contents)?;
        Ok(parsed.relative_to(base_dir))
    }

    /// Parses and validates configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text is malformed or invalid.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.invocation_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Resolves relative directories against `base_dir`.
    #[must_use]
    pub fn relative_to(mut self, base_dir: &Utf8Path) -> Self {
        self.artifact_dir = base_dir.join(&self.artifact_dir);
        self.module_search_path = self
            .module_search_path
            .iter()
            .map(|dir| base_dir.join(dir))
            .collect();
        self
    }

    /// Returns the invocation timeout.
    #[must_use]
    pub const fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }

    /// Builds the frozen capability registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Domain`] for invalid or duplicate entries.
    pub fn registry(&self) -> Result<CapabilityRegistry, ConfigError> {
        let Some(entries) = &self.capabilities else {
            return Ok(reference_registry(&self.artifact_dir)?);
        };

        let builder = entries
            .iter()
            .try_fold(CapabilityRegistry::builder(), |builder, entry| {
                let descriptor = entry.descriptor(&self.artifact_dir)?;
                Ok::<_, ConfigError>(builder.register_descriptor(descriptor)?)
            })?;
        Ok(builder.build())
    }

    /// Builds the resolution pipeline in strategy order.
    ///
    /// Wasm walkers share one engine whose execution deadline matches the
    /// invocation timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Engine`] when the wasm engine cannot start.
    pub fn pipeline<C>(
        &self,
        natives: Arc<NativeModuleTable>,
        clock: Arc<C>,
    ) -> Result<ResolverPipeline<C>, ConfigError>
    where
        C: Clock + Send + Sync + 'static,
    {
        let engine = WalkerEngine::new(self.invocation_timeout())?;
        let mut strategies: Vec<Arc<dyn ResolutionStrategy>> = vec![
            Arc::new(DirectImportStrategy::new(natives)),
            Arc::new(SearchPathStrategy::new(
                engine.clone(),
                self.module_search_path.clone(),
            )),
            Arc::new(SourceStrategy::new(engine, self.source_execution)),
        ];
        if self.fallback_stubs {
            strategies.push(Arc::new(FallbackStrategy::new(Arc::clone(&clock))));
        }
        Ok(ResolverPipeline::new(strategies, clock))
    }

    /// Assembles registry, pipeline, cache and dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the registry or the wasm engine cannot be
    /// built.
    pub fn dispatcher<C>(
        &self,
        natives: Arc<NativeModuleTable>,
        clock: Arc<C>,
    ) -> Result<Dispatcher<C>, ConfigError>
    where
        C: Clock + Send + Sync + 'static,
    {
        let registry = Arc::new(self.registry()?);
        let pipeline = Arc::new(self.pipeline(natives, clock)?);
        let cache = Arc::new(CapabilityCache::new(registry, pipeline));
        Ok(Dispatcher::new(cache).with_timeout(self.invocation_timeout()))
    }
}
