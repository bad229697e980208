//! Strategies 2 and 3: loading walker modules from the filesystem.

use super::{WalkerEngine, WasmCapability};
use crate::capability::{
    domain::{Capability, CapabilityDescriptor, StrategyKind},
    ports::{ResolutionError, ResolutionResult, ResolutionStrategy},
};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use std::sync::Arc;

/// File extension of precompiled walker modules.
pub const MODULE_EXTENSION: &str = "wasm";

fn open_ambient_dir(path: &Utf8Path) -> io::Result<Dir> {
    Dir::open_ambient_dir(path, ambient_authority())
}

/// Strategy 2: search the artifact directory, then the configured module
/// search path, for `<bare_name>.wasm`.
#[derive(Clone)]
pub struct SearchPathStrategy {
    engine: WalkerEngine,
    search_path: Vec<Utf8PathBuf>,
}

impl SearchPathStrategy {
    /// Creates a strategy searching `search_path` after each locator's own
    /// directory.
    #[must_use]
    pub const fn new(engine: WalkerEngine, search_path: Vec<Utf8PathBuf>) -> Self {
        Self {
            engine,
            search_path,
        }
    }

    fn candidate_dirs<'a>(
        &'a self,
        descriptor: &'a CapabilityDescriptor,
    ) -> impl Iterator<Item = &'a Utf8Path> {
        descriptor
            .locator()
            .source_dir()
            .into_iter()
            .chain(self.search_path.iter().map(Utf8PathBuf::as_path))
    }
}

impl ResolutionStrategy for SearchPathStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PathImport
    }

    fn resolve(&self, descriptor: &CapabilityDescriptor) -> ResolutionResult<Arc<dyn Capability>> {
        let bare_name = descriptor.locator().bare_name();
        let file_name = format!("{bare_name}.{MODULE_EXTENSION}");

        for dir_path in self.candidate_dirs(descriptor) {
            let Ok(dir) = open_ambient_dir(dir_path) else {
                tracing::trace!(dir = %dir_path, "search path entry is not a readable directory");
                continue;
            };
            let bytes = match dir.read(&file_name) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(ResolutionError::import_failure(bare_name, err)),
            };

            let label = dir_path.join(&file_name);
            let capability = WasmCapability::from_binary(&self.engine, label.as_str(), &bytes)
                .map_err(|err| ResolutionError::import_failure(bare_name, err))?;
            tracing::debug!(
                capability = %descriptor.name(),
                module = %label,
                digest = capability.digest(),
                "imported precompiled walker module"
            );
            return Ok(Arc::new(capability));
        }

        Err(ResolutionError::import_failure(
            bare_name,
            format!("{file_name} not found on the module search path"),
        ))
    }
}

/// Strategy 3: compile the registered WebAssembly text artifact at runtime.
#[derive(Clone)]
pub struct SourceStrategy {
    engine: WalkerEngine,
    enabled: bool,
}

impl SourceStrategy {
    /// Creates the strategy; when `enabled` is false every resolution fails
    /// with [`ResolutionError::SourceExecutionDisabled`].
    #[must_use]
    pub const fn new(engine: WalkerEngine, enabled: bool) -> Self {
        Self { engine, enabled }
    }
}

impl ResolutionStrategy for SourceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SourceExecution
    }

    fn resolve(&self, descriptor: &CapabilityDescriptor) -> ResolutionResult<Arc<dyn Capability>> {
        let source_path = descriptor.locator().source_path().ok_or_else(|| {
            ResolutionError::SourceUnavailable(format!(
                "no source artifact registered for {}",
                descriptor.name()
            ))
        })?;

        if !self.enabled {
            return Err(ResolutionError::SourceExecutionDisabled);
        }

        let (Some(parent), Some(file_name)) = (
            descriptor.locator().source_dir(),
            source_path.file_name(),
        ) else {
            return Err(ResolutionError::SourceUnavailable(source_path.to_string()));
        };
        let source = open_ambient_dir(parent)
            .and_then(|dir| dir.read_to_string(file_name))
            .map_err(|err| ResolutionError::SourceUnavailable(format!("{source_path}: {err}")))?;

        let capability = WasmCapability::from_text(&self.engine, source_path.as_str(), &source)?;
        tracing::debug!(
            capability = %descriptor.name(),
            source = %source_path,
            digest = capability.digest(),
            "compiled walker source artifact"
        );
        Ok(Arc::new(capability))
    }
}
