//! Shared world state for walker dispatch BDD scenarios.

use camino::{Utf8Path, Utf8PathBuf};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use tempfile::TempDir;
use walker_runtime::{
    capability::{
        adapters::NativeModuleTable,
        domain::InvocationResult,
        services::{CapabilityError, Dispatcher},
    },
    config::{CapabilityConfig, LoaderConfig},
};

/// Dispatcher type used by the BDD world.
pub type TestDispatcher = Dispatcher<DefaultClock>;

/// Walker module compiled from source in scenarios.
pub const STATUS_WALKER_WAT: &str = r#"
(module
  (import "walker" "host_log" (func $host_log (param i32 i32)))
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 1024))
  (data (i32.const 16) "{\"ok\":true}")
  (func (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $len)))
    (local.get $ptr))
  (func (export "status") (param $ptr i32) (param $len i32) (result i32 i32)
    (call $host_log (local.get $ptr) (local.get $len))
    (i32.const 16)
    (i32.const 11))
)
"#;

/// Scenario world for walker dispatch behaviour tests.
pub struct DispatchWorld {
    /// Temporary artifact directory.
    pub artifacts: TempDir,
    /// Registered walker names.
    pub names: Vec<String>,
    /// Natively linked walkers.
    pub natives: NativeModuleTable,
    /// Whether source artifacts may be compiled.
    pub source_execution: bool,
    /// Runtime assembled by the "runtime starts" step.
    pub dispatcher: Option<TestDispatcher>,
    /// Result of the last invocation.
    pub last_invocation: Option<Result<InvocationResult, CapabilityError>>,
}

impl DispatchWorld {
    /// Creates a world with an empty artifact directory.
    ///
    /// # Panics
    ///
    /// Panics when the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            artifacts: tempfile::tempdir().expect("temporary artifact dir"),
            names: Vec::new(),
            natives: NativeModuleTable::new(),
            source_execution: false,
            dispatcher: None,
            last_invocation: None,
        }
    }

    /// Returns the artifact directory as a UTF-8 path.
    pub fn artifact_dir(&self) -> eyre::Result<Utf8PathBuf> {
        Utf8Path::from_path(self.artifacts.path())
            .map(Utf8Path::to_path_buf)
            .ok_or_else(|| eyre::eyre!("temporary directory is not UTF-8"))
    }

    /// Builds the loader configuration for the registered walkers.
    pub fn config(&self) -> eyre::Result<LoaderConfig> {
        let capabilities = self
            .names
            .iter()
            .map(|name| CapabilityConfig {
                name: name.clone(),
                import_path: None,
                source: None,
                default_operation: None,
                fallback_operations: Vec::new(),
            })
            .collect();
        Ok(LoaderConfig {
            artifact_dir: self.artifact_dir()?,
            source_execution: self.source_execution,
            capabilities: Some(capabilities),
            ..LoaderConfig::default()
        })
    }

    /// Writes the source artifact for `name`.
    pub fn write_source(&self, name: &str) -> eyre::Result<()> {
        let path = self.artifact_dir()?.join(format!("{name}.wat"));
        std::fs::write(&path, STATUS_WALKER_WAT)?;
        Ok(())
    }

    /// Returns the started runtime.
    pub fn dispatcher(&self) -> eyre::Result<&TestDispatcher> {
        self.dispatcher
            .as_ref()
            .ok_or_else(|| eyre::eyre!("runtime has not been started"))
    }

    /// Returns the last invocation result.
    pub fn last_invocation(&self) -> eyre::Result<&Result<InvocationResult, CapabilityError>> {
        self.last_invocation
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no invocation recorded in scenario world"))
    }
}

impl Default for DispatchWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DispatchWorld {
    DispatchWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Starts the runtime from the world's configuration.
pub fn start(world: &mut DispatchWorld) -> eyre::Result<()> {
    let config = world.config()?;
    let dispatcher = config.dispatcher(Arc::new(world.natives.clone()), Arc::new(DefaultClock))?;
    world.dispatcher = Some(dispatcher);
    Ok(())
}
