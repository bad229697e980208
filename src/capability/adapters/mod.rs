//! Adapter implementations of the resolution strategies.

pub mod fallback;
pub mod native;
pub mod wasm;

pub use fallback::{FallbackCapability, FallbackStrategy};
pub use native::{CapabilityFactory, DirectImportStrategy, NativeCapability, NativeModuleTable};
pub use wasm::{SearchPathStrategy, SourceStrategy, WalkerEngine, WasmCapability};
