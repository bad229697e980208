//! WebAssembly walker modules loaded through `wasmtime`.

mod engine;
mod module;
mod strategy;

pub use engine::{EPOCH_TICK, EngineError, WalkerEngine};
pub use module::{HOST_LOG, HOST_MODULE, WasmCapability};
pub use strategy::{MODULE_EXTENSION, SearchPathStrategy, SourceStrategy};
