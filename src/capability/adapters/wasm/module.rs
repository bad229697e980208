//! Walker modules compiled to WebAssembly.
//!
//! A walker module exports `memory`, an `alloc(len) -> ptr` allocator and any
//! number of operations with the signature `(ptr, len) -> (ptr, len)`. The
//! host writes the JSON parameters into guest memory and reads a JSON value
//! back. A zero result length means `null`; a negative length `-n` points at
//! `n` bytes of error text. Calls run under the engine's epoch deadline.

use super::WalkerEngine;
use crate::capability::{
    domain::{Capability, OperationError, OperationName, Parameters},
    ports::{ResolutionError, ResolutionResult},
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use wasmtime::{
    Caller, Extern, ExternType, FuncType, Instance, Linker, Memory, Module, Store, Trap,
    ValType,
};

/// Import module name under which host functions are provided.
pub const HOST_MODULE: &str = "walker";

/// Host function forwarding guest log lines to `tracing`.
pub const HOST_LOG: &str = "host_log";

const MEMORY_EXPORT: &str = "memory";
const ALLOC_EXPORT: &str = "alloc";

/// A validated walker module ready to be instantiated per call.
pub struct WasmCapability {
    label: Arc<str>,
    engine: WalkerEngine,
    module: Module,
    operations: Vec<OperationName>,
    digest: String,
}

impl WasmCapability {
    /// Compiles a binary `.wasm` module.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidModule`] when the bytes are not a
    /// valid module or do not follow the walker calling convention.
    pub fn from_binary(engine: &WalkerEngine, label: &str, bytes: &[u8]) -> ResolutionResult<Self> {
        let module = Module::from_binary(engine.engine(), bytes)
            .map_err(|err| ResolutionError::invalid_module(label, err))?;
        Self::from_module(engine, label, module, bytes)
    }

    /// Compiles WebAssembly text at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidModule`] when the text does not
    /// compile or the module does not follow the walker calling convention.
    pub fn from_text(engine: &WalkerEngine, label: &str, source: &str) -> ResolutionResult<Self> {
        let module = Module::new(engine.engine(), source)
            .map_err(|err| ResolutionError::invalid_module(label, err))?;
        Self::from_module(engine, label, module, source.as_bytes())
    }

    fn from_module(
        engine: &WalkerEngine,
        label: &str,
        module: Module,
        artifact: &[u8],
    ) -> ResolutionResult<Self> {
        let operations = validate(label, &module)?;
        Ok(Self {
            label: Arc::from(label),
            engine: engine.clone(),
            module,
            operations,
            digest: format!("{:x}", Sha256::digest(artifact)),
        })
    }

    /// Returns the SHA-256 digest of the artifact the module was built from.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    fn instantiate(&self) -> Result<(Store<()>, Instance), OperationError> {
        let mut store = self.engine.store();
        let mut linker = Linker::new(self.engine.engine());
        let label = Arc::clone(&self.label);
        linker
            .func_wrap(
                HOST_MODULE,
                HOST_LOG,
                move |mut caller: Caller<'_, ()>, ptr: i32, len: i32| {
                    match read_guest_log(&mut caller, ptr, len) {
                        Some(line) => tracing::info!(target: "walker_runtime::guest", walker = %label, "{line}"),
                        None => tracing::warn!(walker = %label, "guest log line could not be read"),
                    }
                },
            )
            .map_err(OperationError::failed)?;
        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(OperationError::failed)?;
        Ok((store, instance))
    }
}

impl fmt::Debug for WasmCapability {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WasmCapability")
            .field("label", &self.label)
            .field("operations", &self.operations)
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

impl Capability for WasmCapability {
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

        let payload = serde_json::to_vec(parameters)
            .map_err(|err| OperationError::InvalidParameters(err.to_string()))?;
        let payload_len = i32::try_from(payload.len())
            .map_err(|_| OperationError::InvalidParameters("parameters too large".to_owned()))?;

        let (mut store, instance) = self.instantiate()?;
        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| OperationError::failed("module does not export memory"))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, ALLOC_EXPORT)
            .map_err(OperationError::failed)?;
        let entry = instance
            .get_typed_func::<(i32, i32), (i32, i32)>(&mut store, operation.as_str())
            .map_err(OperationError::failed)?;

        let input_ptr = alloc
            .call(&mut store, payload_len)
            .map_err(call_failure)?;
        memory
            .write(&mut store, guest_offset(input_ptr)?, &payload)
            .map_err(OperationError::failed)?;

        let (output_ptr, output_len) = entry
            .call(&mut store, (input_ptr, payload_len))
            .map_err(call_failure)?;
        decode_output(&memory, &store, output_ptr, output_len)
    }
}

fn validate(label: &str, module: &Module) -> ResolutionResult<Vec<OperationName>> {
    for import in module.imports() {
        if import.module().starts_with("wasi") {
            return Err(ResolutionError::invalid_module(
                label,
                format!("requires WASI import module '{}'", import.module()),
            ));
        }
        if import.module() != HOST_MODULE || import.name() != HOST_LOG {
            return Err(ResolutionError::invalid_module(
                label,
                format!("unsupported import '{}.{}'", import.module(), import.name()),
            ));
        }
    }

    let mut has_memory = false;
    let mut has_alloc = false;
    let mut operations = Vec::new();
    for export in module.exports() {
        match export.ty() {
            ExternType::Memory(_) if export.name() == MEMORY_EXPORT => has_memory = true,
            ExternType::Func(func) if export.name() == ALLOC_EXPORT => {
                has_alloc = is_i32_signature(&func, 1, 1);
            }
            ExternType::Func(func) if is_i32_signature(&func, 2, 2) => {
                if let Ok(operation) = OperationName::new(export.name()) {
                    operations.push(operation);
                }
            }
            _ => {}
        }
    }

    if !has_memory {
        return Err(ResolutionError::invalid_module(
            label,
            "module does not export 'memory'",
        ));
    }
    if !has_alloc {
        return Err(ResolutionError::invalid_module(
            label,
            "module does not export 'alloc(i32) -> i32'",
        ));
    }
    Ok(operations)
}

fn is_i32_signature(func: &FuncType, params: usize, results: usize) -> bool {
    func.params().len() == params
        && func.results().len() == results
        && func.params().all(|ty| matches!(ty, ValType::I32))
        && func.results().all(|ty| matches!(ty, ValType::I32))
}

fn call_failure(err: wasmtime::Error) -> OperationError {
    if matches!(err.downcast_ref::<Trap>(), Some(Trap::Interrupt)) {
        return OperationError::failed("walker exceeded its execution deadline");
    }
    OperationError::failed(err)
}

fn guest_offset(value: i32) -> Result<usize, OperationError> {
    usize::try_from(value).map_err(|_| OperationError::failed(format!("invalid guest pointer {value}")))
}

// Bounds are checked against linear memory before copying.
fn read_bytes(data: &[u8], ptr: i32, len: usize) -> Result<Vec<u8>, OperationError> {
    let start = guest_offset(ptr)?;
    let range = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| {
            OperationError::failed(format!(
                "guest range of {len} bytes at {start} is outside linear memory"
            ))
        })?;
    Ok(range.to_vec())
}

fn decode_output(
    memory: &Memory,
    store: &Store<()>,
    ptr: i32,
    len: i32,
) -> Result<Value, OperationError> {
    if len == 0 {
        return Ok(Value::Null);
    }

    let byte_len = usize::try_from(len.unsigned_abs()).map_err(OperationError::failed)?;
    let bytes = read_bytes(memory.data(store), ptr, byte_len)?;
    if len < 0 {
        return Err(OperationError::Failed(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
    }

    serde_json::from_slice(&bytes)
        .map_err(|err| OperationError::failed(format!("module returned invalid JSON: {err}")))
}

fn read_guest_log(caller: &mut Caller<'_, ()>, ptr: i32, len: i32) -> Option<String> {
    let Some(Extern::Memory(memory)) = caller.get_export(MEMORY_EXPORT) else {
        return None;
    };
    let byte_len = usize::try_from(len).ok()?;
    let bytes = read_bytes(memory.data(&*caller), ptr, byte_len).ok()?;
    String::from_utf8(bytes).ok()
}
