//! Unit tests for WebAssembly walker modules and the filesystem strategies.

use super::fixtures::{SPINNING_WAT, WALKER_WAT, capability_name, operation};
use crate::capability::{
    adapters::{SearchPathStrategy, SourceStrategy, WalkerEngine, WasmCapability},
    domain::{
        Capability, CapabilityDescriptor, CapabilityHandle, OperationError, Parameters,
        ResourceLocator,
    },
    ports::{ResolutionError, ResolutionStrategy},
};
use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[fixture]
fn engine() -> WalkerEngine {
    WalkerEngine::new(Duration::from_secs(5)).expect("engine starts")
}

#[fixture]
fn walker(engine: WalkerEngine) -> WasmCapability {
    WasmCapability::from_text(&engine, "walker.wat", WALKER_WAT).expect("fixture module compiles")
}

fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8Path::from_path(dir.path())
        .expect("temporary directory is UTF-8")
        .to_path_buf()
}

fn descriptor_with_source(source: Option<Utf8PathBuf>) -> CapabilityDescriptor {
    let locator = ResourceLocator::new("walkers.quiz_master").expect("valid locator");
    let located = match source {
        Some(path) => locator.with_source_path(path),
        None => locator,
    };
    CapabilityDescriptor::new(capability_name("quiz_master"), located)
}

#[rstest]
fn discovery_skips_allocator_and_private_exports(walker: WasmCapability) {
    let handle = CapabilityHandle::new(Arc::new(walker));

    let names: Vec<&str> = handle
        .operations()
        .iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(
        names,
        ["echo", "status", "explode", "nothing", "trap", "oversized"]
    );
}

#[rstest]
#[case("echo", Ok(json!({"x": 1})))]
#[case("status", Ok(json!({"ok": true})))]
#[case("nothing", Ok(Value::Null))]
#[case("explode", Err(OperationError::Failed("boom".to_owned())))]
fn operations_follow_json_calling_convention(
    walker: WasmCapability,
    #[case] name: &str,
    #[case] expected: Result<Value, OperationError>,
) {
    let mut parameters = Parameters::new();
    parameters.insert("x".to_owned(), json!(1));

    assert_eq!(walker.invoke(&operation(name), &parameters), expected);
}

#[rstest]
fn trap_becomes_operation_failure(walker: WasmCapability) {
    let result = walker.invoke(&operation("trap"), &Parameters::new());

    assert!(matches!(result, Err(OperationError::Failed(_))));
}

#[rstest]
fn out_of_range_result_is_rejected_without_copying(walker: WasmCapability) {
    let result = walker.invoke(&operation("oversized"), &Parameters::new());

    match result {
        Err(OperationError::Failed(reason)) => {
            assert!(reason.contains("outside linear memory"), "unexpected reason: {reason}");
        }
        other => panic!("expected an out-of-range failure, got {other:?}"),
    }
}

#[test]
fn runaway_guest_traps_at_the_execution_deadline() {
    let engine = WalkerEngine::new(Duration::from_millis(50)).expect("engine starts");
    let spinner =
        WasmCapability::from_text(&engine, "spinner.wat", SPINNING_WAT).expect("module compiles");
    let started = Instant::now();

    let result = spinner.invoke(&operation("spin"), &Parameters::new());

    assert_eq!(
        result,
        Err(OperationError::Failed(
            "walker exceeded its execution deadline".to_owned()
        ))
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[rstest]
#[case::wasi(
    r#"(module (import "wasi_snapshot_preview1" "fd_write" (func (param i32 i32 i32 i32) (result i32))) (memory (export "memory") 1))"#,
    "WASI"
)]
#[case::foreign_import(
    r#"(module (import "env" "abort" (func)) (memory (export "memory") 1))"#,
    "unsupported import"
)]
#[case::no_memory(
    r#"(module (func (export "alloc") (param i32) (result i32) (local.get 0)))"#,
    "memory"
)]
#[case::no_alloc(r#"(module (memory (export "memory") 1))"#, "alloc")]
fn contract_violations_are_rejected(engine: WalkerEngine, #[case] source: &str, #[case] reason: &str) {
    let result = WasmCapability::from_text(&engine, "bad.wat", source);

    match result {
        Err(ResolutionError::InvalidModule { reason: actual, .. }) => {
            assert!(actual.contains(reason), "unexpected reason: {actual}");
        }
        other => panic!("expected InvalidModule, got {other:?}"),
    }
}

#[rstest]
fn search_path_finds_precompiled_module(engine: WalkerEngine) {
    let artifacts = tempfile::tempdir().expect("temporary artifact dir");
    let modules = tempfile::tempdir().expect("temporary module dir");
    let binary = wat::parse_str(WALKER_WAT).expect("fixture assembles");
    fs::write(modules.path().join("quiz_master.wasm"), binary).expect("write module");
    let strategy = SearchPathStrategy::new(engine, vec![utf8_dir(&modules)]);
    let target = descriptor_with_source(Some(utf8_dir(&artifacts).join("quiz_master.wat")));

    let capability = strategy.resolve(&target).expect("module is on the search path");

    assert!(capability.operations().contains(&operation("echo")));
}

#[rstest]
fn search_path_prefers_artifact_directory(engine: WalkerEngine) {
    let artifacts = tempfile::tempdir().expect("temporary artifact dir");
    let modules = tempfile::tempdir().expect("temporary module dir");
    let binary = wat::parse_str(WALKER_WAT).expect("fixture assembles");
    fs::write(artifacts.path().join("quiz_master.wasm"), &binary).expect("write module");
    fs::write(modules.path().join("quiz_master.wasm"), b"not wasm").expect("write junk");
    let strategy = SearchPathStrategy::new(engine, vec![utf8_dir(&modules)]);
    let target = descriptor_with_source(Some(utf8_dir(&artifacts).join("quiz_master.wat")));

    assert!(strategy.resolve(&target).is_ok());
}

#[rstest]
fn search_path_reports_missing_module(engine: WalkerEngine) {
    let modules = tempfile::tempdir().expect("temporary module dir");
    let strategy = SearchPathStrategy::new(engine, vec![utf8_dir(&modules)]);

    let result = strategy.resolve(&descriptor_with_source(None));

    assert!(matches!(
        result,
        Err(ResolutionError::ImportFailure { ref module, .. }) if module == "quiz_master"
    ));
}

#[rstest]
fn search_path_rejects_invalid_binary(engine: WalkerEngine) {
    let modules = tempfile::tempdir().expect("temporary module dir");
    fs::write(modules.path().join("quiz_master.wasm"), b"not wasm").expect("write junk");
    let strategy = SearchPathStrategy::new(engine, vec![utf8_dir(&modules)]);

    let result = strategy.resolve(&descriptor_with_source(None));

    assert!(matches!(result, Err(ResolutionError::ImportFailure { .. })));
}

#[rstest]
fn source_execution_compiles_registered_artifact(engine: WalkerEngine) {
    let artifacts = tempfile::tempdir().expect("temporary artifact dir");
    let source = utf8_dir(&artifacts).join("quiz_master.wat");
    fs::write(&source, WALKER_WAT).expect("write source");
    let strategy = SourceStrategy::new(engine, true);

    let capability = strategy
        .resolve(&descriptor_with_source(Some(source)))
        .expect("source compiles");

    assert!(capability.operations().contains(&operation("status")));
}

#[rstest]
fn source_execution_is_gated_by_configuration(engine: WalkerEngine) {
    let artifacts = tempfile::tempdir().expect("temporary artifact dir");
    let source = utf8_dir(&artifacts).join("quiz_master.wat");
    fs::write(&source, WALKER_WAT).expect("write source");
    let strategy = SourceStrategy::new(engine, false);

    let result = strategy.resolve(&descriptor_with_source(Some(source)));

    assert!(matches!(result, Err(ResolutionError::SourceExecutionDisabled)));
}

#[rstest]
#[case::unregistered(false)]
#[case::missing_file(true)]
fn source_execution_reports_unavailable_artifact(engine: WalkerEngine, #[case] registered: bool) {
    let artifacts = tempfile::tempdir().expect("temporary artifact dir");
    let source = registered.then(|| utf8_dir(&artifacts).join("quiz_master.wat"));
    let strategy = SourceStrategy::new(engine, true);

    let result = strategy.resolve(&descriptor_with_source(source));

    assert!(matches!(result, Err(ResolutionError::SourceUnavailable(_))));
}
