//! Unit tests for capability resolution and dispatch.

mod wasm_tests;
