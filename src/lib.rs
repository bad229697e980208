//! Walker runtime: capability resolution and dispatch for the learning
//! platform's multi-agent layer.
//!
//! Agents ("walkers") are addressed by name. Each request is resolved through
//! an ordered fallback chain of loading strategies, memoised per name, and
//! invoked through a dispatcher that always answers with a uniform result
//! envelope.
//!
//! # Modules
//!
//! - [`capability`]: Registry, resolution pipeline, cache and dispatcher
//! - [`config`]: Loader configuration and runtime assembly
//! - [`telemetry`]: Structured logging setup

pub mod capability;
pub mod config;
pub mod telemetry;
