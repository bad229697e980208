//! Walker capability resolution and dispatch.
//!
//! A capability is a named unit of agent functionality (a walker) exposing
//! operations. Requests are resolved through an ordered chain of loading
//! strategies, memoised per name, and invoked through a dispatcher that
//! always answers with a uniform result envelope. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Loading strategies in [`adapters`]
//! - Pipeline, cache and dispatcher in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
