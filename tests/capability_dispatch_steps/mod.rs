//! Step definitions for walker resolution and dispatch scenarios.

mod given;
mod then;
mod when;
pub mod world;
