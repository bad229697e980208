//! Application services: resolution pipeline, memoisation and dispatch.

mod cache;
mod dispatcher;
mod error;
mod pipeline;

pub use cache::{CapabilityCache, HealthEntry, HealthReport, ReloadReport};
pub use dispatcher::{DEFAULT_INVOCATION_TIMEOUT, Dispatcher, select_operation};
pub use error::{CapabilityError, CapabilityResult, InvocationError};
pub use pipeline::ResolverPipeline;
