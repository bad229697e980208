//! Domain model for capability resolution and dispatch.
//!
//! The capability domain models validated names, resource locators, the
//! frozen registry, resolution outcomes and the invocation envelope.
//! Loading mechanisms remain outside this boundary.

mod capability;
mod error;
mod invocation;
mod locator;
mod name;
mod outcome;
mod reference;
mod registry;

pub use capability::{Capability, CapabilityHandle, OperationError, Parameters};
pub use error::{CapabilityDomainError, UnknownCapabilityError};
pub use invocation::{InvocationResult, InvocationStatus};
pub use locator::ResourceLocator;
pub use name::{CapabilityName, OperationName};
pub use outcome::{
    CapabilityHealth, OutcomeKind, Resolution, ResolutionAttempt, ResolutionFailure,
    ResolutionOutcome, StrategyKind,
};
pub use reference::{WALKER_IMPORT_PREFIX, WALKER_SOURCE_EXTENSION, reference_registry};
pub use registry::{CapabilityDescriptor, CapabilityRegistry, CapabilityRegistryBuilder};
