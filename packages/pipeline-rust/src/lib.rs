//! Conduit pipeline: in-process request dispatch with authorization,
//! validation, logging and unhandled-fault capture around each handler.

pub mod service;
pub mod telemetry;
pub mod testing;
pub mod traits;

pub use conduit_core::{
    AccessRequirement, Anonymous, Identity, IdentityProvider, Outcome, Principal, Status,
    ValidationFailure, ValueOutcome,
};
pub use service::{CallContext, Mediator, MediatorBuilder, PipelineConfig, PipelineError};
pub use traits::{FnValidator, Handler, Request, Validator};
