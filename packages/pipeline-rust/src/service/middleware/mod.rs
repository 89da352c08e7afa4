//! Tower layers implementing the pipeline behaviors.
//!
//! - [`authorization`]: Access-requirement gate (`Unauthorized` / `Forbidden`)
//! - [`validation`]: Concurrent validators, `Invalid` on any failure
//! - [`unhandled`]: Logs faults and panics escaping the handler, then re-raises them
//! - [`logging`]: One structured record per request, just before the handler
//! - [`pipeline`]: Composes the enabled layers around a handler

pub mod authorization;
pub mod logging;
pub mod pipeline;
pub mod unhandled;
pub mod validation;

pub use authorization::AuthorizationLayer;
pub use logging::LoggingLayer;
pub use pipeline::{build_pipeline, BoxPipeline, Registries};
pub use unhandled::UnhandledFaultLayer;
pub use validation::ValidationLayer;
