//! Request dispatch framework.
//!
//! A request travels through these pieces:
//!
//! 1. **Mediator** (`mediator`): looks up the handler and composes the chain
//! 2. **Middleware** (`middleware`): Tower layers (authorization, validation,
//!    unhandled-fault capture, logging)
//! 3. **Routing** (`router`): the terminal handler for the request type
//!
//! Per-type declarations (access requirements, validators) live in
//! `registry`; `config` decides which behaviors are enabled.

pub mod call;
pub mod config;
pub mod mediator;
pub mod middleware;
pub mod registry;
pub mod router;

// Re-export key types for convenient access.
pub use call::{Call, CallContext, PipelineError, PipelineFuture};
pub use config::{PipelineConfig, Stage};
pub use mediator::{Mediator, MediatorBuilder};
pub use middleware::{
    build_pipeline, AuthorizationLayer, BoxPipeline, LoggingLayer, Registries, UnhandledFaultLayer,
    ValidationLayer,
};
pub use registry::{AccessRegistry, ValidatorRegistry};
pub use router::{HandlerRouter, HandlerService};
