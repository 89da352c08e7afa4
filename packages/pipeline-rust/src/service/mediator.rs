//! The pipeline executor: dispatches a request through the configured
//! behaviors to its handler.

use std::sync::Arc;

use conduit_core::{AccessRequirement, Constructors, FailureResponse, IdentityProvider, ResultFactory, Shape};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use super::call::{Call, CallContext, PipelineError};
use super::config::{PipelineConfig, Stage};
use super::middleware::{build_pipeline, Registries};
use super::registry::{AccessRegistry, ValidatorRegistry};
use super::router::HandlerRouter;
use crate::traits::{Handler, Request, Validator};

// ---------------------------------------------------------------------------
// Mediator
// ---------------------------------------------------------------------------

/// Sends requests through the pipeline.
///
/// Cloning is cheap; clones share every registry. The behavior chain is
/// composed per call from the stage list fixed at build time.
#[derive(Debug, Clone)]
pub struct Mediator {
    router: Arc<HandlerRouter>,
    registries: Registries,
    stages: Arc<[Stage]>,
}

impl Mediator {
    #[must_use]
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::default()
    }

    /// Enabled stages, outermost first.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Dispatch `request` with an already resolved context.
    ///
    /// Business failures, including gating rejections, come back as `Ok`
    /// response values.
    ///
    /// # Errors
    ///
    /// - `PipelineError::HandlerNotFound` if `R` has no handler.
    /// - `PipelineError::Configuration` if a gating behavior cannot build the
    ///   failure response for `R::Response`.
    /// - `PipelineError::Fault` carrying the handler's own error.
    pub async fn send<R: Request>(&self, request: R, ctx: CallContext) -> Result<R::Response, PipelineError> {
        let handler = self.router.service_for::<R>()?;
        build_pipeline(handler, &self.stages, &self.registries)
            .oneshot(Call::new(request, ctx))
            .await
    }

    /// Resolve the caller through `identity`, then [`send`](Self::send).
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus `PipelineError::IdentityUnavailable`
    /// when the provider fails.
    pub async fn send_as<R: Request>(
        &self,
        request: R,
        identity: &dyn IdentityProvider,
        cancellation: CancellationToken,
    ) -> Result<R::Response, PipelineError> {
        let ctx = CallContext::resolve(identity, cancellation)?;
        self.send(request, ctx).await
    }
}

// ---------------------------------------------------------------------------
// MediatorBuilder
// ---------------------------------------------------------------------------

/// Collects handlers, validators, access requirements and response
/// constructors at startup.
#[derive(Debug, Default)]
pub struct MediatorBuilder {
    config: PipelineConfig,
    router: HandlerRouter,
    access: AccessRegistry,
    validators: ValidatorRegistry,
    factory: ResultFactory,
}

impl MediatorBuilder {
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers the handler for `R` and the failure constructors of its
    /// response type.
    #[must_use]
    pub fn handler<R, H>(self, handler: H) -> Self
    where
        R: Request,
        R::Response: FailureResponse,
        H: Handler<R>,
    {
        self.factory.register::<R::Response>();
        self.router.register::<R, H>(handler);
        self
    }

    /// Registers a handler whose response type is not a [`FailureResponse`].
    ///
    /// Gating rejections for `R` fail with `PipelineError::Configuration`
    /// unless constructors are supplied through
    /// [`response_constructors`](Self::response_constructors).
    #[must_use]
    pub fn custom_handler<R, H>(self, handler: H) -> Self
    where
        R: Request,
        H: Handler<R>,
    {
        self.router.register::<R, H>(handler);
        self
    }

    #[must_use]
    pub fn validator<R, V>(self, validator: V) -> Self
    where
        R: Request,
        V: Validator<R>,
    {
        self.validators.register::<R, V>(validator);
        self
    }

    #[must_use]
    pub fn require<R: Request>(self, requirement: AccessRequirement) -> Self {
        self.access.require::<R>(requirement);
        self
    }

    #[must_use]
    pub fn response<T: FailureResponse>(self) -> Self {
        self.factory.register::<T>();
        self
    }

    #[must_use]
    pub fn response_constructors<T: Send + 'static>(self, shape: Shape, constructors: Constructors<T>) -> Self {
        self.factory.register_constructors::<T>(shape, constructors);
        self
    }

    #[must_use]
    pub fn build(self) -> Mediator {
        let stages = self.config.stages();
        tracing::debug!(
            stages = ?stages.iter().map(|stage| stage.as_str()).collect::<Vec<_>>(),
            responses = self.factory.len(),
            "mediator built"
        );
        Mediator {
            router: Arc::new(self.router),
            registries: Registries {
                access: Arc::new(self.access),
                validators: Arc::new(self.validators),
                factory: Arc::new(self.factory),
            },
            stages: Arc::from(stages),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
