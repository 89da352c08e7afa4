//! Handler routing: maps each request type to its single terminal handler.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::DashMap;
use tower::Service;

use super::call::{Call, PipelineError, PipelineFuture};
use crate::traits::{Handler, Request};

// ---------------------------------------------------------------------------
// HandlerRouter
// ---------------------------------------------------------------------------

/// Routes a request type to the handler registered for it.
///
/// Handlers are stored as `Arc<dyn Handler<R>>` erased behind `Any` and keyed
/// by the request's `TypeId`.
#[derive(Default)]
pub struct HandlerRouter {
    handlers: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl HandlerRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `R`, replacing any earlier one.
    pub fn register<R, H>(&self, handler: H)
    where
        R: Request,
        H: Handler<R>,
    {
        let handler: Arc<dyn Handler<R>> = Arc::new(handler);
        if self
            .handlers
            .insert(TypeId::of::<R>(), Arc::new(handler))
            .is_some()
        {
            tracing::warn!(request_name = R::name(), "replaced previously registered handler");
        }
    }

    #[must_use]
    pub fn handler_for<R: Request>(&self) -> Option<Arc<dyn Handler<R>>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.value().clone().downcast::<Arc<dyn Handler<R>>>().ok())
            .map(|handler| Arc::clone(&*handler))
    }

    /// The terminal pipeline stage for `R`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::HandlerNotFound` if no handler is registered.
    pub fn service_for<R: Request>(&self) -> Result<HandlerService<R>, PipelineError> {
        self.handler_for::<R>()
            .map(HandlerService::new)
            .ok_or(PipelineError::HandlerNotFound { request: R::name() })
    }

    #[must_use]
    pub fn contains<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }
}

impl std::fmt::Debug for HandlerRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRouter")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// HandlerService
// ---------------------------------------------------------------------------

/// Innermost stage: invokes the handler and forwards the cancellation token.
pub struct HandlerService<R: Request> {
    handler: Arc<dyn Handler<R>>,
}

impl<R: Request> HandlerService<R> {
    pub fn new(handler: Arc<dyn Handler<R>>) -> Self {
        Self { handler }
    }
}

impl<R: Request> Clone for HandlerService<R> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<R: Request> Service<Call<R>> for HandlerService<R> {
    type Response = R::Response;
    type Error = PipelineError;
    type Future = PipelineFuture<R::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: Call<R>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            let Call { request, ctx } = call;
            handler
                .handle(request, ctx.cancellation().clone())
                .await
                .map_err(PipelineError::Fault)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
