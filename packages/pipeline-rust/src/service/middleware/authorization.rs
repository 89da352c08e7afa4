//! Authorization gate.
//!
//! Checks the caller's identity against the access requirements declared for
//! the request type and short-circuits with `Unauthorized` or `Forbidden`
//! built by the [`ResultFactory`].

use std::sync::Arc;
use std::task::{Context, Poll};

use conduit_core::{evaluate, AccessDecision, ResultFactory};
use tower::{Layer, Service};

use crate::service::call::{Call, PipelineError, PipelineFuture};
use crate::service::registry::AccessRegistry;
use crate::traits::Request;

// ---------------------------------------------------------------------------
// AuthorizationLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthorizationLayer {
    access: Arc<AccessRegistry>,
    factory: Arc<ResultFactory>,
}

impl AuthorizationLayer {
    #[must_use]
    pub fn new(access: Arc<AccessRegistry>, factory: Arc<ResultFactory>) -> Self {
        Self { access, factory }
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationService {
            inner,
            access: Arc::clone(&self.access),
            factory: Arc::clone(&self.factory),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthorizationService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthorizationService<S> {
    inner: S,
    access: Arc<AccessRegistry>,
    factory: Arc<ResultFactory>,
}

impl<S, R> Service<Call<R>> for AuthorizationService<S>
where
    R: Request,
    S: Service<Call<R>, Response = R::Response, Error = PipelineError> + Send,
    S::Future: Send + 'static,
{
    type Response = R::Response;
    type Error = PipelineError;
    type Future = PipelineFuture<R::Response>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: Call<R>) -> Self::Future {
        let requirements = self.access.requirements_for::<R>();
        let rejection = match evaluate(&requirements, call.ctx.identity()) {
            AccessDecision::Allow => return Box::pin(self.inner.call(call)),
            AccessDecision::Unauthenticated => {
                tracing::debug!(request_name = R::name(), outcome = "unauthorized", "request rejected");
                self.factory.unauthorized::<R::Response>()
            }
            AccessDecision::Forbidden => {
                tracing::debug!(request_name = R::name(), outcome = "forbidden", "request rejected");
                self.factory.forbidden::<R::Response>()
            }
        };
        Box::pin(std::future::ready(rejection.map_err(PipelineError::from)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
