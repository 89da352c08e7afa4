//! Validation gate.
//!
//! Runs every validator registered for the request type concurrently, waits
//! for all of them, and short-circuits with `Invalid` carrying the combined
//! failures if any validator reported one.

use std::sync::Arc;
use std::task::{Context, Poll};

use conduit_core::{ResultFactory, ValidationFailure};
use futures_util::future::join_all;
use tower::{Layer, Service};

use crate::service::call::{Call, PipelineError, PipelineFuture};
use crate::service::registry::ValidatorRegistry;
use crate::traits::Request;

// ---------------------------------------------------------------------------
// ValidationLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ValidationLayer {
    validators: Arc<ValidatorRegistry>,
    factory: Arc<ResultFactory>,
}

impl ValidationLayer {
    #[must_use]
    pub fn new(validators: Arc<ValidatorRegistry>, factory: Arc<ResultFactory>) -> Self {
        Self { validators, factory }
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            inner,
            validators: Arc::clone(&self.validators),
            factory: Arc::clone(&self.factory),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ValidationService<S> {
    inner: S,
    validators: Arc<ValidatorRegistry>,
    factory: Arc<ResultFactory>,
}

impl<S, R> Service<Call<R>> for ValidationService<S>
where
    R: Request,
    S: Service<Call<R>, Response = R::Response, Error = PipelineError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = R::Response;
    type Error = PipelineError;
    type Future = PipelineFuture<R::Response>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: Call<R>) -> Self::Future {
        let validators = self.validators.validators_for::<R>();
        if validators.is_empty() {
            return Box::pin(self.inner.call(call));
        }

        // The ready inner service is taken; its clone stays behind for the next call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let factory = Arc::clone(&self.factory);

        Box::pin(async move {
            let failures: Vec<ValidationFailure> = {
                let cancellation = call.ctx.cancellation();
                join_all(
                    validators
                        .iter()
                        .map(|validator| validator.validate(&call.request, cancellation)),
                )
                .await
                .into_iter()
                .flatten()
                .collect()
            };

            if failures.is_empty() {
                return inner.call(call).await;
            }

            tracing::debug!(
                request_name = R::name(),
                outcome = "invalid",
                failures = failures.len(),
                "request rejected"
            );
            Ok(factory.invalid::<R::Response>(failures)?)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
