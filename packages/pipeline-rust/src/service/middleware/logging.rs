//! Pre-handler request logging.

use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::service::call::{Call, PipelineError, PipelineFuture};
use crate::traits::Request;

// ---------------------------------------------------------------------------
// LoggingLayer
// ---------------------------------------------------------------------------

/// Emits one `INFO` record per request just before it reaches the handler.
///
/// The request's `Debug` rendering is attached to that record only. The
/// layer never changes the call or its response.
#[derive(Debug, Clone, Default)]
pub struct LoggingLayer;

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

// ---------------------------------------------------------------------------
// LoggingService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
}

impl<S, R> Service<Call<R>> for LoggingService<S>
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
        let request_name = R::name();
        match call.ctx.identity().id() {
            Some(user_id) => tracing::info!(
                request_name,
                %user_id,
                request = ?call.request,
                "Processing {request_name} with user {user_id}"
            ),
            None => tracing::info!(request_name, request = ?call.request, "Processing {request_name}"),
        }
        Box::pin(self.inner.call(call))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
