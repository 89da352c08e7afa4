//! Unhandled-fault capture.
//!
//! Wraps the rest of the chain and logs every fault that escapes it, either an
//! `Err` or a panic, before handing it back to the caller untouched. Panics are
//! resumed with their original payload.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::task::{Context, Poll};

use futures_util::FutureExt;
use tower::{Layer, Service};

use crate::service::call::{Call, PipelineError, PipelineFuture};
use crate::traits::Request;

// ---------------------------------------------------------------------------
// UnhandledFaultLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct UnhandledFaultLayer;

impl<S> Layer<S> for UnhandledFaultLayer {
    type Service = UnhandledFaultService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UnhandledFaultService { inner }
    }
}

// ---------------------------------------------------------------------------
// UnhandledFaultService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UnhandledFaultService<S> {
    inner: S,
}

impl<S, R> Service<Call<R>> for UnhandledFaultService<S>
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

        // Inner stages may do work before returning their future.
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| self.inner.call(call))) {
            Ok(fut) => fut,
            Err(payload) => {
                log_panic(request_name, payload.as_ref());
                panic::resume_unwind(payload);
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(error)) => {
                    tracing::error!(
                        request_name,
                        error = %error,
                        "Request: Unhandled fault for request {request_name}"
                    );
                    Err(error)
                }
                Err(payload) => {
                    log_panic(request_name, payload.as_ref());
                    panic::resume_unwind(payload)
                }
            }
        })
    }
}

fn log_panic(request_name: &str, payload: &(dyn Any + Send)) {
    let error = panic_message(payload);
    tracing::error!(
        request_name,
        error,
        panic = true,
        "Request: Unhandled fault for request {request_name}"
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use conduit_core::{Outcome, ValidationFailure};
    use tower::ServiceExt;
    use tracing::Level;

    use super::*;
    use crate::service::call::CallContext;
    use crate::testing::LogCapture;

    #[derive(Debug)]
    struct Explode;

    impl Request for Explode {
        type Response = Outcome;
    }

    fn stub(
        result: fn() -> Result<Outcome, PipelineError>,
    ) -> UnhandledFaultService<impl Service<Call<Explode>, Response = Outcome, Error = PipelineError, Future = PipelineFuture<Outcome>> + Send>
    {
        UnhandledFaultLayer.layer(tower::service_fn(move |_call: Call<Explode>| -> PipelineFuture<Outcome> {
            Box::pin(async move { result() })
        }))
    }

    fn call() -> Call<Explode> {
        Call::new(Explode, CallContext::anonymous())
    }

    #[tokio::test]
    async fn business_failures_pass_through_silently() {
        let logs = LogCapture::new();
        let _guard = logs.install();

        let resp = stub(|| Ok(Outcome::invalid([ValidationFailure::new("Name", "taken")])))
            .oneshot(call())
            .await
            .unwrap();
        assert_eq!(resp, Outcome::invalid([ValidationFailure::new("Name", "taken")]));
        assert!(logs.at_level(Level::ERROR).is_empty());
    }

    #[tokio::test]
    async fn fault_is_logged_once_and_returned_unchanged() {
        let logs = LogCapture::new();
        let _guard = logs.install();

        let err = stub(|| Err(PipelineError::Fault(anyhow::anyhow!("SomeSortOfError"))))
            .oneshot(call())
            .await
            .unwrap_err();
        assert_eq!(err.into_fault().unwrap().to_string(), "SomeSortOfError");

        let events = logs.at_level(Level::ERROR);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Request: Unhandled fault for request Explode");
        assert_eq!(events[0].field("request_name"), Some("Explode"));
        assert_eq!(events[0].field("error"), Some("SomeSortOfError"));
    }

    #[tokio::test]
    async fn panic_is_logged_and_resumed() {
        let logs = LogCapture::new();
        let _guard = logs.install();

        let svc = UnhandledFaultLayer.layer(tower::service_fn(|_call: Call<Explode>| -> PipelineFuture<Outcome> {
            Box::pin(async { panic!("SomeSortOfError") })
        }));
        let payload = AssertUnwindSafe(svc.oneshot(call()))
            .catch_unwind()
            .await
            .unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "SomeSortOfError");

        let events = logs.at_level(Level::ERROR);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field("error"), Some("SomeSortOfError"));
        assert_eq!(events[0].field("panic"), Some("true"));
    }

    #[tokio::test]
    async fn panic_before_future_is_logged_and_resumed() {
        let logs = LogCapture::new();
        let _guard = logs.install();

        let svc = UnhandledFaultLayer.layer(tower::service_fn(|_call: Call<Explode>| -> PipelineFuture<Outcome> {
            panic!("eager {}", 42)
        }));
        let payload = AssertUnwindSafe(svc.oneshot(call()))
            .catch_unwind()
            .await
            .unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "eager 42");
        assert_eq!(logs.at_level(Level::ERROR).len(), 1);
    }

    #[test]
    fn panic_message_handles_opaque_payloads() {
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
