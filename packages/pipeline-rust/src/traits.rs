use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use conduit_core::ValidationFailure;
use tokio_util::sync::CancellationToken;

/// A command or query dispatched through the pipeline.
///
/// The `Debug` rendering is attached to the pre-handler log record, so keep
/// secrets out of it.
pub trait Request: fmt::Debug + Send + Sync + 'static {
    /// What the handler answers with, usually `Outcome` or `ValueOutcome<T>`.
    type Response: Send + 'static;

    /// Name used in log records. Defaults to the unqualified type name.
    fn name() -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// Strips the module path from a non-generic type name. Generic names are
/// returned whole since their parameters carry paths of their own.
fn short_type_name(full: &'static str) -> &'static str {
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

/// The single terminal handler for request type `R`.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    /// Handle the request. Business failures belong in the response value;
    /// an `Err` is an unexpected fault and propagates to the caller.
    async fn handle(&self, request: R, cancellation: CancellationToken) -> anyhow::Result<R::Response>;
}

/// One of possibly several validators registered for request type `R`.
///
/// Validators of the same request run concurrently and must not depend on
/// each other's outcome.
#[async_trait]
pub trait Validator<R: Request>: Send + Sync + 'static {
    /// Returns every rule `request` violates; empty when valid.
    async fn validate(&self, request: &R, cancellation: &CancellationToken) -> Vec<ValidationFailure>;
}

/// Adapts a synchronous closure into a [`Validator`].
pub struct FnValidator<R, F> {
    func: F,
    _request: PhantomData<fn(&R)>,
}

impl<R, F> FnValidator<R, F>
where
    R: Request,
    F: Fn(&R) -> Vec<ValidationFailure> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _request: PhantomData,
        }
    }
}

#[async_trait]
impl<R, F> Validator<R> for FnValidator<R, F>
where
    R: Request,
    F: Fn(&R) -> Vec<ValidationFailure> + Send + Sync + 'static,
{
    async fn validate(&self, request: &R, _cancellation: &CancellationToken) -> Vec<ValidationFailure> {
        (self.func)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct CreateUser {
        email: String,
    }

    impl Request for CreateUser {
        type Response = ();
    }

    #[derive(Debug)]
    struct Wrapped<T>(T);

    impl<T: fmt::Debug + Send + Sync + 'static> Request for Wrapped<T> {
        type Response = ();
    }

    #[test]
    fn default_name_is_unqualified() {
        assert_eq!(CreateUser::name(), "CreateUser");
    }

    #[test]
    fn generic_request_name_keeps_parameters() {
        assert!(Wrapped::<u8>::name().contains("Wrapped<u8>"));
    }

    #[tokio::test]
    async fn fn_validator_reports_closure_failures() {
        let validator = FnValidator::new(|req: &CreateUser| {
            if req.email.is_empty() {
                vec![ValidationFailure::new("Email", "must not be empty")]
            } else {
                Vec::new()
            }
        });
        let token = CancellationToken::new();

        let failures = validator
            .validate(&CreateUser { email: String::new() }, &token)
            .await;
        assert_eq!(failures.len(), 1);

        let failures = validator
            .validate(&CreateUser { email: "a@b.c".into() }, &token)
            .await;
        assert!(failures.is_empty());
    }
}
