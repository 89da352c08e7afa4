use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use conduit_core::{Anonymous, FactoryError, Identity, IdentityProvider};
use tokio_util::sync::CancellationToken;

/// Boxed future returned by every pipeline stage.
pub type PipelineFuture<T> = Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send>>;

/// Ambient state carried alongside every request through the pipeline.
///
/// The pipeline only reads the identity and only forwards the cancellation
/// token; observing cancellation is up to handlers and validators.
#[derive(Clone)]
pub struct CallContext {
    identity: Arc<dyn Identity>,
    cancellation: CancellationToken,
}

impl CallContext {
    #[must_use]
    pub fn new(identity: Arc<dyn Identity>, cancellation: CancellationToken) -> Self {
        Self {
            identity,
            cancellation,
        }
    }

    /// Context for an anonymous caller with a fresh, never-cancelled token.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(Arc::new(Anonymous), CancellationToken::new())
    }

    /// Resolves the identity from `provider`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::IdentityUnavailable` if the provider fails.
    pub fn resolve(
        provider: &dyn IdentityProvider,
        cancellation: CancellationToken,
    ) -> Result<Self, PipelineError> {
        let identity = provider.current().map_err(PipelineError::IdentityUnavailable)?;
        Ok(Self::new(identity, cancellation))
    }

    #[must_use]
    pub fn identity(&self) -> &dyn Identity {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("user_id", &self.identity.id())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

/// A request paired with its context, as seen by every pipeline stage.
#[derive(Debug)]
pub struct Call<R> {
    pub request: R,
    pub ctx: CallContext,
}

impl<R> Call<R> {
    pub fn new(request: R, ctx: CallContext) -> Self {
        Self { request, ctx }
    }
}

/// Faults that escape the pipeline. Business failures never appear here;
/// they are response values.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The handler failed unexpectedly. The original error is passed through.
    #[error(transparent)]
    Fault(anyhow::Error),
    /// A gating behavior could not construct its failure response.
    #[error("result factory misconfigured: {0}")]
    Configuration(#[from] FactoryError),
    #[error("no handler registered for request `{request}`")]
    HandlerNotFound { request: &'static str },
    #[error("identity provider failed: {0}")]
    IdentityUnavailable(#[source] anyhow::Error),
}

impl PipelineError {
    /// `true` for faults caused by how the pipeline was set up rather than by
    /// a particular request.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::HandlerNotFound { .. } | Self::IdentityUnavailable(_)
        )
    }

    /// The handler's own error, if this is a handler fault.
    #[must_use]
    pub fn into_fault(self) -> Option<anyhow::Error> {
        match self {
            Self::Fault(error) => Some(error),
            _ => None,
        }
    }
}
