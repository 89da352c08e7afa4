//! Pipeline composition: nests the enabled behaviors around a handler.

use std::sync::Arc;

use conduit_core::ResultFactory;
use tower::util::BoxCloneService;
use tower::Layer;

use super::authorization::AuthorizationLayer;
use super::logging::LoggingLayer;
use super::unhandled::UnhandledFaultLayer;
use super::validation::ValidationLayer;
use crate::service::call::{Call, PipelineError};
use crate::service::config::Stage;
use crate::service::registry::{AccessRegistry, ValidatorRegistry};
use crate::service::router::HandlerService;
use crate::traits::Request;

/// A fully composed, type-erased pipeline for request type `R`.
pub type BoxPipeline<R> = BoxCloneService<Call<R>, <R as Request>::Response, PipelineError>;

/// Shared state the gating behaviors read from.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub access: Arc<AccessRegistry>,
    pub validators: Arc<ValidatorRegistry>,
    pub factory: Arc<ResultFactory>,
}

/// Build the pipeline for `R` by wrapping `handler` with one layer per stage.
///
/// `stages` is outermost first, as returned by
/// [`PipelineConfig::stages`](crate::service::config::PipelineConfig::stages).
/// Each stage nests around every stage after it, and the handler is always
/// innermost. An empty slice yields the bare handler.
#[must_use]
pub fn build_pipeline<R: Request>(
    handler: HandlerService<R>,
    stages: &[Stage],
    registries: &Registries,
) -> BoxPipeline<R> {
    stages
        .iter()
        .rev()
        .fold(BoxCloneService::new(handler), |inner, stage| match stage {
            Stage::Authorization => BoxCloneService::new(
                AuthorizationLayer::new(
                    Arc::clone(&registries.access),
                    Arc::clone(&registries.factory),
                )
                .layer(inner),
            ),
            Stage::Validation => BoxCloneService::new(
                ValidationLayer::new(
                    Arc::clone(&registries.validators),
                    Arc::clone(&registries.factory),
                )
                .layer(inner),
            ),
            Stage::UnhandledFault => BoxCloneService::new(UnhandledFaultLayer.layer(inner)),
            Stage::Logging => BoxCloneService::new(LoggingLayer.layer(inner)),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use conduit_core::{AccessRequirement, Outcome, Status, ValidationFailure};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;
    use tracing::Level;

    use super::*;
    use crate::service::call::CallContext;
    use crate::service::config::PipelineConfig;
    use crate::testing::LogCapture;
    use crate::traits::{FnValidator, Handler};

    #[derive(Debug)]
    struct Rename {
        name: String,
    }

    impl Request for Rename {
        type Response = Outcome;
    }

    struct RenameHandler {
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Handler<Rename> for RenameHandler {
        async fn handle(&self, request: Rename, _cancellation: CancellationToken) -> anyhow::Result<Outcome> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if request.name == "boom" {
                anyhow::bail!("SomeSortOfError");
            }
            Ok(Outcome::success())
        }
    }

    fn rename(name: &str) -> Call<Rename> {
        Call::new(
            Rename {
                name: name.to_string(),
            },
            CallContext::anonymous(),
        )
    }

    fn setup() -> (HandlerService<Rename>, Registries, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler: Arc<dyn Handler<Rename>> = Arc::new(RenameHandler {
            hits: Arc::clone(&hits),
        });
        let registries = Registries::default();
        registries.validators.register::<Rename, _>(FnValidator::new(|request: &Rename| {
            if request.name.is_empty() {
                vec![ValidationFailure::new("Name", "must not be empty")]
            } else {
                Vec::new()
            }
        }));
        (HandlerService::new(handler), registries, hits)
    }

    #[tokio::test]
    async fn bare_handler_when_no_stages() {
        let (handler, registries, hits) = setup();
        let logs = LogCapture::new();
        let _guard = logs.install();

        let resp = build_pipeline(handler, &[], &registries)
            .oneshot(rename(""))
            .await
            .unwrap();
        assert_eq!(resp, Outcome::success());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(logs.events().is_empty());
    }

    #[tokio::test]
    async fn authorization_runs_before_logging_and_handler() {
        let (handler, registries, hits) = setup();
        registries.access.require::<Rename>(AccessRequirement::authenticated());
        let logs = LogCapture::new();
        let _guard = logs.install();

        let resp = build_pipeline(handler, &PipelineConfig::default().stages(), &registries)
            .oneshot(rename("ada"))
            .await
            .unwrap();
        assert_eq!(resp.status(), Status::Unauthorized);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(logs.with_message("Processing Rename").is_empty());
    }

    #[tokio::test]
    async fn validation_runs_before_logging_and_handler() {
        let (handler, registries, hits) = setup();
        let logs = LogCapture::new();
        let _guard = logs.install();

        let resp = build_pipeline(handler, &PipelineConfig::default().stages(), &registries)
            .oneshot(rename(""))
            .await
            .unwrap();
        assert_eq!(resp.status(), Status::Invalid);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(logs.with_message("Processing Rename").is_empty());
        assert!(logs.at_level(Level::ERROR).is_empty());
    }

    #[tokio::test]
    async fn disabled_validation_is_removed() {
        let (handler, registries, hits) = setup();
        let config = PipelineConfig {
            use_validation: false,
            ..PipelineConfig::default()
        };

        let resp = build_pipeline(handler, &config.stages(), &registries)
            .oneshot(rename(""))
            .await
            .unwrap();
        assert_eq!(resp, Outcome::success());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn full_chain_logs_request_then_fault() {
        let (handler, registries, _hits) = setup();
        let logs = LogCapture::new();
        let _guard = logs.install();

        let err = build_pipeline(handler, &PipelineConfig::default().stages(), &registries)
            .oneshot(rename("boom"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "SomeSortOfError");

        let messages: Vec<String> = logs
            .events()
            .into_iter()
            .filter(|event| event.level <= Level::INFO)
            .map(|event| event.message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Processing Rename".to_string(),
                "Request: Unhandled fault for request Rename".to_string(),
            ]
        );
    }
}
