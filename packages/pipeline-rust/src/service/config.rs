use serde::{Deserialize, Serialize};

/// Switches controlling which behaviors wrap every handler.
///
/// Each flag defaults to enabled. A disabled behavior is left out of the
/// chain entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub use_authorization: bool,
    pub use_validation: bool,
    pub use_logging: bool,
    /// Unhandled-fault capture around the handler.
    pub use_exceptions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_authorization: true,
            use_validation: true,
            use_logging: true,
            use_exceptions: true,
        }
    }
}

/// A behavior position in the composed chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Authorization,
    Validation,
    UnhandledFault,
    Logging,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::UnhandledFault => "unhandled_fault",
            Self::Logging => "logging",
        }
    }
}

impl PipelineConfig {
    /// Enabled stages, outermost first. Logging, when enabled, is always last
    /// so it runs immediately before the handler.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        [
            (self.use_authorization, Stage::Authorization),
            (self.use_validation, Stage::Validation),
            (self.use_exceptions, Stage::UnhandledFault),
            (self.use_logging, Stage::Logging),
        ]
        .into_iter()
        .filter_map(|(enabled, stage)| enabled.then_some(stage))
        .collect()
    }
}
