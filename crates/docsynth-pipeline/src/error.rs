use thiserror::Error;

use docsynth_generate::GenerationError;

use crate::coordinator::PipelineState;

/// Errors surfaced by the pipeline crate.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A run failed while in `stage`.
    #[error("run failed during {stage}: {source}")]
    Stage {
        stage: PipelineState,
        #[source]
        source: GenerationError,
    },
    #[error("illegal state transition {from} -> {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },
    #[error("coordinator has already run")]
    AlreadyRun,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid artifact: {0}")]
    Artifact(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
}

impl PipelineError {
    /// Stable snake_case kind used in summaries and exit handling.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stage { source, .. } => source.kind().as_str(),
            Self::InvalidTransition { .. } | Self::AlreadyRun => "invalid_transition",
            Self::Config(_) | Self::TomlDecode(_) => "config",
            Self::Artifact(_) => "invalid_artifact",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    pub fn stage(&self) -> Option<PipelineState> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<docsynth_core::Error> for PipelineError {
    fn from(err: docsynth_core::Error) -> Self {
        Self::Artifact(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
