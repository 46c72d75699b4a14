use serde::Serialize;
use thiserror::Error;

/// Transport-level failures reported by a generative capability.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("request timed out after {after_secs}s")]
    Timeout { after_secs: u64 },
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("response blocked by safety filters: {0}")]
    Blocked(String),
    #[error("capability does not support {0}")]
    Unsupported(String),
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed service response: {0}")]
    MalformedResponse(String),
}

impl CapabilityError {
    /// Only timeouts and unavailable services are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }
}

/// Errors surfaced by the generator, the analyzer and background assignment.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),
    #[error("analysis service unavailable: {0}")]
    AnalysisServiceUnavailable(String),
    #[error("could not parse analysis response: {0}")]
    AnalysisParseError(String),
    #[error("external service timed out after {attempts} attempt(s)")]
    ExternalServiceTimeout { attempts: u32 },
    #[error("external service unavailable after {attempts} attempt(s): {message}")]
    ExternalServiceUnavailable { attempts: u32, message: String },
    #[error("capability rejected the request: {0}")]
    CapabilityRejected(String),
    #[error("produced {produced} of {requested} requested records")]
    InsufficientGeneratedRecords { produced: usize, requested: usize },
    #[error("no backgrounds available")]
    NoBackgroundsAvailable,
    #[error("run cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSpec(_) => ErrorKind::InvalidSpec,
            Self::UnsupportedImageFormat(_) => ErrorKind::UnsupportedImageFormat,
            Self::AnalysisServiceUnavailable(_) => ErrorKind::AnalysisServiceUnavailable,
            Self::AnalysisParseError(_) => ErrorKind::AnalysisParseError,
            Self::ExternalServiceTimeout { .. } => ErrorKind::ExternalServiceTimeout,
            Self::ExternalServiceUnavailable { .. } => ErrorKind::ExternalServiceUnavailable,
            Self::CapabilityRejected(_) => ErrorKind::CapabilityRejected,
            Self::InsufficientGeneratedRecords { .. } => ErrorKind::InsufficientGeneratedRecords,
            Self::NoBackgroundsAvailable => ErrorKind::NoBackgroundsAvailable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AnalysisServiceUnavailable(_)
                | Self::ExternalServiceTimeout { .. }
                | Self::ExternalServiceUnavailable { .. }
        )
    }
}

impl From<docsynth_core::Error> for GenerationError {
    fn from(err: docsynth_core::Error) -> Self {
        Self::InvalidSpec(err.to_string())
    }
}

/// Stable, machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidSpec,
    UnsupportedImageFormat,
    AnalysisServiceUnavailable,
    AnalysisParseError,
    ExternalServiceTimeout,
    ExternalServiceUnavailable,
    CapabilityRejected,
    InsufficientGeneratedRecords,
    NoBackgroundsAvailable,
    Cancelled,
    Io,
    Json,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSpec => "invalid_spec",
            Self::UnsupportedImageFormat => "unsupported_image_format",
            Self::AnalysisServiceUnavailable => "analysis_service_unavailable",
            Self::AnalysisParseError => "analysis_parse_error",
            Self::ExternalServiceTimeout => "external_service_timeout",
            Self::ExternalServiceUnavailable => "external_service_unavailable",
            Self::CapabilityRejected => "capability_rejected",
            Self::InsufficientGeneratedRecords => "insufficient_generated_records",
            Self::NoBackgroundsAvailable => "no_backgrounds_available",
            Self::Cancelled => "cancelled",
            Self::Io => "io",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
