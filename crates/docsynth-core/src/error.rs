use thiserror::Error;

/// Core error type shared across docsynth crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The document spec violates its invariants.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
    /// An entity batch or artifact does not satisfy its spec.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),
    /// An artifact could not be read back into its contract types.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
    /// JSON Schema compilation failed.
    #[error("schema error: {0}")]
    Schema(String),
}

/// Convenience alias for results returned by docsynth crates.
pub type Result<T> = std::result::Result<T, Error>;
