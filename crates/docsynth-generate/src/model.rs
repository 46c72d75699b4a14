use serde::{Deserialize, Serialize};

/// Largest batch a single capability call may be asked for.
pub const MAX_BATCH_SIZE: usize = 50;

/// Options for the batch entity generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Records requested per capability call; clamped to `1..=50`.
    pub batch_size: usize,
    /// Consecutive zero-progress calls tolerated before giving up.
    pub max_attempts: u32,
    pub retry: RetryOptions,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_attempts: 3,
            retry: RetryOptions::default(),
        }
    }
}

impl GenerateOptions {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

/// Backoff settings for transient capability failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Counters collected while generating one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub requested: usize,
    pub produced: usize,
    /// Capability call slots used, not counting transient retries.
    pub calls: u32,
    pub transient_retries: u32,
    pub discarded_invalid: u32,
    pub discarded_duplicate: u32,
    pub unparseable_payloads: u32,
}

impl GenerationReport {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    pub fn discarded(&self) -> u32 {
        self.discarded_invalid + self.discarded_duplicate
    }
}
