use std::fmt;
use std::path::Path;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use docsynth_core::EntityBatch;

use crate::errors::GenerationError;

const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "tif", "tiff", "bmp"];

/// How backgrounds are distributed across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    /// One background for the whole batch.
    Shared,
    /// An independent pick per record; repeats allowed.
    #[default]
    PerDocument,
}

impl BackgroundMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::PerDocument => "per_document",
        }
    }
}

impl fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered snapshot of background image references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundPool {
    refs: Vec<String>,
}

impl BackgroundPool {
    pub fn from_refs(refs: Vec<String>) -> Self {
        Self { refs }
    }

    /// Snapshot the raster files in `dir`, sorted by file name.
    ///
    /// A missing directory yields an empty pool.
    pub fn scan(dir: &Path) -> std::io::Result<Self> {
        if !dir.exists() {
            return Ok(Self::default());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_raster = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| RASTER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_raster {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(Self {
            refs: files
                .into_iter()
                .map(|path| path.display().to_string())
                .collect(),
        })
    }

    pub fn refs(&self) -> &[String] {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Set `_background_ref` on every record of `batch`.
///
/// An empty pool fails only when backgrounds are `required`; otherwise the
/// records keep no background.
pub fn assign(
    mut batch: EntityBatch,
    pool: &BackgroundPool,
    mode: BackgroundMode,
    required: bool,
    rng: &mut dyn RngCore,
) -> Result<EntityBatch, GenerationError> {
    if pool.is_empty() {
        if required {
            return Err(GenerationError::NoBackgroundsAvailable);
        }
        warn!(event = "backgrounds_skipped", records = batch.len());
        for record in batch.records_mut() {
            record.background_ref = None;
        }
        return Ok(batch);
    }

    match mode {
        BackgroundMode::Shared => {
            let chosen = &pool.refs[rng.random_range(0..pool.len())];
            for record in batch.records_mut() {
                record.background_ref = Some(chosen.clone());
            }
        }
        BackgroundMode::PerDocument => {
            for record in batch.records_mut() {
                let chosen = &pool.refs[rng.random_range(0..pool.len())];
                record.background_ref = Some(chosen.clone());
            }
        }
    }

    info!(
        event = "backgrounds_assigned",
        mode = %mode,
        pool_size = pool.len(),
        records = batch.len(),
    );
    Ok(batch)
}
