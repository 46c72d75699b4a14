use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use docsynth_core::{
    AnalysisResult, EntityArtifact, analysis_artifact_json_schema, validate_artifact_json,
};

use crate::error::{PipelineError, PipelineResult};

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    let data = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &data)
}

/// Write `data` next to `path` and rename it into place.
///
/// Readers see either the previous file or the complete new one.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> PipelineResult<()> {
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path)?;
    let written = write_and_sync(&tmp_path, data).and_then(|()| {
        if let Some(parent) = parent {
            sync_dir(parent)?;
        }
        std::fs::rename(&tmp_path, path)
    });
    if let Err(err) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    if let Some(parent) = parent {
        sync_dir(parent)?;
    }
    Ok(())
}

fn write_and_sync(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PipelineResult<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| PipelineError::Artifact("invalid path for atomic write".to_string()))?;
    let tmp_name = format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    );
    Ok(path.with_file_name(tmp_name))
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

pub fn save_entity_artifact(path: &Path, artifact: &EntityArtifact) -> PipelineResult<()> {
    write_json_atomic(path, artifact)
}

pub fn load_entity_artifact(path: &Path) -> PipelineResult<EntityArtifact> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|err| {
        PipelineError::Artifact(format!("{}: {err}", path.display()))
    })
}

pub fn save_analysis_artifact(path: &Path, analysis: &AnalysisResult) -> PipelineResult<()> {
    write_json_atomic(path, analysis)
}

/// Read an analysis artifact, checking it against its JSON Schema first.
pub fn load_analysis_artifact(path: &Path) -> PipelineResult<AnalysisResult> {
    let content = std::fs::read_to_string(path)?;
    let instance: Value = serde_json::from_str(&content)
        .map_err(|err| PipelineError::Artifact(format!("{}: {err}", path.display())))?;

    let schema = serde_json::to_value(analysis_artifact_json_schema())?;
    let report = validate_artifact_json(&instance, &schema)?;
    if !report.is_ok() {
        return Err(PipelineError::Artifact(format!(
            "{}: {}",
            path.display(),
            report.summary()
        )));
    }

    serde_json::from_value(instance)
        .map_err(|err| PipelineError::Artifact(format!("{}: {err}", path.display())))
}
