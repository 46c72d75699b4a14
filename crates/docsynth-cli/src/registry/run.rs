use std::fs::{OpenOptions, create_dir_all};
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use docsynth_pipeline::{PipelineConfig, PipelineError, write_json_atomic};

use super::RegistryResult;

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// Subcommand that opened the run.
    pub command: &'static str,
    pub run_dir: PathBuf,
}

/// JSON config written to each run directory. API keys never appear here.
#[derive(Debug, Serialize)]
struct RunConfig<'a> {
    run_id: &'a str,
    started_at: String,
    command: &'a str,
    cli_version: &'static str,
    config: &'a PipelineConfig,
    git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
struct GitInfo {
    commit: Option<String>,
    dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Final record of a run, successful or not.
#[derive(Debug, Serialize)]
pub struct RunOutcome<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> RunOutcome<T> {
    pub fn success(result: T) -> Self {
        Self {
            status: "success",
            result: Some(result),
            error_kind: None,
            failed_stage: None,
            message: None,
        }
    }
}

impl RunOutcome<()> {
    pub fn failure(err: &PipelineError) -> Self {
        Self {
            status: "failed",
            result: None,
            error_kind: Some(err.kind().to_string()),
            failed_stage: err.stage().map(|stage| stage.as_str().to_string()),
            message: Some(err.to_string()),
        }
    }
}

pub fn start_run(ctx: &RunContext, config: &PipelineConfig) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));
    create_dir_all(&root)?;

    let logs_path = root.join("logs.ndjson");
    let run_config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        command: ctx.command,
        cli_version: env!("CARGO_PKG_VERSION"),
        config,
        git: collect_git_info(),
    };
    write_json_atomic(&root.join("config.json"), &run_config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        summary_path: root.join("summary.json"),
        logs_path,
        root,
    })
}

pub fn finish_run<T: Serialize>(paths: &RunPaths, outcome: &RunOutcome<T>) -> RegistryResult<()> {
    write_json_atomic(&paths.summary_path, outcome)?;
    Ok(())
}

fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}
