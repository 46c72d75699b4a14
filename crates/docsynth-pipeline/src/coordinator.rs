use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{error, info, warn};

use docsynth_core::{
    ARTIFACT_VERSION, AnalysisResult, DocumentSpec, EntityArtifact, LocaleFallback, Provenance,
    SpecOverrides, locale, validate_batch,
};
use docsynth_generate::{
    BackgroundMode, BackgroundPool, BatchEntityGenerator, CancellationToken, GenerationError,
    GenerativeCapability, ReferenceAnalyzer, ReferenceImage, RetryOptions, RetryPolicy, assign,
};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::persist::save_entity_artifact;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    SpecResolved,
    Generating,
    Assigning,
    Persisted,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SpecResolved => "spec_resolved",
            Self::Generating => "generating",
            Self::Assigning => "assigning",
            Self::Persisted => "persisted",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, SpecResolved)
            | (SpecResolved, Generating)
            | (Generating, Assigning)
            | (Assigning, Persisted)
            | (Persisted, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the document spec comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    Manual(DocumentSpec),
    Analysis {
        analysis: AnalysisResult,
        overrides: SpecOverrides,
    },
    /// Analyze this image first, then derive the spec from the result.
    ReferenceImage {
        path: PathBuf,
        overrides: SpecOverrides,
    },
}

/// What a successful run produced, for renderers and operators.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub artifact_path: PathBuf,
    pub document_type: String,
    pub locale: String,
    pub locale_fallback: Option<LocaleFallback>,
    pub provider: String,
    pub model: String,
    pub requested: usize,
    pub produced: usize,
    pub generation_calls: u32,
    pub discarded_records: u32,
    pub backgrounds_assigned: usize,
    pub background_mode: BackgroundMode,
    pub seed: u64,
    pub elapsed_ms: u64,
}

/// Runs the spec → generate → assign → persist sequence exactly once.
pub struct PipelineCoordinator {
    config: PipelineConfig,
    capability: Arc<dyn GenerativeCapability>,
    run_id: String,
    state: PipelineState,
    history: Vec<PipelineState>,
    cancel: CancellationToken,
}

impl PipelineCoordinator {
    pub fn new(config: PipelineConfig, capability: Arc<dyn GenerativeCapability>) -> Self {
        Self {
            config,
            capability,
            run_id: uuid::Uuid::new_v4().to_string(),
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// States visited so far, starting with `Idle`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Token that aborts the run before the next capability call.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn run(&mut self, source: SpecSource) -> PipelineResult<RunSummary> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::AlreadyRun);
        }

        let started = Instant::now();
        info!(
            event = "run_started",
            run_id = %self.run_id,
            provider = self.capability.name(),
        );

        match self.execute(source, started) {
            Ok(summary) => {
                info!(
                    event = "run_finished",
                    run_id = %self.run_id,
                    status = "success",
                    artifact = %summary.artifact_path.display(),
                    produced = summary.produced,
                    duration_ms = summary.elapsed_ms,
                );
                Ok(summary)
            }
            Err(err) => {
                let failed_in = self.state;
                if !self.state.is_terminal() {
                    self.state = PipelineState::Failed;
                    self.history.push(PipelineState::Failed);
                }
                error!(
                    event = "run_failed",
                    run_id = %self.run_id,
                    stage = %failed_in,
                    kind = err.kind(),
                    error = %err,
                );
                Err(err)
            }
        }
    }

    fn execute(&mut self, source: SpecSource, started: Instant) -> PipelineResult<RunSummary> {
        let capability = Arc::clone(&self.capability);

        let (spec, analysis) = self
            .resolve_spec(source, capability.as_ref())
            .map_err(|err| self.stage_error(err))?;
        let resolution = locale::lookup(&spec.locale);
        if let Some(fallback) = &resolution.fallback {
            warn!(
                event = "locale_fallback",
                run_id = %self.run_id,
                requested = %fallback.requested,
                fallback = %fallback.fallback,
            );
        }
        self.transition(PipelineState::SpecResolved)?;
        info!(
            event = "spec_resolved",
            document_type = %spec.document_type,
            locale = %spec.locale,
            fields = spec.entity_fields.len(),
            records = spec.record_count,
        );

        self.transition(PipelineState::Generating)?;
        let seed_examples: Option<&BTreeMap<String, String>> = analysis
            .as_ref()
            .map(|analysis| &analysis.extracted_entities)
            .filter(|examples| !examples.is_empty());
        let generator =
            BatchEntityGenerator::new(capability.as_ref(), self.config.generation.clone())
                .with_cancellation(self.cancel.clone());
        let (batch, report) = generator
            .generate_with_report(&spec, &resolution.rules, seed_examples)
            .map_err(|err| self.stage_error(err))?;

        if self.cancel.is_cancelled() {
            return Err(self.stage_error(GenerationError::Cancelled));
        }

        self.transition(PipelineState::Assigning)?;
        let backgrounds = &self.config.backgrounds;
        let pool = match &backgrounds.dir {
            Some(dir) => BackgroundPool::scan(dir).map_err(|err| self.stage_error(err.into()))?,
            None => BackgroundPool::default(),
        };
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let batch = assign(batch, &pool, backgrounds.mode, backgrounds.required, &mut rng)
            .map_err(|err| self.stage_error(err))?;
        validate_batch(&batch, &spec).map_err(|err| self.stage_error(err.into()))?;
        let backgrounds_assigned = batch
            .iter()
            .filter(|record| record.background_ref.is_some())
            .count();

        let model_info = capability.model_info();
        let provenance = Provenance {
            artifact_version: ARTIFACT_VERSION.to_string(),
            run_id: self.run_id.clone(),
            generated_at: Utc::now().to_rfc3339(),
            provider: model_info.provider.clone(),
            model: Some(model_info.model.clone()),
            seed,
            background_mode: backgrounds.mode.to_string(),
            analysis,
        };
        let artifact = EntityArtifact::new(&spec.document_type, &spec.locale, batch)
            .with_provenance(provenance);
        let artifact_path = self.config.artifact_path();
        save_entity_artifact(&artifact_path, &artifact)?;
        self.transition(PipelineState::Persisted)?;
        info!(event = "artifact_written", path = %artifact_path.display());

        let summary = RunSummary {
            run_id: self.run_id.clone(),
            artifact_path,
            document_type: spec.document_type.clone(),
            locale: spec.locale.clone(),
            locale_fallback: resolution.fallback,
            provider: model_info.provider,
            model: model_info.model,
            requested: report.requested,
            produced: report.produced,
            generation_calls: report.calls,
            discarded_records: report.discarded(),
            backgrounds_assigned,
            background_mode: self.config.backgrounds.mode,
            seed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        self.transition(PipelineState::Done)?;
        Ok(summary)
    }

    fn resolve_spec(
        &self,
        source: SpecSource,
        capability: &dyn GenerativeCapability,
    ) -> Result<(DocumentSpec, Option<AnalysisResult>), GenerationError> {
        match source {
            SpecSource::Manual(spec) => Ok((spec, None)),
            SpecSource::Analysis {
                analysis,
                overrides,
            } => {
                let spec = DocumentSpec::from_analysis(&analysis, &overrides)?;
                Ok((spec, Some(analysis)))
            }
            SpecSource::ReferenceImage { path, overrides } => {
                let analysis =
                    analyze_reference(capability, &path, &self.config.generation.retry)?;
                let spec = DocumentSpec::from_analysis(&analysis, &overrides)?;
                Ok((spec, Some(analysis)))
            }
        }
    }

    fn transition(&mut self, next: PipelineState) -> PipelineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!(event = "state_transition", from = %self.state, to = %next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn stage_error(&self, source: GenerationError) -> PipelineError {
        PipelineError::Stage {
            stage: self.state,
            source,
        }
    }
}

/// Analyze a reference image file, retrying transient failures.
pub fn analyze_reference(
    capability: &dyn GenerativeCapability,
    path: &Path,
    retry: &RetryOptions,
) -> Result<AnalysisResult, GenerationError> {
    let image = ReferenceImage::from_path(path)?;
    let analyzer = ReferenceAnalyzer::new(capability);
    RetryPolicy::new(retry)
        .run("analyze_image", || analyzer.analyze(&image))
        .map(|retried| retried.value)
        .map_err(|failure| match failure.error {
            GenerationError::ExternalServiceTimeout { .. } => {
                GenerationError::ExternalServiceTimeout {
                    attempts: failure.attempts,
                }
            }
            other => other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_edges_and_failures_are_legal() {
        use PipelineState::*;
        assert!(Idle.can_transition_to(SpecResolved));
        assert!(Assigning.can_transition_to(Persisted));
        assert!(Generating.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Generating));
        assert!(!Persisted.can_transition_to(Assigning));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }
}
