use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use docsynth_core::DEFAULT_LOCALE;
use docsynth_generate::{BackgroundMode, GenerateOptions, ProviderConfig, ProviderKind};

use crate::error::{PipelineError, PipelineResult};

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "docsynth.toml";

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub provider: ProviderConfig,
    pub generation: GenerateOptions,
    pub backgrounds: BackgroundConfig,
    pub output: OutputConfig,
    pub default_locale: String,
    /// Seed for background selection; a fresh one is drawn when unset.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            generation: GenerateOptions::default(),
            backgrounds: BackgroundConfig::default(),
            output: OutputConfig::default(),
            default_locale: DEFAULT_LOCALE.to_string(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub dir: Option<PathBuf>,
    pub mode: BackgroundMode,
    /// Fail the run when no backgrounds are found.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            file_name: "entity_data.json".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the TOML file, then the process environment (and `.env`).
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        debug!(event = "config_loaded", path = %path.display());
        Ok(config)
    }

    /// Overlay provider settings from environment-style variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> PipelineResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(kind) = get("AI_PROVIDER") {
            self.provider.kind = kind
                .parse::<ProviderKind>()
                .map_err(|err| PipelineError::Config(err.to_string()))?;
        }

        let kind = self.provider.kind;
        if let Some(key) = get(kind.api_key_env()) {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = get(model_env(kind)) {
            self.provider.model = Some(model);
        }
        match kind {
            ProviderKind::Novita => {
                if let Some(model) = get("NOVITA_VISION_MODEL") {
                    self.provider.vision_model = Some(model);
                }
            }
            ProviderKind::Huggingface => {
                if let Some(endpoint) = get("HUGGINGFACE_ENDPOINT") {
                    self.provider.endpoint = Some(endpoint);
                }
            }
            ProviderKind::Gemini => {}
        }

        if let Some(raw) = get("TEMPERATURE") {
            self.provider.temperature = raw
                .parse()
                .map_err(|_| PipelineError::Config(format!("TEMPERATURE is not a number: {raw}")))?;
        }
        if let Some(raw) = get("MAX_TOKENS") {
            self.provider.max_tokens = raw.parse().map_err(|_| {
                PipelineError::Config(format!("MAX_TOKENS is not a positive integer: {raw}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(PipelineError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.provider.temperature
            )));
        }
        if self.provider.max_tokens == 0 {
            return Err(PipelineError::Config("max_tokens must be > 0".to_string()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(PipelineError::Config("timeout_secs must be > 0".to_string()));
        }
        if self.generation.max_attempts == 0 || self.generation.retry.max_attempts == 0 {
            return Err(PipelineError::Config(
                "attempt limits must be at least 1".to_string(),
            ));
        }
        if self.output.file_name.trim().is_empty() {
            return Err(PipelineError::Config("output file name is empty".to_string()));
        }
        if self.default_locale.trim().is_empty() {
            return Err(PipelineError::Config("default locale is empty".to_string()));
        }
        Ok(())
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.file_name)
    }
}

/// Environment variable that overrides the model for `kind`.
pub fn model_env(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Gemini => "GEMINI_MODEL",
        ProviderKind::Novita => "NOVITA_MODEL",
        ProviderKind::Huggingface => "HUGGINGFACE_MODEL",
    }
}
