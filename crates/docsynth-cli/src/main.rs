mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use docsynth_core::{
    DocumentSpec, SpecOverrides, analysis_artifact_json_schema, entity_artifact_json_schema,
    locale, parse_field_list, redact_url,
};
use docsynth_generate::{
    BackgroundMode, BatchEntityGenerator, CapabilityError, GenerativeCapability,
    ProviderKind, build_capability,
};
use docsynth_pipeline::{
    PipelineConfig, PipelineCoordinator, PipelineError, SpecSource, analyze_reference,
    apply_values, save_analysis_artifact,
};
use registry::{RunContext, RunOutcome, RunPaths, finish_run, init_logging, start_run};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Records generated when `--count` is not given.
const DEFAULT_RECORD_COUNT: usize = 10;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("{0}")]
    Pipeline(#[from] PipelineError),
    #[error("provider error: {0}")]
    Capability(#[from] CapabilityError),
    #[error("invalid input: {0}")]
    Core(#[from] docsynth_core::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

#[derive(Parser, Debug)]
#[command(name = "docsynth", version, about = "Synthetic document entity generator")]
struct Cli {
    /// TOML config file (defaults to ./docsynth.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate entity records and write the entity artifact.
    Generate(GenerateArgs),
    /// Analyze a reference image and write the analysis artifact.
    Analyze(AnalyzeArgs),
    /// Copy one attribute between two entity artifacts, record by record.
    ApplyValue(ApplyValueArgs),
    /// Show provider configuration and model info.
    Providers(ProvidersArgs),
    /// List supported locale codes.
    Locales,
    /// Print the JSON Schema of an artifact.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct ProviderFlags {
    /// Provider to use (gemini, novita, huggingface).
    #[arg(long)]
    provider: Option<ProviderKind>,
    /// Model override for the selected provider.
    #[arg(long)]
    model: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Document type, e.g. "invoice".
    #[arg(long)]
    document_type: Option<String>,
    /// Comma-separated entity field names.
    #[arg(long)]
    fields: Option<String>,
    /// Number of records to generate (default 10).
    #[arg(long)]
    count: Option<usize>,
    /// Locale code, e.g. "de".
    #[arg(long)]
    locale: Option<String>,
    /// Derive the spec from a saved analysis artifact.
    #[arg(long, conflicts_with = "reference_image")]
    analysis: Option<PathBuf>,
    /// Analyze this image first and derive the spec from it.
    #[arg(long)]
    reference_image: Option<PathBuf>,
    /// Output directory for the entity artifact.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Entity artifact file name.
    #[arg(long)]
    file_name: Option<String>,
    /// Directory of background images.
    #[arg(long)]
    backgrounds: Option<PathBuf>,
    /// Background assignment mode.
    #[arg(long, value_enum)]
    background_mode: Option<BackgroundModeArg>,
    /// Fail when no background images are found.
    #[arg(long, default_value_t = false)]
    require_backgrounds: bool,
    /// Seed for background selection.
    #[arg(long)]
    seed: Option<u64>,
    /// Records requested per generation call.
    #[arg(long)]
    batch_size: Option<usize>,
    #[command(flatten)]
    provider: ProviderFlags,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Reference document image.
    image: PathBuf,
    /// Where to write the analysis artifact.
    #[arg(long, default_value = "analysis_output/document_analysis.json")]
    out: PathBuf,
    #[command(flatten)]
    provider: ProviderFlags,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ApplyValueArgs {
    /// Source entity artifact.
    from: PathBuf,
    /// Target entity artifact, rewritten in place.
    to: PathBuf,
    /// Attribute read from each source record.
    from_attribute: String,
    /// Attribute written on each target record.
    to_attribute: String,
    /// Create the target attribute when a record lacks it.
    #[arg(long, default_value_t = false)]
    add_missing: bool,
}

#[derive(Args, Debug)]
struct ProvidersArgs {
    #[command(flatten)]
    provider: ProviderFlags,
    /// Ask the selected provider for one sample record.
    #[arg(long, default_value_t = false)]
    test: bool,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    #[arg(value_enum, default_value_t = SchemaKind::Entity)]
    kind: SchemaKind,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaKind {
    Entity,
    Analysis,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackgroundModeArg {
    Shared,
    PerDocument,
}

impl From<BackgroundModeArg> for BackgroundMode {
    fn from(value: BackgroundModeArg) -> Self {
        match value {
            BackgroundModeArg::Shared => BackgroundMode::Shared,
            BackgroundModeArg::PerDocument => BackgroundMode::PerDocument,
        }
    }
}

/// Provider status line printed by `providers`.
#[derive(Debug, Serialize)]
struct ProviderStatus {
    provider: &'static str,
    selected: bool,
    api_key_env: &'static str,
    api_key_set: bool,
    model: String,
    vision_model: Option<String>,
    endpoint: String,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Generate(args) => run_generate(PipelineConfig::load(config)?, args),
        Command::Analyze(args) => run_analyze(PipelineConfig::load(config)?, args),
        Command::ApplyValue(args) => run_apply_value(args),
        Command::Providers(args) => run_providers(PipelineConfig::load(config)?, args),
        Command::Locales => run_locales(),
        Command::Schema(args) => run_schema(args),
    }
}

fn apply_provider_flags(config: &mut PipelineConfig, flags: &ProviderFlags) -> Result<(), CliError> {
    if let Some(kind) = flags.provider {
        if kind != config.provider.kind {
            config.provider.kind = kind;
            // Key and model from the environment belong to the previous provider.
            config.provider.api_key = None;
            config.provider.model = None;
            config.provider.vision_model = None;
            config.provider.endpoint = None;
            config.apply_env(|key| {
                (key != "AI_PROVIDER")
                    .then(|| std::env::var(key).ok())
                    .flatten()
            })?;
        }
    }
    if let Some(model) = &flags.model {
        config.provider.model = Some(model.clone());
    }
    Ok(())
}

fn run_generate(mut config: PipelineConfig, args: GenerateArgs) -> Result<(), CliError> {
    apply_provider_flags(&mut config, &args.provider)?;
    if let Some(dir) = args.out_dir {
        config.output.dir = dir;
    }
    if let Some(file_name) = args.file_name {
        config.output.file_name = file_name;
    }
    if let Some(dir) = args.backgrounds {
        config.backgrounds.dir = Some(dir);
    }
    if let Some(mode) = args.background_mode {
        config.backgrounds.mode = mode.into();
    }
    if args.require_backgrounds {
        config.backgrounds.required = true;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(batch_size) = args.batch_size {
        config.generation.batch_size = batch_size;
    }
    config.validate()?;

    let overrides = SpecOverrides {
        document_type: args.document_type,
        entity_fields: args.fields.as_deref().map(parse_field_list),
        locale: args.locale,
        record_count: Some(args.count.unwrap_or(DEFAULT_RECORD_COUNT)),
    };

    let source = match (args.analysis, args.reference_image) {
        (Some(path), _) => SpecSource::Analysis {
            analysis: docsynth_pipeline::load_analysis_artifact(&path)?,
            overrides,
        },
        (None, Some(path)) => SpecSource::ReferenceImage { path, overrides },
        (None, None) => {
            let (Some(document_type), Some(fields)) =
                (overrides.document_type, overrides.entity_fields)
            else {
                return Err(CliError::InvalidArgs(
                    "--document-type and --fields are required without --analysis or --reference-image"
                        .to_string(),
                ));
            };
            let locale = overrides
                .locale
                .unwrap_or_else(|| config.default_locale.clone());
            SpecSource::Manual(DocumentSpec::new(
                document_type,
                fields,
                locale,
                overrides.record_count.unwrap_or(DEFAULT_RECORD_COUNT),
            )?)
        }
    };

    let run_id = Uuid::new_v4().to_string();
    let paths = open_run(&run_id, "generate", &args.run_dir, &config)?;

    let capability: Arc<dyn GenerativeCapability> = Arc::from(build_capability(&config.provider)?);
    let mut coordinator = PipelineCoordinator::new(config, capability).with_run_id(run_id.clone());

    match coordinator.run(source) {
        Ok(summary) => {
            finish_run(&paths, &RunOutcome::success(&summary))?;
            info!(
                event = "run_completed",
                run_id = %run_id,
                artifact = %summary.artifact_path.display(),
                records = summary.produced,
                run_dir = %paths.root.display(),
            );
            println!("{}", summary.artifact_path.display());
            Ok(())
        }
        Err(err) => {
            record_failure(&paths, &err)?;
            Err(err.into())
        }
    }
}

fn run_analyze(mut config: PipelineConfig, args: AnalyzeArgs) -> Result<(), CliError> {
    apply_provider_flags(&mut config, &args.provider)?;
    config.validate()?;

    let run_id = Uuid::new_v4().to_string();
    let paths = open_run(&run_id, "analyze", &args.run_dir, &config)?;
    let capability = build_capability(&config.provider)?;

    let analysis = match analyze_reference(capability.as_ref(), &args.image, &config.generation.retry)
    {
        Ok(analysis) => analysis,
        Err(source) => {
            let err = PipelineError::Stage {
                stage: docsynth_pipeline::PipelineState::Idle,
                source,
            };
            record_failure(&paths, &err)?;
            return Err(err.into());
        }
    };

    if let Err(err) = save_analysis_artifact(&args.out, &analysis) {
        record_failure(&paths, &err)?;
        return Err(err.into());
    }
    finish_run(&paths, &RunOutcome::success(&analysis))?;
    info!(
        event = "analysis_saved",
        run_id = %run_id,
        path = %args.out.display(),
        document_type = %analysis.document_type,
        locale = %analysis.detected_locale,
    );
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn run_apply_value(args: ApplyValueArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let report = apply_values(
        &args.from,
        &args.to,
        &args.from_attribute,
        &args.to_attribute,
        args.add_missing,
    )?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_providers(mut config: PipelineConfig, args: ProvidersArgs) -> Result<(), CliError> {
    init_logging(None)?;
    apply_provider_flags(&mut config, &args.provider)?;

    let selected = config.provider.kind;
    let statuses: Vec<ProviderStatus> = ProviderKind::ALL
        .into_iter()
        .map(|kind| {
            let mut provider = config.provider.clone();
            if kind != selected {
                provider.kind = kind;
                provider.model = None;
                provider.vision_model = None;
                provider.endpoint = None;
                provider.api_key = std::env::var(kind.api_key_env()).ok();
            }
            ProviderStatus {
                provider: kind.as_str(),
                selected: kind == selected,
                api_key_env: kind.api_key_env(),
                api_key_set: provider.has_api_key(),
                model: provider.resolved_model(),
                vision_model: provider.resolved_vision_model(),
                endpoint: redact_url(&provider.resolved_endpoint()),
            }
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&statuses)?);

    if args.test {
        let capability = build_capability(&config.provider)?;
        let rules = locale::resolve(&config.default_locale);
        let spec = DocumentSpec::new(
            "invoice",
            vec!["customer_name".to_string(), "total_amount".to_string()],
            rules.locale_code.clone(),
            1,
        )?;
        let batch = BatchEntityGenerator::new(capability.as_ref(), config.generation.clone())
            .generate(&spec, &rules, None)
            .map_err(|source| PipelineError::Stage {
                stage: docsynth_pipeline::PipelineState::Generating,
                source,
            })?;
        println!("{}", serde_json::to_string_pretty(&batch)?);
    }
    Ok(())
}

fn run_locales() -> Result<(), CliError> {
    for code in locale::supported_codes() {
        let rules = locale::resolve(code);
        println!(
            "{code}\t{}\t{}",
            rules.language_name,
            rules.date_format_style.pattern()
        );
    }
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = match args.kind {
        SchemaKind::Entity => entity_artifact_json_schema(),
        SchemaKind::Analysis => analysis_artifact_json_schema(),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn open_run(
    run_id: &str,
    command: &'static str,
    run_dir: &std::path::Path,
    config: &PipelineConfig,
) -> Result<RunPaths, CliError> {
    let ctx = RunContext {
        run_id: run_id.to_string(),
        started_at: Utc::now(),
        command,
        run_dir: run_dir.to_path_buf(),
    };
    let paths = start_run(&ctx, config)?;
    init_logging(Some(&paths.logs_path))?;
    info!(
        event = "run_registered",
        run_id = %run_id,
        command,
        run_dir = %paths.root.display(),
    );
    Ok(paths)
}

fn record_failure(paths: &RunPaths, err: &PipelineError) -> Result<(), CliError> {
    error!(
        event = "run_failed",
        kind = err.kind(),
        stage = err.stage().map(|stage| stage.as_str()),
        error = %err,
    );
    finish_run(paths, &RunOutcome::<()>::failure(err))?;
    Ok(())
}
