use std::path::{Path, PathBuf};
use std::sync::Arc;

use docsynth_core::{AnalysisResult, Confidence, DocumentSpec, SpecOverrides};
use docsynth_generate::{BackgroundMode, CapabilityError, RetryOptions, ScriptedCapability};
use docsynth_pipeline::{
    PipelineConfig, PipelineCoordinator, PipelineState, SpecSource, load_entity_artifact,
};

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("docsynth_{label}_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output.dir = root.join("output");
    config.seed = Some(2024);
    config.generation.retry = RetryOptions {
        max_attempts: 3,
        base_delay_ms: 0,
        max_delay_ms: 0,
    };
    config
}

fn invoice_spec(count: usize) -> DocumentSpec {
    DocumentSpec::new(
        "invoice",
        vec!["customer".to_string(), "total".to_string()],
        "en",
        count,
    )
    .expect("valid spec")
}

fn payload(range: std::ops::Range<usize>) -> String {
    let records: Vec<String> = range
        .map(|i| format!(r#"{{"customer": "Customer {i}", "total": "${i}.00"}}"#))
        .collect();
    format!("[{}]", records.join(","))
}

fn png_bytes() -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        4,
        4,
        image::Rgb([250, 250, 250]),
    ));
    let mut bytes = Vec::new();
    image
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}

#[test]
fn manual_run_persists_artifact_and_walks_every_state() {
    let root = temp_dir("manual");
    let capability = Arc::new(ScriptedCapability::new().with_batch_response(payload(0..3)));
    let mut coordinator = PipelineCoordinator::new(config(&root), capability.clone());

    let summary = coordinator
        .run(SpecSource::Manual(invoice_spec(3)))
        .expect("run succeeds");

    assert_eq!(
        coordinator.history(),
        &[
            PipelineState::Idle,
            PipelineState::SpecResolved,
            PipelineState::Generating,
            PipelineState::Assigning,
            PipelineState::Persisted,
            PipelineState::Done,
        ]
    );
    assert_eq!(summary.produced, 3);
    assert_eq!(summary.generation_calls, 1);
    assert_eq!(summary.seed, 2024);
    assert!(summary.locale_fallback.is_none());
    assert_eq!(summary.backgrounds_assigned, 0);

    let artifact = load_entity_artifact(&summary.artifact_path).expect("reload artifact");
    assert_eq!(artifact.document_type, "invoice");
    assert_eq!(artifact.language, "en");
    let customers: Vec<&str> = artifact
        .entities
        .iter()
        .filter_map(|record| record.get("customer"))
        .collect();
    assert_eq!(customers, vec!["Customer 0", "Customer 1", "Customer 2"]);

    let provenance = artifact.provenance.expect("provenance");
    assert_eq!(provenance.run_id, coordinator.run_id());
    assert_eq!(provenance.seed, 2024);
    assert_eq!(provenance.provider, "scripted");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn required_backgrounds_missing_fails_without_artifact() {
    let root = temp_dir("no_backgrounds");
    let mut config = config(&root);
    config.backgrounds.dir = Some(root.join("backgrounds"));
    config.backgrounds.mode = BackgroundMode::PerDocument;
    config.backgrounds.required = true;
    let artifact_path = config.artifact_path();

    let capability = Arc::new(ScriptedCapability::new().with_batch_response(payload(0..2)));
    let mut coordinator = PipelineCoordinator::new(config, capability);

    let err = coordinator
        .run(SpecSource::Manual(invoice_spec(2)))
        .expect_err("run fails");

    assert_eq!(err.kind(), "no_backgrounds_available");
    assert_eq!(err.stage(), Some(PipelineState::Assigning));
    assert_eq!(coordinator.state(), PipelineState::Failed);
    assert!(!artifact_path.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn failed_run_leaves_prior_artifact_untouched() {
    let root = temp_dir("prior");
    let config = config(&root);
    let artifact_path = config.artifact_path();
    std::fs::create_dir_all(artifact_path.parent().expect("parent")).expect("create output");
    std::fs::write(&artifact_path, b"previous artifact").expect("write prior");

    let capability = Arc::new(ScriptedCapability::new().with_batch_response(payload(0..1)));
    let mut coordinator = PipelineCoordinator::new(config, capability);

    let err = coordinator
        .run(SpecSource::Manual(invoice_spec(4)))
        .expect_err("shortfall");

    assert_eq!(err.kind(), "insufficient_generated_records");
    assert_eq!(err.stage(), Some(PipelineState::Generating));
    let content = std::fs::read(&artifact_path).expect("read prior");
    assert_eq!(content, b"previous artifact");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn backgrounds_are_recorded_per_record() {
    let root = temp_dir("backgrounds");
    let backgrounds = root.join("backgrounds");
    std::fs::create_dir_all(&backgrounds).expect("create backgrounds");
    for name in ["linen.png", "kraft.jpg"] {
        std::fs::write(backgrounds.join(name), b"x").expect("write background");
    }

    let mut config = config(&root);
    config.backgrounds.dir = Some(backgrounds);
    let capability = Arc::new(ScriptedCapability::new().with_batch_response(payload(0..5)));
    let mut coordinator = PipelineCoordinator::new(config, capability);

    let summary = coordinator
        .run(SpecSource::Manual(invoice_spec(5)))
        .expect("run succeeds");
    assert_eq!(summary.backgrounds_assigned, 5);

    let artifact = load_entity_artifact(&summary.artifact_path).expect("reload");
    for record in &artifact.entities {
        let reference = record.background_ref.as_deref().expect("background assigned");
        assert!(reference.ends_with("linen.png") || reference.ends_with("kraft.jpg"));
    }

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn overrides_win_over_analysis() {
    let root = temp_dir("overrides");
    let analysis = AnalysisResult {
        document_type: "ใบแจ้งหนี้".to_string(),
        detected_locale: "th".to_string(),
        confidence: Confidence::High,
        extracted_entities: [("customer".to_string(), "สมชาย".to_string())]
            .into_iter()
            .collect(),
    };
    let capability = Arc::new(
        ScriptedCapability::new().with_batch_response(r#"[{"customer": "Jane Doe"}]"#),
    );
    let mut coordinator = PipelineCoordinator::new(config(&root), capability.clone());

    let summary = coordinator
        .run(SpecSource::Analysis {
            analysis,
            overrides: SpecOverrides {
                locale: Some("en".to_string()),
                record_count: Some(1),
                ..SpecOverrides::default()
            },
        })
        .expect("run succeeds");

    assert_eq!(summary.locale, "en");
    assert_eq!(summary.document_type, "ใบแจ้งหนี้");
    let calls = capability.batch_calls();
    assert_eq!(calls[0].rules.locale_code, "en");
    assert!(calls[0].seed_examples.is_some());

    let artifact = load_entity_artifact(&summary.artifact_path).expect("reload");
    let provenance = artifact.provenance.expect("provenance");
    assert_eq!(
        provenance.analysis.map(|analysis| analysis.detected_locale),
        Some("th".to_string())
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn reference_image_analysis_is_retried_when_transient() {
    let root = temp_dir("reference");
    let image_path = root.join("reference.png");
    std::fs::write(&image_path, png_bytes()).expect("write image");

    let capability = Arc::new(
        ScriptedCapability::new()
            .with_analysis_error(CapabilityError::Unavailable("status 503".to_string()))
            .with_analysis_response(
                r#"{"document_type": "Rechnung", "detected_language": "de", "confidence": "low", "extracted_entities": {"Kunde": "Müller GmbH"}}"#,
            )
            .with_batch_response(r#"[{"Kunde": "Schmidt AG"}, {"Kunde": "Weber KG"}]"#),
    );
    let mut coordinator = PipelineCoordinator::new(config(&root), capability.clone());

    let summary = coordinator
        .run(SpecSource::ReferenceImage {
            path: image_path,
            overrides: SpecOverrides {
                record_count: Some(2),
                ..SpecOverrides::default()
            },
        })
        .expect("run succeeds");

    assert_eq!(capability.analysis_calls(), 2);
    assert_eq!(summary.locale, "de");
    assert_eq!(summary.document_type, "Rechnung");
    assert_eq!(summary.produced, 2);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn cancelled_run_writes_nothing() {
    let root = temp_dir("cancel");
    let config = config(&root);
    let artifact_path = config.artifact_path();
    let capability = Arc::new(ScriptedCapability::new().with_batch_response(payload(0..2)));
    let mut coordinator = PipelineCoordinator::new(config, capability.clone());
    coordinator.cancellation_token().cancel();

    let err = coordinator
        .run(SpecSource::Manual(invoice_spec(2)))
        .expect_err("cancelled");

    assert_eq!(err.kind(), "cancelled");
    assert!(capability.batch_calls().is_empty());
    assert!(!artifact_path.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn unknown_locale_falls_back_and_is_reported() {
    let root = temp_dir("fallback");
    let capability = Arc::new(ScriptedCapability::new().with_batch_response(payload(0..1)));
    let mut coordinator = PipelineCoordinator::new(config(&root), capability.clone());
    let spec = DocumentSpec::new(
        "invoice",
        vec!["customer".to_string(), "total".to_string()],
        "tlh",
        1,
    )
    .expect("valid spec");

    let summary = coordinator
        .run(SpecSource::Manual(spec))
        .expect("run succeeds");

    let fallback = summary.locale_fallback.expect("fallback recorded");
    assert_eq!(fallback.requested, "tlh");
    assert_eq!(fallback.fallback, "en");
    assert_eq!(capability.batch_calls()[0].rules.locale_code, "en");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn coordinator_runs_once() {
    let root = temp_dir("once");
    let capability = Arc::new(
        ScriptedCapability::new()
            .with_batch_response(payload(0..1))
            .with_batch_response(payload(1..2)),
    );
    let mut coordinator = PipelineCoordinator::new(config(&root), capability);

    coordinator
        .run(SpecSource::Manual(invoice_spec(1)))
        .expect("first run");
    let err = coordinator
        .run(SpecSource::Manual(invoice_spec(1)))
        .expect_err("second run");
    assert_eq!(err.kind(), "invalid_transition");

    let _ = std::fs::remove_dir_all(&root);
}
