use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docsynth_core::{AnalysisResult, Confidence, EntityArtifact, EntityBatch, EntityRecord};
use docsynth_pipeline::{
    apply_values, load_analysis_artifact, load_entity_artifact, save_analysis_artifact,
    save_entity_artifact,
};

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("docsynth_{label}_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn artifact(rows: &[&[(&str, &str)]]) -> EntityArtifact {
    let records = rows
        .iter()
        .map(|row| {
            let fields: BTreeMap<String, String> = row
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            EntityRecord::new(fields, "invoice", "en")
        })
        .collect();
    EntityArtifact::new("invoice", "en", EntityBatch::from_records(records))
}

fn write(path: &Path, artifact: &EntityArtifact) {
    save_entity_artifact(path, artifact).expect("save artifact");
}

#[test]
fn entity_artifact_round_trips_through_disk() {
    let dir = temp_dir("roundtrip");
    let path = dir.join("nested").join("entity_data.json");
    let original = artifact(&[
        &[("customer", "Acme"), ("total", "$1.00")],
        &[("customer", "Borealis"), ("total", "$2.00")],
    ]);

    write(&path, &original);
    let reloaded = load_entity_artifact(&path).expect("load artifact");
    assert_eq!(reloaded, original);

    let leftovers: Vec<_> = std::fs::read_dir(path.parent().expect("parent"))
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn analysis_artifact_is_schema_checked() {
    let dir = temp_dir("analysis");
    let good = dir.join("document_analysis.json");
    let analysis = AnalysisResult {
        document_type: "receipt".to_string(),
        detected_locale: "fr".to_string(),
        confidence: Confidence::Low,
        extracted_entities: BTreeMap::from([("magasin".to_string(), "Chez Paul".to_string())]),
    };
    save_analysis_artifact(&good, &analysis).expect("save analysis");
    assert_eq!(load_analysis_artifact(&good).expect("load analysis"), analysis);

    let bad = dir.join("bad_analysis.json");
    std::fs::write(
        &bad,
        r#"{"document_type": "receipt", "detected_language": "fr", "confidence": "sure"}"#,
    )
    .expect("write bad analysis");
    let err = load_analysis_artifact(&bad).expect_err("invalid confidence");
    assert_eq!(err.kind(), "invalid_artifact");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn apply_values_copies_pairwise() {
    let dir = temp_dir("apply");
    let from = dir.join("from.json");
    let to = dir.join("to.json");
    write(
        &from,
        &artifact(&[&[("full_name", "Ana Lima")], &[("full_name", "Bo Chen")]]),
    );
    write(
        &to,
        &artifact(&[
            &[("Customer Name", "Old One")],
            &[("Customer Name", "Bo Chen")],
            &[("Customer Name", "Kept")],
        ]),
    );

    let report = apply_values(&from, &to, "full_name", "Customer Name", false).expect("apply");
    assert_eq!(report.pairs, 2);
    assert_eq!(report.modified, 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.untouched_targets, 1);

    let updated = load_entity_artifact(&to).expect("reload");
    let names: Vec<&str> = updated
        .entities
        .iter()
        .filter_map(|record| record.get("Customer Name"))
        .collect();
    assert_eq!(names, vec!["Ana Lima", "Bo Chen", "Kept"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn apply_values_requires_target_attribute_unless_added() {
    let dir = temp_dir("apply_missing");
    let from = dir.join("from.json");
    let to = dir.join("to.json");
    write(&from, &artifact(&[&[("full_name", "Ana Lima")]]));
    write(&to, &artifact(&[&[("total", "$5")]]));

    let err = apply_values(&from, &to, "full_name", "customer", false).expect_err("missing");
    assert_eq!(err.kind(), "invalid_artifact");
    assert!(
        load_entity_artifact(&to).expect("reload").entities[0]
            .get("customer")
            .is_none()
    );

    let report = apply_values(&from, &to, "full_name", "customer", true).expect("apply");
    assert_eq!(report.added, 1);
    assert_eq!(report.modified, 1);
    let updated = load_entity_artifact(&to).expect("reload");
    assert_eq!(updated.entities[0].get("customer"), Some("Ana Lima"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn apply_values_rejects_missing_source_attribute() {
    let dir = temp_dir("apply_source");
    let from = dir.join("from.json");
    let to = dir.join("to.json");
    write(&from, &artifact(&[&[("total", "$1")]]));
    write(&to, &artifact(&[&[("customer", "Ana")]]));

    assert!(apply_values(&from, &to, "full_name", "customer", true).is_err());

    let _ = std::fs::remove_dir_all(&dir);
}
