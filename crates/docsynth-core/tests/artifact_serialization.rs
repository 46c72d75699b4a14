use std::collections::BTreeMap;

use docsynth_core::{
    AnalysisResult, Confidence, DocumentSpec, EntityArtifact, EntityBatch, EntityRecord,
    SpecOverrides, validate_batch,
};

fn record(customer: &str, total: &str) -> EntityRecord {
    let mut fields = BTreeMap::new();
    fields.insert("customer".to_string(), customer.to_string());
    fields.insert("total".to_string(), total.to_string());
    EntityRecord::new(fields, "invoice", "en")
}

fn spec(count: usize) -> DocumentSpec {
    DocumentSpec::new(
        "invoice",
        vec!["customer".to_string(), "total".to_string()],
        "en",
        count,
    )
    .expect("valid spec")
}

#[test]
fn serializes_record_with_reserved_keys() {
    let json = serde_json::to_string(&record("Acme Catering", "$120.00")).expect("serialize");
    assert_eq!(
        json,
        r#"{"customer":"Acme Catering","total":"$120.00","_document_type":"invoice","_locale":"en","_background_ref":null}"#
    );
}

#[test]
fn artifact_round_trip_preserves_order() {
    let batch = EntityBatch::from_records(vec![
        record("Zeta Foods", "$10.00"),
        record("Alpha Events", "$20.00"),
        record("Mid Bakery", "$30.00"),
    ]);
    let artifact = EntityArtifact::new("invoice", "en", batch.clone());

    let json = serde_json::to_string_pretty(&artifact).expect("serialize artifact");
    let reloaded: EntityArtifact = serde_json::from_str(&json).expect("parse artifact");

    assert_eq!(reloaded.batch(), batch);
    assert_eq!(reloaded.document_type, "invoice");
    assert_eq!(reloaded.language, "en");
    assert!(reloaded.provenance.is_none());
}

#[test]
fn artifact_top_level_keys_match_contract() {
    let artifact = EntityArtifact::new("invoice", "de", EntityBatch::new());
    let value = serde_json::to_value(&artifact).expect("serialize");
    let object = value.as_object().expect("object");

    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    assert!(keys.contains(&"_document_type"));
    assert!(keys.contains(&"_language"));
    assert!(keys.contains(&"entities"));
    assert!(!keys.contains(&"_provenance"));
}

#[test]
fn analysis_artifact_uses_detected_language_key() {
    let raw = r#"{
  "document_type": "catering invoice",
  "detected_language": "th",
  "confidence": "high",
  "extracted_entities": {"customer name": "Somchai", "total": "฿1,200"}
}"#;
    let analysis: AnalysisResult = serde_json::from_str(raw).expect("parse analysis");
    assert_eq!(analysis.detected_locale, "th");
    assert_eq!(analysis.confidence, Confidence::High);
    assert_eq!(analysis.extracted_entities.len(), 2);

    let value = serde_json::to_value(&analysis).expect("serialize analysis");
    assert_eq!(value["detected_language"], "th");
    assert_eq!(value["confidence"], "high");
}

#[test]
fn spec_from_analysis_prefers_overrides() {
    let mut extracted = BTreeMap::new();
    extracted.insert("customer".to_string(), "Somchai".to_string());
    extracted.insert("total".to_string(), "฿1,200".to_string());
    let analysis = AnalysisResult {
        document_type: "catering invoice".to_string(),
        detected_locale: "th".to_string(),
        confidence: Confidence::Medium,
        extracted_entities: extracted,
    };

    let derived = DocumentSpec::from_analysis(
        &analysis,
        &SpecOverrides {
            record_count: Some(4),
            ..SpecOverrides::default()
        },
    )
    .expect("derive spec");
    assert_eq!(derived.document_type, "catering invoice");
    assert_eq!(derived.locale, "th");
    assert_eq!(derived.entity_fields, vec!["customer", "total"]);

    let overridden = DocumentSpec::from_analysis(
        &analysis,
        &SpecOverrides {
            locale: Some("en".to_string()),
            document_type: Some("receipt".to_string()),
            record_count: Some(4),
            ..SpecOverrides::default()
        },
    )
    .expect("derive spec");
    assert_eq!(overridden.locale, "en");
    assert_eq!(overridden.document_type, "receipt");
}

#[test]
fn spec_from_analysis_requires_count() {
    let analysis = AnalysisResult {
        document_type: "receipt".to_string(),
        detected_locale: "en".to_string(),
        confidence: Confidence::Low,
        extracted_entities: BTreeMap::from([("store".to_string(), "Corner Shop".to_string())]),
    };
    assert!(DocumentSpec::from_analysis(&analysis, &SpecOverrides::default()).is_err());
}

#[test]
fn validate_batch_rejects_duplicates_and_short_batches() {
    let spec = spec(2);

    let short = EntityBatch::from_records(vec![record("Acme", "$1")]);
    assert!(validate_batch(&short, &spec).is_err());

    let duplicated = EntityBatch::from_records(vec![record("Acme", "$1"), record("Acme", "$1")]);
    assert!(validate_batch(&duplicated, &spec).is_err());

    let valid = EntityBatch::from_records(vec![record("Acme", "$1"), record("Acme", "$2")]);
    validate_batch(&valid, &spec).expect("valid batch");
}
