use std::collections::BTreeSet;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{DocumentSpec, EntityBatch};

/// Structured issue found while validating an artifact document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub code: String,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Aggregated validation report.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    /// One-line summary of every error, for surfacing to callers.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|issue| format!("{}: {}", issue.path, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validate an artifact JSON document against its JSON Schema.
pub fn validate_artifact_json(instance: &Value, schema: &Value) -> Result<ValidationReport> {
    let compiled = JSONSchema::compile(schema).map_err(|err| Error::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(instance) {
        for error in errors {
            let path = error.instance_path.to_string();
            report.push_error(ValidationIssue::new(
                "schema_violation",
                if path.is_empty() { "/".to_string() } else { path },
                error.to_string(),
            ));
        }
    }

    Ok(report)
}

/// Check that a batch satisfies its spec.
///
/// This checks:
/// - the batch holds exactly `record_count` records
/// - every record carries every entity field with a non-empty value
/// - records are stamped with the spec's document type and locale
/// - no two records are field-wise identical
pub fn validate_batch(batch: &EntityBatch, spec: &DocumentSpec) -> Result<()> {
    if batch.len() != spec.record_count {
        return Err(Error::InvalidBatch(format!(
            "expected {} records, found {}",
            spec.record_count,
            batch.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for (index, record) in batch.iter().enumerate() {
        for field in &spec.entity_fields {
            match record.get(field) {
                Some(value) if !value.trim().is_empty() => {}
                Some(_) => {
                    return Err(Error::InvalidBatch(format!(
                        "record {index}: field '{field}' is empty"
                    )));
                }
                None => {
                    return Err(Error::InvalidBatch(format!(
                        "record {index}: missing field '{field}'"
                    )));
                }
            }
        }

        if record.document_type != spec.document_type || record.locale != spec.locale {
            return Err(Error::InvalidBatch(format!(
                "record {index}: stamped as '{}'/'{}', expected '{}'/'{}'",
                record.document_type, record.locale, spec.document_type, spec.locale
            )));
        }

        if !seen.insert(record.identity_key(&spec.entity_fields)) {
            return Err(Error::InvalidBatch(format!(
                "record {index}: duplicates an earlier record"
            )));
        }
    }

    Ok(())
}
