use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to generate: document type, ordered entity fields, locale and count.
///
/// Construct through [`DocumentSpec::new`] so the invariants hold; the value
/// is treated as immutable once generation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSpec {
    pub document_type: String,
    pub entity_fields: Vec<String>,
    pub locale: String,
    pub record_count: usize,
}

impl DocumentSpec {
    pub fn new(
        document_type: impl Into<String>,
        entity_fields: Vec<String>,
        locale: impl Into<String>,
        record_count: usize,
    ) -> Result<Self> {
        let document_type = document_type.into().trim().to_string();
        let locale = locale.into().trim().to_string();
        let entity_fields: Vec<String> = entity_fields
            .into_iter()
            .map(|field| field.trim().to_string())
            .collect();

        if document_type.is_empty() {
            return Err(Error::InvalidSpec("document type is empty".to_string()));
        }
        if locale.is_empty() {
            return Err(Error::InvalidSpec("locale code is empty".to_string()));
        }
        if record_count == 0 {
            return Err(Error::InvalidSpec(
                "record count must be greater than 0".to_string(),
            ));
        }
        if entity_fields.is_empty() {
            return Err(Error::InvalidSpec(
                "at least one entity field is required".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for field in &entity_fields {
            if field.is_empty() {
                return Err(Error::InvalidSpec("entity field name is empty".to_string()));
            }
            if field.starts_with('_') {
                return Err(Error::InvalidSpec(format!(
                    "entity field '{field}' uses the reserved '_' prefix"
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(Error::InvalidSpec(format!(
                    "duplicate entity field: {field}"
                )));
            }
        }

        Ok(Self {
            document_type,
            entity_fields,
            locale,
            record_count,
        })
    }

    /// Derive a spec from an analysis result. Overrides always win.
    pub fn from_analysis(analysis: &AnalysisResult, overrides: &SpecOverrides) -> Result<Self> {
        let document_type = overrides
            .document_type
            .clone()
            .unwrap_or_else(|| analysis.document_type.clone());
        let entity_fields = overrides
            .entity_fields
            .clone()
            .unwrap_or_else(|| analysis.extracted_entities.keys().cloned().collect());
        let locale = overrides
            .locale
            .clone()
            .unwrap_or_else(|| analysis.detected_locale.clone());
        let record_count = overrides.record_count.ok_or_else(|| {
            Error::InvalidSpec("record count must be given when deriving from analysis".to_string())
        })?;

        Self::new(document_type, entity_fields, locale, record_count)
    }
}

/// Explicit values that take precedence over analysis-derived ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecOverrides {
    pub document_type: Option<String>,
    pub entity_fields: Option<Vec<String>>,
    pub locale: Option<String>,
    pub record_count: Option<usize>,
}

/// Parse a comma-separated field list, dropping blank entries.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

/// Confidence reported by the image-understanding capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing a reference image. Serializes as the analysis artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub document_type: String,
    #[serde(rename = "detected_language")]
    pub detected_locale: String,
    pub confidence: Confidence,
    /// Example value per field, written in the document's language.
    #[serde(default)]
    pub extracted_entities: BTreeMap<String, String>,
}

/// One synthetic data row backing a single generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntityRecord {
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    #[serde(rename = "_document_type")]
    pub document_type: String,
    #[serde(rename = "_locale")]
    pub locale: String,
    #[serde(rename = "_background_ref", default)]
    pub background_ref: Option<String>,
}

impl EntityRecord {
    pub fn new(
        fields: BTreeMap<String, String>,
        document_type: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            fields,
            document_type: document_type.into(),
            locale: locale.into(),
            background_ref: None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Values of `fields` in the given order; used as the de-duplication key.
    pub fn identity_key(&self, fields: &[String]) -> Vec<String> {
        fields
            .iter()
            .map(|field| self.fields.get(field).cloned().unwrap_or_default())
            .collect()
    }
}

/// Ordered batch of entity records for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EntityBatch {
    records: Vec<EntityRecord>,
}

impl EntityBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<EntityRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: EntityRecord) {
        self.records.push(record);
    }

    /// Drop trailing records beyond `len`, keeping generation order.
    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [EntityRecord] {
        &mut self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<EntityRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a EntityBatch {
    type Item = &'a EntityRecord;
    type IntoIter = std::slice::Iter<'a, EntityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn rejects_duplicate_fields() {
        let err = DocumentSpec::new("invoice", fields(&["customer", "customer"]), "en", 3)
            .expect_err("duplicate fields");
        assert!(err.to_string().contains("duplicate entity field"));
    }

    #[test]
    fn rejects_zero_count() {
        assert!(DocumentSpec::new("invoice", fields(&["customer"]), "en", 0).is_err());
    }

    #[test]
    fn rejects_reserved_prefix() {
        assert!(DocumentSpec::new("invoice", fields(&["_locale"]), "en", 1).is_err());
    }

    #[test]
    fn trims_field_names() {
        let spec = DocumentSpec::new(" invoice ", fields(&[" customer ", "total"]), "en", 1)
            .expect("valid spec");
        assert_eq!(spec.document_type, "invoice");
        assert_eq!(spec.entity_fields, fields(&["customer", "total"]));
    }

    #[test]
    fn parses_field_list() {
        assert_eq!(
            parse_field_list("customer name, invoice number,,total "),
            fields(&["customer name", "invoice number", "total"])
        );
    }
}
