use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::persist::{load_entity_artifact, save_entity_artifact};

/// Outcome of copying one attribute between two entity artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Record pairs processed; the shorter artifact decides.
    pub pairs: usize,
    pub modified: usize,
    pub unchanged: usize,
    /// Target records beyond the last source record.
    pub untouched_targets: usize,
    /// Target records that received the attribute as an empty value first.
    pub added: usize,
}

/// Copy `from_attribute` of each source record into `to_attribute` of the
/// target record at the same index, rewriting the target artifact.
pub fn apply_values(
    from: &Path,
    to: &Path,
    from_attribute: &str,
    to_attribute: &str,
    add_missing: bool,
) -> PipelineResult<ApplyReport> {
    if to_attribute.starts_with('_') {
        return Err(PipelineError::Artifact(format!(
            "'{to_attribute}' is a reserved attribute"
        )));
    }

    let source = load_entity_artifact(from)?;
    let mut target = load_entity_artifact(to)?;
    let pairs = source.entities.len().min(target.entities.len());

    if source.entities.len() != target.entities.len() {
        warn!(
            event = "apply_length_mismatch",
            source_records = source.entities.len(),
            target_records = target.entities.len(),
            pairs,
        );
    }

    for (index, record) in source.entities.iter().take(pairs).enumerate() {
        if record.get(from_attribute).is_none() {
            return Err(PipelineError::Artifact(format!(
                "'{from_attribute}' not found in source record {index}"
            )));
        }
    }

    let missing: Vec<usize> = target
        .entities
        .iter()
        .take(pairs)
        .enumerate()
        .filter(|(_, record)| record.get(to_attribute).is_none())
        .map(|(index, _)| index)
        .collect();

    let mut report = ApplyReport {
        pairs,
        untouched_targets: target.entities.len() - pairs,
        ..ApplyReport::default()
    };

    if !missing.is_empty() {
        if !add_missing {
            return Err(PipelineError::Artifact(format!(
                "'{to_attribute}' not found in {} target record(s), first at index {}",
                missing.len(),
                missing[0]
            )));
        }
        for record in &mut target.entities {
            if record.get(to_attribute).is_none() {
                record.fields.insert(to_attribute.to_string(), String::new());
                report.added += 1;
            }
        }
    }

    for (source_record, target_record) in source.entities.iter().zip(target.entities.iter_mut()) {
        let new_value = source_record.get(from_attribute).unwrap_or_default().to_string();
        match target_record.fields.get_mut(to_attribute) {
            Some(current) if *current == new_value => report.unchanged += 1,
            Some(current) => {
                *current = new_value;
                report.modified += 1;
            }
            None => {}
        }
    }

    save_entity_artifact(to, &target)?;
    info!(
        event = "values_applied",
        from_attribute,
        to_attribute,
        pairs = report.pairs,
        modified = report.modified,
        unchanged = report.unchanged,
        untouched_targets = report.untouched_targets,
    );
    Ok(report)
}
