use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use docsynth_core::{DocumentSpec, EntityBatch, EntityRecord, LocaleRules};

use crate::cancel::CancellationToken;
use crate::capability::{BatchRequest, GenerativeCapability};
use crate::errors::{CapabilityError, GenerationError};
use crate::model::{GenerateOptions, GenerationReport};
use crate::parser::{parse_entity_payload, record_fields};
use crate::retry::{RetryFailure, RetryPolicy};

/// Produces exactly `record_count` validated, unique records, or fails.
pub struct BatchEntityGenerator<'a> {
    capability: &'a dyn GenerativeCapability,
    options: GenerateOptions,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl<'a> BatchEntityGenerator<'a> {
    pub fn new(capability: &'a dyn GenerativeCapability, options: GenerateOptions) -> Self {
        let retry = RetryPolicy::new(&options.retry);
        Self {
            capability,
            options,
            retry,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn generate(
        &self,
        spec: &DocumentSpec,
        rules: &LocaleRules,
        seed_examples: Option<&BTreeMap<String, String>>,
    ) -> Result<EntityBatch, GenerationError> {
        self.generate_with_report(spec, rules, seed_examples)
            .map(|(batch, _)| batch)
    }

    pub fn generate_with_report(
        &self,
        spec: &DocumentSpec,
        rules: &LocaleRules,
        seed_examples: Option<&BTreeMap<String, String>>,
    ) -> Result<(EntityBatch, GenerationReport), GenerationError> {
        let requested = spec.record_count;
        let batch_size = self.options.effective_batch_size();
        let max_stalled = self.options.max_attempts.max(1);

        let mut report = GenerationReport::new(requested);
        let mut batch = EntityBatch::new();
        let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut stalled = 0_u32;

        info!(
            event = "generation_started",
            document_type = %spec.document_type,
            locale = %spec.locale,
            requested,
            batch_size,
            provider = self.capability.name(),
        );

        while batch.len() < requested {
            if self.cancel.is_cancelled() {
                warn!(event = "generation_cancelled", produced = batch.len(), requested);
                return Err(GenerationError::Cancelled);
            }

            let count = (requested - batch.len()).min(batch_size);
            let request = BatchRequest {
                document_type: spec.document_type.clone(),
                entity_fields: spec.entity_fields.clone(),
                rules: rules.clone(),
                count,
                seed_examples: seed_examples.cloned(),
            };

            report.calls += 1;
            let accepted = match self
                .retry
                .run("generate_batch", || self.capability.generate_batch(&request))
            {
                Ok(retried) => {
                    report.transient_retries += retried.attempts - 1;
                    self.absorb(&retried.value, spec, &mut seen, &mut batch, &mut report)
                }
                Err(RetryFailure {
                    error: CapabilityError::MalformedResponse(message),
                    attempts,
                }) => {
                    report.transient_retries += attempts - 1;
                    report.unparseable_payloads += 1;
                    warn!(event = "payload_unparseable", call = report.calls, error = %message);
                    0
                }
                Err(failure) => return Err(exhausted(failure)),
            };

            info!(
                event = "batch_call_finished",
                call = report.calls,
                asked = count,
                accepted,
                produced = batch.len(),
                requested,
            );

            if accepted == 0 {
                stalled += 1;
                if stalled >= max_stalled {
                    warn!(
                        event = "generation_exhausted",
                        produced = batch.len(),
                        requested,
                        attempts = stalled,
                    );
                    return Err(GenerationError::InsufficientGeneratedRecords {
                        produced: batch.len(),
                        requested,
                    });
                }
            } else {
                stalled = 0;
            }
        }

        report.produced = batch.len();
        info!(
            event = "generation_finished",
            produced = report.produced,
            calls = report.calls,
            transient_retries = report.transient_retries,
            discarded_invalid = report.discarded_invalid,
            discarded_duplicate = report.discarded_duplicate,
        );
        Ok((batch, report))
    }

    /// Validate one payload and append accepted records; returns how many.
    fn absorb(
        &self,
        payload: &str,
        spec: &DocumentSpec,
        seen: &mut BTreeSet<Vec<String>>,
        batch: &mut EntityBatch,
        report: &mut GenerationReport,
    ) -> usize {
        let records = match parse_entity_payload(payload) {
            Ok(records) => records,
            Err(message) => {
                report.unparseable_payloads += 1;
                warn!(event = "payload_unparseable", call = report.calls, error = %message);
                return 0;
            }
        };

        let mut accepted = 0;
        for (index, raw) in records.iter().enumerate() {
            if batch.len() == spec.record_count {
                debug!(
                    event = "surplus_records_dropped",
                    dropped = records.len() - index,
                );
                break;
            }

            let fields = match record_fields(raw, &spec.entity_fields) {
                Ok(fields) => fields,
                Err(reason) => {
                    report.discarded_invalid += 1;
                    debug!(event = "record_discarded", reason = %reason);
                    continue;
                }
            };

            let record = EntityRecord::new(fields, &spec.document_type, &spec.locale);
            if !seen.insert(record.identity_key(&spec.entity_fields)) {
                report.discarded_duplicate += 1;
                debug!(event = "record_discarded", reason = "duplicate");
                continue;
            }

            batch.push(record);
            accepted += 1;
        }
        accepted
    }
}

fn exhausted(failure: RetryFailure<CapabilityError>) -> GenerationError {
    let attempts = failure.attempts;
    match failure.error {
        CapabilityError::Timeout { .. } => GenerationError::ExternalServiceTimeout { attempts },
        CapabilityError::Unavailable(message) => {
            GenerationError::ExternalServiceUnavailable { attempts, message }
        }
        other => GenerationError::CapabilityRejected(other.to_string()),
    }
}
