use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use super::audit::{AuditError, AuditId, AuditRecord, AuditStatus, AuditStore};
use super::consolidate::consolidate;
use super::domain::{
    Decision, FailureKind, ValidationOutcome, ValidationStatus,
};
use super::policy;
use super::reasoning::{InvocationMetrics, ReasoningClient, ReasoningError, ReasoningInvoker};
use super::upstream::{EvidenceSource, UpstreamError};
use crate::config::RetryConfig;

/// Failure of one validation attempt, classified for the caller-facing
/// contract.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
}

impl ValidationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Upstream(UpstreamError::Auth(_)) => FailureKind::AuthenticationFailure,
            Self::Upstream(UpstreamError::NotFound(_)) => FailureKind::ResourceNotFound,
            Self::Upstream(UpstreamError::DataMissing(_)) => FailureKind::EvidenceIncomplete,
            Self::Upstream(UpstreamError::Transport(_)) => FailureKind::UnclassifiedFailure,
            Self::Reasoning(_) => FailureKind::ReasoningServiceFailure,
        }
    }
}

/// Orchestrates one credit validation end to end: evidence acquisition,
/// consolidation, reasoning invocation, and audit persistence. Audit
/// writes are best-effort; the business outcome is never blocked by an
/// unavailable audit store.
pub struct CreditValidationService<E, C, A> {
    evidence: Arc<E>,
    invoker: ReasoningInvoker<C>,
    audit: Arc<A>,
    model_version: String,
}

impl<E, C, A> CreditValidationService<E, C, A>
where
    E: EvidenceSource,
    C: ReasoningClient,
    A: AuditStore,
{
    pub fn new(
        evidence: Arc<E>,
        reasoning_client: C,
        retry: RetryConfig,
        audit: Arc<A>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            evidence,
            invoker: ReasoningInvoker::new(reasoning_client, retry),
            audit,
            model_version: model_version.into(),
        }
    }

    /// Runs one validation. Always returns a well-formed outcome; failures
    /// are classified and carried in the outcome rather than raised.
    pub async fn validate(&self, transaction_id: &str) -> ValidationOutcome {
        let started = Instant::now();
        info!(transaction_id, "credit validation started");

        let mut record =
            AuditRecord::begin(transaction_id, &self.model_version, policy::PROMPT_VERSION);
        let audit_id = self.try_audit(|| self.audit.begin(record.clone()));

        let result = self.run(transaction_id, &mut record, audit_id).await;
        let latency_ms = started.elapsed().as_millis() as u64;
        record.latency_total_ms = Some(latency_ms);

        match result {
            Ok((decision, metrics)) => {
                record.status = AuditStatus::Success;
                if let Some(id) = audit_id {
                    self.try_audit(|| self.audit.finalize(id, &record));
                }
                info!(
                    transaction_id,
                    decision = ?decision.decision,
                    retries = metrics.retries,
                    latency_ms,
                    "credit validation succeeded"
                );

                ValidationOutcome {
                    transaction_id: transaction_id.to_string(),
                    status: ValidationStatus::Success,
                    decision: Some(decision.decision),
                    product: decision.product,
                    max_amount: decision.max_amount,
                    max_term: decision.max_term,
                    available_capacity: decision.available_capacity,
                    summary: Some(decision.summary),
                    verdict: Some(decision.raw),
                    error_kind: None,
                    error: None,
                    latency_ms,
                    audit_id,
                }
            }
            Err(err) => {
                record.status = AuditStatus::Error;
                record.error_message = Some(err.to_string());
                if let Some(id) = audit_id {
                    self.try_audit(|| self.audit.finalize(id, &record));
                }
                warn!(transaction_id, kind = ?err.kind(), %err, "credit validation failed");

                ValidationOutcome {
                    transaction_id: transaction_id.to_string(),
                    status: ValidationStatus::Error,
                    decision: None,
                    product: None,
                    max_amount: None,
                    max_term: None,
                    available_capacity: None,
                    summary: None,
                    verdict: None,
                    error_kind: Some(err.kind()),
                    error: Some(err.to_string()),
                    latency_ms,
                    audit_id,
                }
            }
        }
    }

    async fn run(
        &self,
        transaction_id: &str,
        record: &mut AuditRecord,
        audit_id: Option<AuditId>,
    ) -> Result<(Decision, InvocationMetrics), ValidationError> {
        let fetched = self.evidence.fetch_evidence(transaction_id).await?;
        let bundle = &fetched.bundle;

        record.person_id = Some(bundle.person_id.clone());
        record.input_ocr = Some(Value::Array(bundle.ocr_documents.clone()));
        record.input_bureau = Some(bundle.bureau_report.clone());
        record.input_background = Some(bundle.background_check.clone());
        record.input_tasks = Some(Value::Array(bundle.pending_tasks.clone()));
        record.latency_upstream_ms = Some(fetched.latency_ms);
        if let Some(id) = audit_id {
            self.try_audit(|| self.audit.update(id, record));
        }

        let evidence = consolidate(transaction_id, bundle);
        if !evidence.anomalies.is_empty() {
            warn!(
                transaction_id,
                anomalies = ?evidence.anomalies,
                "evidence consolidation recorded source anomalies"
            );
        }
        record.canonical_evidence = serde_json::to_value(&evidence).ok();
        record.garnishment_count = Some(evidence.applicant.garnishment_count as u64);

        let (decision, metrics) = self.invoker.invoke(&evidence).await?;

        record.raw_response = Some(metrics.raw_response.clone());
        record.parsed_response = Some(decision.raw.clone());
        record.decision = Some(decision.decision);
        record.product = decision.product;
        record.max_amount = decision.max_amount;
        record.max_term = decision.max_term;
        record.available_capacity = decision.available_capacity;
        record.summary = Some(decision.summary.clone());
        record.tokens_input = Some(metrics.input_tokens);
        record.tokens_output = Some(metrics.output_tokens);
        record.latency_reasoning_ms = Some(metrics.latency_ms);
        record.retries = metrics.retries;
        if let Some(id) = audit_id {
            self.try_audit(|| self.audit.update(id, record));
        }

        Ok((decision, metrics))
    }

    /// Audit persistence never blocks the business outcome: failures are
    /// logged and the pipeline continues without an audit reference.
    fn try_audit<T>(&self, op: impl FnOnce() -> Result<T, AuditError>) -> Option<T> {
        match op() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%err, "audit store unavailable; continuing without audit");
                None
            }
        }
    }

    /// Read access to the audit trail for the query surface.
    pub fn audit_store(&self) -> &A {
        &self.audit
    }
}
