use std::future::Future;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use credit_ai::config::AppConfig;
use credit_ai::error::AppError;
use credit_ai::workflows::validation::domain::RawEvidenceBundle;
use credit_ai::workflows::validation::reasoning::{Completion, ReasoningClient, ReasoningError};
use credit_ai::workflows::validation::upstream::{
    EvidenceSource, FetchedEvidence, UpstreamError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) health: Arc<HealthSnapshot>,
}

/// Static view of collaborator configuration, reported by the health
/// endpoint. Secrets themselves never leave the config.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HealthSnapshot {
    pub(crate) upstream_credentials_configured: bool,
    pub(crate) reasoning_key_configured: bool,
    pub(crate) reasoning_model: String,
    pub(crate) audit_store: &'static str,
}

impl HealthSnapshot {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self {
            upstream_credentials_configured: config.upstream.credentials().is_ok(),
            reasoning_key_configured: config.reasoning.api_key().is_ok(),
            reasoning_model: config.reasoning.model.clone(),
            audit_store: "in-memory",
        }
    }
}

pub(crate) fn load_bundle(path: &Path) -> Result<RawEvidenceBundle, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let bundle = serde_json::from_str(&raw)?;
    Ok(bundle)
}

/// Evidence source backed by a pre-loaded bundle, for the CLI demo and
/// route tests.
#[derive(Clone)]
pub(crate) struct FixtureEvidenceSource {
    bundle: RawEvidenceBundle,
}

impl FixtureEvidenceSource {
    pub(crate) fn new(bundle: RawEvidenceBundle) -> Self {
        Self { bundle }
    }
}

impl EvidenceSource for FixtureEvidenceSource {
    fn fetch_evidence(
        &self,
        _transaction_id: &str,
    ) -> impl Future<Output = Result<FetchedEvidence, UpstreamError>> + Send {
        let fetched = FetchedEvidence {
            bundle: self.bundle.clone(),
            latency_ms: 0,
        };
        async move { Ok(fetched) }
    }
}

/// Reasoning client that replies with a fixed structured verdict.
#[derive(Clone)]
pub(crate) struct CannedReasoningClient {
    verdict: String,
}

impl CannedReasoningClient {
    pub(crate) fn approving() -> Self {
        let verdict = json!({
            "verdict": {
                "decision": "APPROVED",
                "product": "FREE_INVESTMENT",
                "maxAmount": 18_000_000,
                "maxTerm": 120
            },
            "capacity": { "availableCapacity": 430_000 },
            "summary": "Fixture verdict: income verified, no unacceptable criteria."
        })
        .to_string();
        Self { verdict }
    }
}

impl ReasoningClient for CannedReasoningClient {
    fn complete(
        &self,
        _system: &str,
        _user: &str,
    ) -> impl Future<Output = Result<Completion, ReasoningError>> + Send {
        let completion = Completion {
            text: self.verdict.clone(),
            input_tokens: 0,
            output_tokens: 0,
        };
        async move { Ok(completion) }
    }
}

/// Representative pensioner bundle used when the demo is run without an
/// input file.
pub(crate) fn sample_bundle() -> RawEvidenceBundle {
    RawEvidenceBundle {
        person_id: "demo-person".to_string(),
        ocr_documents: vec![json!({
            "standardizedData": {
                "personal_info": { "full_name": "MARIA DEL PILAR SUAREZ", "document_id": "41552290" },
                "employment_info": { "company_name": "COLPENSIONES" },
                "salary_info": {
                    "gross_salary": 2_450_000,
                    "net_salary": 1_610_000,
                    "deduction_details": [
                        { "description": "Aporte salud", "amount": 294_000 },
                        { "description": "LIBRANZA BANCO POPULAR", "amount": 546_000 }
                    ]
                }
            }
        })],
        bureau_report: json!({
            "score": { "scoring": 688 },
            "basicInformation": {
                "fullName": "MARIA DEL PILAR SUAREZ",
                "documentIdentificationNumber": "41552290"
            },
            "alert": { "deceased": false },
            "outstandingLoans": [{
                "accounts": {
                    "lenderName": "BANCO POPULAR",
                    "accountType": "Libranza",
                    "totalDebt": 9_800_000,
                    "installments": 546_000,
                    "typePayrollDeductionLoan": true,
                    "pastDueMax": 0,
                    "paymentBehavior": "NNNNNNNNNNNN",
                    "sector": "Bancario"
                }
            }]
        }),
        background_check: json!({
            "enrichment": { "sarlaftCompliance": true, "numberOfProcesses": 0, "processes": [] }
        }),
        pending_tasks: vec![json!({
            "id": "task-1", "nameFrom": "GENERAL", "allTaskValidated": true
        })],
    }
}
