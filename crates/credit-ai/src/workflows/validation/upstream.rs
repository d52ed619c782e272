use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::domain::RawEvidenceBundle;
use super::session::SessionStore;
use crate::config::UpstreamConfig;

/// Enrichment sub-document keys as the platform names them on the wire.
const OCR_SUMMARY_KEY: &str = "summaryTrebolOcr";
const BUREAU_SUMMARY_KEY: &str = "customSummaryBuro";
const BACKGROUND_SUMMARY_KEY: &str = "summaryTruoraBackgroundChecks";

/// Task-inbox source filter the pipeline cares about.
const TASK_SOURCES: &str = "TRUORA, BURO, GENERAL";

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream authentication failed: {0}")]
    Auth(String),
    #[error("no applicant resolvable for transaction {0}")]
    NotFound(String),
    #[error("enrichment bundle is missing the {0}")]
    DataMissing(&'static str),
    #[error("upstream transport error: {0}")]
    Transport(String),
}

/// Raw bundle plus the wall-clock cost of assembling it, kept for the
/// audit record.
#[derive(Debug, Clone)]
pub struct FetchedEvidence {
    pub bundle: RawEvidenceBundle,
    pub latency_ms: u64,
}

/// Seam over the upstream platform so the orchestrator can be exercised
/// against fixtures.
pub trait EvidenceSource: Send + Sync {
    fn fetch_evidence(
        &self,
        transaction_id: &str,
    ) -> impl Future<Output = Result<FetchedEvidence, UpstreamError>> + Send;
}

/// HTTP client for the loan-origination platform. Performs the three
/// sequential calls that assemble one applicant's raw evidence, reusing a
/// cached bearer token across all of them.
pub struct PlatformClient {
    http: reqwest::Client,
    config: UpstreamConfig,
    session: Arc<SessionStore>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: Option<String>,
    #[serde(rename = "expiresIn")]
    expires_in: Option<i64>,
}

impl PlatformClient {
    pub fn new(config: UpstreamConfig, session: Arc<SessionStore>) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(config.timeout)
            .build()
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn ensure_token(&self) -> Result<String, UpstreamError> {
        if let Some(token) = self.session.valid_token(Utc::now()) {
            return Ok(token);
        }

        let (email, password) = self
            .config
            .credentials()
            .map_err(|err| UpstreamError::Auth(err.to_string()))?;

        let response = self
            .http
            .post(self.endpoint("/v2/auth"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Auth(format!(
                "token endpoint returned {status}"
            )));
        }

        let payload: AuthResponse = response
            .json()
            .await
            .map_err(|err| UpstreamError::Auth(err.to_string()))?;
        let token = payload
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| UpstreamError::Auth("token endpoint returned no token".to_string()))?;

        let ttl = payload.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);
        self.session.store(&token, ttl, Utc::now());
        debug!(ttl, "refreshed upstream bearer token");

        Ok(token)
    }

    async fn get_json(
        &self,
        url: String,
        token: &str,
        query: &[(&str, &str)],
        context: &'static str,
    ) -> Result<Value, UpstreamError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(UpstreamError::Auth(format!("{context} returned {status}")));
        }
        if !status.is_success() {
            return Err(UpstreamError::Transport(format!(
                "{context} returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| UpstreamError::Transport(format!("{context}: {err}")))
    }
}

impl EvidenceSource for PlatformClient {
    async fn fetch_evidence(
        &self,
        transaction_id: &str,
    ) -> Result<FetchedEvidence, UpstreamError> {
        let started = Instant::now();
        let token = self.ensure_token().await?;

        let tasks = self
            .get_json(
                self.endpoint("/v2/task_inbox"),
                &token,
                &[("transactionId", transaction_id), ("namesFrom", TASK_SOURCES)],
                "task inbox",
            )
            .await?;

        let applicant = self
            .get_json(
                self.endpoint(&format!(
                    "/v2/person/transaction/{transaction_id}/applicant"
                )),
                &token,
                &[],
                "applicant resolution",
            )
            .await?;
        let person_id = applicant
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| UpstreamError::NotFound(transaction_id.to_string()))?
            .to_string();

        let enrichment = self
            .get_json(
                self.endpoint(&format!("/external_data/person/{person_id}")),
                &token,
                &[],
                "enrichment fetch",
            )
            .await?;

        let bundle = extract_bundle(person_id, enrichment, tasks)?;
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(latency_ms, "assembled raw evidence bundle");

        Ok(FetchedEvidence { bundle, latency_ms })
    }
}

/// Pulls the three required sub-documents out of the enrichment payload,
/// failing fast and naming the first one that is absent. An empty array
/// or object counts as absent: there is no evidence in it to validate.
fn extract_bundle(
    person_id: String,
    enrichment: Value,
    tasks: Value,
) -> Result<RawEvidenceBundle, UpstreamError> {
    let ocr_documents =
        match require_sub_document(&enrichment, OCR_SUMMARY_KEY, "document OCR summary")? {
            Value::Array(documents) => documents.clone(),
            single => vec![single.clone()],
        };

    let bureau_report =
        require_sub_document(&enrichment, BUREAU_SUMMARY_KEY, "bureau summary")?.clone();

    let background_check =
        require_sub_document(&enrichment, BACKGROUND_SUMMARY_KEY, "background-check summary")?
            .clone();

    let pending_tasks = match tasks {
        Value::Array(entries) => entries,
        _ => Vec::new(),
    };

    Ok(RawEvidenceBundle {
        person_id,
        ocr_documents,
        bureau_report,
        background_check,
        pending_tasks,
    })
}

fn require_sub_document<'a>(
    enrichment: &'a Value,
    key: &str,
    name: &'static str,
) -> Result<&'a Value, UpstreamError> {
    match enrichment.get(key) {
        Some(value) if !is_empty_document(value) => Ok(value),
        _ => Err(UpstreamError::DataMissing(name)),
    }
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enrichment() -> Value {
        json!({
            "summaryTrebolOcr": [ { "standardizedData": {} } ],
            "customSummaryBuro": { "score": { "scoring": 720 } },
            "summaryTruoraBackgroundChecks": { "enrichment": {} }
        })
    }

    #[test]
    fn extract_bundle_collects_all_sub_documents() {
        let bundle = extract_bundle(
            "person-1".to_string(),
            enrichment(),
            json!([{ "id": "t-1" }]),
        )
        .expect("bundle extracts");

        assert_eq!(bundle.person_id, "person-1");
        assert_eq!(bundle.ocr_documents.len(), 1);
        assert_eq!(bundle.pending_tasks.len(), 1);
    }

    #[test]
    fn extract_bundle_names_the_missing_document() {
        let mut payload = enrichment();
        payload
            .as_object_mut()
            .expect("object payload")
            .remove("customSummaryBuro");

        let err = extract_bundle("person-1".to_string(), payload, json!([]))
            .expect_err("bureau summary missing");
        assert!(matches!(err, UpstreamError::DataMissing("bureau summary")));
    }

    #[test]
    fn extract_bundle_rejects_null_sub_documents() {
        let mut payload = enrichment();
        payload["summaryTruoraBackgroundChecks"] = Value::Null;

        let err = extract_bundle("person-1".to_string(), payload, json!([]))
            .expect_err("background check null");
        assert!(matches!(
            err,
            UpstreamError::DataMissing("background-check summary")
        ));
    }

    #[test]
    fn extract_bundle_rejects_an_empty_ocr_document_list() {
        let mut payload = enrichment();
        payload["summaryTrebolOcr"] = json!([]);

        let err = extract_bundle("person-1".to_string(), payload, json!([]))
            .expect_err("empty OCR list carries no evidence");
        assert!(matches!(
            err,
            UpstreamError::DataMissing("document OCR summary")
        ));
    }

    #[test]
    fn extract_bundle_rejects_an_empty_bureau_object() {
        let mut payload = enrichment();
        payload["customSummaryBuro"] = json!({});

        let err = extract_bundle("person-1".to_string(), payload, json!([]))
            .expect_err("empty bureau summary carries no evidence");
        assert!(matches!(err, UpstreamError::DataMissing("bureau summary")));
    }

    #[test]
    fn extract_bundle_wraps_a_single_ocr_document() {
        let mut payload = enrichment();
        payload["summaryTrebolOcr"] = json!({ "standardizedData": {} });

        let bundle = extract_bundle("person-1".to_string(), payload, json!(null))
            .expect("single document accepted");
        assert_eq!(bundle.ocr_documents.len(), 1);
        assert!(bundle.pending_tasks.is_empty());
    }
}
