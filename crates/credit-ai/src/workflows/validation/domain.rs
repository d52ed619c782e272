use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw applicant data assembled by the upstream data client, before any
/// normalization. Owned by the orchestrator for the duration of one
/// validation and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvidenceBundle {
    pub person_id: String,
    /// Document-OCR summaries, primary document first.
    pub ocr_documents: Vec<Value>,
    pub bureau_report: Value,
    pub background_check: Value,
    pub pending_tasks: Vec<Value>,
}

/// Terminal verdict classes the reasoning service may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Approved,
    Conditional,
    Rejected,
}

impl DecisionOutcome {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "APPROVED" => Some(Self::Approved),
            "CONDITIONAL" => Some(Self::Conditional),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Loan products the policy can open for an approved applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Product {
    FreeInvestment,
    PortfolioPurchase,
    Both,
    NotApplicable,
}

impl Product {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "FREE_INVESTMENT" => Some(Self::FreeInvestment),
            "PORTFOLIO_PURCHASE" => Some(Self::PortfolioPurchase),
            "BOTH" => Some(Self::Both),
            "NOT_APPLICABLE" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Maximum length of the narrative summary carried out of the verdict.
pub const SUMMARY_MAX_CHARS: usize = 250;

/// Validated view over the structured verdict returned by the reasoning
/// service. The full structured body is retained alongside the extracted
/// fields; callers that need more than the validated fields read `raw`.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub decision: DecisionOutcome,
    pub product: Option<Product>,
    pub max_amount: Option<i64>,
    pub max_term: Option<u32>,
    pub available_capacity: Option<i64>,
    pub summary: String,
    pub raw: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionParseError {
    #[error("verdict is missing a decision field")]
    MissingDecision,
    #[error("'{0}' is not a recognized decision")]
    UnknownDecision(String),
}

impl Decision {
    /// Validates the structured body extracted from the reasoning response.
    /// The decision class is mandatory; every other field degrades to
    /// absent so a partially-formed verdict is still auditable upstream.
    pub fn from_structured(body: Value) -> Result<Self, DecisionParseError> {
        let verdict = body.get("verdict").unwrap_or(&Value::Null);

        let label = verdict
            .get("decision")
            .and_then(Value::as_str)
            .ok_or(DecisionParseError::MissingDecision)?;
        let decision = DecisionOutcome::from_label(label)
            .ok_or_else(|| DecisionParseError::UnknownDecision(label.to_string()))?;

        let product = verdict
            .get("product")
            .and_then(Value::as_str)
            .and_then(Product::from_label);
        let max_amount = verdict.get("maxAmount").and_then(as_whole_amount);
        let max_term = verdict
            .get("maxTerm")
            .and_then(Value::as_u64)
            .and_then(|term| u32::try_from(term).ok());
        let available_capacity = body
            .get("capacity")
            .and_then(|capacity| capacity.get("availableCapacity"))
            .and_then(as_whole_amount);

        let summary = body
            .get("summary")
            .and_then(Value::as_str)
            .map(truncate_summary)
            .unwrap_or_default();

        Ok(Self {
            decision,
            product,
            max_amount,
            max_term,
            available_capacity,
            summary,
            raw: body,
        })
    }
}

fn as_whole_amount(value: &Value) -> Option<i64> {
    if let Some(amount) = value.as_i64() {
        return Some(amount);
    }
    value.as_f64().map(|amount| amount as i64)
}

fn truncate_summary(summary: &str) -> String {
    summary.chars().take(SUMMARY_MAX_CHARS).collect()
}

/// Classified failure surfaced to callers; each kind maps to a distinct
/// status at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    AuthenticationFailure,
    ResourceNotFound,
    EvidenceIncomplete,
    ReasoningServiceFailure,
    UnclassifiedFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Success,
    Error,
}

/// Caller-facing result of one validation attempt. Always well-formed:
/// failure paths populate `error`/`error_kind` and leave the decision
/// fields empty, but the transaction id and latency are always present.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub transaction_id: String,
    pub status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_term: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full structured verdict for callers that need the complete body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decision_parses_validated_fields() {
        let body = json!({
            "verdict": {
                "decision": "APPROVED",
                "product": "BOTH",
                "maxAmount": 18_500_000.0,
                "maxTerm": 144
            },
            "capacity": { "availableCapacity": 412_000 },
            "summary": "Pension income verified; capacity covers both products."
        });

        let decision = Decision::from_structured(body).expect("valid verdict");
        assert_eq!(decision.decision, DecisionOutcome::Approved);
        assert_eq!(decision.product, Some(Product::Both));
        assert_eq!(decision.max_amount, Some(18_500_000));
        assert_eq!(decision.max_term, Some(144));
        assert_eq!(decision.available_capacity, Some(412_000));
    }

    #[test]
    fn decision_requires_a_known_decision_label() {
        let missing = Decision::from_structured(json!({ "verdict": {} }));
        assert!(matches!(missing, Err(DecisionParseError::MissingDecision)));

        let unknown = Decision::from_structured(json!({
            "verdict": { "decision": "MAYBE" }
        }));
        assert!(matches!(
            unknown,
            Err(DecisionParseError::UnknownDecision(label)) if label == "MAYBE"
        ));
    }

    #[test]
    fn decision_tolerates_partial_verdicts() {
        let body = json!({
            "verdict": { "decision": "REJECTED", "product": "SOMETHING_NEW" }
        });

        let decision = Decision::from_structured(body).expect("decision alone suffices");
        assert_eq!(decision.decision, DecisionOutcome::Rejected);
        assert!(decision.product.is_none());
        assert!(decision.max_amount.is_none());
        assert!(decision.summary.is_empty());
    }

    #[test]
    fn summary_is_capped_at_250_chars() {
        let long = "x".repeat(400);
        let body = json!({
            "verdict": { "decision": "CONDITIONAL" },
            "summary": long
        });

        let decision = Decision::from_structured(body).expect("valid verdict");
        assert_eq!(decision.summary.chars().count(), SUMMARY_MAX_CHARS);
    }
}
