use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{DecisionOutcome, Product};

pub type AuditId = u64;

/// Lifecycle of one audit row. Terminal states are final: a record never
/// leaves `Success` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Processing,
    Success,
    Error,
}

impl AuditStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

/// One persisted row per validation attempt: raw source payloads as opaque
/// blobs, the canonical evidence and verdict, denormalized decision
/// scalars for queryability, and per-stage metrics. Derived fields are
/// always written from the same snapshot the decision was made on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<AuditId>,
    pub transaction_id: String,
    pub person_id: Option<String>,
    pub input_ocr: Option<Value>,
    pub input_bureau: Option<Value>,
    pub input_background: Option<Value>,
    pub input_tasks: Option<Value>,
    pub canonical_evidence: Option<Value>,
    pub raw_response: Option<String>,
    pub parsed_response: Option<Value>,
    pub decision: Option<DecisionOutcome>,
    pub product: Option<Product>,
    pub max_amount: Option<i64>,
    pub max_term: Option<u32>,
    pub available_capacity: Option<i64>,
    pub garnishment_count: Option<u64>,
    pub summary: Option<String>,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    pub latency_upstream_ms: Option<u64>,
    pub latency_reasoning_ms: Option<u64>,
    pub latency_total_ms: Option<u64>,
    pub retries: u32,
    pub model_version: String,
    pub prompt_version: String,
    pub status: AuditStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// A fresh `PROCESSING` record for one attempt.
    pub fn begin(transaction_id: &str, model_version: &str, prompt_version: &str) -> Self {
        Self {
            id: None,
            transaction_id: transaction_id.to_string(),
            person_id: None,
            input_ocr: None,
            input_bureau: None,
            input_background: None,
            input_tasks: None,
            canonical_evidence: None,
            raw_response: None,
            parsed_response: None,
            decision: None,
            product: None,
            max_amount: None,
            max_term: None,
            available_capacity: None,
            garnishment_count: None,
            summary: None,
            tokens_input: None,
            tokens_output: None,
            latency_upstream_ms: None,
            latency_reasoning_ms: None,
            latency_total_ms: None,
            retries: 0,
            model_version: model_version.to_string(),
            prompt_version: prompt_version.to_string(),
            status: AuditStatus::Processing,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    #[error("audit record {0} not found")]
    NotFound(AuditId),
    #[error("audit record {0} is already finalized")]
    AlreadyFinalized(AuditId),
    #[error("finalize requires a terminal status")]
    NotTerminal,
}

/// Storage boundary for the audit trail. Rows are append-only from the
/// caller's perspective: updates mutate the one row for an in-flight
/// attempt, and nothing is ever deleted.
pub trait AuditStore: Send + Sync {
    fn begin(&self, record: AuditRecord) -> Result<AuditId, AuditError>;
    fn update(&self, id: AuditId, record: &AuditRecord) -> Result<(), AuditError>;
    fn finalize(&self, id: AuditId, record: &AuditRecord) -> Result<(), AuditError>;
    /// All records for a transaction, most recent first.
    fn list_by_transaction(&self, transaction_id: &str) -> Result<Vec<AuditRecord>, AuditError>;
    fn fetch(&self, id: AuditId) -> Result<Option<AuditRecord>, AuditError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: AuditId,
    records: BTreeMap<AuditId, AuditRecord>,
}

/// Mutex-guarded map store. The shipped store for this service; a
/// DBMS-backed implementation slots in behind the same trait.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn begin(&self, mut record: AuditRecord) -> Result<AuditId, AuditError> {
        let mut inner = self.inner.lock().expect("audit mutex poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        record.id = Some(id);
        inner.records.insert(id, record);
        Ok(id)
    }

    fn update(&self, id: AuditId, record: &AuditRecord) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().expect("audit mutex poisoned");
        let stored = inner.records.get_mut(&id).ok_or(AuditError::NotFound(id))?;
        if stored.status.is_terminal() {
            return Err(AuditError::AlreadyFinalized(id));
        }
        let mut snapshot = record.clone();
        snapshot.id = Some(id);
        *stored = snapshot;
        Ok(())
    }

    fn finalize(&self, id: AuditId, record: &AuditRecord) -> Result<(), AuditError> {
        if !record.status.is_terminal() {
            return Err(AuditError::NotTerminal);
        }
        self.update(id, record)
    }

    fn list_by_transaction(&self, transaction_id: &str) -> Result<Vec<AuditRecord>, AuditError> {
        let inner = self.inner.lock().expect("audit mutex poisoned");
        Ok(inner
            .records
            .values()
            .filter(|record| record.transaction_id == transaction_id)
            .rev()
            .cloned()
            .collect())
    }

    fn fetch(&self, id: AuditId) -> Result<Option<AuditRecord>, AuditError> {
        let inner = self.inner.lock().expect("audit mutex poisoned");
        Ok(inner.records.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(transaction_id: &str) -> AuditRecord {
        AuditRecord::begin(transaction_id, "model-x", "1.0.0")
    }

    #[test]
    fn begin_assigns_ids_and_starts_processing() {
        let store = InMemoryAuditStore::new();
        let first = store.begin(record("txn-1")).expect("insert");
        let second = store.begin(record("txn-1")).expect("insert");
        assert!(second > first);

        let stored = store.fetch(first).expect("fetch").expect("present");
        assert_eq!(stored.status, AuditStatus::Processing);
        assert_eq!(stored.id, Some(first));
    }

    #[test]
    fn finalize_is_terminal_exactly_once() {
        let store = InMemoryAuditStore::new();
        let mut draft = record("txn-1");
        let id = store.begin(draft.clone()).expect("insert");

        draft.status = AuditStatus::Error;
        draft.error_message = Some("bureau summary missing".to_string());
        store.finalize(id, &draft).expect("first finalize");

        draft.status = AuditStatus::Success;
        let err = store.finalize(id, &draft).expect_err("second finalize rejected");
        assert!(matches!(err, AuditError::AlreadyFinalized(found) if found == id));

        let stored = store.fetch(id).expect("fetch").expect("present");
        assert_eq!(stored.status, AuditStatus::Error);
    }

    #[test]
    fn finalize_rejects_a_non_terminal_status() {
        let store = InMemoryAuditStore::new();
        let draft = record("txn-1");
        let id = store.begin(draft.clone()).expect("insert");
        let err = store.finalize(id, &draft).expect_err("processing is not terminal");
        assert!(matches!(err, AuditError::NotTerminal));
    }

    #[test]
    fn updates_accumulate_until_finalized() {
        let store = InMemoryAuditStore::new();
        let mut draft = record("txn-1");
        let id = store.begin(draft.clone()).expect("insert");

        draft.person_id = Some("person-9".to_string());
        draft.latency_upstream_ms = Some(412);
        store.update(id, &draft).expect("update");

        let stored = store.fetch(id).expect("fetch").expect("present");
        assert_eq!(stored.person_id.as_deref(), Some("person-9"));
        assert_eq!(stored.latency_upstream_ms, Some(412));
    }

    #[test]
    fn listing_returns_most_recent_first() {
        let store = InMemoryAuditStore::new();
        let first = store.begin(record("txn-1")).expect("insert");
        store.begin(record("txn-other")).expect("insert");
        let third = store.begin(record("txn-1")).expect("insert");

        let listed = store.list_by_transaction("txn-1").expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, Some(third));
        assert_eq!(listed[1].id, Some(first));
    }
}
