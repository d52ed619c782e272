//! Automated credit-risk validation for payroll-deduction loan
//! applications.
//!
//! One validation is a sequential pipeline: assemble raw applicant
//! evidence from the loan-origination platform, consolidate it into a
//! compact canonical document, submit that document to the external
//! reasoning service under a versioned credit policy, and persist an
//! auditable record of the whole exchange. The orchestrator in
//! [`service`] sequences the stages; every external collaborator sits
//! behind a trait seam.

pub mod audit;
pub mod consolidate;
pub mod domain;
pub mod policy;
pub mod reasoning;
pub mod service;
pub mod session;
pub mod upstream;

pub use audit::{AuditId, AuditRecord, AuditStatus, AuditStore, InMemoryAuditStore};
pub use consolidate::{consolidate, CanonicalEvidence, PayerCategory};
pub use domain::{
    Decision, DecisionOutcome, FailureKind, Product, RawEvidenceBundle, ValidationOutcome,
    ValidationStatus,
};
pub use reasoning::{HttpReasoningClient, ReasoningClient, ReasoningInvoker};
pub use service::{CreditValidationService, ValidationError};
pub use session::SessionStore;
pub use upstream::{EvidenceSource, FetchedEvidence, PlatformClient, UpstreamError};
