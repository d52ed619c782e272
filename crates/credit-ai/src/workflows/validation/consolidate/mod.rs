//! Evidence consolidation: the pure transformation from the three raw
//! source documents into the canonical evidence handed to the reasoning
//! service.

mod sources;
pub mod taxonomy;

pub use sources::{BureauLoan, Deduction, LegalProcess, TaskSummary};
pub use taxonomy::PayerCategory;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::RawEvidenceBundle;
use sources::{parse_deductions, project_bureau_loan, project_legal_process, project_task};
use taxonomy::{classify_payer, is_garnishment, is_loan_deduction};

const UNKNOWN_PAYER: &str = "UNKNOWN";

/// The normalized, compact evidence document. Field names are stable and
/// independent of source-schema naming; collections preserve source
/// insertion order; every monetary amount is in whole currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvidence {
    pub transaction_id: String,
    pub applicant: ApplicantSummary,
    pub bureau: BureauSummary,
    pub background: BackgroundSummary,
    pub tasks: Vec<TaskSummary>,
    /// Source shapes the adapters refused to guess at.
    pub anomalies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantSummary {
    /// Personal fields from the primary OCR document, carried through as-is.
    pub personal: Value,
    pub payer_name: String,
    pub payer_category: PayerCategory,
    pub gross_salary: Option<i64>,
    pub net_salary: Option<i64>,
    pub deductions: Vec<Deduction>,
    pub loan_deductions: Vec<Deduction>,
    pub garnishments: Vec<Deduction>,
    pub garnishment_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BureauSummary {
    pub score: Option<i64>,
    pub full_name: Option<String>,
    pub document_id: Option<String>,
    pub alerts: Value,
    pub loans: Vec<BureauLoan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundSummary {
    pub sarlaft_compliant: Option<bool>,
    pub process_count: Option<i64>,
    pub processes: Vec<LegalProcess>,
}

/// Consolidates one raw evidence bundle. Total: malformed or missing
/// nested fields degrade to defaults, never an error.
pub fn consolidate(transaction_id: &str, bundle: &RawEvidenceBundle) -> CanonicalEvidence {
    let mut anomalies = Vec::new();

    let applicant = consolidate_applicant(&bundle.ocr_documents, &mut anomalies);
    let bureau = consolidate_bureau(&bundle.bureau_report);
    let background = consolidate_background(&bundle.background_check);
    let tasks = bundle.pending_tasks.iter().map(project_task).collect();

    CanonicalEvidence {
        transaction_id: transaction_id.to_string(),
        applicant,
        bureau,
        background,
        tasks,
        anomalies,
    }
}

fn consolidate_applicant(ocr_documents: &[Value], anomalies: &mut Vec<String>) -> ApplicantSummary {
    // The first OCR document is the primary payslip.
    let primary = ocr_documents.first().cloned().unwrap_or(Value::Null);
    let standardized = primary.get("standardizedData").cloned().unwrap_or(Value::Null);

    let employment = standardized.get("employment_info").cloned().unwrap_or(Value::Null);
    let salary = standardized.get("salary_info").cloned().unwrap_or(Value::Null);
    let personal = standardized
        .get("personal_info")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));

    let payer_name = employment
        .get("company_name")
        .and_then(Value::as_str)
        .or_else(|| employment.get("employer_name").and_then(Value::as_str))
        .unwrap_or(UNKNOWN_PAYER)
        .to_string();
    let payer_category = classify_payer(&payer_name);

    let (deductions, deduction_anomaly) = parse_deductions(salary.get("deduction_details"));
    if let Some(anomaly) = deduction_anomaly {
        anomalies.push(anomaly);
    }

    let loan_deductions: Vec<Deduction> = deductions
        .iter()
        .filter(|deduction| is_loan_deduction(&deduction.description))
        .cloned()
        .collect();
    let garnishments: Vec<Deduction> = deductions
        .iter()
        .filter(|deduction| is_garnishment(&deduction.description))
        .cloned()
        .collect();
    let garnishment_count = garnishments.len();

    ApplicantSummary {
        personal,
        payer_name,
        payer_category,
        gross_salary: salary.get("gross_salary").and_then(sources::as_amount),
        net_salary: salary.get("net_salary").and_then(sources::as_amount),
        deductions,
        loan_deductions,
        garnishments,
        garnishment_count,
    }
}

fn consolidate_bureau(report: &Value) -> BureauSummary {
    let basic = report.get("basicInformation").cloned().unwrap_or(Value::Null);

    let loans = report
        .get("outstandingLoans")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(project_bureau_loan).collect())
        .unwrap_or_default();

    BureauSummary {
        score: report
            .get("score")
            .and_then(|score| score.get("scoring"))
            .and_then(Value::as_i64),
        full_name: basic.get("fullName").and_then(Value::as_str).map(str::to_string),
        document_id: basic
            .get("documentIdentificationNumber")
            .and_then(Value::as_str)
            .map(str::to_string),
        alerts: report.get("alert").cloned().unwrap_or(Value::Null),
        loans,
    }
}

fn consolidate_background(check: &Value) -> BackgroundSummary {
    let enrichment = check.get("enrichment").cloned().unwrap_or(Value::Null);

    let processes = enrichment
        .get("processes")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(project_legal_process).collect())
        .unwrap_or_default();

    BackgroundSummary {
        sarlaft_compliant: enrichment.get("sarlaftCompliance").and_then(Value::as_bool),
        process_count: enrichment.get("numberOfProcesses").and_then(Value::as_i64),
        processes,
    }
}
