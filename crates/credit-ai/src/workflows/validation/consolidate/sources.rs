//! Defaulting adapters over the three loosely-typed source schemas.
//!
//! Every function here is total: a missing or wrong-typed field resolves to
//! an empty container or default scalar, never an error. Shapes the adapters
//! genuinely cannot interpret are reported back as anomaly strings so the
//! consolidator can record them instead of guessing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payment-behavior codes are truncated to the most recent twelve months.
const PAYMENT_BEHAVIOR_MONTHS: usize = 12;

/// One payroll deduction as it appears on the payslip, amount in whole
/// currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub description: String,
    pub amount: i64,
}

/// Reduced projection of one outstanding bureau loan; fields the policy
/// does not read are dropped to keep the evidence document compact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BureauLoan {
    pub lender: Option<String>,
    pub account_type: Option<String>,
    pub outstanding_debt: i64,
    pub installment: i64,
    pub payroll_deduction: Option<bool>,
    pub worst_delinquency: Option<String>,
    pub payment_behavior: String,
    pub sector: Option<String>,
}

/// Reduced projection of one legal process from the background check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalProcess {
    pub entity: Option<String>,
    pub defendant: Option<bool>,
    pub open: Option<bool>,
    pub process_type: Option<String>,
}

/// Reduced projection of one pending task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Option<String>,
    pub source: Option<String>,
    pub all_validated: Option<bool>,
}

/// Coerces a monetary field to whole currency units. Accepts integers,
/// floats (truncated toward zero), and numeric strings; anything else is
/// unusable and reported as `None`.
pub(super) fn as_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|amount| amount as i64)),
        Value::String(raw) => {
            let trimmed = raw.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|amount| amount as i64))
        }
        _ => None,
    }
}

fn amount_or_zero(value: Option<&Value>) -> i64 {
    value.and_then(as_amount).unwrap_or(0)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// The deduction list has shipped in two incompatible shapes across schema
/// revisions: a sequence of `{description, amount}` records, and a map of
/// description to amount. Both normalize to the same record list; an
/// unknown shape yields an empty list plus an anomaly.
pub(super) fn parse_deductions(value: Option<&Value>) -> (Vec<Deduction>, Option<String>) {
    match value {
        None | Some(Value::Null) => (Vec::new(), None),
        Some(Value::Array(entries)) => {
            let deductions = entries
                .iter()
                .filter_map(|entry| {
                    let description = string_field(entry, "description")?;
                    Some(Deduction {
                        description,
                        amount: amount_or_zero(entry.get("amount")),
                    })
                })
                .collect();
            (deductions, None)
        }
        Some(Value::Object(map)) => {
            let deductions = map
                .iter()
                .map(|(description, amount)| Deduction {
                    description: description.clone(),
                    amount: amount_or_zero(Some(amount)),
                })
                .collect();
            (deductions, None)
        }
        Some(other) => {
            let anomaly = format!(
                "deduction list has unrecognized shape ({})",
                json_kind(other)
            );
            (Vec::new(), Some(anomaly))
        }
    }
}

pub(super) fn project_bureau_loan(entry: &Value) -> BureauLoan {
    let accounts = entry.get("accounts").cloned().unwrap_or(Value::Null);

    let payment_behavior = accounts
        .get("paymentBehavior")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .chars()
        .take(PAYMENT_BEHAVIOR_MONTHS)
        .collect();

    BureauLoan {
        lender: string_field(&accounts, "lenderName"),
        account_type: string_field(&accounts, "accountType"),
        outstanding_debt: amount_or_zero(accounts.get("totalDebt")),
        installment: amount_or_zero(accounts.get("installments")),
        payroll_deduction: accounts
            .get("typePayrollDeductionLoan")
            .and_then(Value::as_bool),
        worst_delinquency: string_field(&accounts, "pastDueMax"),
        payment_behavior,
        sector: string_field(&accounts, "sector"),
    }
}

pub(super) fn project_legal_process(entry: &Value) -> LegalProcess {
    LegalProcess {
        entity: string_field(entry, "entity"),
        defendant: entry.get("roleDefendant").and_then(Value::as_bool),
        open: entry.get("processOpen").and_then(Value::as_bool),
        process_type: string_field(entry, "processType"),
    }
}

pub(super) fn project_task(entry: &Value) -> TaskSummary {
    // Task ids have shipped both as strings and as numbers.
    let id = match entry.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };

    TaskSummary {
        id,
        source: string_field(entry, "nameFrom"),
        all_validated: entry.get("allTaskValidated").and_then(Value::as_bool),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amounts_coerce_from_integers_floats_and_strings() {
        assert_eq!(as_amount(&json!(1_250_000)), Some(1_250_000));
        assert_eq!(as_amount(&json!(1_250_000.75)), Some(1_250_000));
        assert_eq!(as_amount(&json!("980000")), Some(980_000));
        assert_eq!(as_amount(&json!("980000.5")), Some(980_000));
        assert_eq!(as_amount(&json!("n/a")), None);
        assert_eq!(as_amount(&json!([1])), None);
    }

    #[test]
    fn deduction_records_parse_from_the_sequence_shape() {
        let raw = json!([
            { "description": "Aporte salud", "amount": 120_000 },
            { "description": "LIBRANZA BANCO", "amount": "310000" },
            { "amount": 99 }
        ]);

        let (deductions, anomaly) = parse_deductions(Some(&raw));
        assert!(anomaly.is_none());
        assert_eq!(deductions.len(), 2);
        assert_eq!(deductions[1].amount, 310_000);
    }

    #[test]
    fn deduction_records_parse_from_the_map_shape() {
        let raw = json!({
            "Aporte salud": 120_000,
            "EMBARGO JUZGADO": 250_000
        });

        let (deductions, anomaly) = parse_deductions(Some(&raw));
        assert!(anomaly.is_none());
        assert_eq!(deductions.len(), 2);
        assert!(deductions
            .iter()
            .any(|d| d.description == "EMBARGO JUZGADO" && d.amount == 250_000));
    }

    #[test]
    fn unknown_deduction_shape_degrades_to_empty_with_anomaly() {
        let (deductions, anomaly) = parse_deductions(Some(&json!("salud: 120000")));
        assert!(deductions.is_empty());
        assert_eq!(
            anomaly.as_deref(),
            Some("deduction list has unrecognized shape (string)")
        );

        let (deductions, anomaly) = parse_deductions(None);
        assert!(deductions.is_empty());
        assert!(anomaly.is_none());
    }

    #[test]
    fn bureau_loan_projection_truncates_payment_behavior() {
        let entry = json!({
            "accounts": {
                "lenderName": "Banco Popular",
                "accountType": "LIBRANZA",
                "totalDebt": "15400000",
                "installments": 420_000.9,
                "typePayrollDeductionLoan": true,
                "pastDueMax": "030",
                "paymentBehavior": "NNNNNNNNNNNNNNNNNNNNNNNN",
                "sector": "FINANCIERO"
            }
        });

        let loan = project_bureau_loan(&entry);
        assert_eq!(loan.lender.as_deref(), Some("Banco Popular"));
        assert_eq!(loan.outstanding_debt, 15_400_000);
        assert_eq!(loan.installment, 420_000);
        assert_eq!(loan.payment_behavior.len(), 12);
        assert_eq!(loan.payroll_deduction, Some(true));
    }

    #[test]
    fn projections_default_on_malformed_entries() {
        let loan = project_bureau_loan(&json!({ "accounts": 7 }));
        assert!(loan.lender.is_none());
        assert_eq!(loan.outstanding_debt, 0);
        assert!(loan.payment_behavior.is_empty());

        let process = project_legal_process(&json!("not an object"));
        assert!(process.entity.is_none());
        assert!(process.open.is_none());

        let task = project_task(&json!({ "id": 41, "nameFrom": "BURO" }));
        assert_eq!(task.id.as_deref(), Some("41"));
        assert_eq!(task.source.as_deref(), Some("BURO"));
        assert!(task.all_validated.is_none());
    }
}
