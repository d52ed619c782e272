use serde::{Deserialize, Serialize};

/// Fixed taxonomy of pension payers the policy distinguishes. Anything
/// outside the known payer list falls into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayerCategory {
    Colpensiones,
    Fopep,
    Fiduprevisora,
    Casur,
    Cremil,
    Positiva,
    Other,
}

const PAYER_MATCHES: [(&str, PayerCategory); 6] = [
    ("COLPENSIONES", PayerCategory::Colpensiones),
    ("FOPEP", PayerCategory::Fopep),
    ("FIDUPREVISORA", PayerCategory::Fiduprevisora),
    ("CASUR", PayerCategory::Casur),
    ("CREMIL", PayerCategory::Cremil),
    ("POSITIVA", PayerCategory::Positiva),
];

/// Payroll-deduction descriptions containing any of these mark a
/// loan-type deduction.
const LOAN_KEYWORDS: [&str; 5] = ["LIBRANZA", "PRESTAMO", "CREDITO", "BCO", "BANCO"];

/// A wage attachment ordered by a court shows up on the payslip with this
/// marker.
const GARNISHMENT_KEYWORD: &str = "EMBARGO";

/// Classifies an employer/payer name by case-insensitive substring match.
pub fn classify_payer(name: &str) -> PayerCategory {
    let upper = name.to_uppercase();
    PAYER_MATCHES
        .iter()
        .find(|(needle, _)| upper.contains(needle))
        .map(|(_, category)| *category)
        .unwrap_or(PayerCategory::Other)
}

pub fn is_loan_deduction(description: &str) -> bool {
    let upper = description.to_uppercase();
    LOAN_KEYWORDS.iter().any(|keyword| upper.contains(keyword))
}

pub fn is_garnishment(description: &str) -> bool {
    description.to_uppercase().contains(GARNISHMENT_KEYWORD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payer_classification_is_deterministic_and_case_insensitive() {
        assert_eq!(classify_payer("Colpensiones S.A."), PayerCategory::Colpensiones);
        assert_eq!(classify_payer("fopep - consorcio"), PayerCategory::Fopep);
        assert_eq!(classify_payer("FIDUPREVISORA"), PayerCategory::Fiduprevisora);
        assert_eq!(classify_payer("Alcaldia Municipal"), PayerCategory::Other);
        assert_eq!(classify_payer(""), PayerCategory::Other);

        // Same input, same category, every time.
        assert_eq!(classify_payer("casur bogota"), classify_payer("casur bogota"));
    }

    #[test]
    fn loan_keywords_match_anywhere_in_the_description() {
        assert!(is_loan_deduction("LIBRANZA BANCO POPULAR"));
        assert!(is_loan_deduction("prestamo vivienda"));
        assert!(is_loan_deduction("Dcto credito rotativo"));
        assert!(is_loan_deduction("BCO BOGOTA CUOTA 12/48"));
        assert!(!is_loan_deduction("Aporte salud"));
    }

    #[test]
    fn garnishment_keyword_is_independent_of_loan_keywords() {
        assert!(is_garnishment("EMBARGO JUZGADO 12"));
        assert!(is_garnishment("embargo alimentos"));
        assert!(!is_garnishment("LIBRANZA BANCO POPULAR"));
        assert!(!is_loan_deduction("EMBARGO JUZGADO 12"));
    }
}
