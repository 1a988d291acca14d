use crate::schema::CompanyClass;

/// Decides which chart-of-accounts class a company belongs to.
///
/// The default implementation is a keyword heuristic over free-text
/// sector/industry fields; putting it behind a trait lets a stricter
/// classifier (an explicit enum column, an external service) replace it
/// without touching the normalization engine.
pub trait CompanyClassifier {
    fn classify(&self, sector_industry_hint: &str) -> CompanyClass;
}

/// Substring matcher over the lowercased sector/industry text.
///
/// "bank" wins over "insur" so that bancassurance groups land on the bank
/// template, which carries the larger balance sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl CompanyClassifier for KeywordClassifier {
    fn classify(&self, sector_industry_hint: &str) -> CompanyClass {
        let hint = sector_industry_hint.to_lowercase();
        if hint.contains("bank") {
            CompanyClass::Bank
        } else if hint.contains("insur") {
            CompanyClass::Insurer
        } else {
            CompanyClass::Normal
        }
    }
}

/// Convenience wrapper using the default keyword heuristic.
pub fn classify_company(sector_industry_hint: &str) -> CompanyClass {
    KeywordClassifier.classify(sector_industry_hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_classification() {
        assert_eq!(classify_company("Financials / Regional Banks"), CompanyClass::Bank);
        assert_eq!(classify_company("Insurance - Property & Casualty"), CompanyClass::Insurer);
        assert_eq!(classify_company("Life Insurers"), CompanyClass::Insurer);
        assert_eq!(classify_company("Consumer Staples / Food Retail"), CompanyClass::Normal);
        assert_eq!(classify_company(""), CompanyClass::Normal);
    }

    #[test]
    fn test_bank_wins_over_insurance() {
        assert_eq!(
            classify_company("Banking & Insurance Conglomerate"),
            CompanyClass::Bank
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify_company("BANKS"), CompanyClass::Bank);
        assert_eq!(classify_company("InSuRaNcE"), CompanyClass::Insurer);
    }
}
