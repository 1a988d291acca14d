use crate::error::{Result, StatementError};
use crate::schema::{CompanyClass, StatementKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One row slot in a fixed display template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateEntry {
    /// Plain lookup by exact canonical name.
    Metric(String),
    /// Display one source metric under a different label.
    Rename { display: String, source: String },
    /// Per-period sum of several source metrics under one label.
    Combine {
        display: String,
        sources: Vec<String>,
    },
    /// Layout-only separator row; always rendered.
    Spacer,
}

impl TemplateEntry {
    pub fn metric(name: &str) -> Self {
        Self::Metric(name.to_string())
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Metric(name) => Some(name),
            Self::Rename { display, .. } | Self::Combine { display, .. } => Some(display),
            Self::Spacer => None,
        }
    }
}

/// An ordered metric template: the authoritative row order for display.
/// Metrics absent from the template are not displayed (the facts survive in
/// storage, they just have no row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementTemplate {
    pub statement: StatementKind,
    pub entries: Vec<TemplateEntry>,
    /// Display names rendered as emphasized subtotal rows.
    pub sum_metrics: HashSet<String>,
}

impl StatementTemplate {
    pub fn new(statement: StatementKind, entries: Vec<TemplateEntry>) -> Self {
        Self {
            statement,
            entries,
            sum_metrics: HashSet::new(),
        }
    }

    pub fn with_sum_metrics(mut self, names: &[&str]) -> Self {
        self.sum_metrics = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Structural check. Duplicate plain `Metric` entries are allowed (some
    /// providers legitimately repeat a label like "Other" across sections),
    /// but combine/rename entries must be well-formed and their display
    /// names unique.
    pub fn validate(&self) -> Result<()> {
        let mut derived_names: HashSet<&str> = HashSet::new();
        for entry in &self.entries {
            match entry {
                TemplateEntry::Combine { display, sources } => {
                    if sources.is_empty() {
                        return Err(self.invalid(format!("combine '{}' has no sources", display)));
                    }
                    if !derived_names.insert(display) {
                        return Err(self.invalid(format!("duplicate display name '{}'", display)));
                    }
                }
                TemplateEntry::Rename { display, source } => {
                    if source.is_empty() {
                        return Err(self.invalid(format!("rename '{}' has no source", display)));
                    }
                    if !derived_names.insert(display) {
                        return Err(self.invalid(format!("duplicate display name '{}'", display)));
                    }
                }
                TemplateEntry::Metric(_) | TemplateEntry::Spacer => {}
            }
        }
        Ok(())
    }

    fn invalid(&self, details: String) -> StatementError {
        StatementError::InvalidTemplate {
            statement: self.statement.title().to_string(),
            details,
        }
    }
}

/// Subtotal lines shared across the QFS-style templates.
const SUM_METRICS: &[&str] = &[
    "Gross Profit",
    "Operating Profit",
    "Pre-Tax Income",
    "Net Income",
    "Net Interest Income",
    "Total Current Assets",
    "Total Assets",
    "Total Current Liabilities",
    "Total Liabilities",
    "Liabilities & Equity",
    "Cash From Operations",
    "Cash From Investing",
    "Cash From Financing",
];

/// The shared subtotal set as an owned set, for natural-order presentation.
pub fn default_sum_metrics() -> HashSet<String> {
    SUM_METRICS.iter().map(|s| s.to_string()).collect()
}

/// Fixed display template for QFS-style sources, selected by statement kind
/// and chart-of-accounts class.
pub fn quickfs_template(statement: StatementKind, class: CompanyClass) -> StatementTemplate {
    let entries = match (statement, class) {
        (StatementKind::IncomeStatement, CompanyClass::Normal) => normal_income_statement(),
        (StatementKind::IncomeStatement, CompanyClass::Bank) => bank_income_statement(),
        (StatementKind::IncomeStatement, CompanyClass::Insurer) => insurer_income_statement(),
        (StatementKind::BalanceSheet, CompanyClass::Normal) => normal_balance_sheet(),
        (StatementKind::BalanceSheet, CompanyClass::Bank) => bank_balance_sheet(),
        (StatementKind::BalanceSheet, CompanyClass::Insurer) => insurer_balance_sheet(),
        // Cash flow presentation does not vary by class.
        (StatementKind::CashFlow, _) => cash_flow(),
    };
    StatementTemplate::new(statement, entries).with_sum_metrics(SUM_METRICS)
}

fn m(name: &str) -> TemplateEntry {
    TemplateEntry::metric(name)
}

fn normal_income_statement() -> Vec<TemplateEntry> {
    vec![
        m("Revenue"),
        m("Cost of Goods Sold"),
        m("Gross Profit"),
        TemplateEntry::Spacer,
        m("Sales, General, & Administrative"),
        m("Other Operating Expense"),
        m("Total Operating Expenses"),
        m("Operating Profit"),
        TemplateEntry::Spacer,
        m("Net Interest Income"),
        m("Other Non-Operating Income"),
        m("Pre-Tax Income"),
        m("Income Tax"),
        m("Other Non-recurring"),
        m("Net Income"),
        TemplateEntry::Spacer,
        m("Shares (Basic)"),
        m("Shares (Diluted)"),
    ]
}

fn bank_income_statement() -> Vec<TemplateEntry> {
    vec![
        m("Interest Income"),
        m("Interest Expense"),
        TemplateEntry::Combine {
            display: "Net Interest Income".to_string(),
            sources: vec!["Interest Income".to_string(), "Interest Expense".to_string()],
        },
        m("Provision for Loan Losses"),
        TemplateEntry::Spacer,
        TemplateEntry::Rename {
            display: "Fee Income".to_string(),
            source: "Non-Interest Income".to_string(),
        },
        m("Non-Interest Expense"),
        m("Pre-Tax Income"),
        m("Income Tax"),
        m("Net Income"),
        TemplateEntry::Spacer,
        m("Shares (Basic)"),
        m("Shares (Diluted)"),
    ]
}

fn insurer_income_statement() -> Vec<TemplateEntry> {
    vec![
        m("Premiums Earned"),
        m("Net Investment Income"),
        m("Other Revenue"),
        m("Revenue"),
        TemplateEntry::Spacer,
        m("Losses & Loss Adjustment Expenses"),
        m("Policy Acquisition Costs"),
        m("Other Underwriting Expenses"),
        m("Pre-Tax Income"),
        m("Income Tax"),
        m("Net Income"),
        TemplateEntry::Spacer,
        m("Shares (Basic)"),
        m("Shares (Diluted)"),
    ]
}

fn normal_balance_sheet() -> Vec<TemplateEntry> {
    vec![
        m("Cash & Equivalents"),
        m("Accounts Receivable"),
        m("Inventories"),
        m("Other Current Assets"),
        m("Total Current Assets"),
        m("Property, Plant, & Equipment (Net)"),
        m("Goodwill"),
        m("Other Intangible Assets"),
        m("Other Assets"),
        m("Total Assets"),
        TemplateEntry::Spacer,
        m("Accounts Payable"),
        m("Tax Payable"),
        m("Short-Term Debt"),
        m("Current Portion of Capital Leases"),
        m("Other Current Liabilities"),
        m("Total Current Liabilities"),
        m("Long-Term Debt"),
        m("Capital Leases"),
        m("Pension Liabilities"),
        m("Other Liabilities"),
        m("Total Liabilities"),
        TemplateEntry::Spacer,
        m("Retained Earnings"),
        m("Paid-in Capital"),
        m("Common Stock"),
        m("Other"),
        m("Shareholders' Equity"),
        m("Liabilities & Equity"),
    ]
}

fn bank_balance_sheet() -> Vec<TemplateEntry> {
    vec![
        m("Cash & Equivalents"),
        m("Investment Securities"),
        m("Gross Loans"),
        m("Allowance for Loan Losses"),
        m("Net Loans"),
        m("Other Assets"),
        m("Total Assets"),
        TemplateEntry::Spacer,
        m("Deposits"),
        m("Short-Term Debt"),
        m("Long-Term Debt"),
        m("Other Liabilities"),
        m("Total Liabilities"),
        TemplateEntry::Spacer,
        m("Retained Earnings"),
        m("Paid-in Capital"),
        m("Common Stock"),
        m("Other"),
        m("Shareholders' Equity"),
        m("Liabilities & Equity"),
    ]
}

fn insurer_balance_sheet() -> Vec<TemplateEntry> {
    vec![
        m("Total Investments"),
        m("Cash & Equivalents"),
        m("Premiums Receivable"),
        m("Reinsurance Recoverable"),
        m("Deferred Acquisition Costs"),
        m("Other Assets"),
        m("Total Assets"),
        TemplateEntry::Spacer,
        m("Loss & Loss Adjustment Reserves"),
        m("Unearned Premiums"),
        m("Long-Term Debt"),
        m("Other Liabilities"),
        m("Total Liabilities"),
        TemplateEntry::Spacer,
        m("Retained Earnings"),
        m("Paid-in Capital"),
        m("Common Stock"),
        m("Other"),
        m("Shareholders' Equity"),
        m("Liabilities & Equity"),
    ]
}

fn cash_flow() -> Vec<TemplateEntry> {
    vec![
        m("Net Income"),
        m("Depreciation & Amortization"),
        m("Change in Working Capital"),
        m("Change in Deferred Tax"),
        m("Stock-Based Compensation"),
        m("Other"),
        m("Cash From Operations"),
        TemplateEntry::Spacer,
        m("Property, Plant, & Equipment"),
        m("Acquisitions"),
        m("Intangibles"),
        m("Other"),
        m("Cash From Investing"),
        TemplateEntry::Spacer,
        m("Net Issuance of Common Stock"),
        m("Net Issuance of Debt"),
        m("Other"),
        m("Cash From Financing"),
        m("Free Cash Flow"),
    ]
}
