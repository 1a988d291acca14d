use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    #[schemars(description = "Income statement (profit and loss). Provider code: IS")]
    #[serde(alias = "IS")]
    IncomeStatement,

    #[schemars(description = "Balance sheet (statement of financial position). Provider code: BS")]
    #[serde(alias = "BS")]
    BalanceSheet,

    #[schemars(description = "Cash flow statement. Provider code: CF")]
    #[serde(alias = "CF")]
    CashFlow,
}

impl StatementKind {
    /// Two-letter code used by the persistence layer and the raw providers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "IS",
            Self::BalanceSheet => "BS",
            Self::CashFlow => "CF",
        }
    }

    /// Human-readable title, as embedded in some providers' tables.
    pub fn title(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "Income Statement",
            Self::BalanceSheet => "Balance Sheet",
            Self::CashFlow => "Cash Flow",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum CompanyClass {
    #[schemars(description = "Ordinary industrial/commercial chart of accounts")]
    #[default]
    Normal,

    #[schemars(description = "Bank chart of accounts (loans, deposits, net interest income)")]
    Bank,

    #[schemars(description = "Insurer chart of accounts (premiums, claims, float)")]
    Insurer,
}

/// Per-company fiscal calendar and presentation context.
///
/// `fiscal_year_end_month` is `None` when the persistence layer has no
/// reliable value; LTM and bare-year headers cannot be resolved without it
/// and the affected cells are skipped rather than defaulted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FiscalContext {
    #[schemars(description = "Month the fiscal year ends (1 = January, 12 = December)")]
    pub fiscal_year_end_month: Option<u32>,

    #[schemars(description = "Reporting currency code attached to every emitted fact")]
    pub currency: String,

    #[schemars(description = "Chart-of-accounts class, selecting the display template")]
    pub company_class: CompanyClass,
}

impl FiscalContext {
    pub fn new(
        fiscal_year_end_month: Option<u32>,
        currency: impl Into<String>,
        company_class: CompanyClass,
    ) -> Self {
        Self {
            fiscal_year_end_month,
            currency: currency.into(),
            company_class,
        }
    }
}

/// The atomic unit of normalized financial data.
///
/// Facts are scoped to a single company (the company key is owned by the
/// persistence collaborator). Unique per `(statement, metric,
/// period_end_date)`; re-ingestion keeps the first value for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Fact {
    pub statement: StatementKind,
    pub metric: String,
    pub period_end_date: NaiveDate,
    pub value: f64,
    pub currency: String,
}

/// A provider's raw statement table, exactly as scraped or cached.
///
/// `rows[0]` is the header row: a label placeholder followed by one period
/// header per data column. Every later row is `[metric_label, value, ...]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawStatementTable {
    pub rows: Vec<Vec<String>>,
}

impl RawStatementTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Period header cells (everything after the label placeholder).
    pub fn period_headers(&self) -> &[String] {
        match self.rows.first() {
            Some(header) if !header.is_empty() => &header[1..],
            _ => &[],
        }
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.rows.iter().skip(1)
    }

    /// First data row, used by the TTM-duplicate heuristic (Revenue for the
    /// income statement, Cash From Operations for the cash flow statement).
    pub fn first_data_row(&self) -> Option<&Vec<String>> {
        self.rows.get(1)
    }
}

/// Parsed form of a raw period header.
///
/// Estimate headers (`"Dec '27 (E)"`) never produce a variant: the parser
/// rejects them so forecast periods cannot enter the fact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderPeriod {
    /// Concrete month/year header such as `"Dec '24"`.
    MonthYear { month: u32, year: i32 },
    /// Bare fiscal-year header such as `"2015"`; the month comes from the
    /// company's fiscal year end.
    YearOnly { year: i32 },
    /// Trailing-twelve-month column (`"LTM"` / `"TTM"`), resolved relative
    /// to the fiscal calendar and the other headers in the same table.
    Ltm,
}

/// A parsed cell: either a number or an explicit "no data" marker.
///
/// Providers print the same dash for "zero" and "not reported"; keeping the
/// distinction here lets summation sites decide where zero is a valid
/// neutral element instead of baking the coercion into the parser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Missing,
}

impl CellValue {
    pub fn or_zero(self) -> f64 {
        match self {
            Self::Number(v) => v,
            Self::Missing => 0.0,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}
