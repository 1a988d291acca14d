use crate::dates::{
    last_day_of_month, parse_period_header, resolve_ltm_period, validate_fiscal_year_end_month,
};
use crate::error::Result;
use crate::schema::{Fact, FiscalContext, HeaderPeriod, RawStatementTable, StatementKind};
use crate::values::parse_value;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};

/// Relative tolerance for deciding that an LTM column repeats the latest
/// fiscal year. Exact equality is too fragile for scraped numbers.
pub const LTM_DUPLICATE_TOLERANCE: f64 = 1e-6;

/// Turns raw provider tables into flat [`Fact`] streams for one company.
///
/// All data-quality problems degrade to skips: an unparseable header drops
/// its column, a malformed row drops that row, and a missing fiscal year
/// end disables LTM and bare-year resolution without failing the table.
pub struct Ingestor {
    context: FiscalContext,
}

impl Ingestor {
    pub fn new(context: FiscalContext) -> Result<Self> {
        if let Some(month) = context.fiscal_year_end_month {
            validate_fiscal_year_end_month(month)?;
        }
        Ok(Self { context })
    }

    pub fn context(&self) -> &FiscalContext {
        &self.context
    }

    /// Ingests one statement table into facts, deduplicated keep-first on
    /// `(statement, metric, period_end_date)`.
    pub fn ingest_table(&self, table: &RawStatementTable, kind: StatementKind) -> Vec<Fact> {
        self.ingest_with_options(table, kind, false)
    }

    /// Ingests a set of statement tables for the same company. When the LTM
    /// column merely repeats the latest fiscal year (per
    /// [`ltm_duplicates_latest_annual`]), it is dropped from every table so
    /// the same period is not stored twice.
    pub fn ingest_statements(
        &self,
        tables: &BTreeMap<StatementKind, RawStatementTable>,
    ) -> Vec<Fact> {
        let skip_ltm = match (
            tables.get(&StatementKind::IncomeStatement),
            tables.get(&StatementKind::CashFlow),
        ) {
            (Some(is_table), Some(cf_table)) => ltm_duplicates_latest_annual(is_table, cf_table),
            _ => false,
        };
        if skip_ltm {
            info!("LTM column duplicates the latest fiscal year; dropping it");
        }

        tables
            .iter()
            .flat_map(|(kind, table)| self.ingest_with_options(table, *kind, skip_ltm))
            .collect()
    }

    fn ingest_with_options(
        &self,
        table: &RawStatementTable,
        kind: StatementKind,
        skip_ltm: bool,
    ) -> Vec<Fact> {
        let headers = table.period_headers();
        let parsed: Vec<Option<HeaderPeriod>> = headers
            .iter()
            .map(|h| {
                let period = parse_period_header(h);
                if period.is_none() && !h.trim().is_empty() {
                    debug!("{}: skipping unparseable period header '{}'", kind, h);
                }
                period
            })
            .collect();

        let latest_annual_year = parsed
            .iter()
            .filter_map(|p| match p {
                Some(HeaderPeriod::MonthYear { year, .. }) => Some(*year),
                Some(HeaderPeriod::YearOnly { year }) => Some(*year),
                _ => None,
            })
            .max();

        let period_ends: Vec<Option<NaiveDate>> = parsed
            .iter()
            .map(|p| self.resolve_period_end(*p, latest_annual_year, skip_ltm))
            .collect();

        let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
        let mut facts = Vec::new();

        for row in table.data_rows() {
            let Some(metric) = row.first().map(|m| m.trim()) else {
                continue;
            };
            if metric.is_empty() || is_statement_title(metric) {
                continue;
            }

            for (column, cell) in row.iter().skip(1).enumerate() {
                let Some(Some(period_end_date)) = period_ends.get(column) else {
                    continue;
                };
                if !seen.insert((metric.to_string(), *period_end_date)) {
                    continue;
                }
                facts.push(Fact {
                    statement: kind,
                    metric: metric.to_string(),
                    period_end_date: *period_end_date,
                    value: parse_value(cell),
                    currency: self.context.currency.clone(),
                });
            }
        }

        facts
    }

    fn resolve_period_end(
        &self,
        period: Option<HeaderPeriod>,
        latest_annual_year: Option<i32>,
        skip_ltm: bool,
    ) -> Option<NaiveDate> {
        match period? {
            HeaderPeriod::MonthYear { month, year } => Some(last_day_of_month(year, month)),
            HeaderPeriod::YearOnly { year } => {
                // Month absent from the header; only the fiscal calendar can
                // place the period end.
                let fye = self.context.fiscal_year_end_month?;
                Some(last_day_of_month(year, fye))
            }
            HeaderPeriod::Ltm => {
                if skip_ltm {
                    return None;
                }
                let fye = self.context.fiscal_year_end_month?;
                let latest = latest_annual_year?;
                Some(resolve_ltm_period(latest, fye))
            }
        }
    }
}

/// True when the LTM column of a company's tables repeats its latest annual
/// column: the first data rows (Revenue on the income statement, Cash From
/// Operations on the cash flow statement) match across the last two value
/// columns within a relative tolerance.
pub fn ltm_duplicates_latest_annual(
    is_table: &RawStatementTable,
    cf_table: &RawStatementTable,
) -> bool {
    last_two_match(is_table) && last_two_match(cf_table)
}

fn last_two_match(table: &RawStatementTable) -> bool {
    let Some(row) = table.first_data_row() else {
        return false;
    };
    // Label plus at least two value columns.
    if row.len() < 3 {
        return false;
    }
    let a = parse_value(&row[row.len() - 2]);
    let b = parse_value(&row[row.len() - 1]);
    approx_eq(a, b)
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= LTM_DUPLICATE_TOLERANCE * f64::max(1.0, f64::max(a.abs(), b.abs()))
}

fn is_statement_title(metric: &str) -> bool {
    [
        StatementKind::IncomeStatement,
        StatementKind::BalanceSheet,
        StatementKind::CashFlow,
    ]
    .iter()
    .any(|kind| metric.eq_ignore_ascii_case(kind.title()))
}
