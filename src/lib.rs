//! # Statement Normalizer
//!
//! A library for turning heterogeneous, inconsistently-labeled raw financial
//! statement tables (scraped or cached from multiple providers) into a single
//! canonical, period-aligned table per statement, suitable for display and
//! cross-company comparison.
//!
//! ## Core Concepts
//!
//! - **Raw table**: a provider's 2D string table, one header row of period
//!   labels followed by `[metric, value, value, ...]` rows
//! - **Fact**: the atomic normalized unit `(statement, metric, period end,
//!   value, currency)`, unique per key, keep-first on re-ingestion
//! - **Rule set**: immutable rename/drop/combine/rollup configuration applied
//!   by the normalization engine, selected per provider
//! - **Template**: a fixed ordered row layout (with spacers and subtotal
//!   flags) per statement kind and chart-of-accounts class
//! - **Pivot table**: the display-ready structure of ordered period columns,
//!   ordered rows, and expandable breakdown sub-rows
//!
//! The pipeline is pure and synchronous: parsing and normalization never
//! perform I/O, and data-quality problems degrade to skipped columns, rows,
//! or cells rather than errors.
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_normalizer::*;
//!
//! let context = FiscalContext::new(Some(12), "GBP", classify_company("Food Retail"));
//! let processor = StatementProcessor::new(context)?;
//!
//! let raw = RawStatementTable::new(vec![
//!     vec!["".into(), "Dec '23".into(), "Dec '24".into(), "LTM".into()],
//!     vec!["Total Revenues".into(), "900".into(), "1,000".into(), "1,050".into()],
//! ]);
//!
//! let facts = processor.ingest_table(&raw, StatementKind::IncomeStatement);
//! let table = processor.build_fiscal_table(&facts, StatementKind::IncomeStatement)?;
//! ```

pub mod classify;
pub mod dates;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod pivot;
pub mod rules;
pub mod schema;
pub mod template;
pub mod values;

pub use classify::{classify_company, CompanyClassifier, KeywordClassifier};
pub use dates::{last_day_of_month, parse_period_header, period_label, resolve_ltm_period};
pub use error::{Result, StatementError};
pub use ingest::{ltm_duplicates_latest_annual, Ingestor};
pub use normalize::{BreakdownFact, NormalizedStatement, Normalizer};
pub use pivot::{
    pivot_natural_order, pivot_with_template, BreakdownRow, NaturalOrderOptions, PivotRow,
    PivotTable,
};
pub use rules::{fiscal_rules, CashRule, CombineRule, MetricAction, RollupRule, RuleSet};
pub use schema::{
    CellValue, CompanyClass, Fact, FiscalContext, HeaderPeriod, RawStatementTable, StatementKind,
};
pub use template::{quickfs_template, StatementTemplate, TemplateEntry};
pub use values::{parse_cell, parse_value};

use log::info;
use std::collections::BTreeMap;

/// End-to-end pipeline for one company: raw tables in, display tables out.
///
/// Holds the company's [`FiscalContext`] and wires the ingestor, the
/// normalization engine, and the pivot builders together. Each call
/// operates on its own inputs and returns new structures, so a processor
/// can be shared freely across threads.
pub struct StatementProcessor {
    ingestor: Ingestor,
}

impl StatementProcessor {
    pub fn new(context: FiscalContext) -> Result<Self> {
        Ok(Self {
            ingestor: Ingestor::new(context)?,
        })
    }

    pub fn context(&self) -> &FiscalContext {
        self.ingestor.context()
    }

    /// Ingests one raw statement table into facts.
    pub fn ingest_table(&self, table: &RawStatementTable, kind: StatementKind) -> Vec<Fact> {
        self.ingestor.ingest_table(table, kind)
    }

    /// Ingests a full set of statement tables, dropping an LTM column that
    /// merely repeats the latest fiscal year.
    pub fn ingest_statements(
        &self,
        tables: &BTreeMap<StatementKind, RawStatementTable>,
    ) -> Vec<Fact> {
        self.ingestor.ingest_statements(tables)
    }

    /// Builds the display table for a Fiscal-style source: applies the
    /// provider rule set for `kind`, then pivots in natural order.
    pub fn build_fiscal_table(&self, facts: &[Fact], kind: StatementKind) -> Result<PivotTable> {
        self.build_fiscal_table_with_rules(facts, kind, fiscal_rules(kind))
    }

    /// Same as [`build_fiscal_table`](Self::build_fiscal_table) but with a
    /// caller-supplied rule set.
    pub fn build_fiscal_table_with_rules(
        &self,
        facts: &[Fact],
        kind: StatementKind,
        rules: RuleSet,
    ) -> Result<PivotTable> {
        let statement_facts: Vec<Fact> =
            facts.iter().filter(|f| f.statement == kind).cloned().collect();
        info!(
            "normalizing {} facts for {}",
            statement_facts.len(),
            kind.title()
        );

        let normalizer = Normalizer::new(rules)?;
        let normalized = normalizer.apply(&statement_facts);
        Ok(pivot_natural_order(
            &normalized,
            &NaturalOrderOptions::default(),
        ))
    }

    /// Builds the display table for a QFS-style source using the fixed
    /// template for the company's chart-of-accounts class.
    pub fn build_templated_table(&self, facts: &[Fact], kind: StatementKind) -> Result<PivotTable> {
        let template = quickfs_template(kind, self.context().company_class);
        let statement_facts: Vec<Fact> =
            facts.iter().filter(|f| f.statement == kind).cloned().collect();
        pivot_with_template(&statement_facts, &template, None)
    }
}
