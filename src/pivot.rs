use crate::dates::period_label;
use crate::normalize::{BreakdownFact, NormalizedStatement};
use crate::schema::Fact;
use crate::template::{StatementTemplate, TemplateEntry};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Sub-row of an expandable rollup line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BreakdownRow {
    pub metric: String,
    pub values: Vec<Option<f64>>,
}

/// One display row. `values` is always aligned to the table's `dates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PivotRow {
    pub metric: String,
    pub values: Vec<Option<f64>>,
    pub sum_metric: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub spacer: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub expandable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<BreakdownRow>,
}

impl PivotRow {
    fn spacer(width: usize) -> Self {
        Self {
            metric: String::new(),
            values: vec![None; width],
            sum_metric: false,
            spacer: true,
            expandable: false,
            breakdown: Vec::new(),
        }
    }

    fn data(metric: &str, values: Vec<Option<f64>>, sum_metric: bool) -> Self {
        Self {
            metric: metric.to_string(),
            values,
            sum_metric,
            spacer: false,
            expandable: false,
            breakdown: Vec::new(),
        }
    }
}

/// The display-ready table: period labels (most recent first) and ordered
/// rows, every row's values aligned to the labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PivotTable {
    pub dates: Vec<String>,
    pub rows: Vec<PivotRow>,
}

/// Options for natural-order (rule-engine-normalized) presentation.
#[derive(Debug, Clone)]
pub struct NaturalOrderOptions {
    /// Canonical metrics rendered as layout-only section separators.
    pub section_titles: HashSet<String>,
    /// The first metric matching one of these gets a spacer row after it,
    /// separating the equity block from whatever follows.
    pub equity_total_aliases: Vec<String>,
    pub sum_metrics: HashSet<String>,
}

impl Default for NaturalOrderOptions {
    fn default() -> Self {
        Self {
            section_titles: [
                "Current Assets",
                "Non-Current Assets",
                "Current Liabilities",
                "Non-Current Liabilities",
                "Operating Activities",
                "Investing Activities",
                "Financing Activities",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            equity_total_aliases: vec![
                "Shareholders' Equity".to_string(),
                "Total Equity".to_string(),
                "Total Shareholders' Equity".to_string(),
            ],
            sum_metrics: crate::template::default_sum_metrics(),
        }
    }
}

struct FactGrid {
    periods: Vec<NaiveDate>,
    lookup: HashMap<(String, NaiveDate), f64>,
}

impl FactGrid {
    fn build(facts: &[Fact]) -> Self {
        let periods: BTreeSet<NaiveDate> = facts.iter().map(|f| f.period_end_date).collect();
        let mut lookup = HashMap::new();
        for fact in facts {
            // Keep-first, consistent with ingestion's conflict policy.
            lookup
                .entry((fact.metric.clone(), fact.period_end_date))
                .or_insert(fact.value);
        }
        Self {
            periods: periods.into_iter().rev().collect(),
            lookup,
        }
    }

    fn labels(&self) -> Vec<String> {
        self.periods.iter().map(|d| period_label(*d)).collect()
    }

    fn values_for(&self, metric: &str) -> Vec<Option<f64>> {
        self.periods
            .iter()
            .map(|d| self.lookup.get(&(metric.to_string(), *d)).copied())
            .collect()
    }

    fn combined_values(&self, sources: &[String]) -> Vec<Option<f64>> {
        self.periods
            .iter()
            .map(|d| {
                let mut sum = 0.0;
                let mut present = false;
                for source in sources {
                    if let Some(v) = self.lookup.get(&(source.clone(), *d)) {
                        sum += v;
                        present = true;
                    }
                }
                present.then_some(sum)
            })
            .collect()
    }
}

/// Builds a table from a fixed ordered template (QFS-style sources).
///
/// Spacer entries always render; data rows are suppressed when no period
/// has a value. Metrics present in the facts but absent from the template
/// get no row.
pub fn pivot_with_template(
    facts: &[Fact],
    template: &StatementTemplate,
    breakdowns: Option<&BTreeMap<String, Vec<BreakdownFact>>>,
) -> crate::error::Result<PivotTable> {
    template.validate()?;

    if facts.is_empty() {
        return Ok(PivotTable::default());
    }

    let grid = FactGrid::build(facts);
    let width = grid.periods.len();
    let mut rows = Vec::new();

    for entry in &template.entries {
        let row = match entry {
            TemplateEntry::Spacer => {
                rows.push(PivotRow::spacer(width));
                continue;
            }
            TemplateEntry::Metric(name) => {
                PivotRow::data(name, grid.values_for(name), template.sum_metrics.contains(name))
            }
            TemplateEntry::Rename { display, source } => PivotRow::data(
                display,
                grid.values_for(source),
                template.sum_metrics.contains(display),
            ),
            TemplateEntry::Combine { display, sources } => PivotRow::data(
                display,
                grid.combined_values(sources),
                template.sum_metrics.contains(display),
            ),
        };
        if row.values.iter().any(Option::is_some) {
            rows.push(attach_breakdown(row, breakdowns, &grid));
        }
    }

    Ok(PivotTable {
        dates: grid.labels(),
        rows,
    })
}

/// Builds a table in first-appearance order from an already-normalized
/// statement (Fiscal-style sources).
pub fn pivot_natural_order(
    normalized: &NormalizedStatement,
    options: &NaturalOrderOptions,
) -> PivotTable {
    if normalized.facts.is_empty() {
        return PivotTable::default();
    }

    let grid = FactGrid::build(&normalized.facts);
    let width = grid.periods.len();
    let mut rows = Vec::new();
    let mut equity_spacer_done = false;

    for metric in normalized.metric_order() {
        if options.section_titles.contains(&metric) {
            rows.push(PivotRow::spacer(width));
            continue;
        }

        let row = PivotRow::data(
            &metric,
            grid.values_for(&metric),
            options.sum_metrics.contains(&metric),
        );
        if row.values.iter().any(Option::is_some) {
            rows.push(attach_breakdown(
                row,
                Some(&normalized.breakdowns),
                &grid,
            ));
        }

        if !equity_spacer_done && options.equity_total_aliases.iter().any(|a| a == &metric) {
            rows.push(PivotRow::spacer(width));
            equity_spacer_done = true;
        }
    }

    PivotTable {
        dates: grid.labels(),
        rows,
    }
}

fn attach_breakdown(
    mut row: PivotRow,
    breakdowns: Option<&BTreeMap<String, Vec<BreakdownFact>>>,
    grid: &FactGrid,
) -> PivotRow {
    let Some(members) = breakdowns.and_then(|b| b.get(&row.metric)) else {
        return row;
    };

    let mut member_lookup: HashMap<(&str, NaiveDate), f64> = HashMap::new();
    let mut member_order: Vec<&str> = Vec::new();
    for member in members {
        if !member_order.contains(&member.metric.as_str()) {
            member_order.push(&member.metric);
        }
        member_lookup
            .entry((&member.metric, member.period_end_date))
            .or_insert(member.value);
    }

    row.expandable = true;
    row.breakdown = member_order
        .into_iter()
        .map(|name| BreakdownRow {
            metric: name.to_string(),
            values: grid
                .periods
                .iter()
                .map(|d| member_lookup.get(&(name, *d)).copied())
                .collect(),
        })
        .collect();
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CompanyClass, StatementKind};
    use crate::template::quickfs_template;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn fact(metric: &str, date: NaiveDate, value: f64) -> Fact {
        Fact {
            statement: StatementKind::IncomeStatement,
            metric: metric.to_string(),
            period_end_date: date,
            value,
            currency: "GBP".to_string(),
        }
    }

    #[test]
    fn test_empty_facts_give_empty_table() {
        let template = quickfs_template(StatementKind::IncomeStatement, CompanyClass::Normal);
        let table = pivot_with_template(&[], &template, None).unwrap();
        assert!(table.dates.is_empty());
        assert!(table.rows.is_empty());

        let table = pivot_natural_order(
            &NormalizedStatement::default(),
            &NaturalOrderOptions::default(),
        );
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_template_alignment_ordering_and_suppression() {
        let template = quickfs_template(StatementKind::IncomeStatement, CompanyClass::Normal);
        let facts = vec![
            fact("Revenue", d(2023, 12, 31), 900.0),
            fact("Revenue", d(2024, 12, 31), 1000.0),
            fact("Net Income", d(2024, 12, 31), 120.0),
        ];

        let table = pivot_with_template(&facts, &template, None).unwrap();
        assert_eq!(table.dates, ["Dec 2024", "Dec 2023"]);

        for row in &table.rows {
            assert_eq!(row.values.len(), table.dates.len());
        }

        let metrics: Vec<&str> = table
            .rows
            .iter()
            .filter(|r| !r.spacer)
            .map(|r| r.metric.as_str())
            .collect();
        // Template metrics with no data anywhere are suppressed.
        assert_eq!(metrics, ["Revenue", "Net Income"]);

        let revenue = &table.rows[0];
        assert_eq!(revenue.values, [Some(1000.0), Some(900.0)]);
        let net_income = table.rows.iter().find(|r| r.metric == "Net Income").unwrap();
        assert_eq!(net_income.values, [Some(120.0), None]);
        assert!(net_income.sum_metric);
    }

    #[test]
    fn test_spacers_always_render() {
        let template = quickfs_template(StatementKind::IncomeStatement, CompanyClass::Normal);
        let facts = vec![fact("Revenue", d(2024, 12, 31), 1000.0)];

        let table = pivot_with_template(&facts, &template, None).unwrap();
        let spacers = table.rows.iter().filter(|r| r.spacer).count();
        assert_eq!(spacers, 3);
        for spacer in table.rows.iter().filter(|r| r.spacer) {
            assert_eq!(spacer.values, [None]);
        }
    }

    #[test]
    fn test_template_combine_and_rename_rows() {
        let template = quickfs_template(StatementKind::IncomeStatement, CompanyClass::Bank);
        let facts = vec![
            fact("Interest Income", d(2024, 12, 31), 500.0),
            fact("Interest Expense", d(2024, 12, 31), -180.0),
            fact("Interest Income", d(2023, 12, 31), 450.0),
            fact("Non-Interest Income", d(2024, 12, 31), 75.0),
        ];

        let table = pivot_with_template(&facts, &template, None).unwrap();

        let nii = table
            .rows
            .iter()
            .find(|r| r.metric == "Net Interest Income")
            .unwrap();
        // 2023 has one contributing source; still a value, not None.
        assert_eq!(nii.values, [Some(320.0), Some(450.0)]);
        assert!(nii.sum_metric);

        let fees = table.rows.iter().find(|r| r.metric == "Fee Income").unwrap();
        assert_eq!(fees.values, [Some(75.0), None]);
        assert!(!table.rows.iter().any(|r| r.metric == "Non-Interest Income"));
    }

    #[test]
    fn test_natural_order_with_equity_spacer_once() {
        let facts = vec![
            fact("Total Assets", d(2024, 12, 31), 900.0),
            fact("Shareholders' Equity", d(2024, 12, 31), 400.0),
            fact("Total Equity", d(2024, 12, 31), 400.0),
            fact("Liabilities & Equity", d(2024, 12, 31), 900.0),
        ];
        let normalized = NormalizedStatement {
            facts,
            breakdowns: BTreeMap::new(),
        };

        let table = pivot_natural_order(&normalized, &NaturalOrderOptions::default());
        let shape: Vec<(&str, bool)> = table
            .rows
            .iter()
            .map(|r| (r.metric.as_str(), r.spacer))
            .collect();
        assert_eq!(
            shape,
            [
                ("Total Assets", false),
                ("Shareholders' Equity", false),
                ("", true),
                ("Total Equity", false),
                ("Liabilities & Equity", false),
            ]
        );
    }

    #[test]
    fn test_section_titles_become_spacers() {
        let facts = vec![
            fact("Operating Activities", d(2024, 12, 31), 0.0),
            fact("Net Income", d(2024, 12, 31), 120.0),
        ];
        let normalized = NormalizedStatement {
            facts,
            breakdowns: BTreeMap::new(),
        };

        let table = pivot_natural_order(&normalized, &NaturalOrderOptions::default());
        assert!(table.rows[0].spacer);
        assert_eq!(table.rows[1].metric, "Net Income");
    }

    #[test]
    fn test_breakdown_rows_aligned_with_nulls() {
        let facts = vec![
            fact("Exceptional Items", d(2024, 12, 31), -50.0),
            fact("Exceptional Items", d(2023, 12, 31), -10.0),
        ];
        let mut breakdowns = BTreeMap::new();
        breakdowns.insert(
            "Exceptional Items".to_string(),
            vec![
                BreakdownFact {
                    metric: "Restructuring Charges".to_string(),
                    period_end_date: d(2024, 12, 31),
                    value: -40.0,
                },
                BreakdownFact {
                    metric: "Legal Settlements".to_string(),
                    period_end_date: d(2024, 12, 31),
                    value: -10.0,
                },
                BreakdownFact {
                    metric: "Restructuring Charges".to_string(),
                    period_end_date: d(2023, 12, 31),
                    value: -10.0,
                },
            ],
        );
        let normalized = NormalizedStatement { facts, breakdowns };

        let table = pivot_natural_order(&normalized, &NaturalOrderOptions::default());
        let row = &table.rows[0];
        assert!(row.expandable);
        assert_eq!(row.breakdown.len(), 2);
        assert_eq!(row.breakdown[0].metric, "Restructuring Charges");
        assert_eq!(row.breakdown[0].values, [Some(-40.0), Some(-10.0)]);
        // Missing member periods are null, not zero.
        assert_eq!(row.breakdown[1].values, [Some(-10.0), None]);
    }

    #[test]
    fn test_row_serialization_skips_layout_flags() {
        let row = PivotRow::data("Revenue", vec![Some(1.0)], false);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("spacer").is_none());
        assert!(json.get("breakdown").is_none());

        let spacer = PivotRow::spacer(1);
        let json = serde_json::to_value(&spacer).unwrap();
        assert_eq!(json["spacer"], true);
    }
}
