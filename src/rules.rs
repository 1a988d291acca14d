use crate::error::{Result, StatementError};
use crate::schema::StatementKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// N raw metrics summed per period into one display metric. Runs before
/// rename/drop; a missing component contributes nothing, and the target is
/// only emitted for periods where at least one component exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineRule {
    pub display: String,
    pub sources: Vec<String>,
}

/// Raw one-off line items rolled up into a single expandable summary line.
///
/// Per period, the members sum into `summary` and each present member is
/// recorded into a breakdown side-table. `derived` is computed as
/// `base_metric − summary` for periods where both exist. The `derived` and
/// `summary` lines are inserted immediately before `anchor` in display
/// order, not at their original stream position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupRule {
    pub summary: String,
    pub members: Vec<String>,
    pub base_metric: String,
    pub derived_metric: String,
    pub anchor: String,
}

/// Balance-sheet cash preprocessing. When a provider reports an explicit
/// subtotal (any of `subtotal_aliases`), the subtotal is renamed to
/// `display` and the components dropped; otherwise the components are
/// summed per period into `display`. Never both, so nothing double-counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashRule {
    pub display: String,
    pub components: Vec<String>,
    pub subtotal_aliases: Vec<String>,
}

/// Tagged per-metric action, for callers that want to audit what would
/// happen to a given raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricAction<'a> {
    Rename(&'a str),
    Drop,
    CombineInto(&'a str),
    RollupInto(&'a str),
}

/// The full rule set for one provider/statement pair.
///
/// A `RuleSet` is plain immutable data passed into the
/// [`Normalizer`](crate::normalize::Normalizer); nothing here is global
/// state, so tests can run the engine against synthetic rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub renames: HashMap<String, String>,
    pub drops: HashSet<String>,
    pub combines: Vec<CombineRule>,
    pub rollups: Vec<RollupRule>,
    pub cash: Option<CashRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, raw: impl Into<String>, display: impl Into<String>) -> Self {
        self.renames.insert(raw.into(), display.into());
        self
    }

    pub fn drop_metric(mut self, raw: impl Into<String>) -> Self {
        self.drops.insert(raw.into());
        self
    }

    pub fn combine(mut self, display: impl Into<String>, sources: &[&str]) -> Self {
        self.combines.push(CombineRule {
            display: display.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn rollup(mut self, rule: RollupRule) -> Self {
        self.rollups.push(rule);
        self
    }

    pub fn cash(mut self, rule: CashRule) -> Self {
        self.cash = Some(rule);
        self
    }

    /// Looks up the action this rule set takes on a raw metric name.
    /// Combine/rollup membership wins over rename/drop, mirroring the
    /// engine's pass order.
    pub fn action_for(&self, raw: &str) -> Option<MetricAction<'_>> {
        for rule in &self.combines {
            if rule.sources.iter().any(|s| s == raw) {
                return Some(MetricAction::CombineInto(&rule.display));
            }
        }
        for rule in &self.rollups {
            if rule.members.iter().any(|m| m == raw) {
                return Some(MetricAction::RollupInto(&rule.summary));
            }
        }
        if let Some(display) = self.renames.get(raw) {
            return Some(MetricAction::Rename(display));
        }
        if self.drops.contains(raw) {
            return Some(MetricAction::Drop);
        }
        None
    }

    /// Structural check: no canonical output name may itself be matched by
    /// any rule, otherwise a second application would not be a no-op.
    pub fn validate(&self) -> Result<()> {
        let mut outputs: Vec<&str> = Vec::new();
        outputs.extend(self.renames.values().map(String::as_str));
        outputs.extend(self.combines.iter().map(|c| c.display.as_str()));
        for rollup in &self.rollups {
            if rollup.members.is_empty() {
                return Err(StatementError::InvalidRuleSet(format!(
                    "rollup '{}' has no members",
                    rollup.summary
                )));
            }
            outputs.push(&rollup.summary);
            outputs.push(&rollup.derived_metric);
        }
        if let Some(cash) = &self.cash {
            if cash
                .components
                .iter()
                .chain(cash.subtotal_aliases.iter())
                .any(|name| name == &cash.display)
            {
                return Err(StatementError::InvalidRuleSet(format!(
                    "cash display '{}' is also one of its own inputs",
                    cash.display
                )));
            }
            outputs.push(&cash.display);
        }
        for rule in &self.combines {
            if rule.sources.is_empty() {
                return Err(StatementError::InvalidRuleSet(format!(
                    "combine '{}' has no sources",
                    rule.display
                )));
            }
        }

        for name in outputs {
            if self.action_for(name).is_some() {
                return Err(StatementError::InvalidRuleSet(format!(
                    "canonical name '{}' is also matched by a rule; the rule set is not idempotent",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Default rule set for the Fiscal-style statement provider.
pub fn fiscal_rules(kind: StatementKind) -> RuleSet {
    match kind {
        StatementKind::IncomeStatement => fiscal_income_statement_rules(),
        StatementKind::BalanceSheet => fiscal_balance_sheet_rules(),
        StatementKind::CashFlow => fiscal_cash_flow_rules(),
    }
}

fn fiscal_income_statement_rules() -> RuleSet {
    RuleSet::new()
        .rename("Total Revenues", "Revenue")
        .rename("Cost of Goods Sold, Total", "Cost of Goods Sold")
        .rename("Selling General & Admin Expenses, Total", "Sales, General, & Administrative")
        .rename("Operating Income", "Operating Profit")
        .rename("EBT, Incl. Unusual Items", "Pre-Tax Income")
        .rename("Income Tax Expense", "Income Tax")
        .rename("Net Income to Company", "Net Income")
        .rename("Weighted Average Basic Shares Outstanding", "Shares (Basic)")
        .rename("Weighted Average Diluted Shares Outstanding", "Shares (Diluted)")
        // Derivable ratio/EPS lines never make the canonical table.
        .drop_metric("Gross Profit Margin %")
        .drop_metric("Operating Margin %")
        .drop_metric("Net Income Margin %")
        .drop_metric("Revenue Growth %")
        .drop_metric("Basic EPS")
        .drop_metric("Diluted EPS (Excl. Excep Items)")
        .combine(
            "Net Interest Income",
            &["Interest Income", "Interest Expense"],
        )
        .combine(
            "Other Non-Operating Income",
            &[
                "Other Non-Operating Income (Expense)",
                "Currency Exchange Gains (Loss)",
            ],
        )
        .rollup(RollupRule {
            summary: "Exceptional Items".to_string(),
            members: vec![
                "Restructuring Charges".to_string(),
                "Impairment of Goodwill".to_string(),
                "Asset Writedown".to_string(),
                "Gain (Loss) on Sale of Assets".to_string(),
                "Legal Settlements".to_string(),
            ],
            base_metric: "Pre-Tax Income".to_string(),
            derived_metric: "Pre-Exceptional Pre-Tax Income".to_string(),
            anchor: "Income Tax".to_string(),
        })
}

fn fiscal_balance_sheet_rules() -> RuleSet {
    RuleSet::new()
        .rename("Accounts Receivable, Total", "Accounts Receivable")
        .rename("Inventory", "Inventories")
        .rename("Net Property, Plant & Equipment", "Property, Plant, & Equipment (Net)")
        .rename("Long-Term Debt, Total", "Long-Term Debt")
        .rename("Total Shareholders Equity", "Shareholders' Equity")
        .rename("Total Liabilities And Equity", "Liabilities & Equity")
        .drop_metric("Tangible Book Value")
        .drop_metric("Book Value/Share")
        .drop_metric("Total Shares Out. on Filing Date")
        .cash(CashRule {
            display: "Cash & Short-Term Investments".to_string(),
            components: vec![
                "Cash And Equivalents".to_string(),
                "Short Term Investments".to_string(),
            ],
            subtotal_aliases: vec!["Total Cash & ST Investments".to_string()],
        })
}

fn fiscal_cash_flow_rules() -> RuleSet {
    RuleSet::new()
        .rename("Cash from Ops.", "Cash From Operations")
        .rename("Cash from Investing", "Cash From Investing")
        .rename("Cash from Financing", "Cash From Financing")
        .rename("Depreciation & Amort., Total", "Depreciation & Amortization")
        .drop_metric("Cash Flow per Share")
        .drop_metric("Levered Free Cash Flow")
        .drop_metric("Unlevered Free Cash Flow")
        .combine(
            "Change in Working Capital",
            &[
                "Change In Accounts Receivable",
                "Change In Inventories",
                "Change In Accounts Payable",
                "Change In Other Net Operating Assets",
            ],
        )
}
