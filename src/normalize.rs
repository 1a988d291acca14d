use crate::error::Result;
use crate::rules::{CashRule, CombineRule, RollupRule, RuleSet};
use crate::schema::Fact;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One member line of a rolled-up category, kept for expandable display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownFact {
    pub metric: String,
    pub period_end_date: NaiveDate,
    pub value: f64,
}

/// Output of the normalization engine: the canonical fact stream (stream
/// order is display order) plus the breakdown side-table keyed by rollup
/// summary metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedStatement {
    pub facts: Vec<Fact>,
    pub breakdowns: BTreeMap<String, Vec<BreakdownFact>>,
}

impl NormalizedStatement {
    /// Canonical metric names in first-appearance order.
    pub fn metric_order(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for fact in &self.facts {
            if seen.insert(fact.metric.as_str()) {
                order.push(fact.metric.clone());
            }
        }
        order
    }
}

/// Applies a [`RuleSet`] to a raw fact stream for one statement kind.
///
/// Pass order: combine, cash preprocessing, rollup extraction, rename,
/// drop, then the rollup insertion post-pass that places summary/derived
/// lines before their anchor metric. Applying the engine to its own output
/// is a no-op (guaranteed by [`RuleSet::validate`]).
pub struct Normalizer {
    rules: RuleSet,
}

impl Normalizer {
    pub fn new(rules: RuleSet) -> Result<Self> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn apply(&self, facts: &[Fact]) -> NormalizedStatement {
        let mut facts: Vec<Fact> = facts.to_vec();

        for rule in &self.rules.combines {
            facts = apply_combine(facts, rule);
        }

        if let Some(cash) = &self.rules.cash {
            facts = apply_cash(facts, cash);
        }

        let mut extractions = Vec::new();
        for rule in &self.rules.rollups {
            if let Some(extraction) = extract_rollup(&mut facts, rule) {
                extractions.push(extraction);
            }
        }

        facts = apply_renames_and_drops(facts, &self.rules);

        let mut breakdowns = BTreeMap::new();
        for extraction in extractions {
            insert_rollup_lines(&mut facts, &extraction);
            breakdowns.insert(extraction.rule.summary.clone(), extraction.members);
        }

        NormalizedStatement { facts, breakdowns }
    }
}

struct RollupExtraction {
    rule: RollupRule,
    sums: BTreeMap<NaiveDate, f64>,
    members: Vec<BreakdownFact>,
    template: Fact,
}

/// Replaces every source fact of `rule` with per-period sums under the
/// display name, positioned where the first source appeared in the stream.
fn apply_combine(facts: Vec<Fact>, rule: &CombineRule) -> Vec<Fact> {
    let is_source = |metric: &str| rule.sources.iter().any(|s| s == metric);

    let Some(first_idx) = facts.iter().position(|f| is_source(&f.metric)) else {
        return facts;
    };
    let template = facts[first_idx].clone();

    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for fact in facts.iter().filter(|f| is_source(&f.metric)) {
        *sums.entry(fact.period_end_date).or_insert(0.0) += fact.value;
    }

    let mut out = Vec::with_capacity(facts.len());
    for (idx, fact) in facts.into_iter().enumerate() {
        if idx == first_idx {
            for (period, value) in sums.iter().rev() {
                out.push(Fact {
                    metric: rule.display.clone(),
                    period_end_date: *period,
                    value: *value,
                    ..template.clone()
                });
            }
        }
        if !is_source(&fact.metric) {
            out.push(fact);
        }
    }
    out
}

/// Cash preprocessing: prefer an explicit subtotal line when the provider
/// reports one, otherwise synthesize the subtotal from the components.
fn apply_cash(facts: Vec<Fact>, rule: &CashRule) -> Vec<Fact> {
    let has_subtotal = facts
        .iter()
        .any(|f| rule.subtotal_aliases.iter().any(|a| a == &f.metric));

    if !has_subtotal {
        return apply_combine(
            facts,
            &CombineRule {
                display: rule.display.clone(),
                sources: rule.components.clone(),
            },
        );
    }

    debug!(
        "explicit cash subtotal present; dropping components of '{}'",
        rule.display
    );
    let mut seen_periods: HashSet<NaiveDate> = HashSet::new();
    facts
        .into_iter()
        .filter_map(|mut fact| {
            if rule.components.iter().any(|c| c == &fact.metric) {
                return None;
            }
            if rule.subtotal_aliases.iter().any(|a| a == &fact.metric) {
                if !seen_periods.insert(fact.period_end_date) {
                    return None;
                }
                fact.metric = rule.display.clone();
            }
            Some(fact)
        })
        .collect()
}

/// Removes the rollup members from the stream, accumulating their per-period
/// sums and the breakdown entries. Returns `None` when no member is present.
fn extract_rollup(facts: &mut Vec<Fact>, rule: &RollupRule) -> Option<RollupExtraction> {
    let is_member = |metric: &str| rule.members.iter().any(|m| m == metric);

    let template = facts.iter().find(|f| is_member(&f.metric))?.clone();

    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut members = Vec::new();
    facts.retain(|fact| {
        if !is_member(&fact.metric) {
            return true;
        }
        *sums.entry(fact.period_end_date).or_insert(0.0) += fact.value;
        members.push(BreakdownFact {
            metric: fact.metric.clone(),
            period_end_date: fact.period_end_date,
            value: fact.value,
        });
        false
    });

    Some(RollupExtraction {
        rule: rule.clone(),
        sums,
        members,
        template,
    })
}

fn apply_renames_and_drops(facts: Vec<Fact>, rules: &RuleSet) -> Vec<Fact> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    facts
        .into_iter()
        .filter_map(|mut fact| {
            if rules.drops.contains(&fact.metric) {
                return None;
            }
            if let Some(display) = rules.renames.get(&fact.metric) {
                fact.metric = display.clone();
            }
            // Many-to-one renames can collide on the same canonical
            // name and period; the first value wins.
            if !seen.insert((fact.metric.clone(), fact.period_end_date)) {
                return None;
            }
            Some(fact)
        })
        .collect()
}

/// Inserts the derived ("pre-rollup") line and the rollup summary line
/// immediately before the anchor metric. When the anchor is missing from
/// the stream, the lines go at the end.
fn insert_rollup_lines(facts: &mut Vec<Fact>, extraction: &RollupExtraction) {
    let rule = &extraction.rule;

    let mut base: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for fact in facts.iter().filter(|f| f.metric == rule.base_metric) {
        base.entry(fact.period_end_date).or_insert(fact.value);
    }

    let mut lines = Vec::new();
    for (period, base_value) in base.iter().rev() {
        if let Some(rollup_sum) = extraction.sums.get(period) {
            lines.push(Fact {
                metric: rule.derived_metric.clone(),
                period_end_date: *period,
                value: base_value - rollup_sum,
                ..extraction.template.clone()
            });
        }
    }
    for (period, value) in extraction.sums.iter().rev() {
        lines.push(Fact {
            metric: rule.summary.clone(),
            period_end_date: *period,
            value: *value,
            ..extraction.template.clone()
        });
    }

    let insert_at = facts
        .iter()
        .position(|f| f.metric == rule.anchor)
        .unwrap_or(facts.len());
    facts.splice(insert_at..insert_at, lines);
}
