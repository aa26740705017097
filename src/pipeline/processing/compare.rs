//! Better/worse/neutral classification of a comparable's metrics against the subject.

use serde::{Deserialize, Serialize};

use crate::domain::{Metric, UnifiedProperty};
use crate::pipeline::processing::numeric::format_percent_diff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Better,
    Worse,
    Neutral,
}

/// Which direction of a metric is favourable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    LowerIsBetter,
    HigherIsBetter,
    /// Reported as a fact, never scored
    Contextual,
}

/// Caller switches for classification
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ClassifyOptions {
    /// Score price per square foot (cheaper is better) instead of reporting it neutrally
    #[serde(default)]
    pub score_price_per_sqft: bool,
}

pub fn polarity(metric: Metric, options: ClassifyOptions) -> Polarity {
    match metric {
        Metric::DaysToSale | Metric::DaysOnMarket | Metric::TaxRate => Polarity::LowerIsBetter,
        Metric::PricePerSqFt if options.score_price_per_sqft => Polarity::LowerIsBetter,
        Metric::PricePerSqFt => Polarity::Contextual,
        Metric::InvestmentScore
        | Metric::SchoolRating
        | Metric::AppreciationRate
        | Metric::MarketScore
        | Metric::MarketActivityScore
        | Metric::LocationScore
        | Metric::PropertyConditionScore
        | Metric::NeighborhoodSafetyScore => Polarity::HigherIsBetter,
    }
}

/// Classify `value` (a comparable) against `reference` (the subject) with default options.
pub fn classify(metric: Metric, value: Option<f64>, reference: Option<f64>) -> Verdict {
    classify_with(metric, value, reference, ClassifyOptions::default())
}

/// Neutral when either side is missing or NaN, when they are equal, or when
/// the metric is contextual.
pub fn classify_with(metric: Metric, value: Option<f64>, reference: Option<f64>, options: ClassifyOptions) -> Verdict {
    let (value, reference) = match (value, reference) {
        (Some(v), Some(r)) if !v.is_nan() && !r.is_nan() => (v, r),
        _ => return Verdict::Neutral,
    };
    if value == reference {
        return Verdict::Neutral;
    }
    let higher = value > reference;
    match polarity(metric, options) {
        Polarity::HigherIsBetter if higher => Verdict::Better,
        Polarity::HigherIsBetter => Verdict::Worse,
        Polarity::LowerIsBetter if higher => Verdict::Worse,
        Polarity::LowerIsBetter => Verdict::Better,
        Polarity::Contextual => Verdict::Neutral,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonCell {
    pub metric: Metric,
    pub value: Option<f64>,
    pub reference: Option<f64>,
    pub verdict: Verdict,
    /// Signed percentage against the subject, or "N/A"
    pub delta: String,
}

/// One comparable's metrics against the subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub property_id: i64,
    pub address: String,
    pub cells: Vec<ComparisonCell>,
}

impl ComparisonRow {
    pub fn cell(&self, metric: Metric) -> Option<&ComparisonCell> {
        self.cells.iter().find(|c| c.metric == metric)
    }
}

pub fn compare_property(subject: &UnifiedProperty, comp: &UnifiedProperty, options: ClassifyOptions) -> ComparisonRow {
    let cells = Metric::ALL
        .into_iter()
        .map(|metric| {
            let value = comp.metric_value(metric);
            let reference = subject.metric_value(metric);
            ComparisonCell {
                metric,
                value,
                reference,
                verdict: classify_with(metric, value, reference, options),
                delta: format_percent_diff(value, reference),
            }
        })
        .collect();

    ComparisonRow {
        property_id: comp.id,
        address: comp.address.clone(),
        cells,
    }
}

/// Comparison rows for every comparable, in order
pub fn build_comparison_table(
    subject: &UnifiedProperty,
    comps: &[UnifiedProperty],
    options: ClassifyOptions,
) -> Vec<ComparisonRow> {
    comps
        .iter()
        .map(|comp| compare_property(subject, comp, options))
        .collect()
}
