use serde::{Deserialize, Serialize};

use crate::domain::UnifiedProperty;
use crate::pipeline::processing::numeric::{mean, median, round_to};

/// Half-width of the suggested value range around the $/sqft estimate
const VALUE_RANGE_BAND: f64 = 0.05;

/// Aggregate market figures over the comparables (subject excluded)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub comparable_count: usize,
    pub average_price: Option<f64>,
    pub median_price: Option<f64>,
    pub average_price_per_sqft: Option<f64>,
    pub median_price_per_sqft: Option<f64>,
    pub average_days_on_market: Option<f64>,
    pub subject_price_per_sqft: Option<f64>,
    /// Median comp $/sqft applied to the subject's living area
    pub suggested_value: Option<f64>,
    pub suggested_value_low: Option<f64>,
    pub suggested_value_high: Option<f64>,
}

pub fn summarize(subject: &UnifiedProperty, comps: &[UnifiedProperty]) -> MarketSummary {
    let prices: Vec<f64> = comps.iter().filter_map(|c| c.price_value).collect();
    let ppsf: Vec<f64> = comps.iter().filter_map(|c| c.price_per_sqft).collect();
    let listed_dom: Vec<f64> = comps
        .iter()
        .filter(|c| c.has_mls)
        .map(|c| c.days_on_market as f64)
        .collect();

    let median_ppsf = median(&ppsf);
    let suggested_value = median_ppsf
        .filter(|_| subject.sqft > 0.0)
        .map(|p| (p * subject.sqft).round());

    let round_money = |v: Option<f64>| v.map(f64::round);
    let round_rate = |v: Option<f64>| v.map(|x| round_to(x, 2));

    MarketSummary {
        comparable_count: comps.len(),
        average_price: round_money(mean(&prices)),
        median_price: round_money(median(&prices)),
        average_price_per_sqft: round_rate(mean(&ppsf)),
        median_price_per_sqft: round_rate(median_ppsf),
        average_days_on_market: mean(&listed_dom).map(|d| round_to(d, 1)),
        subject_price_per_sqft: round_rate(subject.price_per_sqft),
        suggested_value,
        suggested_value_low: suggested_value.map(|v| (v * (1.0 - VALUE_RANGE_BAND)).round()),
        suggested_value_high: suggested_value.map(|v| (v * (1.0 + VALUE_RANGE_BAND)).round()),
    }
}
