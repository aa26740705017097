//! Derived scores and rates for one property.
//!
//! Every score is a weighted blend of components on a 0-10 scale. A component
//! whose inputs are missing contributes [`NEUTRAL_SCORE`] instead of dropping
//! out, so a sparse record drifts toward the middle rather than toward zero.
//! Each component is monotonic in its input, which makes every blend
//! monotonic too. The weights and scales are tunable through
//! [`ScoringConfig`]; they are deliberate choices, not reproductions of any
//! vendor formula.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::constants::{NEUTRAL_SCORE, SCORE_MAX, SCORE_MIN};
use crate::domain::{ScoreSet, ZipTrend};
use crate::pipeline::processing::numeric::{mean, price_per_sqft, round_to};
use crate::types::{MlsRecord, PropertyDetailRecord};

/// Positive remark phrases for the condition score
const CONDITION_POSITIVE: &[&str] = &[
    "renovated",
    "remodeled",
    "updated",
    "new roof",
    "new construction",
    "move-in ready",
    "move in ready",
    "turnkey",
];

/// Negative remark phrases for the condition score
const CONDITION_NEGATIVE: &[&str] = &[
    "fixer",
    "as-is",
    "as is",
    "tlc",
    "needs work",
    "handyman",
    "investor special",
];

const INACTIVE_STATUSES: &[&str] = &["withdrawn", "expired", "canceled", "cancelled", "off market"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvestmentWeights {
    pub price: f64,
    pub days_on_market: f64,
    pub equity: f64,
    pub appreciation: f64,
}

impl Default for InvestmentWeights {
    fn default() -> Self {
        Self {
            price: 0.35,
            days_on_market: 0.15,
            equity: 0.25,
            appreciation: 0.25,
        }
    }
}

/// Tunable scales and weights for the score functions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Days on market at which the freshness component reaches 0
    pub dom_horizon_days: f64,
    /// Building age at which the age component reaches 0
    pub age_horizon_years: f64,
    /// Score points per unit of (estimated $/sqft ÷ list $/sqft - 1)
    pub value_gap_scale: f64,
    /// Score points per unit of (close price ÷ list price - 1)
    pub sale_to_list_scale: f64,
    /// Trend changes within ±this percentage are reported as flat
    pub trend_flat_band_pct: f64,
    /// $/sqft that scores a neutral 5 for location value
    pub reference_price_per_sqft: f64,
    /// Lot size that scores a neutral 5
    pub reference_lot_sqft: f64,
    /// Tenure in years that earns full stability credit
    pub stable_tenure_years: f64,
    /// Date ages and tenures are measured against; today when unset
    pub reference_date: Option<NaiveDate>,
    pub investment_weights: InvestmentWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            dom_horizon_days: 180.0,
            age_horizon_years: 100.0,
            value_gap_scale: 25.0,
            sale_to_list_scale: 50.0,
            trend_flat_band_pct: 0.5,
            reference_price_per_sqft: 250.0,
            reference_lot_sqft: 10_000.0,
            stable_tenure_years: 10.0,
            reference_date: None,
            investment_weights: InvestmentWeights::default(),
        }
    }
}

/// Clamp into [0, 10]; NaN becomes neutral.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return NEUTRAL_SCORE;
    }
    value.clamp(SCORE_MIN, SCORE_MAX)
}

/// Weighted mean of `(component, weight)`; a missing component counts as neutral.
fn blend(components: &[(Option<f64>, f64)]) -> f64 {
    let total_weight: f64 = components.iter().map(|(_, w)| w.max(0.0)).sum();
    if total_weight <= 0.0 {
        return NEUTRAL_SCORE;
    }
    let weighted: f64 = components
        .iter()
        .map(|(value, weight)| clamp_score(value.unwrap_or(NEUTRAL_SCORE)) * weight.max(0.0))
        .sum();
    round_to(clamp_score(weighted / total_weight), 1)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn status_matches(mls: &MlsRecord, set: &[&str]) -> bool {
    [mls.custom_status.as_deref(), mls.standard_status.as_deref()]
        .into_iter()
        .flatten()
        .any(|s| set.contains(&s.trim().to_ascii_lowercase().as_str()))
}

/// Computes the score set for (MLS, detail) pairs
pub struct Scorer {
    config: ScoringConfig,
    reference_date: NaiveDate,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        let reference_date = config
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());
        Self {
            config,
            reference_date,
        }
    }

    /// Every score for one property
    pub fn score_all(&self, mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> ScoreSet {
        let (zip_trend, zip_trend_value) = self.zip_trend(mls, detail);
        ScoreSet {
            investment_score: self.investment_score(mls, detail),
            appreciation_rate: self.appreciation_rate(mls, detail),
            zip_trend,
            zip_trend_value,
            school_rating: self.school_rating(mls, detail),
            market_score: self.market_score(mls, detail),
            market_activity_score: self.market_activity_score(mls, detail),
            location_score: self.location_score(mls, detail),
            property_condition_score: self.property_condition_score(mls, detail),
            neighborhood_safety_score: self.neighborhood_safety_score(mls, detail),
            tax_rate: self.tax_rate(mls, detail),
        }
    }

    // ------------------------------------------------------------------
    // Shared components
    // ------------------------------------------------------------------

    fn sqft(mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> Option<f64> {
        positive(mls.and_then(|m| m.living_area)).or_else(|| positive(detail.and_then(|d| d.living_square_feet)))
    }

    /// 10 for a fresh listing, falling linearly to 0 at the horizon
    fn freshness(&self, mls: Option<&MlsRecord>) -> Option<f64> {
        let dom = mls?.days_on_market.filter(|d| d.is_finite())?.max(0.0);
        let horizon = self.config.dom_horizon_days.max(1.0);
        Some(SCORE_MAX - dom / horizon * SCORE_MAX)
    }

    /// Percentage change across the listing's price history
    fn history_change_pct(mls: Option<&MlsRecord>) -> Option<f64> {
        let history = mls?.price_history();
        let oldest = history.iter().find(|c| c.price.is_some())?;
        let newest = history.iter().rev().find(|c| c.price.is_some())?;
        let start = positive(oldest.previous_price()).or(positive(oldest.price))?;
        let end = newest.price?;
        Some((end - start) / start * 100.0).filter(|v| v.is_finite())
    }

    /// Percentage change from the last recorded sale to today's estimate
    fn valuation_change_pct(detail: Option<&PropertyDetailRecord>) -> Option<f64> {
        let detail = detail?;
        let sold = positive(detail.last_sale_amount)?;
        let estimate = positive(detail.estimated_value)?;
        Some((estimate - sold) / sold * 100.0).filter(|v| v.is_finite())
    }

    fn trend_pct(mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> Option<f64> {
        Self::history_change_pct(mls).or_else(|| Self::valuation_change_pct(detail))
    }

    fn school_average(detail: Option<&PropertyDetailRecord>) -> Option<f64> {
        let ratings: Vec<f64> = detail?
            .schools
            .iter()
            .filter_map(|s| s.rating)
            .map(clamp_score)
            .collect();
        mean(&ratings)
    }

    // ------------------------------------------------------------------
    // Score functions
    // ------------------------------------------------------------------

    /// Blend of price competitiveness ($/sqft of the estimate against the
    /// asking $/sqft), listing freshness, equity share and appreciation.
    pub fn investment_score(&self, mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> f64 {
        let sqft = Self::sqft(mls, detail);

        let price_component = sqft.and_then(|sqft| {
            let asking = price_per_sqft(positive(mls?.list_price)?, sqft)?;
            let estimated = price_per_sqft(positive(detail?.estimated_value)?, sqft)?;
            Some(NEUTRAL_SCORE + (estimated / asking - 1.0) * self.config.value_gap_scale)
        });

        let equity_component = detail.and_then(|d| {
            let value = positive(d.estimated_value)?;
            Some(d.equity_amount()? / value * SCORE_MAX)
        });

        let appreciation_component = Self::history_change_pct(mls).map(|pct| NEUTRAL_SCORE + pct / 2.0);

        let w = &self.config.investment_weights;
        blend(&[
            (price_component, w.price),
            (self.freshness(mls), w.days_on_market),
            (equity_component, w.equity),
            (appreciation_component, w.appreciation),
        ])
    }

    /// Percentage change over the MLS price history; 0 without one
    pub fn appreciation_rate(&self, mls: Option<&MlsRecord>, _detail: Option<&PropertyDetailRecord>) -> f64 {
        Self::history_change_pct(mls).map(|pct| round_to(pct, 1)).unwrap_or(0.0)
    }

    /// Direction and magnitude of the price trend, from the listing's price
    /// history or else from last sale against the current estimate.
    pub fn zip_trend(&self, mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> (ZipTrend, f64) {
        let pct = match Self::trend_pct(mls, detail) {
            Some(pct) => pct,
            None => return (ZipTrend::Flat, 0.0),
        };
        let band = self.config.trend_flat_band_pct.abs();
        let trend = if pct > band {
            ZipTrend::Up
        } else if pct < -band {
            ZipTrend::Down
        } else {
            ZipTrend::Flat
        };
        (trend, round_to(pct.abs(), 1))
    }

    /// Mean rating of the schools attached to the property
    pub fn school_rating(&self, _mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> f64 {
        blend(&[(Self::school_average(detail), 1.0)])
    }

    /// Demand (freshness), sale-to-list strength and price trend
    pub fn market_score(&self, mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> f64 {
        let sale_to_list = mls.and_then(|m| {
            let ratio = positive(m.close_price)? / positive(m.list_price)?;
            Some(NEUTRAL_SCORE + (ratio - 1.0) * self.config.sale_to_list_scale)
        });
        let trend = Self::trend_pct(mls, detail).map(|pct| NEUTRAL_SCORE + pct / 2.0);

        blend(&[(self.freshness(mls), 0.4), (sale_to_list, 0.3), (trend, 0.3)])
    }

    /// How quickly this listing is moving: days on market, listing status,
    /// and how many price reductions it has taken.
    pub fn market_activity_score(&self, mls: Option<&MlsRecord>, _detail: Option<&PropertyDetailRecord>) -> f64 {
        let status = mls.and_then(|m| {
            if m.is_pending() || m.is_closed() {
                Some(SCORE_MAX)
            } else if status_matches(m, INACTIVE_STATUSES) {
                Some(SCORE_MIN)
            } else if m.status().is_some() {
                Some(NEUTRAL_SCORE)
            } else {
                None
            }
        });
        let reductions = mls.map(|m| {
            let count = m
                .price_changes
                .iter()
                .filter(|c| c.signed_change().map(|v| v < 0.0).unwrap_or(false))
                .count();
            SCORE_MAX - count as f64 * 2.5
        });

        blend(&[(self.freshness(mls), 0.6), (status, 0.25), (reductions, 0.15)])
    }

    /// Schools, value density ($/sqft of the estimate) and lot size
    pub fn location_score(&self, mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> f64 {
        let value_density = Self::sqft(mls, detail).and_then(|sqft| {
            let ppsf = price_per_sqft(positive(detail?.estimated_value)?, sqft)?;
            Some(ppsf / self.config.reference_price_per_sqft.max(1.0) * NEUTRAL_SCORE)
        });
        let lot = positive(mls.and_then(|m| m.lot_size_square_feet))
            .or_else(|| positive(detail.and_then(|d| d.lot_square_feet)))
            .map(|lot| lot / self.config.reference_lot_sqft.max(1.0) * NEUTRAL_SCORE);

        blend(&[(Self::school_average(detail), 0.4), (value_density, 0.4), (lot, 0.2)])
    }

    /// Building age, amenity flags and condition phrases in the remarks
    pub fn property_condition_score(&self, mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> f64 {
        let year_built = positive(mls.and_then(|m| m.year_built)).or_else(|| positive(detail.and_then(|d| d.year_built)));
        let age = year_built.map(|year| {
            let age = (self.reference_date.year() as f64 - year).max(0.0);
            SCORE_MAX - age / self.config.age_horizon_years.max(1.0) * SCORE_MAX
        });

        let amenities = detail.and_then(|d| {
            let cooling = d
                .cooling_type
                .as_deref()
                .map(|c| !c.eq_ignore_ascii_case("none"));
            let flags = [d.garage, d.pool, d.porch, d.basement, cooling];
            if flags.iter().all(Option::is_none) {
                return None;
            }
            // Each flag is worth 2 points; an unknown flag takes the neutral half
            let points: f64 = flags
                .iter()
                .map(|f| match f {
                    Some(true) => 2.0,
                    Some(false) => 0.0,
                    None => 1.0,
                })
                .sum();
            Some(points)
        });

        let remarks = mls.and_then(|m| m.public_remarks.as_deref()).map(|text| {
            let text = text.to_ascii_lowercase();
            let good = CONDITION_POSITIVE.iter().filter(|p| text.contains(*p)).count();
            let bad = CONDITION_NEGATIVE.iter().filter(|p| text.contains(*p)).count();
            NEUTRAL_SCORE + good as f64 * 1.5 - bad as f64 * 2.0
        });

        blend(&[(age, 0.5), (amenities, 0.25), (remarks, 0.25)])
    }

    /// Stability proxy from owner occupancy, vacancy and ownership tenure.
    /// Neither feed carries crime data.
    pub fn neighborhood_safety_score(&self, _mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> f64 {
        let owner = detail.and_then(|d| d.owner_occupied).map(|o| if o { 8.0 } else { 4.0 });
        let vacancy = detail.and_then(|d| d.vacant).map(|v| if v { 2.0 } else { 7.0 });
        let tenure = detail.and_then(|d| d.last_sale_date).map(|sold| {
            let years = ((self.reference_date - sold).num_days() as f64 / 365.25).max(0.0);
            years / self.config.stable_tenure_years.max(1.0) * SCORE_MAX
        });

        blend(&[(owner, 0.35), (vacancy, 0.35), (tenure, 0.3)])
    }

    /// Annual tax as a percentage of assessed value; 0 when either is
    /// missing or the assessment is zero.
    pub fn tax_rate(&self, _mls: Option<&MlsRecord>, detail: Option<&PropertyDetailRecord>) -> f64 {
        let detail = match detail {
            Some(d) => d,
            None => return 0.0,
        };
        match (detail.tax_amount, detail.assessed_value) {
            (Some(tax), Some(assessed)) if assessed != 0.0 => {
                let rate = tax / assessed * 100.0;
                if rate.is_finite() {
                    round_to(rate, 2)
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}
