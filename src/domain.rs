//! Canonical view model produced for the subject and every comparable.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of the local price trend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipTrend {
    Up,
    Down,
    #[default]
    Flat,
}

/// Every derived score and rate for one property.
/// Scores lie in [0, 10]; rates are finite percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSet {
    pub investment_score: f64,
    pub appreciation_rate: f64,
    pub zip_trend: ZipTrend,
    pub zip_trend_value: f64,
    pub school_rating: f64,
    pub market_score: f64,
    pub market_activity_score: f64,
    pub location_score: f64,
    pub property_condition_score: f64,
    pub neighborhood_safety_score: f64,
    pub tax_rate: f64,
}

/// Structural descriptors carried over from the public-records feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFeatures {
    pub stories: f64,
    pub construction_type: String,
    pub roof_material: String,
    pub heating_type: String,
    pub cooling_type: String,
    pub basement: bool,
    pub basement_sqft: f64,
    pub garage: bool,
    pub garage_sqft: f64,
    pub pool: bool,
    pub pool_area: f64,
    pub porch: bool,
    pub porch_area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryEntry {
    pub date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub change_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub date: Option<NaiveDate>,
    pub status: String,
}

/// One property merged from both feeds. Built once per analysis and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedProperty {
    pub id: i64,
    pub address: String,
    /// Formatted price, or the "Price not available" sentinel
    pub price: String,
    /// Numeric price behind `price`
    pub price_value: Option<f64>,
    pub image: String,
    pub images: Vec<String>,
    pub beds: f64,
    pub baths: f64,
    pub sqft: f64,
    /// `price_value / sqft`; null when either is unusable
    #[serde(rename = "pricePerSqFt")]
    pub price_per_sqft: Option<f64>,
    pub lot_sqft: f64,
    pub year_built: Option<i32>,
    pub property_type: String,
    pub status: String,
    pub days_to_sale: Option<i64>,
    pub days_on_market: i64,
    pub percent_of_asking: Option<i64>,
    pub amenities: Vec<String>,
    pub features: PropertyFeatures,
    pub estimated_value: Option<f64>,
    pub equity: Option<f64>,
    pub last_sale_price: Option<f64>,
    pub last_sale_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub price_history: Vec<PriceHistoryEntry>,
    pub status_history: Vec<StatusHistoryEntry>,
    /// Whether an MLS record contributed to this property
    pub has_mls: bool,
    #[serde(flatten)]
    pub scores: ScoreSet,
}

impl UnifiedProperty {
    /// Value of a comparison metric on this property
    pub fn metric_value(&self, metric: Metric) -> Option<f64> {
        let s = &self.scores;
        match metric {
            Metric::DaysToSale => self.days_to_sale.map(|d| d as f64),
            Metric::DaysOnMarket => Some(self.days_on_market as f64),
            Metric::TaxRate => Some(s.tax_rate),
            Metric::InvestmentScore => Some(s.investment_score),
            Metric::SchoolRating => Some(s.school_rating),
            Metric::AppreciationRate => Some(s.appreciation_rate),
            Metric::MarketScore => Some(s.market_score),
            Metric::MarketActivityScore => Some(s.market_activity_score),
            Metric::LocationScore => Some(s.location_score),
            Metric::PropertyConditionScore => Some(s.property_condition_score),
            Metric::NeighborhoodSafetyScore => Some(s.neighborhood_safety_score),
            Metric::PricePerSqFt => self.price_per_sqft,
        }
    }
}

/// Metrics a comparable can be classified on against the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    DaysToSale,
    DaysOnMarket,
    TaxRate,
    InvestmentScore,
    SchoolRating,
    AppreciationRate,
    MarketScore,
    MarketActivityScore,
    LocationScore,
    PropertyConditionScore,
    NeighborhoodSafetyScore,
    PricePerSqFt,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::DaysToSale,
        Metric::DaysOnMarket,
        Metric::TaxRate,
        Metric::InvestmentScore,
        Metric::SchoolRating,
        Metric::AppreciationRate,
        Metric::MarketScore,
        Metric::MarketActivityScore,
        Metric::LocationScore,
        Metric::PropertyConditionScore,
        Metric::NeighborhoodSafetyScore,
        Metric::PricePerSqFt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::DaysToSale => "daysToSale",
            Metric::DaysOnMarket => "daysOnMarket",
            Metric::TaxRate => "taxRate",
            Metric::InvestmentScore => "investmentScore",
            Metric::SchoolRating => "schoolRating",
            Metric::AppreciationRate => "appreciationRate",
            Metric::MarketScore => "marketScore",
            Metric::MarketActivityScore => "marketActivityScore",
            Metric::LocationScore => "locationScore",
            Metric::PropertyConditionScore => "propertyConditionScore",
            Metric::NeighborhoodSafetyScore => "neighborhoodSafetyScore",
            Metric::PricePerSqFt => "pricePerSqFt",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Accepts the camelCase name or its snake_case spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}
