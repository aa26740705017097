use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::lenient;
use crate::constants::{CLOSED_STATUSES, PENDING_STATUSES};

/// One photo in several resolutions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlsPhoto {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub high_res: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub mid_res: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub low_res: Option<String>,
}

impl MlsPhoto {
    /// Largest available rendition
    pub fn best_url(&self) -> Option<&str> {
        self.high_res
            .as_deref()
            .or(self.mid_res.as_deref())
            .or(self.low_res.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlsMedia {
    #[serde(default, alias = "primaryImageUrl", deserialize_with = "lenient::opt_string")]
    pub primary_listing_image_url: Option<String>,
    #[serde(default, alias = "photos", deserialize_with = "lenient::null_as_default")]
    pub photos_list: Vec<MlsPhoto>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceDirection {
    Up,
    Down,
    #[default]
    Unknown,
}

impl From<&str> for PriceDirection {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "increase" | "increased" | "raised" => PriceDirection::Up,
            "down" | "decrease" | "decreased" | "reduced" | "reduction" => PriceDirection::Down,
            _ => PriceDirection::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for PriceDirection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(lenient::opt_string(deserializer)?
            .map(|s| PriceDirection::from(s.as_str()))
            .unwrap_or_default())
    }
}

/// One entry of a listing's price history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    /// Price after the change
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub change_amount: Option<f64>,
    #[serde(default)]
    pub direction: PriceDirection,
}

impl PriceChange {
    /// Change amount signed by its direction. Feeds disagree on whether the
    /// amount itself is signed, so an explicit direction wins.
    pub fn signed_change(&self) -> Option<f64> {
        let amount = self.change_amount?;
        Some(match self.direction {
            PriceDirection::Up => amount.abs(),
            PriceDirection::Down => -amount.abs(),
            PriceDirection::Unknown => amount,
        })
    }

    /// Price before this change, when it can be derived
    pub fn previous_price(&self) -> Option<f64> {
        Some(self.price? - self.signed_change()?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "newStatus", deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(default, alias = "oldStatus", deserialize_with = "lenient::opt_string")]
    pub previous_status: Option<String>,
}

/// Free-form home detail lists. The feed sends each as a comma-joined string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeDetails {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub appliances: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub exterior_features: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub interior_features: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub community_features: Vec<String>,
}

/// MLS listing view of one property
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlsRecord {
    #[serde(default, alias = "listingId", alias = "mlsNumber", deserialize_with = "lenient::opt_string")]
    pub mls_id: Option<String>,
    #[serde(default, alias = "unparsedAddress", deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub list_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub close_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub days_on_market: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub standard_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub custom_status: Option<String>,
    #[serde(default, alias = "listingContractDate", deserialize_with = "lenient::opt_date")]
    pub listing_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub close_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub modification_timestamp: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub bedrooms_total: Option<f64>,
    #[serde(default, alias = "bathroomsTotalInteger", deserialize_with = "lenient::opt_f64")]
    pub bathrooms_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub living_area: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub lot_size_square_feet: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub year_built: Option<f64>,

    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub media: MlsMedia,
    #[serde(default, alias = "priceHistory", deserialize_with = "lenient::null_as_default")]
    pub price_changes: Vec<PriceChange>,
    #[serde(default, alias = "statusHistory", deserialize_with = "lenient::null_as_default")]
    pub status_changes: Vec<StatusChange>,
    #[serde(default, alias = "remarks", deserialize_with = "lenient::opt_string")]
    pub public_remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub home_details: HomeDetails,
}

impl MlsRecord {
    /// Custom status when the board sets one, else the standard status
    pub fn status(&self) -> Option<&str> {
        self.custom_status
            .as_deref()
            .or(self.standard_status.as_deref())
    }

    pub fn is_closed(&self) -> bool {
        status_in(self.status(), CLOSED_STATUSES) || status_in(self.standard_status.as_deref(), CLOSED_STATUSES)
    }

    pub fn is_pending(&self) -> bool {
        status_in(self.status(), PENDING_STATUSES) || status_in(self.standard_status.as_deref(), PENDING_STATUSES)
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.media.primary_listing_image_url.as_deref()
    }

    /// High-resolution photo URLs, falling back per photo to smaller renditions
    pub fn photo_urls(&self) -> impl Iterator<Item = &str> {
        self.media.photos_list.iter().filter_map(MlsPhoto::best_url)
    }

    /// Price history oldest first. Undated entries keep their feed order at the end.
    pub fn price_history(&self) -> Vec<&PriceChange> {
        let mut history: Vec<&PriceChange> = self.price_changes.iter().collect();
        history.sort_by_key(|change| (change.date.is_none(), change.date));
        history
    }

    /// First entry of the price history as the feed delivered it
    pub fn first_price_change(&self) -> Option<&PriceChange> {
        self.price_changes.first()
    }

    /// Days between listing and close, when the listing has closed
    pub fn days_to_sale(&self) -> Option<f64> {
        if let (Some(listed), Some(closed)) = (self.listing_date, self.close_date) {
            let days = (closed - listed).num_days();
            if days >= 0 {
                return Some(days as f64);
            }
        }
        if self.is_closed() {
            return self.days_on_market;
        }
        None
    }
}

fn status_in(status: Option<&str>, set: &[&str]) -> bool {
    status
        .map(|s| s.trim().to_ascii_lowercase())
        .map(|s| set.iter().any(|candidate| *candidate == s))
        .unwrap_or(false)
}
