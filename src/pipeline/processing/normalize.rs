use tracing::debug;

use crate::constants::{NOT_AVAILABLE, PLACEHOLDER_IMAGE, PRICE_UNAVAILABLE};
use crate::domain::{PriceHistoryEntry, PropertyFeatures, StatusHistoryEntry, UnifiedProperty};
use crate::pipeline::processing::numeric::{format_currency, price_per_sqft};
use crate::pipeline::processing::scoring::Scorer;
use crate::types::{MlsRecord, PropertyDetailRecord};

/// Trait for merging the two raw views of a property into one canonical view
pub trait Normalizer: Send + Sync {
    /// Merge a public-records record and an MLS record, either of which may be absent
    fn normalize(&self, detail: Option<&PropertyDetailRecord>, mls: Option<&MlsRecord>) -> UnifiedProperty;
}

/// Field-by-field merge: the MLS value wins when present, then the
/// public-records value, then a fixed default (0 for counts and areas,
/// "N/A" for descriptive text).
pub struct DefaultNormalizer {
    pub scorer: Scorer,
    pub placeholder_image: String,
}

impl Default for DefaultNormalizer {
    fn default() -> Self {
        Self::new(Scorer::default())
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn text_or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// Keep the first occurrence of each non-blank entry
fn dedup_non_empty<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

impl DefaultNormalizer {
    pub fn new(scorer: Scorer) -> Self {
        Self {
            scorer,
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
        }
    }

    pub fn with_placeholder_image(mut self, placeholder_image: impl Into<String>) -> Self {
        self.placeholder_image = placeholder_image.into();
        self
    }

    /// MLS list price, else the estimate, else the last MLS price known to public records
    fn price_value(detail: Option<&PropertyDetailRecord>, mls: Option<&MlsRecord>) -> Option<f64> {
        positive(mls.and_then(|m| m.list_price))
            .or_else(|| positive(detail.and_then(|d| d.estimated_value)))
            .or_else(|| positive(detail.and_then(|d| d.mls_listing_price)))
    }

    /// `round((1 - firstChange.changeAmount / listPrice) * 100)`
    fn percent_of_asking(mls: Option<&MlsRecord>) -> Option<i64> {
        let mls = mls?;
        let list_price = mls.list_price.filter(|p| *p != 0.0)?;
        let change = mls.first_price_change()?.change_amount?;
        let pct = (1.0 - change / list_price) * 100.0;
        pct.is_finite().then(|| pct.round() as i64)
    }

    fn images(detail: Option<&PropertyDetailRecord>, mls: Option<&MlsRecord>) -> Vec<String> {
        let from_mls = mls.into_iter().flat_map(MlsRecord::photo_urls);
        let from_detail = detail.into_iter().flat_map(|d| d.photos.iter().map(String::as_str));
        dedup_non_empty(from_mls.chain(from_detail))
    }

    fn amenities(mls: Option<&MlsRecord>) -> Vec<String> {
        let details = match mls {
            Some(m) => &m.home_details,
            None => return Vec::new(),
        };
        dedup_non_empty(
            details
                .appliances
                .iter()
                .chain(&details.exterior_features)
                .chain(&details.interior_features)
                .chain(&details.community_features)
                .map(String::as_str),
        )
    }

    fn features(detail: Option<&PropertyDetailRecord>) -> PropertyFeatures {
        let empty = PropertyDetailRecord::default();
        let d = detail.unwrap_or(&empty);
        let area = |v: Option<f64>| positive(v).unwrap_or(0.0);
        PropertyFeatures {
            stories: area(d.stories),
            construction_type: text_or_na(d.construction_type.as_deref()),
            roof_material: text_or_na(d.roof_material.as_deref()),
            heating_type: text_or_na(d.heating_type.as_deref()),
            cooling_type: text_or_na(d.cooling_type.as_deref()),
            basement: d.basement.unwrap_or(false) || area(d.basement_square_feet) > 0.0,
            basement_sqft: area(d.basement_square_feet),
            garage: d.garage.unwrap_or(false) || area(d.garage_square_feet) > 0.0,
            garage_sqft: area(d.garage_square_feet),
            pool: d.pool.unwrap_or(false) || area(d.pool_area) > 0.0,
            pool_area: area(d.pool_area),
            porch: d.porch.unwrap_or(false) || area(d.porch_area) > 0.0,
            porch_area: area(d.porch_area),
        }
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, detail: Option<&PropertyDetailRecord>, mls: Option<&MlsRecord>) -> UnifiedProperty {
        let id = detail
            .and_then(|d| d.id)
            .or_else(|| mls.and_then(|m| m.mls_id.as_deref()).and_then(|s| s.parse().ok()))
            .unwrap_or(0);

        let address = mls
            .and_then(|m| m.address.clone())
            .or_else(|| detail.and_then(PropertyDetailRecord::address_label))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let price_value = Self::price_value(detail, mls);
        let price = match price_value {
            Some(p) => format_currency(Some(p)),
            None => PRICE_UNAVAILABLE.to_string(),
        };

        let images = Self::images(detail, mls);
        let image = mls
            .and_then(MlsRecord::primary_image)
            .map(str::to_string)
            .or_else(|| images.first().cloned())
            .unwrap_or_else(|| self.placeholder_image.clone());

        let pick = |from_mls: Option<f64>, from_detail: Option<f64>| {
            positive(from_mls).or(positive(from_detail)).unwrap_or(0.0)
        };
        let beds = pick(mls.and_then(|m| m.bedrooms_total), detail.and_then(|d| d.bedrooms));
        let baths = pick(mls.and_then(|m| m.bathrooms_total), detail.and_then(|d| d.bathrooms));
        let sqft = pick(mls.and_then(|m| m.living_area), detail.and_then(|d| d.living_square_feet));
        let lot_sqft = pick(
            mls.and_then(|m| m.lot_size_square_feet),
            detail.and_then(|d| d.lot_square_feet),
        );
        let year_built = positive(mls.and_then(|m| m.year_built))
            .or(positive(detail.and_then(|d| d.year_built)))
            .map(|y| y.round() as i32);

        let property_type = text_or_na(
            mls.and_then(|m| m.property_type.as_deref())
                .or(detail.and_then(|d| d.property_type.as_deref())),
        );
        let status = text_or_na(mls.and_then(MlsRecord::status));

        let days_to_sale = mls.and_then(MlsRecord::days_to_sale).map(|d| d.round() as i64);
        let days_on_market = mls
            .and_then(|m| m.days_on_market)
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as i64)
            .unwrap_or(0);

        let price_history = mls
            .map(|m| {
                m.price_history()
                    .into_iter()
                    .map(|c| PriceHistoryEntry {
                        date: c.date,
                        price: c.price,
                        change_amount: c.signed_change(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let status_history = mls
            .map(|m| {
                m.status_changes
                    .iter()
                    .map(|s| StatusHistoryEntry {
                        date: s.date,
                        status: text_or_na(s.status.as_deref()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let property = UnifiedProperty {
            id,
            address,
            price,
            price_value,
            image,
            images,
            beds,
            baths,
            sqft,
            price_per_sqft: price_value.and_then(|p| price_per_sqft(p, sqft)),
            lot_sqft,
            year_built,
            property_type,
            status,
            days_to_sale,
            days_on_market,
            percent_of_asking: Self::percent_of_asking(mls),
            amenities: Self::amenities(mls),
            features: Self::features(detail),
            estimated_value: positive(detail.and_then(|d| d.estimated_value)),
            equity: detail.and_then(PropertyDetailRecord::equity_amount),
            last_sale_price: positive(detail.and_then(|d| d.last_sale_amount))
                .or_else(|| positive(mls.and_then(|m| m.close_price))),
            last_sale_date: detail
                .and_then(|d| d.last_sale_date)
                .or_else(|| mls.and_then(|m| m.close_date)),
            remarks: mls.and_then(|m| m.public_remarks.clone()),
            price_history,
            status_history,
            has_mls: mls.is_some(),
            scores: self.scorer.score_all(mls, detail),
        };

        debug!(
            property_id = property.id,
            address = %property.address,
            has_mls = property.has_mls,
            photos = property.images.len(),
            "Normalized property"
        );

        property
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AddressValue, HomeDetails, MlsMedia, MlsPhoto, PriceChange, PriceDirection};

    fn normalizer() -> DefaultNormalizer {
        DefaultNormalizer::default()
    }

    #[test]
    fn test_mls_price_and_detail_area_merge() {
        let detail = PropertyDetailRecord {
            id: Some(17),
            living_square_feet: Some(2000.0),
            estimated_value: Some(480_000.0),
            ..Default::default()
        };
        let mls = MlsRecord {
            list_price: Some(500_000.0),
            ..Default::default()
        };

        let property = normalizer().normalize(Some(&detail), Some(&mls));
        assert_eq!(property.price, "$500,000");
        assert_eq!(property.sqft, 2000.0);
        assert_eq!(property.price_per_sqft, Some(250.0));
        assert_eq!(property.id, 17);
        assert!(property.has_mls);

        let json = serde_json::to_value(&property).unwrap();
        assert_eq!(json["pricePerSqFt"], serde_json::json!(250.0));
        assert_eq!(json["priceValue"], serde_json::json!(500_000.0));
    }

    #[test]
    fn test_both_sources_missing_yields_sentinels() {
        let property = normalizer().normalize(None, None);
        assert_eq!(property.id, 0);
        assert_eq!(property.address, "N/A");
        assert_eq!(property.price, "Price not available");
        assert_eq!(property.image, PLACEHOLDER_IMAGE);
        assert!(property.images.is_empty());
        assert_eq!(property.beds, 0.0);
        assert_eq!(property.sqft, 0.0);
        assert_eq!(property.price_per_sqft, None);
        assert!(serde_json::to_value(&property).unwrap()["pricePerSqFt"].is_null());
        assert_eq!(property.days_on_market, 0);
        assert_eq!(property.days_to_sale, None);
        assert_eq!(property.percent_of_asking, None);
        assert_eq!(property.features.construction_type, "N/A");
    }

    #[test]
    fn test_price_falls_back_through_detail_fields() {
        let estimate_only = PropertyDetailRecord {
            estimated_value: Some(410_000.0),
            mls_listing_price: Some(399_000.0),
            ..Default::default()
        };
        assert_eq!(normalizer().normalize(Some(&estimate_only), None).price, "$410,000");

        let listing_only = PropertyDetailRecord {
            mls_listing_price: Some(399_000.0),
            ..Default::default()
        };
        assert_eq!(normalizer().normalize(Some(&listing_only), None).price, "$399,000");

        let zero_list = MlsRecord { list_price: Some(0.0), ..Default::default() };
        assert_eq!(
            normalizer().normalize(Some(&listing_only), Some(&zero_list)).price,
            "$399,000"
        );
    }

    #[test]
    fn test_photos_mls_first_deduplicated_and_filtered() {
        let detail = PropertyDetailRecord {
            photos: vec!["d1.jpg".to_string(), "m1.jpg".to_string(), " ".to_string()],
            ..Default::default()
        };
        let mls = MlsRecord {
            media: MlsMedia {
                primary_listing_image_url: None,
                photos_list: vec![
                    MlsPhoto { high_res: Some("m1.jpg".to_string()), ..Default::default() },
                    MlsPhoto { high_res: Some("".to_string()), ..Default::default() },
                    MlsPhoto { high_res: Some("m2.jpg".to_string()), ..Default::default() },
                ],
            },
            ..Default::default()
        };

        let property = normalizer().normalize(Some(&detail), Some(&mls));
        assert_eq!(property.images, vec!["m1.jpg", "m2.jpg", "d1.jpg"]);
        assert_eq!(property.image, "m1.jpg");
    }

    #[test]
    fn test_primary_image_wins_and_detail_photo_is_fallback() {
        let detail = PropertyDetailRecord {
            photos: vec!["a.jpg".to_string()],
            ..Default::default()
        };
        assert_eq!(normalizer().normalize(Some(&detail), None).image, "a.jpg");

        let mls = MlsRecord {
            media: MlsMedia {
                primary_listing_image_url: Some("primary.jpg".to_string()),
                photos_list: Vec::new(),
            },
            ..Default::default()
        };
        assert_eq!(normalizer().normalize(Some(&detail), Some(&mls)).image, "primary.jpg");
    }

    #[test]
    fn test_percent_of_asking() {
        let mls = MlsRecord {
            list_price: Some(500_000.0),
            price_changes: vec![PriceChange {
                change_amount: Some(15_000.0),
                direction: PriceDirection::Down,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(normalizer().normalize(None, Some(&mls)).percent_of_asking, Some(97));

        let zero_price = MlsRecord { list_price: Some(0.0), ..mls.clone() };
        assert_eq!(normalizer().normalize(None, Some(&zero_price)).percent_of_asking, None);

        let no_history = MlsRecord { price_changes: Vec::new(), ..mls };
        assert_eq!(normalizer().normalize(None, Some(&no_history)).percent_of_asking, None);
    }

    #[test]
    fn test_amenities_are_flattened_and_trimmed() {
        let mls = MlsRecord {
            home_details: HomeDetails {
                appliances: vec!["Dishwasher".to_string(), "Range".to_string()],
                exterior_features: vec!["Deck".to_string(), "Dishwasher".to_string()],
                interior_features: vec![" Fireplace ".to_string()],
                community_features: Vec::new(),
            },
            ..Default::default()
        };
        let property = normalizer().normalize(None, Some(&mls));
        assert_eq!(property.amenities, vec!["Dishwasher", "Range", "Deck", "Fireplace"]);
    }

    #[test]
    fn test_mls_structure_overrides_detail() {
        let detail = PropertyDetailRecord {
            bedrooms: Some(3.0),
            bathrooms: Some(2.0),
            living_square_feet: Some(1800.0),
            address: Some(AddressValue::Label("1 Detail Rd".to_string())),
            ..Default::default()
        };
        let mls = MlsRecord {
            bedrooms_total: Some(4.0),
            living_area: Some(1950.0),
            address: Some("1 Listing Rd".to_string()),
            standard_status: Some("Active".to_string()),
            days_on_market: Some(12.4),
            ..Default::default()
        };
        let property = normalizer().normalize(Some(&detail), Some(&mls));
        assert_eq!(property.beds, 4.0);
        assert_eq!(property.baths, 2.0);
        assert_eq!(property.sqft, 1950.0);
        assert_eq!(property.address, "1 Listing Rd");
        assert_eq!(property.status, "Active");
        assert_eq!(property.days_on_market, 12);
    }

    #[test]
    fn test_features_default_and_area_implies_presence() {
        let detail = PropertyDetailRecord {
            garage_square_feet: Some(400.0),
            roof_material: Some("Composition Shingle".to_string()),
            ..Default::default()
        };
        let features = normalizer().normalize(Some(&detail), None).features;
        assert!(features.garage);
        assert_eq!(features.garage_sqft, 400.0);
        assert!(!features.pool);
        assert_eq!(features.roof_material, "Composition Shingle");
        assert_eq!(features.heating_type, "N/A");
    }

    #[test]
    fn test_custom_placeholder_image() {
        let normalizer = DefaultNormalizer::default().with_placeholder_image("/img/none.png");
        assert_eq!(normalizer.normalize(None, None).image, "/img/none.png");
    }
}
