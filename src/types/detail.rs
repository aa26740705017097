use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::lenient;

/// Address as sent by the feeds: either a single display label or its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressValue {
    Label(String),
    Parts(AddressParts),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressParts {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub label: Option<String>,
    #[serde(default, alias = "street", deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub zip: Option<String>,
}

impl AddressValue {
    /// Display label, assembled from parts when no label was sent
    pub fn label(&self) -> Option<String> {
        match self {
            AddressValue::Label(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            AddressValue::Parts(parts) => {
                if let Some(label) = &parts.label {
                    return Some(label.clone());
                }
                let street = parts.address.as_deref()?;
                let locality: Vec<&str> = [parts.city.as_deref(), parts.state.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                let mut label = street.to_string();
                if !locality.is_empty() {
                    label.push_str(", ");
                    label.push_str(&locality.join(", "));
                }
                if let Some(zip) = &parts.zip {
                    label.push(' ');
                    label.push_str(zip);
                }
                Some(label)
            }
        }
    }
}

/// School attached to a public-records property
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolRecord {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    /// Rating on a 0-10 scale
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub rating: Option<f64>,
}

/// Comparable property as listed inside a subject's detail record.
/// It carries no MLS data until the enrichment step looks it up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompStub {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(default)]
    pub address: Option<AddressValue>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub bedrooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub bathrooms: Option<f64>,
    #[serde(default, alias = "squareFeet", deserialize_with = "lenient::opt_f64")]
    pub living_square_feet: Option<f64>,
    #[serde(default, alias = "lotSquareFeet", deserialize_with = "lenient::opt_f64")]
    pub lot_square_feet: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub year_built: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub estimated_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub last_sale_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub last_sale_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub photos: Vec<String>,
}

impl CompStub {
    pub fn address_label(&self) -> Option<String> {
        self.address.as_ref().and_then(AddressValue::label)
    }
}

/// Public-records ("property detail") view of one property
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetailRecord {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(default)]
    pub address: Option<AddressValue>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub property_type: Option<String>,

    // Structure
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub bedrooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub bathrooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub living_square_feet: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub lot_square_feet: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub year_built: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub stories: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub basement: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub basement_square_feet: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub garage: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub garage_square_feet: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub pool: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub pool_area: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub porch: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub porch_area: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub construction_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub roof_material: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub heating_type: Option<String>,
    #[serde(default, alias = "airConditioningType", deserialize_with = "lenient::opt_string")]
    pub cooling_type: Option<String>,

    // Valuation
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub estimated_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub mls_listing_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub last_sale_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub last_sale_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub tax_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub assessed_value: Option<f64>,
    #[serde(default, alias = "openMortgageBalance", deserialize_with = "lenient::opt_f64")]
    pub mortgage_balance: Option<f64>,
    #[serde(default, alias = "estimatedEquity", deserialize_with = "lenient::opt_f64")]
    pub equity: Option<f64>,

    // Occupancy and surroundings
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub owner_occupied: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub vacant: Option<bool>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub schools: Vec<SchoolRecord>,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub photos: Vec<String>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub comps: Vec<CompStub>,
}

impl PropertyDetailRecord {
    pub fn address_label(&self) -> Option<String> {
        self.address.as_ref().and_then(AddressValue::label)
    }

    /// Equity as reported, or estimated value minus the open mortgage balance
    pub fn equity_amount(&self) -> Option<f64> {
        self.equity.or_else(|| match (self.estimated_value, self.mortgage_balance) {
            (Some(value), Some(balance)) => Some(value - balance),
            _ => None,
        })
    }
}

impl From<&CompStub> for PropertyDetailRecord {
    fn from(stub: &CompStub) -> Self {
        PropertyDetailRecord {
            id: stub.id,
            address: stub.address.clone(),
            bedrooms: stub.bedrooms,
            bathrooms: stub.bathrooms,
            living_square_feet: stub.living_square_feet,
            lot_square_feet: stub.lot_square_feet,
            year_built: stub.year_built,
            estimated_value: stub.estimated_value,
            last_sale_amount: stub.last_sale_amount,
            last_sale_date: stub.last_sale_date,
            photos: stub.photos.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_record_parses_string_encoded_fields() {
        let detail: PropertyDetailRecord = serde_json::from_value(json!({
            "id": "9876",
            "address": {"address": "12 Elm St", "city": "Austin", "state": "TX", "zip": "78701"},
            "livingSquareFeet": "2,000",
            "taxAmount": "0",
            "assessedValue": 0,
            "pool": "Y",
            "photos": ["a.jpg", "", null],
            "comps": [
                {"id": 1, "squareFeet": "1,850", "estimatedValue": "$410,000", "photos": ["c.jpg"],
                 "address": "14 Elm St, Austin, TX 78701"}
            ],
            "schools": null
        }))
        .unwrap();

        assert_eq!(detail.id, Some(9876));
        assert_eq!(detail.address_label().as_deref(), Some("12 Elm St, Austin, TX 78701"));
        assert_eq!(detail.living_square_feet, Some(2000.0));
        assert_eq!(detail.tax_amount, Some(0.0));
        assert_eq!(detail.pool, Some(true));
        assert_eq!(detail.photos, vec!["a.jpg"]);
        assert!(detail.schools.is_empty());

        let comp = &detail.comps[0];
        assert_eq!(comp.living_square_feet, Some(1850.0));
        assert_eq!(comp.estimated_value, Some(410_000.0));
        assert_eq!(comp.address_label().as_deref(), Some("14 Elm St, Austin, TX 78701"));
    }

    #[test]
    fn test_equity_falls_back_to_value_minus_mortgage() {
        let detail = PropertyDetailRecord {
            estimated_value: Some(500_000.0),
            mortgage_balance: Some(200_000.0),
            ..Default::default()
        };
        assert_eq!(detail.equity_amount(), Some(300_000.0));

        let reported = PropertyDetailRecord { equity: Some(1.0), ..detail };
        assert_eq!(reported.equity_amount(), Some(1.0));
    }

    #[test]
    fn test_comp_stub_converts_to_detail_view() {
        let stub = CompStub {
            id: Some(3),
            living_square_feet: Some(1500.0),
            photos: vec!["x.jpg".to_string()],
            ..Default::default()
        };
        let detail = PropertyDetailRecord::from(&stub);
        assert_eq!(detail.id, Some(3));
        assert_eq!(detail.living_square_feet, Some(1500.0));
        assert_eq!(detail.photos, vec!["x.jpg"]);
        assert!(detail.comps.is_empty());
    }
}
