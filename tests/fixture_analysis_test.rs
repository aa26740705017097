use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tempfile::tempdir;

use cma_engine::app::ports::PropertyKey;
use cma_engine::domain::{Metric, ZipTrend};
use cma_engine::infra::FixtureStore;
use cma_engine::pipeline::processing::compare::Verdict;
use cma_engine::{AnalyzeUseCase, Config};

fn write_json(dir: &Path, relative: &str, value: serde_json::Value) -> Result<()> {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn seed_fixtures(dir: &Path) -> Result<()> {
    write_json(
        dir,
        "detail.json",
        json!({
            "data": {
                "id": "100",
                "address": { "label": "100 Main St, Austin, TX 78701" },
                "propertyType": "SFR",
                "bedrooms": 3,
                "bathrooms": "2.5",
                "livingSquareFeet": "2,000",
                "lotSquareFeet": 8000,
                "yearBuilt": 1995,
                "estimatedValue": "$480,000",
                "taxAmount": "9,600",
                "assessedValue": "480000",
                "ownerOccupied": "Y",
                "schools": [{ "name": "Lamar", "rating": 9 }],
                "comps": [
                    { "id": 201, "address": "201 Elm St, Austin, TX 78701", "squareFeet": 1800 },
                    { "id": 202, "address": "202 Pine St, Austin, TX 78701", "squareFeet": 2200, "photos": ["pine.jpg"] },
                    { "id": 201, "address": "201 Elm St, Austin, TX 78701", "squareFeet": 1800 },
                    { "id": 203, "address": "203 Ash St, Austin, TX 78701" }
                ]
            }
        }),
    )?;

    write_json(
        dir,
        "mls/100-main-st-austin-tx-78701.json",
        json!({
            "listPrice": 500000,
            "daysOnMarket": 20,
            "standardStatus": "Active",
            "livingArea": 2000,
            "media": { "photosList": [{ "highRes": "subject-hi.jpg", "lowRes": "subject-lo.jpg" }] },
            "priceChanges": [
                { "date": "2024-03-01", "price": 500000, "changeAmount": -20000, "direction": "down" }
            ]
        }),
    )?;

    write_json(
        dir,
        "mls/201-elm-st-austin-tx-78701.json",
        json!({
            "data": {
                "listPrice": "$450,000",
                "closePrice": 440000,
                "daysOnMarket": 10,
                "standardStatus": "Closed",
                "listingDate": "2024-01-01",
                "closeDate": "2024-01-31",
                "media": { "primaryListingImageUrl": "elm.jpg" }
            }
        }),
    )?;
    Ok(())
}

#[tokio::test]
async fn test_fixture_directory_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    seed_fixtures(dir.path())?;

    let store = Arc::new(FixtureStore::new(dir.path()));
    let use_case = AnalyzeUseCase::from_config(&Config::default(), store.clone(), store);
    let report = use_case.analyze(&PropertyKey::Address(String::new())).await?;

    let subject = &report.subject;
    assert_eq!(subject.id, 100);
    assert!(subject.has_mls);
    assert_eq!(subject.price, "$500,000");
    assert_eq!(subject.image, "subject-hi.jpg");
    assert_eq!(subject.price_per_sqft, Some(250.0));
    assert_eq!(subject.percent_of_asking, Some(104));
    assert_eq!(subject.scores.tax_rate, 2.0);
    assert_eq!(subject.scores.school_rating, 9.0);
    assert_eq!(subject.scores.zip_trend, ZipTrend::Down);

    // Duplicate 201 collapses; 203 has no listing and no photo
    let ids: Vec<i64> = report.comps().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![201, 202]);
    assert_eq!(report.enrichment.duplicates_skipped, 1);
    assert_eq!(report.enrichment.filtered_no_photos, 1);

    let elm = &report.comps()[0];
    assert_eq!(elm.image, "elm.jpg");
    assert_eq!(elm.days_to_sale, Some(30));

    let pine = &report.comps()[1];
    assert!(!pine.has_mls);
    assert_eq!(pine.image, "pine.jpg");

    let elm_row = &report.comparison[0];
    let dom = elm_row.cell(Metric::DaysOnMarket).expect("days on market cell");
    assert_eq!(dom.verdict, Verdict::Better);
    assert_eq!(dom.delta, "-50.0%");
    Ok(())
}

#[tokio::test]
async fn test_empty_fixture_directory_is_fatal() -> Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(FixtureStore::new(dir.path()));
    let use_case = AnalyzeUseCase::from_config(&Config::default(), store.clone(), store);

    let result = use_case.analyze(&PropertyKey::Address("nowhere".to_string())).await;
    assert!(result.is_err());
    Ok(())
}
