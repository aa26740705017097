use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::app::ports::{MlsLookupPort, PropertyDetailPort, PropertyKey};
use crate::error::{CmaError, Result};
use crate::types::{MlsRecord, PropertyDetailRecord};

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// File name stem for a lookup key: `"12 Oak St, Austin"` becomes `12-oak-st-austin`
pub fn slug(key: &PropertyKey) -> String {
    match key {
        PropertyKey::Address(address) => NON_SLUG
            .replace_all(&address.to_lowercase(), "-")
            .trim_matches('-')
            .to_string(),
        PropertyKey::Id(id) => format!("id-{}", id),
    }
}

/// Offline adapter over a directory of captured API responses:
///
/// ```text
/// <dir>/detail.json            default subject detail
/// <dir>/detail/<slug>.json     subject detail per key
/// <dir>/mls/<slug>.json        MLS listing per key (missing file = no listing)
/// ```
///
/// Files hold either the bare record or the `{"data": ...}` envelope.
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "Reading fixture");
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let record = match value {
            serde_json::Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or_default(),
            other => other,
        };
        if record.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(record)?))
    }
}

#[async_trait]
impl PropertyDetailPort for FixtureStore {
    async fn fetch_property_detail(&self, key: &PropertyKey) -> Result<PropertyDetailRecord> {
        let keyed = self.dir.join("detail").join(format!("{}.json", slug(key)));
        if let Some(record) = Self::read_record(&keyed)? {
            return Ok(record);
        }
        Self::read_record(&self.dir.join("detail.json"))?.ok_or_else(|| {
            CmaError::MissingSubject(format!("no detail fixture for {} in {}", key, self.dir.display()))
        })
    }
}

#[async_trait]
impl MlsLookupPort for FixtureStore {
    async fn fetch_mls_detail(&self, key: &PropertyKey) -> Result<Option<MlsRecord>> {
        Self::read_record(&self.dir.join("mls").join(format!("{}.json", slug(key))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug(&PropertyKey::Address("12 Oak St, Austin, TX 78701".to_string())), "12-oak-st-austin-tx-78701");
        assert_eq!(slug(&PropertyKey::Address("  #4 ".to_string())), "4");
        assert_eq!(slug(&PropertyKey::Id(99)), "id-99");
    }

    #[tokio::test]
    async fn test_detail_prefers_keyed_file_then_default() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "detail.json", r#"{"id": 1}"#);
        write(dir.path(), "detail/id-2.json", r#"{"data": {"id": 2}}"#);
        let store = FixtureStore::new(dir.path());

        let keyed = store.fetch_property_detail(&PropertyKey::Id(2)).await.unwrap();
        assert_eq!(keyed.id, Some(2));
        let fallback = store.fetch_property_detail(&PropertyKey::Id(3)).await.unwrap();
        assert_eq!(fallback.id, Some(1));
    }

    #[tokio::test]
    async fn test_missing_detail_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path());
        let result = store.fetch_property_detail(&PropertyKey::Id(1)).await;
        assert!(matches!(result, Err(CmaError::MissingSubject(_))));
    }

    #[tokio::test]
    async fn test_mls_lookup() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "mls/1-main-st.json", r#"{"listPrice": "$450,000", "daysOnMarket": 12}"#);
        write(dir.path(), "mls/2-main-st.json", r#"{"data": null}"#);
        write(dir.path(), "mls/3-main-st.json", "not json");
        let store = FixtureStore::new(dir.path());

        let found = store
            .fetch_mls_detail(&PropertyKey::Address("1 Main St".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.list_price, Some(450_000.0));
        assert_eq!(found.days_on_market, Some(12.0));

        for absent in ["2 Main St", "9 Main St"] {
            let result = store.fetch_mls_detail(&PropertyKey::Address(absent.to_string())).await;
            assert!(result.unwrap().is_none());
        }

        let broken = store.fetch_mls_detail(&PropertyKey::Address("3 Main St".to_string())).await;
        assert!(matches!(broken, Err(CmaError::Json(_))));
    }
}
