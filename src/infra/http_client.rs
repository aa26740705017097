use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::app::ports::{MlsLookupPort, PropertyDetailPort, PropertyKey};
use crate::config::ApiConfig;
use crate::constants::{SOURCE_MLS, SOURCE_PROPERTY_DETAIL};
use crate::error::{CmaError, Result};
use crate::observability::metrics;
use crate::types::{MlsRecord, PropertyDetailRecord};

const API_KEY_HEADER: &str = "x-api-key";

/// Responses are wrapped as `{"data": ...}`; `data` may be null
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// REST adapter for both upstream feeds
pub struct RestPropertyApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestPropertyApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request_body(key: &PropertyKey) -> serde_json::Value {
        match key {
            PropertyKey::Address(address) => json!({ "address": address }),
            PropertyKey::Id(id) => json!({ "id": id }),
        }
    }

    /// POST the key to `path`. A 404 or a null `data` yields `Ok(None)`.
    async fn post<T: DeserializeOwned>(&self, source: &'static str, path: &str, key: &PropertyKey) -> Result<Option<T>> {
        let url = format!("{}/{}", self.base_url, path);
        let started = Instant::now();
        debug!(source, url = %url, key = %key, "Sending lookup request");

        let mut request = self.client.post(&url).json(&Self::request_body(key));
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let result = self.send::<T>(source, request).await;
        metrics::sources::request_duration(source, started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => metrics::sources::request_success(source),
            Err(_) => metrics::sources::request_error(source),
        }
        result
    }

    async fn send<T: DeserializeOwned>(&self, source: &'static str, request: reqwest::RequestBuilder) -> Result<Option<T>> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CmaError::fetch(source, format!("HTTP {}: {}", status, body)));
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl PropertyDetailPort for RestPropertyApi {
    async fn fetch_property_detail(&self, key: &PropertyKey) -> Result<PropertyDetailRecord> {
        self.post(SOURCE_PROPERTY_DETAIL, "property-detail", key)
            .await?
            .ok_or_else(|| CmaError::MissingSubject(format!("no property detail for {}", key)))
    }
}

#[async_trait]
impl MlsLookupPort for RestPropertyApi {
    async fn fetch_mls_detail(&self, key: &PropertyKey) -> Result<Option<MlsRecord>> {
        self.post(SOURCE_MLS, "mls-detail", key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_by_key() {
        assert_eq!(
            RestPropertyApi::request_body(&PropertyKey::Address("1 Main St".to_string())),
            json!({ "address": "1 Main St" })
        );
        assert_eq!(RestPropertyApi::request_body(&PropertyKey::Id(42)), json!({ "id": 42 }));
    }

    #[test]
    fn test_envelope_with_null_and_missing_data() {
        let null: Envelope<MlsRecord> = serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert!(null.data.is_none());
        let missing: Envelope<MlsRecord> = serde_json::from_str("{}").unwrap();
        assert!(missing.data.is_none());

        let present: Envelope<PropertyDetailRecord> =
            serde_json::from_str(r#"{"data": {"id": "17", "livingSquareFeet": "1,850"}}"#).unwrap();
        let detail = present.data.unwrap();
        assert_eq!(detail.id, Some(17));
        assert_eq!(detail.living_square_feet, Some(1850.0));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let api = RestPropertyApi::new(&ApiConfig {
            base_url: "http://localhost:9/api/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(api.base_url, "http://localhost:9/api");
        assert!(api.api_key.is_none());
    }
}
