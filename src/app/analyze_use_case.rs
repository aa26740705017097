use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::ports::{MlsLookupPort, PropertyDetailPort, PropertyKey};
use crate::config::Config;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::{CmaPipeline, CmaReport};
use crate::types::MlsRecord;

/// Use case for running a full analysis of one subject property
pub struct AnalyzeUseCase {
    detail_port: Arc<dyn PropertyDetailPort>,
    mls_port: Arc<dyn MlsLookupPort>,
    pipeline: CmaPipeline,
    /// Bound on the subject's MLS lookup, shared with the comp lookups
    lookup_timeout: Duration,
}

impl AnalyzeUseCase {
    pub fn new(
        detail_port: Arc<dyn PropertyDetailPort>,
        mls_port: Arc<dyn MlsLookupPort>,
        pipeline: CmaPipeline,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            detail_port,
            mls_port,
            pipeline,
            lookup_timeout,
        }
    }

    /// Create a use case whose pipeline is wired from configuration
    pub fn from_config(
        config: &Config,
        detail_port: Arc<dyn PropertyDetailPort>,
        mls_port: Arc<dyn MlsLookupPort>,
    ) -> Self {
        let pipeline = CmaPipeline::from_config(config, mls_port.clone());
        let lookup_timeout = Duration::from_millis(config.enrichment.lookup_timeout_ms);
        Self::new(detail_port, mls_port, pipeline, lookup_timeout)
    }

    /// Fetch the subject and its comparables, then build the report.
    /// Only a failed subject detail fetch aborts the analysis.
    pub async fn analyze(&self, key: &PropertyKey) -> Result<CmaReport> {
        info!(subject = %key, "Fetching subject property detail");
        let detail = match self.detail_port.fetch_property_detail(key).await {
            Ok(detail) => detail,
            Err(e) => {
                metrics::analysis::failed("subject_fetch");
                return Err(e);
            }
        };

        let mls_key = detail
            .address_label()
            .map(PropertyKey::Address)
            .unwrap_or_else(|| key.clone());
        let subject_mls = self.fetch_subject_listing(&mls_key).await;

        self.pipeline
            .build_cma(Some(&detail), subject_mls.as_ref(), &detail.comps)
            .await
    }

    async fn fetch_subject_listing(&self, key: &PropertyKey) -> Option<MlsRecord> {
        match tokio::time::timeout(self.lookup_timeout, self.mls_port.fetch_mls_detail(key)).await {
            Ok(Ok(Some(record))) => Some(record),
            Ok(Ok(None)) => {
                info!(subject = %key, "No MLS listing for subject");
                None
            }
            Ok(Err(e)) => {
                warn!(subject = %key, error = %e, "Subject MLS lookup failed, continuing without listing data");
                None
            }
            Err(_) => {
                warn!(
                    subject = %key,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Subject MLS lookup timed out, continuing without listing data"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CmaError;
    use crate::types::{AddressValue, CompStub, MlsMedia, PropertyDetailRecord};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticDetail(Option<PropertyDetailRecord>);

    #[async_trait]
    impl PropertyDetailPort for StaticDetail {
        async fn fetch_property_detail(&self, key: &PropertyKey) -> Result<PropertyDetailRecord> {
            self.0
                .clone()
                .ok_or_else(|| CmaError::fetch("property_detail", format!("no record for {}", key)))
        }
    }

    #[derive(Default)]
    struct RecordingMls {
        keys: Mutex<Vec<PropertyKey>>,
        fail: bool,
        hang: bool,
    }

    #[async_trait]
    impl MlsLookupPort for RecordingMls {
        async fn fetch_mls_detail(&self, key: &PropertyKey) -> Result<Option<MlsRecord>> {
            self.keys.lock().unwrap().push(key.clone());
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(CmaError::fetch("mls", "service unavailable"));
            }
            Ok(Some(MlsRecord {
                list_price: Some(500_000.0),
                media: MlsMedia {
                    primary_listing_image_url: Some("https://img/primary.jpg".to_string()),
                    photos_list: Vec::new(),
                },
                ..Default::default()
            }))
        }
    }

    fn subject() -> PropertyDetailRecord {
        PropertyDetailRecord {
            id: Some(7),
            address: Some(AddressValue::Label("7 Elm St".to_string())),
            living_square_feet: Some(2000.0),
            comps: vec![CompStub {
                id: Some(8),
                address: Some(AddressValue::Label("8 Elm St".to_string())),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn use_case(detail: Option<PropertyDetailRecord>, mls: Arc<RecordingMls>) -> AnalyzeUseCase {
        AnalyzeUseCase::from_config(&Config::default(), Arc::new(StaticDetail(detail)), mls)
    }

    #[tokio::test]
    async fn test_analyze_merges_subject_listing_and_enriches_comps() {
        let mls = Arc::new(RecordingMls::default());
        let report = use_case(Some(subject()), mls.clone())
            .analyze(&PropertyKey::Id(7))
            .await
            .unwrap();

        assert!(report.subject.has_mls);
        assert_eq!(report.subject.price, "$500,000");
        assert_eq!(report.comparables.len(), 2);
        assert_eq!(report.comps()[0].id, 8);

        let keys = mls.keys.lock().unwrap();
        assert_eq!(keys[0], PropertyKey::Address("7 Elm St".to_string()));
        assert!(keys.contains(&PropertyKey::Address("8 Elm St".to_string())));
    }

    #[tokio::test]
    async fn test_subject_fetch_failure_is_fatal() {
        let mls = Arc::new(RecordingMls::default());
        let result = use_case(None, mls.clone()).analyze(&PropertyKey::Id(7)).await;
        assert!(matches!(result, Err(CmaError::Fetch { .. })));
        assert!(mls.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subject_listing_failure_is_absorbed() {
        let mls = Arc::new(RecordingMls {
            fail: true,
            ..Default::default()
        });
        let report = use_case(Some(subject()), mls).analyze(&PropertyKey::Id(7)).await.unwrap();
        assert!(!report.subject.has_mls);
        // The comp has no photos and no listing, so it is filtered out
        assert!(report.comps().is_empty());
        assert_eq!(report.enrichment.lookups_failed, 1);
    }

    #[tokio::test]
    async fn test_hanging_subject_listing_times_out() {
        let mls = Arc::new(RecordingMls {
            hang: true,
            ..Default::default()
        });
        let mut config = Config::default();
        config.enrichment.lookup_timeout_ms = 50;
        let use_case = AnalyzeUseCase::from_config(&config, Arc::new(StaticDetail(Some(subject()))), mls.clone());

        let report = tokio::time::timeout(Duration::from_secs(5), use_case.analyze(&PropertyKey::Id(7)))
            .await
            .expect("analysis should not wait on a hanging listing")
            .unwrap();

        assert!(!report.subject.has_mls);
        assert_eq!(report.subject.id, 7);
        assert_eq!(report.enrichment.lookups_timed_out, 1);
        assert_eq!(mls.keys.lock().unwrap().len(), 2);
    }
}
