//! CMA pipeline: normalize the subject, enrich and normalize its comparables,
//! then compare and summarize.

pub mod processing;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::app::ports::MlsLookupPort;
use crate::config::Config;
use crate::domain::UnifiedProperty;
use crate::error::{CmaError, Result};
use crate::observability::metrics;
use processing::compare::{build_comparison_table, ClassifyOptions, ComparisonRow};
use processing::enrich::{CompEnricher, EnrichmentStats};
use processing::normalize::{DefaultNormalizer, Normalizer};
use processing::scoring::Scorer;
use processing::summary::{summarize, MarketSummary};

use crate::types::{CompStub, MlsRecord, PropertyDetailRecord};

/// Result of one analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmaReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub subject: UnifiedProperty,
    /// The subject first, then every retained comparable in stub order
    pub comparables: Vec<UnifiedProperty>,
    /// One row per comparable, subject excluded
    pub comparison: Vec<ComparisonRow>,
    pub summary: MarketSummary,
    pub enrichment: EnrichmentStats,
}

impl CmaReport {
    /// Comparables without the leading subject
    pub fn comps(&self) -> &[UnifiedProperty] {
        self.comparables.get(1..).unwrap_or(&[])
    }
}

pub struct CmaPipeline {
    normalizer: Arc<dyn Normalizer>,
    enricher: CompEnricher,
    classify_options: ClassifyOptions,
}

impl CmaPipeline {
    pub fn new(normalizer: Arc<dyn Normalizer>, enricher: CompEnricher, classify_options: ClassifyOptions) -> Self {
        Self {
            normalizer,
            enricher,
            classify_options,
        }
    }

    /// Pipeline wired from configuration with the default normalizer
    pub fn from_config(config: &Config, mls: Arc<dyn MlsLookupPort>) -> Self {
        let normalizer = DefaultNormalizer::new(Scorer::new(config.scoring.clone()))
            .with_placeholder_image(config.presentation.placeholder_image.clone());
        let enricher = CompEnricher::new(mls, Duration::from_millis(config.enrichment.lookup_timeout_ms));
        Self::new(
            Arc::new(normalizer),
            enricher,
            ClassifyOptions {
                score_price_per_sqft: config.presentation.score_price_per_sqft,
            },
        )
    }

    /// The subject needs an id or an address to anchor the analysis
    fn validate_subject(detail: Option<&PropertyDetailRecord>) -> Result<&PropertyDetailRecord> {
        let detail = detail.ok_or_else(|| CmaError::MissingSubject("no property detail record".to_string()))?;
        if detail.id.is_none() && detail.address_label().is_none() {
            return Err(CmaError::MalformedSubject(
                "record has neither an id nor an address".to_string(),
            ));
        }
        Ok(detail)
    }

    /// Build the full comparison set. Fails only when the subject record is
    /// missing or unusable; comparable-level problems are absorbed.
    pub async fn build_cma(
        &self,
        subject_detail: Option<&PropertyDetailRecord>,
        subject_mls: Option<&MlsRecord>,
        comp_stubs: &[CompStub],
    ) -> Result<CmaReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", %run_id);

        async move {
            let started = Instant::now();
            metrics::analysis::started();

            let detail = match Self::validate_subject(subject_detail) {
                Ok(detail) => detail,
                Err(e) => {
                    metrics::analysis::failed("invalid_subject");
                    return Err(e);
                }
            };

            let subject = self.normalizer.normalize(Some(detail), subject_mls);
            info!(
                subject_id = subject.id,
                address = %subject.address,
                comp_stubs = comp_stubs.len(),
                "Building comparative market analysis"
            );

            let (comps, enrichment) = self.enricher.enrich(comp_stubs, self.normalizer.as_ref()).await;

            let comparison = build_comparison_table(&subject, &comps, self.classify_options);
            let summary = summarize(&subject, &comps);

            let mut comparables = Vec::with_capacity(comps.len() + 1);
            comparables.push(subject.clone());
            comparables.extend(comps);

            metrics::analysis::completed(started.elapsed().as_secs_f64());
            info!(comparables = comparables.len() - 1, "Analysis complete");

            Ok(CmaReport {
                run_id,
                generated_at: Utc::now(),
                subject,
                comparables,
                comparison,
                summary,
                enrichment,
            })
        }
        .instrument(span)
        .await
    }
}
