//! Metrics for the CMA engine
//!
//! Names follow the Prometheus conventions and are listed in [`MetricName`]
//! so call sites never spell them out by hand.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Analysis metrics
    AnalysesStarted,
    AnalysesCompleted,
    AnalysesFailed,
    AnalysisDuration,

    // Enrichment metrics
    EnrichmentBatchSize,
    EnrichmentLookupsSuccess,
    EnrichmentLookupsNotFound,
    EnrichmentLookupsError,
    EnrichmentLookupsTimeout,
    EnrichmentLookupsSkipped,
    EnrichmentCompsFiltered,

    // Source fetch metrics
    SourcesRequestsSuccess,
    SourcesRequestsError,
    SourcesRequestDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::AnalysesStarted => "cma_analyses_started_total",
            MetricName::AnalysesCompleted => "cma_analyses_completed_total",
            MetricName::AnalysesFailed => "cma_analyses_failed_total",
            MetricName::AnalysisDuration => "cma_analysis_duration_seconds",

            MetricName::EnrichmentBatchSize => "cma_enrichment_batch_size",
            MetricName::EnrichmentLookupsSuccess => "cma_enrichment_lookups_success_total",
            MetricName::EnrichmentLookupsNotFound => "cma_enrichment_lookups_not_found_total",
            MetricName::EnrichmentLookupsError => "cma_enrichment_lookups_error_total",
            MetricName::EnrichmentLookupsTimeout => "cma_enrichment_lookups_timeout_total",
            MetricName::EnrichmentLookupsSkipped => "cma_enrichment_lookups_skipped_total",
            MetricName::EnrichmentCompsFiltered => "cma_enrichment_comps_filtered_total",

            MetricName::SourcesRequestsSuccess => "cma_sources_requests_success_total",
            MetricName::SourcesRequestsError => "cma_sources_requests_error_total",
            MetricName::SourcesRequestDuration => "cma_sources_request_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus exposition text, when the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

// ============================================================================
// Analysis Metrics
// ============================================================================

pub mod analysis {
    use super::MetricName;

    pub fn started() {
        ::metrics::counter!(MetricName::AnalysesStarted.as_str()).increment(1);
    }

    pub fn completed(secs: f64) {
        ::metrics::counter!(MetricName::AnalysesCompleted.as_str()).increment(1);
        ::metrics::histogram!(MetricName::AnalysisDuration.as_str()).record(secs);
    }

    pub fn failed(reason: &str) {
        ::metrics::counter!(MetricName::AnalysesFailed.as_str(), "reason" => reason.to_string()).increment(1);
    }
}

// ============================================================================
// Enrichment Metrics
// ============================================================================

pub mod enrichment {
    use super::MetricName;

    pub fn batch_size(size: usize) {
        ::metrics::histogram!(MetricName::EnrichmentBatchSize.as_str()).record(size as f64);
    }

    pub fn lookup_succeeded() {
        ::metrics::counter!(MetricName::EnrichmentLookupsSuccess.as_str()).increment(1);
    }

    pub fn lookup_not_found() {
        ::metrics::counter!(MetricName::EnrichmentLookupsNotFound.as_str()).increment(1);
    }

    pub fn lookup_failed() {
        ::metrics::counter!(MetricName::EnrichmentLookupsError.as_str()).increment(1);
    }

    pub fn lookup_timed_out() {
        ::metrics::counter!(MetricName::EnrichmentLookupsTimeout.as_str()).increment(1);
    }

    pub fn lookup_skipped() {
        ::metrics::counter!(MetricName::EnrichmentLookupsSkipped.as_str()).increment(1);
    }

    pub fn comp_filtered() {
        ::metrics::counter!(MetricName::EnrichmentCompsFiltered.as_str()).increment(1);
    }
}

// ============================================================================
// Sources Metrics
// ============================================================================

pub mod sources {
    use super::MetricName;

    pub fn request_success(source: &'static str) {
        ::metrics::counter!(MetricName::SourcesRequestsSuccess.as_str(), "source" => source).increment(1);
    }

    pub fn request_error(source: &'static str) {
        ::metrics::counter!(MetricName::SourcesRequestsError.as_str(), "source" => source).increment(1);
    }

    pub fn request_duration(source: &'static str, secs: f64) {
        ::metrics::histogram!(MetricName::SourcesRequestDuration.as_str(), "source" => source).record(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed_and_unique() {
        let all = [
            MetricName::AnalysesStarted,
            MetricName::AnalysesCompleted,
            MetricName::AnalysesFailed,
            MetricName::AnalysisDuration,
            MetricName::EnrichmentBatchSize,
            MetricName::EnrichmentLookupsSuccess,
            MetricName::EnrichmentLookupsNotFound,
            MetricName::EnrichmentLookupsError,
            MetricName::EnrichmentLookupsTimeout,
            MetricName::EnrichmentLookupsSkipped,
            MetricName::EnrichmentCompsFiltered,
            MetricName::SourcesRequestsSuccess,
            MetricName::SourcesRequestsError,
            MetricName::SourcesRequestDuration,
        ];
        let names: std::collections::HashSet<&str> = all.iter().map(MetricName::as_str).collect();
        assert_eq!(names.len(), all.len());
        assert!(names.iter().all(|n| n.starts_with("cma_")));
    }

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        analysis::started();
        enrichment::lookup_failed();
        sources::request_duration("mls", 0.25);
    }
}
