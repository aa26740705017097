use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::ports::{MlsLookupPort, PropertyKey};
use crate::domain::UnifiedProperty;
use crate::observability::metrics;
use crate::pipeline::processing::normalize::Normalizer;
use crate::types::{CompStub, MlsRecord, PropertyDetailRecord};

/// Counters describing one enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStats {
    /// Comp stubs received from the subject's record
    pub requested: usize,
    /// Stubs dropped because an earlier stub had the same (id, address)
    pub duplicates_skipped: usize,
    /// Stubs without an address, so no MLS lookup was possible
    pub lookups_skipped: usize,
    pub enriched_with_mls: usize,
    /// Lookups that returned no listing
    pub not_found: usize,
    pub lookups_failed: usize,
    pub lookups_timed_out: usize,
    /// Comps dropped because neither source had a photo
    pub filtered_no_photos: usize,
    /// Comps in the final set
    pub retained: usize,
}

/// What happened to one comp's MLS lookup
#[derive(Debug)]
enum LookupOutcome {
    Found(MlsRecord),
    NotFound,
    Failed(String),
    TimedOut,
    Skipped,
}

impl LookupOutcome {
    fn into_record(self) -> Option<MlsRecord> {
        match self {
            LookupOutcome::Found(record) => Some(record),
            _ => None,
        }
    }
}

/// Dedup key for a comp stub. Stubs with neither an id nor an address
/// cannot be matched to each other and are always kept.
fn comp_key(stub: &CompStub) -> Option<(Option<i64>, Option<String>)> {
    let address = stub.address_label().map(|a| a.to_lowercase());
    if stub.id.is_none() && address.is_none() {
        return None;
    }
    Some((stub.id, address))
}

/// Fans out one MLS lookup per comparable, absorbs individual failures, and
/// normalizes each comp. The output keeps the stubs' order.
pub struct CompEnricher {
    mls: Arc<dyn MlsLookupPort>,
    lookup_timeout: Duration,
}

impl CompEnricher {
    pub fn new(mls: Arc<dyn MlsLookupPort>, lookup_timeout: Duration) -> Self {
        Self { mls, lookup_timeout }
    }

    /// First occurrence of each (id, address), in input order
    fn unique_stubs<'a>(stubs: &'a [CompStub], stats: &mut EnrichmentStats) -> Vec<&'a CompStub> {
        let mut seen = HashSet::new();
        stubs
            .iter()
            .filter(|stub| match comp_key(stub) {
                Some(key) => {
                    let first = seen.insert(key);
                    if !first {
                        stats.duplicates_skipped += 1;
                        debug!(comp_id = ?stub.id, "Skipping duplicate comp");
                    }
                    first
                }
                None => true,
            })
            .collect()
    }

    async fn lookup(&self, stub: &CompStub) -> LookupOutcome {
        let address = match stub.address_label() {
            Some(address) => address,
            None => return LookupOutcome::Skipped,
        };
        let key = PropertyKey::Address(address);

        match tokio::time::timeout(self.lookup_timeout, self.mls.fetch_mls_detail(&key)).await {
            Ok(Ok(Some(record))) => LookupOutcome::Found(record),
            Ok(Ok(None)) => LookupOutcome::NotFound,
            Ok(Err(e)) => LookupOutcome::Failed(e.to_string()),
            Err(_) => LookupOutcome::TimedOut,
        }
    }

    /// Look up, merge and photo-filter every comp. Never fails: a comp whose
    /// lookup errors or times out is normalized from its stub alone.
    pub async fn enrich(
        &self,
        stubs: &[CompStub],
        normalizer: &dyn Normalizer,
    ) -> (Vec<UnifiedProperty>, EnrichmentStats) {
        let mut stats = EnrichmentStats {
            requested: stubs.len(),
            ..Default::default()
        };

        let unique = Self::unique_stubs(stubs, &mut stats);
        metrics::enrichment::batch_size(unique.len());

        // join_all yields results in input order, so slot i belongs to unique[i]
        // whatever order the lookups finish in.
        let outcomes = join_all(unique.iter().map(|stub| self.lookup(stub))).await;

        let mut comps = Vec::with_capacity(unique.len());
        for (stub, outcome) in unique.into_iter().zip(outcomes) {
            match &outcome {
                LookupOutcome::Found(_) => {
                    stats.enriched_with_mls += 1;
                    metrics::enrichment::lookup_succeeded();
                }
                LookupOutcome::NotFound => {
                    stats.not_found += 1;
                    metrics::enrichment::lookup_not_found();
                }
                LookupOutcome::Failed(error) => {
                    stats.lookups_failed += 1;
                    metrics::enrichment::lookup_failed();
                    warn!(comp_id = ?stub.id, error = %error, "MLS lookup failed; using public records only");
                }
                LookupOutcome::TimedOut => {
                    stats.lookups_timed_out += 1;
                    metrics::enrichment::lookup_timed_out();
                    warn!(
                        comp_id = ?stub.id,
                        timeout_ms = self.lookup_timeout.as_millis() as u64,
                        "MLS lookup timed out; using public records only"
                    );
                }
                LookupOutcome::Skipped => {
                    stats.lookups_skipped += 1;
                    metrics::enrichment::lookup_skipped();
                }
            }

            let mls = outcome.into_record();
            let has_photo = mls
                .as_ref()
                .and_then(MlsRecord::primary_image)
                .map(|url| !url.trim().is_empty())
                .unwrap_or(false)
                || mls.as_ref().map(|m| m.photo_urls().next().is_some()).unwrap_or(false)
                || stub.photos.iter().any(|p| !p.trim().is_empty());

            if !has_photo {
                stats.filtered_no_photos += 1;
                metrics::enrichment::comp_filtered();
                debug!(comp_id = ?stub.id, "Dropping comp without photos");
                continue;
            }

            let detail = PropertyDetailRecord::from(stub);
            comps.push(normalizer.normalize(Some(&detail), mls.as_ref()));
        }

        stats.retained = comps.len();
        info!(
            requested = stats.requested,
            retained = stats.retained,
            enriched = stats.enriched_with_mls,
            failed = stats.lookups_failed + stats.lookups_timed_out,
            "Comparable enrichment complete"
        );

        (comps, stats)
    }
}
