//! NetBox Enrichment Service
//!
//! Orchestrates the enrichment of records with NetBox data: gate check,
//! key extraction, cached lookup and publication of the result.

use std::sync::Arc;

use crate::cache::{CachedResult, LookupCache};
use crate::config::{EnrichConfig, EnrichSettings};
use crate::error::Result;
use crate::gate::EnrichmentGate;
use crate::lookup::LookupType;
use crate::netbox::{HttpTransport, QueryExecutor, SharedTransport};
use crate::normalize::{collect_values, crush_records};
use crate::publish::ResultPublisher;
use crate::record::{lookup_key, FieldPath, Record};

/// What happened to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// The process-wide gate is off
    Disabled,
    /// Missing source, target, lookup type or key
    Skipped,
    /// The lookup found nothing to write
    NoResult,
    Enriched,
}

/// Where to read keys, what to look up and where to write results
struct Binding {
    source: FieldPath,
    lookup_type: LookupType,
    publisher: ResultPublisher,
}

pub struct NetboxEnrichmentService {
    gate: EnrichmentGate,
    binding: Option<Binding>,
    cache: LookupCache,
    executor: QueryExecutor,
}

impl NetboxEnrichmentService {
    /// Build from raw options, talking HTTP to NetBox; the gate is read
    /// from the process environment
    pub fn new(config: &EnrichConfig) -> Result<Self> {
        let settings = config.resolve()?;
        let transport = HttpTransport::new(
            settings.netbox_url.clone(),
            settings.netbox_token.clone(),
        )?;
        Ok(Self::with_transport(
            &settings,
            EnrichmentGate::from_env(),
            Arc::new(transport),
        ))
    }

    pub fn with_transport(
        settings: &EnrichSettings,
        gate: EnrichmentGate,
        transport: SharedTransport,
    ) -> Self {
        let binding = match (&settings.source, settings.lookup_type, &settings.target) {
            (Some(source), Some(lookup_type), Some(target)) => Some(Binding {
                source: source.clone(),
                lookup_type,
                publisher: ResultPublisher::new(target.clone(), settings.url_base.clone()),
            }),
            _ => {
                tracing::info!("source, target or lookup_type not configured, enrichment skipped");
                None
            }
        };

        if !gate.is_enabled() {
            tracing::info!("NetBox enrichment disabled by environment");
        }

        Self {
            gate,
            binding,
            cache: LookupCache::from_settings(settings),
            executor: QueryExecutor::from_settings(transport, settings),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled() && self.binding.is_some()
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    /// Enrich one record in place
    pub async fn enrich(&self, record: &mut impl Record) -> Result<EnrichOutcome> {
        if !self.gate.is_enabled() {
            return Ok(EnrichOutcome::Disabled);
        }
        let Some(binding) = &self.binding else {
            return Ok(EnrichOutcome::Skipped);
        };
        let Some(key) = lookup_key(&*record, &binding.source).map(str::to_string) else {
            return Ok(EnrichOutcome::Skipped);
        };

        let result = self.lookup(binding.lookup_type, &key).await?;
        if binding.publisher.publish(result.as_deref(), record) {
            tracing::trace!(lookup_type = %binding.lookup_type, key = %key, "Record enriched");
            Ok(EnrichOutcome::Enriched)
        } else {
            Ok(EnrichOutcome::NoResult)
        }
    }

    /// Cached lookup of `key`, querying NetBox on a miss
    pub async fn lookup(&self, lookup_type: LookupType, key: &str) -> Result<CachedResult> {
        self.cache
            .get_or_compute(lookup_type, key, || async {
                let Some(records) = self.executor.fetch(lookup_type, key).await? else {
                    return Ok(None);
                };
                let aggregated = collect_values(crush_records(records));
                tracing::debug!(
                    lookup_type = %lookup_type,
                    key,
                    fields = aggregated.len(),
                    "NetBox lookup complete"
                );
                Ok(Some(Arc::new(aggregated)))
            })
            .await
    }
}
