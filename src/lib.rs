//! NetBox enrichment engine
//!
//! Enriches records by looking up an IP address in NetBox and attaching the
//! normalized, column-oriented result:
//! - [`lookup`]: the closed set of lookup categories
//! - [`netbox`]: API transport and the paginated, category-specific queries
//! - [`normalize`]: pruning of empty values and per-field aggregation
//! - [`cache`]: two-level TTL/LRU cache with single-flight fills
//! - [`publish`]: writing results into records with relative URLs
//! - [`enrichment`]: the service tying it together per record

pub mod cache;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod gate;
pub mod lookup;
pub mod netbox;
pub mod normalize;
pub mod publish;
pub mod record;

pub use cache::{CachedResult, LookupCache};
pub use config::{EnrichConfig, EnrichSettings};
pub use enrichment::{EnrichOutcome, NetboxEnrichmentService};
pub use error::{ConfigError, EnrichError, Result, TransportError};
pub use gate::EnrichmentGate;
pub use lookup::LookupType;
pub use netbox::{HttpTransport, NetboxTransport, QueryExecutor, SharedTransport};
pub use normalize::{collect_values, crush, name_or_display, AggregatedResult, ExtractedRecord};
pub use publish::ResultPublisher;
pub use record::{FieldPath, Record};
