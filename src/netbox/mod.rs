//! NetBox integration
//!
//! This module provides:
//! - Transport trait and reqwest-backed HTTP client for the NetBox REST API
//! - Query executor running the paginated, category-specific lookups

pub mod query;
pub mod transport;

pub use query::QueryExecutor;
pub use transport::{HttpTransport, NetboxTransport, SharedTransport};
