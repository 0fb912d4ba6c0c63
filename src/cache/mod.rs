//! Persisted package cache
//!
//! # Modules
//!
//! - [`store`]: SQLite store holding every source's packages and freshness
//! - [`traits`]: `PackageStore` trait and filter types
//! - [`refresh`]: staleness detection and (parallel) repopulation

pub mod refresh;
pub mod store;
pub mod traits;

pub use refresh::{RefreshOutcome, SourceRefresh, ensure_fresh, refresh_sources};
pub use store::Cache;
pub use traits::{FreshnessEntry, NameMatch, PackageFilter, PackageStore};
