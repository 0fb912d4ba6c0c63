//! Store trait definition

#[cfg(test)]
use mockall::automock;

use crate::error::CacheError;
use crate::parser::PackageRecord;

/// How a package name (or summary) is matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Equality
    Exact(String),
    /// SQL `LIKE` pattern using `\` as escape character
    Like(String),
}

/// Filter applied when reading one source's packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFilter {
    pub name: NameMatch,
    /// Also match against the summary
    pub search_summary: bool,
}

/// Freshness bookkeeping for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessEntry {
    pub source_id: String,
    /// mtime of the metadata file at the last committed repopulation, 0 if never
    pub stored_mtime: i64,
    /// When the last repopulation committed (ms since UNIX epoch)
    pub refreshed_at: Option<i64>,
    pub package_count: i64,
}

/// Trait for the persisted per-source package store
#[cfg_attr(test, automock)]
pub trait PackageStore: Send + Sync + 'static {
    /// Create the freshness entry (stored mtime 0) if it does not exist yet
    /// and return the stored mtime
    fn register_source(&self, source_id: &str) -> Result<i64, CacheError>;

    /// Freshness entry of a source, if the source has been seen
    fn freshness(&self, source_id: &str) -> Result<Option<FreshnessEntry>, CacheError>;

    /// All freshness entries
    fn freshness_entries(&self) -> Result<Vec<FreshnessEntry>, CacheError>;

    /// Atomically replace a source's packages and record `mtime` as stored
    fn replace_packages(
        &self,
        source_id: &str,
        packages: &[PackageRecord],
        mtime: i64,
    ) -> Result<(), CacheError>;

    /// Packages of one source matching `filter`, ordered by name
    fn find_packages(
        &self,
        source_id: &str,
        filter: &PackageFilter,
    ) -> Result<Vec<PackageRecord>, CacheError>;

    /// Drop a source's packages and freshness entry
    fn forget_source(&self, source_id: &str) -> Result<(), CacheError>;
}
