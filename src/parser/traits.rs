//! Parser trait definition

use std::path::Path;

#[cfg(test)]
use mockall::automock;

use crate::parser::types::PackageRecord;

/// Packages read from one metadata file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub packages: Vec<PackageRecord>,
    /// Number of malformed records that were skipped
    pub skipped: usize,
}

/// Trait for turning a source's metadata file into package records
#[cfg_attr(test, automock)]
pub trait MetadataParser: Send + Sync {
    /// Parse the metadata file at `path`, tagging every record with `source_id`
    fn parse(&self, path: &Path, source_id: &str) -> Result<ParseOutcome, ParseError>;
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to open or read the metadata file
    #[error("Failed to read metadata: {0}")]
    Io(#[from] std::io::Error),

    /// The file is neither text nor a supported compressed stream
    #[error("Unsupported metadata format: {0}")]
    UnsupportedFormat(String),
}
