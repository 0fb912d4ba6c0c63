use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Metadata file missing for source {0}")]
    SourceFileMissing(String),

    #[error("Failed to parse metadata: {0}")]
    Parse(#[from] ParseError),

    #[error("Refresh task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Package cache needs a refresh (stale sources: [{}])", .0.join(", "))]
    StaleSources(Vec<String>),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Failed to run installed package query: {0}")]
    Command(#[from] std::io::Error),

    #[error("Installed package query failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
