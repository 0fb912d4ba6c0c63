//! Query layer
//!
//! # Modules
//!
//! - [`pattern`]: turns user patterns into store filters
//! - [`engine`]: per-source retrieval with the fail-closed freshness check
//! - [`merge`]: folds per-source results into one list

pub mod engine;
pub mod merge;
pub mod pattern;

pub use engine::{QueryEngine, QueryOutcome, SourceFailure, SourceMatches};
pub use merge::{MergedPackage, merge};
pub use pattern::{CompiledQuery, QueryRequest, compile};
