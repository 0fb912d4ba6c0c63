//! Local cache and query engine for RPM repository metadata
//!
//! Package indexes ("synthesis" files) published by several sources are
//! parsed into a SQLite cache that is kept in step with the files' mtimes.
//! Queries run per source and are merged afterwards, and available packages
//! can be compared with what is installed.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Parser    │────▶│    Cache    │◀────│    Query    │
//! │ (synthesis) │     │  (storage)  │     │  (match)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │   Checker   │◀────│    Merge    │
//!                     │  (status)   │     │ (rpmvercmp) │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod parser;
pub mod query;
pub mod source;
pub mod version;
