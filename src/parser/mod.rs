//! Parser layer
//! - traits.rs: MetadataParser trait definition
//! - types.rs: Common types (PackageRecord, full name splitting)
//! - decompress.rs: gzip detection for metadata files
//! - synthesis.rs: synthesis metadata parser

pub mod decompress;
pub mod synthesis;
pub mod traits;
pub mod types;

pub use synthesis::SynthesisParser;
pub use traits::{MetadataParser, ParseError, ParseOutcome};
pub use types::{PackageRecord, split_full_name};
