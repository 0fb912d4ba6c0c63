//! Synthesis metadata parser
//!
//! Parses the compact per-source package index published by urpmi-style
//! repositories. Every meaningful line starts with `@` and holds a tuple
//! `@section@field@field...`:
//!
//! ```text
//! @provides@rpm-build[== 4.9.1.3-2.mga2]
//! @summary@The RPM package management system
//! @info@rpm-4.9.1.3-2.mga2.i586@0@1893504@System/Packaging
//! ```
//!
//! `@summary@` is held until the next `@info@` line, which terminates the
//! record. All other sections are ignored.

use std::io::BufRead;
use std::path::Path;

use tracing::{debug, warn};

use crate::parser::decompress::open_metadata;
use crate::parser::traits::{MetadataParser, ParseError, ParseOutcome};
use crate::parser::types::{PackageRecord, split_full_name};

const MARKER: char = '@';

/// Parser for synthesis metadata files
#[derive(Debug, Default, Clone, Copy)]
pub struct SynthesisParser;

impl SynthesisParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a decompressed synthesis stream
    pub fn parse_reader<R: BufRead>(
        &self,
        reader: R,
        source_id: &str,
    ) -> Result<ParseOutcome, ParseError> {
        let mut outcome = ParseOutcome::default();
        let mut pending_summary: Option<String> = None;

        for (line_num, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);

            let Some(body) = line.strip_prefix(MARKER) else {
                continue;
            };
            let (section, rest) = body.split_once(MARKER).unwrap_or((body, ""));

            match section {
                "summary" => pending_summary = Some(rest.to_string()),
                "info" => {
                    let summary = pending_summary.take();
                    match parse_info(rest, summary, source_id) {
                        Some(record) => outcome.packages.push(record),
                        None => {
                            debug!("Skipping malformed info line {}: {}", line_num + 1, line);
                            outcome.skipped += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(outcome)
    }
}

impl MetadataParser for SynthesisParser {
    fn parse(&self, path: &Path, source_id: &str) -> Result<ParseOutcome, ParseError> {
        let reader = open_metadata(path)?;
        let outcome = self.parse_reader(reader, source_id)?;

        if outcome.skipped > 0 {
            warn!(
                "Skipped {} malformed records in {}",
                outcome.skipped,
                path.display()
            );
        }
        debug!(
            "Parsed {} packages from {}",
            outcome.packages.len(),
            path.display()
        );

        Ok(outcome)
    }
}

/// Build a record from the fields of an `@info@` line:
/// `full_name@epoch@size@group`
fn parse_info(fields: &str, summary: Option<String>, source_id: &str) -> Option<PackageRecord> {
    let mut fields = fields.split(MARKER);
    let full_name = fields.next()?;
    let epoch = fields.next()?;
    let size = fields.next()?.parse::<u64>().ok()?;
    let group = fields.next().filter(|g| !g.is_empty())?;

    let parts = split_full_name(full_name)?;
    let epoch = if epoch.is_empty() { "0" } else { epoch };

    Some(PackageRecord {
        full_name: full_name.to_string(),
        name: parts.name,
        version: parts.version,
        release: parts.release,
        arch: parts.arch,
        epoch: epoch.to_string(),
        summary,
        size,
        group: group.to_string(),
        source_id: source_id.to_string(),
    })
}
