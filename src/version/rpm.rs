//! Installed package lookup backed by the `rpm` query tool

use std::process::Command;

use tracing::debug;

use crate::error::LookupError;
use crate::version::checker::InstalledLookup;
use crate::version::rpmvercmp::{Evr, compare_evr};

const QUERY_FORMAT: &str = "%{EPOCH}:%{VERSION}:%{RELEASE}\\n";

/// Queries the local rpm database through the `rpm` command
pub struct RpmInstalledLookup {
    program: String,
}

impl RpmInstalledLookup {
    pub fn new() -> Self {
        Self::with_program("rpm")
    }

    /// Use a different rpm executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RpmInstalledLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl InstalledLookup for RpmInstalledLookup {
    fn installed_version(&self, name: &str) -> Result<Option<Evr>, LookupError> {
        let output = Command::new(&self.program)
            .args(["-q", "--queryformat", QUERY_FORMAT, "--", name])
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            if stdout.contains("is not installed") {
                debug!("{} is not installed", name);
                return Ok(None);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LookupError::Failed(stderr.trim().to_string()));
        }

        Ok(parse_query_output(&stdout))
    }
}

/// Highest `EPOCH:VERSION:RELEASE` line of `rpm -q` output
///
/// rpm prints `(none)` for a missing epoch. Several lines appear when
/// multiple builds (e.g. kernels) are installed side by side.
pub fn parse_query_output(output: &str) -> Option<Evr> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().splitn(3, ':');
            let epoch = fields.next()?;
            let version = fields.next()?;
            let release = fields.next()?;
            let epoch = (epoch != "(none)").then_some(epoch);
            Some(Evr::new(epoch, version, release))
        })
        .max_by(compare_evr)
}
