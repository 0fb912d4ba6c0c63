//! Common types for parsers

use crate::version::rpmvercmp::Evr;

/// One package build described by a source's metadata file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Canonical `name-version-release.arch` string
    pub full_name: String,
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    /// Epoch as written in the metadata ("0" when absent)
    pub epoch: String,
    pub summary: Option<String>,
    /// Installed size in bytes
    pub size: u64,
    pub group: String,
    /// Identifier of the source this record was read from
    pub source_id: String,
}

impl PackageRecord {
    /// `version-release`, the string version prefixes are matched against
    pub fn version_release(&self) -> String {
        format!("{}-{}", self.version, self.release)
    }

    pub fn evr(&self) -> Evr {
        Evr::new(Some(&self.epoch), &self.version, &self.release)
    }
}

/// Components of a full name split by [`split_full_name`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

/// Split `name-version-release.arch` into its components.
///
/// The last `-` field holds `release.arch`; its final `.` token is the arch.
/// The field before it is the version and everything earlier is the name.
/// Names or versions that themselves contain `-` are split at the wrong
/// place (`foo-1.0-beta-1.mga2.noarch` yields name `foo-1.0`, version
/// `beta`); callers rely on that behavior staying stable.
///
/// Returns `None` when there are fewer than three `-` fields or the last
/// field has no `.`.
pub fn split_full_name(full_name: &str) -> Option<NameParts> {
    let fields: Vec<&str> = full_name.split('-').collect();
    let [name_fields @ .., version, release_arch] = fields.as_slice() else {
        return None;
    };
    if name_fields.is_empty() {
        return None;
    }

    let (release, arch) = release_arch.rsplit_once('.')?;
    let name = name_fields.join("-");
    if name.is_empty() || version.is_empty() || release.is_empty() || arch.is_empty() {
        return None;
    }

    Some(NameParts {
        name,
        version: version.to_string(),
        release: release.to_string(),
        arch: arch.to_string(),
    })
}
