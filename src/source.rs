//! Source descriptors
//!
//! A source is one configured package repository. Its `id` is derived from
//! the URL and used as the storage partition key, so it is passed through
//! a strict sanitizer before it ever reaches the store.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;

static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid regex"));

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize_source_id(url: &str) -> String {
    NON_IDENTIFIER.replace_all(url, "_").into_owned()
}

/// Modification time of a file in seconds since the UNIX epoch
pub fn file_mtime(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(secs).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub metadata_path: PathBuf,
    /// Last observed mtime of the metadata file, `None` if it is missing
    pub mtime: Option<i64>,
}

impl Source {
    /// Build a source descriptor, probing the metadata file's mtime
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        enabled: bool,
        metadata_path: impl Into<PathBuf>,
    ) -> Self {
        let url = url.into();
        let metadata_path = metadata_path.into();
        Self {
            id: sanitize_source_id(&url),
            name: name.into(),
            mtime: file_mtime(&metadata_path),
            url,
            enabled,
            metadata_path,
        }
    }

    /// Probe the metadata file again
    pub fn refresh_mtime(&mut self) {
        self.mtime = file_mtime(&self.metadata_path);
    }
}

/// One entry of a JSON source manifest
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    name: String,
    url: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    metadata_path: PathBuf,
}

fn default_enabled() -> bool {
    true
}

/// Parse a JSON manifest: `[{"name", "url", "enabled", "metadataPath"}]`
pub fn parse_manifest(content: &str, origin: &str) -> Result<Vec<Source>, ConfigError> {
    let entries: Vec<ManifestEntry> =
        serde_json::from_str(content).map_err(|source| ConfigError::Json {
            path: origin.to_string(),
            source,
        })?;

    Ok(entries
        .into_iter()
        .map(|e| Source::new(e.name, e.url, e.enabled, e.metadata_path))
        .collect())
}

/// Read a JSON source manifest from disk
pub fn load_manifest(path: &Path) -> Result<Vec<Source>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_manifest(&content, &path.display().to_string())
}

/// Select sources by name; an empty selection means every enabled source
pub fn select_sources<'a>(sources: &'a [Source], names: &[String]) -> Vec<&'a Source> {
    if names.is_empty() {
        sources.iter().filter(|s| s.enabled).collect()
    } else {
        sources
            .iter()
            .filter(|s| names.iter().any(|n| n == &s.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("http://mirror.example.org/mageia/2/core", "http___mirror_example_org_mageia_2_core")]
    #[case("file:///media/cdrom", "file____media_cdrom")]
    #[case("core_release", "core_release")]
    #[case("a b;DROP TABLE x", "a_b_DROP_TABLE_x")]
    #[case("ünï", "_n_")]
    fn sanitize_source_id_replaces_non_identifier_chars(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(sanitize_source_id(url), expected);
    }

    #[test]
    fn source_new_reads_mtime_of_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("synthesis.hdlist.cz");
        std::fs::write(&path, "").unwrap();

        let source = Source::new("Core", "http://example.org/core", true, &path);

        assert_eq!(source.id, "http___example_org_core");
        assert!(source.mtime.is_some());
    }

    #[test]
    fn source_new_leaves_mtime_unknown_for_missing_file() {
        let temp_dir = TempDir::new().unwrap();

        let source = Source::new("Core", "u", true, temp_dir.path().join("missing"));

        assert_eq!(source.mtime, None);
    }

    #[test]
    fn refresh_mtime_picks_up_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("synthesis.hdlist.cz");
        let mut source = Source::new("Core", "u", true, &path);
        assert_eq!(source.mtime, None);

        std::fs::write(&path, "").unwrap();
        source.refresh_mtime();

        assert!(source.mtime.is_some());
    }

    #[test]
    fn parse_manifest_defaults_enabled_to_true() {
        let sources = parse_manifest(
            r#"[
                {"name": "Core", "url": "http://example.org/core", "metadataPath": "/nonexistent/core.cz"},
                {"name": "Tainted", "url": "http://example.org/tainted", "enabled": false, "metadataPath": "/nonexistent/tainted.cz"}
            ]"#,
            "sources.json",
        )
        .unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources[0].enabled);
        assert!(!sources[1].enabled);
        assert_eq!(sources[1].id, "http___example_org_tainted");
        assert_eq!(sources[1].mtime, None);
    }

    #[test]
    fn parse_manifest_reports_origin_on_invalid_json() {
        let err = parse_manifest("{not json", "sources.json").unwrap_err();

        assert!(err.to_string().contains("sources.json"));
    }

    #[test]
    fn load_manifest_fails_for_missing_file() {
        let temp_dir = TempDir::new().unwrap();

        let result = load_manifest(&temp_dir.path().join("sources.json"));

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn select_sources_uses_enabled_when_no_names_given() {
        let sources = vec![
            Source::new("Core", "core", true, "/nonexistent/a"),
            Source::new("Tainted", "tainted", false, "/nonexistent/b"),
        ];

        let selected = select_sources(&sources, &[]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Core");

        let selected = select_sources(&sources, &["Tainted".to_string()]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Tainted");
    }
}
