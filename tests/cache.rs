use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use xz2::write::XzEncoder;

use synthesis_cache::cache::{Cache, PackageStore, RefreshOutcome, refresh_sources};
use synthesis_cache::error::{CacheError, QueryError};
use synthesis_cache::parser::{ParseError, SynthesisParser};
use synthesis_cache::query::{QueryEngine, QueryRequest, merge};
use synthesis_cache::source::Source;

const CORE: &str = "\
@summary@Command line file downloader
@info@wget-1.13.4-2.mga2.x86_64@0@1802934@Networking/WWW
@summary@Text editor
@info@vim-enhanced-7.3.316-1.mga2.x86_64@0@2412111@Editors
@summary@An orphan summary
@summary@GNU libc
@info@glibc-2.14.1-8.mga2.x86_64@0@9000000@System/Libraries
@info@broken-line
";

const UPDATES: &str = "\
@summary@Command line file downloader
@info@wget-1.13.4-3.mga2.x86_64@0@1803000@Networking/WWW
@summary@GNU libc
@info@glibc-2.14.1-7.mga2.x86_64@0@9000000@System/Libraries
";

fn write_gzip(path: &Path, content: &str) {
    let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn write_xz(path: &Path, content: &str) {
    let mut encoder = XzEncoder::new(File::create(path).unwrap(), 6);
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

struct Fixture {
    temp_dir: TempDir,
    cache: Arc<Cache>,
    core_path: PathBuf,
    updates_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let cache = Arc::new(Cache::new(&temp_dir.path().join("packages.db")).unwrap());

        let core_path = temp_dir.path().join("core.cz");
        write_gzip(&core_path, CORE);
        set_mtime(&core_path, 1_700_000_000);

        let updates_path = temp_dir.path().join("updates.txt");
        std::fs::write(&updates_path, UPDATES).unwrap();
        set_mtime(&updates_path, 1_700_000_000);

        Self {
            temp_dir,
            cache,
            core_path,
            updates_path,
        }
    }

    fn sources(&self) -> Vec<Source> {
        vec![
            Source::new("Core", "http://mirror/core/release", true, &self.core_path),
            Source::new(
                "Updates",
                "http://mirror/core/updates",
                true,
                &self.updates_path,
            ),
        ]
    }

    async fn refresh(&self, sources: Vec<Source>) -> Vec<RefreshOutcome> {
        refresh_sources(
            Arc::clone(&self.cache),
            Arc::new(SynthesisParser::new()),
            sources,
            2,
        )
        .await
        .into_iter()
        .map(|r| r.result.unwrap())
        .collect()
    }
}

#[tokio::test]
async fn refresh_populates_cache_from_plain_and_gzip_metadata() {
    let fixture = Fixture::new();

    let outcomes = fixture.refresh(fixture.sources()).await;

    assert_eq!(
        outcomes,
        vec![
            RefreshOutcome::Refreshed {
                packages: 3,
                skipped: 1
            },
            RefreshOutcome::Refreshed {
                packages: 2,
                skipped: 0
            },
        ]
    );

    let entries = fixture.cache.freshness_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.stored_mtime == 1_700_000_000));
}

#[tokio::test]
async fn second_refresh_skips_unchanged_sources() {
    let fixture = Fixture::new();
    fixture.refresh(fixture.sources()).await;

    let outcomes = fixture.refresh(fixture.sources()).await;

    assert_eq!(outcomes, vec![RefreshOutcome::Fresh, RefreshOutcome::Fresh]);
}

#[tokio::test]
async fn touched_metadata_is_reparsed_and_replaces_old_packages() {
    let fixture = Fixture::new();
    fixture.refresh(fixture.sources()).await;

    std::fs::write(
        &fixture.updates_path,
        "@info@wget-1.14-1.mga2.x86_64@0@1900000@Networking/WWW\n",
    )
    .unwrap();
    set_mtime(&fixture.updates_path, 1_700_000_100);

    let outcomes = fixture.refresh(fixture.sources()).await;
    assert_eq!(
        outcomes,
        vec![
            RefreshOutcome::Fresh,
            RefreshOutcome::Refreshed {
                packages: 1,
                skipped: 0
            },
        ]
    );

    let sources = fixture.sources();
    let selected: Vec<&Source> = sources.iter().collect();
    let results = QueryEngine::new(fixture.cache.as_ref())
        .query(&selected, &QueryRequest::new("glibc").exact(true))
        .unwrap();
    assert_eq!(results[0].packages.len(), 1);
    assert!(results[1].packages.is_empty());
}

#[tokio::test]
async fn query_fails_closed_until_stale_source_is_refreshed() {
    let fixture = Fixture::new();
    let sources = fixture.sources();
    fixture.refresh(vec![sources[0].clone()]).await;

    let selected: Vec<&Source> = sources.iter().collect();
    let engine = QueryEngine::new(fixture.cache.as_ref());
    let result = engine.query(&selected, &QueryRequest::new("wget"));

    match result {
        Err(QueryError::StaleSources(ids)) => {
            assert_eq!(ids, vec!["http___mirror_core_updates".to_string()])
        }
        other => panic!("expected StaleSources, got {:?}", other),
    }

    fixture.refresh(sources.clone()).await;
    assert!(engine.query(&selected, &QueryRequest::new("wget")).is_ok());
}

#[tokio::test]
async fn query_and_merge_pick_newest_version_across_sources() {
    let fixture = Fixture::new();
    let sources = fixture.sources();
    fixture.refresh(sources.clone()).await;

    let selected: Vec<&Source> = sources.iter().collect();
    let results = QueryEngine::new(fixture.cache.as_ref())
        .query(&selected, &QueryRequest::new("*"))
        .unwrap();

    let merged: Vec<(String, String, String)> = merge(results, false)
        .into_iter()
        .map(|m| (m.package.name.clone(), m.package.version_release(), m.source_name))
        .collect();

    assert_eq!(
        merged,
        vec![
            (
                "glibc".to_string(),
                "2.14.1-8.mga2".to_string(),
                "Core".to_string()
            ),
            (
                "vim-enhanced".to_string(),
                "7.3.316-1.mga2".to_string(),
                "Core".to_string()
            ),
            (
                "wget".to_string(),
                "1.13.4-3.mga2".to_string(),
                "Updates".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn all_versions_keeps_every_source_entry() {
    let fixture = Fixture::new();
    let sources = fixture.sources();
    fixture.refresh(sources.clone()).await;

    let selected: Vec<&Source> = sources.iter().collect();
    let results = QueryEngine::new(fixture.cache.as_ref())
        .query(&selected, &QueryRequest::new("wget=1.13"))
        .unwrap();

    let merged = merge(results, true);

    let sources: Vec<&str> = merged.iter().map(|m| m.source_name.as_str()).collect();
    assert_eq!(sources, vec!["Core", "Updates"]);
}

#[tokio::test]
async fn summary_search_finds_packages_by_description() {
    let fixture = Fixture::new();
    let sources = fixture.sources();
    fixture.refresh(sources.clone()).await;

    let selected: Vec<&Source> = sources.iter().take(1).collect();
    let results = QueryEngine::new(fixture.cache.as_ref())
        .query(
            &selected,
            &QueryRequest::new("*downloader*").search_summary(true),
        )
        .unwrap();

    let names: Vec<&str> = results[0]
        .packages
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["wget"]);
    assert_eq!(
        results[0].packages[0].summary.as_deref(),
        Some("Command line file downloader")
    );
}

#[tokio::test]
async fn cache_survives_reopen() {
    let fixture = Fixture::new();
    let sources = fixture.sources();
    fixture.refresh(sources.clone()).await;
    let db_path = fixture.temp_dir.path().join("packages.db");

    let reopened = Cache::new(&db_path).unwrap();
    let selected: Vec<&Source> = sources.iter().collect();
    let results = QueryEngine::new(&reopened)
        .query(&selected, &QueryRequest::new("vim-enhanced").exact(true))
        .unwrap();

    assert_eq!(results[0].packages.len(), 1);
}

#[test]
fn query_after_metadata_update_refreshes_instead_of_refusing() {
    let fixture = Fixture::new();
    let parser = SynthesisParser::new();
    let sources = fixture.sources();
    let selected: Vec<&Source> = sources.iter().collect();
    let engine = QueryEngine::new(fixture.cache.as_ref());
    engine
        .refresh_and_query(&parser, &selected, &QueryRequest::new("wget"))
        .unwrap();

    write_gzip(
        &fixture.core_path,
        "@info@wget-1.14-1.mga3.x86_64@0@1900000@Networking/WWW\n",
    );
    set_mtime(&fixture.core_path, 1_700_000_200);
    let sources = fixture.sources();
    let selected: Vec<&Source> = sources.iter().collect();

    let outcome = engine
        .refresh_and_query(&parser, &selected, &QueryRequest::new("wget").exact(true))
        .unwrap();

    let versions: Vec<String> = merge(outcome.matches, true)
        .into_iter()
        .map(|m| m.package.version_release())
        .collect();
    assert_eq!(versions, vec!["1.14-1.mga3", "1.13.4-3.mga2"]);
    assert!(outcome.failures.is_empty());
    assert_eq!(
        fixture.cache.freshness(&sources[0].id).unwrap().unwrap().stored_mtime,
        1_700_000_200
    );
}

#[tokio::test]
async fn xz_metadata_is_decompressed() {
    let fixture = Fixture::new();
    write_xz(&fixture.core_path, CORE);
    set_mtime(&fixture.core_path, 1_700_000_000);

    let outcomes = fixture.refresh(vec![fixture.sources().remove(0)]).await;

    assert_eq!(
        outcomes,
        vec![RefreshOutcome::Refreshed {
            packages: 3,
            skipped: 1
        }]
    );
}

#[tokio::test]
async fn unrecognized_metadata_fails_and_leaves_source_stale() {
    let fixture = Fixture::new();
    std::fs::write(&fixture.core_path, [0x42, 0x5a, 0x68, 0x39, 0x00, 0xff, 0x10]).unwrap();
    set_mtime(&fixture.core_path, 1_700_000_000);
    let source = fixture.sources().remove(0);

    let report = refresh_sources(
        Arc::clone(&fixture.cache),
        Arc::new(SynthesisParser::new()),
        vec![source.clone()],
        1,
    )
    .await;

    assert!(matches!(
        report[0].result,
        Err(CacheError::Parse(ParseError::UnsupportedFormat(_)))
    ));
    assert_eq!(
        fixture.cache.freshness(&source.id).unwrap().unwrap().stored_mtime,
        0
    );
    let result = QueryEngine::new(fixture.cache.as_ref()).refresh_and_query(
        &SynthesisParser::new(),
        &[&source],
        &QueryRequest::new("wget"),
    );
    assert!(matches!(result, Err(QueryError::StaleSources(ids)) if ids == vec![source.id.clone()]));
}
