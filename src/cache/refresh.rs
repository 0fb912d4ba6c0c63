//! Staleness detection and repopulation of the package cache

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::cache::traits::PackageStore;
use crate::error::CacheError;
use crate::parser::MetadataParser;
use crate::source::Source;

/// What [`ensure_fresh`] did for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Stored mtime was already current; nothing was parsed
    Fresh,
    /// Metadata was parsed and the source's packages replaced
    Refreshed { packages: usize, skipped: usize },
}

/// Result of refreshing one source
#[derive(Debug)]
pub struct SourceRefresh {
    pub source_id: String,
    pub source_name: String,
    pub result: Result<RefreshOutcome, CacheError>,
}

/// Make sure the cached packages of `source` match its metadata file.
///
/// A source is fresh when its stored mtime is at least the file's mtime.
/// Otherwise the file is parsed and the packages are replaced together with
/// the stored mtime in one transaction, so a failure leaves the source
/// stale and it is retried next time.
pub fn ensure_fresh<S, P>(
    store: &S,
    parser: &P,
    source: &Source,
) -> Result<RefreshOutcome, CacheError>
where
    S: PackageStore + ?Sized,
    P: MetadataParser + ?Sized,
{
    let Some(mtime) = source.mtime else {
        warn!(
            "Metadata file for {} not found at {}",
            source.name,
            source.metadata_path.display()
        );
        return Err(CacheError::SourceFileMissing(source.id.clone()));
    };

    let stored_mtime = store.register_source(&source.id)?;
    if stored_mtime >= mtime {
        debug!(
            "Cache for {} is fresh (stored {}, file {})",
            source.name, stored_mtime, mtime
        );
        return Ok(RefreshOutcome::Fresh);
    }

    info!(
        "Cache for {} is stale (stored {}, file {}), reparsing {}",
        source.name,
        stored_mtime,
        mtime,
        source.metadata_path.display()
    );

    let outcome = parser.parse(&source.metadata_path, &source.id)?;
    store.replace_packages(&source.id, &outcome.packages, mtime)?;

    info!(
        "Cached {} packages for {} ({} skipped)",
        outcome.packages.len(),
        source.name,
        outcome.skipped
    );

    Ok(RefreshOutcome::Refreshed {
        packages: outcome.packages.len(),
        skipped: outcome.skipped,
    })
}

/// Refresh many sources concurrently
///
/// Each distinct source id is refreshed once, on a blocking worker; at most
/// `max_parallel` workers run at a time. Parsing happens outside the store
/// lock while writes serialize on it. Errors are collected per source and
/// never stop the others. Results come back in input order.
pub async fn refresh_sources<S, P>(
    store: Arc<S>,
    parser: Arc<P>,
    sources: Vec<Source>,
    max_parallel: usize,
) -> Vec<SourceRefresh>
where
    S: PackageStore,
    P: MetadataParser + 'static,
{
    let mut seen = HashSet::new();
    let sources: Vec<Source> = sources
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect();

    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));

    let futures = sources.into_iter().map(|source| {
        let store = Arc::clone(&store);
        let parser = Arc::clone(&parser);
        let semaphore = Arc::clone(&semaphore);
        async move {
            let source_id = source.id.clone();
            let source_name = source.name.clone();

            let result = match semaphore.acquire_owned().await {
                Ok(permit) => tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    ensure_fresh(store.as_ref(), parser.as_ref(), &source)
                })
                .await
                .unwrap_or_else(|e| Err(CacheError::Task(e.to_string()))),
                Err(e) => Err(CacheError::Task(e.to_string())),
            };

            if let Err(e) = &result {
                error!("Failed to refresh {}: {}", source_name, e);
            }

            SourceRefresh {
                source_id,
                source_name,
                result,
            }
        }
    });

    join_all(futures).await
}
