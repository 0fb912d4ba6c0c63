//! Per-source query execution

use tracing::{debug, warn};

use crate::cache::refresh::ensure_fresh;
use crate::cache::traits::PackageStore;
use crate::error::{CacheError, QueryError};
use crate::parser::{MetadataParser, PackageRecord};
use crate::query::pattern::{QueryRequest, compile};
use crate::source::Source;

/// Matches found in one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMatches {
    pub source_id: String,
    pub source_name: String,
    /// Ordered by name
    pub packages: Vec<PackageRecord>,
}

/// A selected source left out of the results because its refresh failed
#[derive(Debug)]
pub struct SourceFailure {
    pub source_id: String,
    pub source_name: String,
    pub error: CacheError,
}

/// Result of [`QueryEngine::refresh_and_query`]
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub matches: Vec<SourceMatches>,
    pub failures: Vec<SourceFailure>,
}

/// Runs queries against the cached packages of selected sources
pub struct QueryEngine<'a, S: PackageStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PackageStore + ?Sized> QueryEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Refuse to answer from a cache that does not match the metadata files.
    ///
    /// Every selected source must have a metadata file and a stored mtime at
    /// least as new as it. An empty selection is refused as well.
    pub fn check_ready(&self, sources: &[&Source]) -> Result<(), QueryError> {
        let mut stale = Vec::new();

        for source in sources {
            let Some(mtime) = source.mtime else {
                warn!("Metadata file missing for {}", source.name);
                stale.push(source.id.clone());
                continue;
            };

            let fresh = self
                .store
                .freshness(&source.id)?
                .is_some_and(|entry| entry.stored_mtime >= mtime);
            if !fresh {
                debug!("Cache for {} is stale", source.name);
                stale.push(source.id.clone());
            }
        }

        if sources.is_empty() || !stale.is_empty() {
            return Err(QueryError::StaleSources(stale));
        }
        Ok(())
    }

    /// Query every selected source, keeping results separate per source.
    ///
    /// The cache is used as is; see [`Self::refresh_and_query`] to bring
    /// stale sources up to date first.
    pub fn query(
        &self,
        sources: &[&Source],
        request: &QueryRequest,
    ) -> Result<Vec<SourceMatches>, QueryError> {
        self.check_ready(sources)?;

        let compiled = compile(request);
        debug!("Compiled query {:?} into {:?}", request.pattern, compiled);

        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let packages: Vec<_> = self
                .store
                .find_packages(&source.id, &compiled.filter)?
                .into_iter()
                .filter(|p| compiled.accepts(p))
                .collect();

            debug!("{} matches in {}", packages.len(), source.name);
            results.push(SourceMatches {
                source_id: source.id.clone(),
                source_name: source.name.clone(),
                packages,
            });
        }

        Ok(results)
    }

    /// Bring the selected sources up to date, then query them.
    ///
    /// A source whose metadata file is missing refuses the whole query. A
    /// source whose refresh fails is reported in
    /// [`QueryOutcome::failures`] and left out; if no source could be
    /// refreshed the query is refused.
    pub fn refresh_and_query<P: MetadataParser + ?Sized>(
        &self,
        parser: &P,
        sources: &[&Source],
        request: &QueryRequest,
    ) -> Result<QueryOutcome, QueryError> {
        let missing: Vec<String> = sources
            .iter()
            .filter(|s| s.mtime.is_none())
            .map(|s| s.id.clone())
            .collect();
        if sources.is_empty() || !missing.is_empty() {
            return Err(QueryError::StaleSources(missing));
        }

        let mut ready = Vec::with_capacity(sources.len());
        let mut failures = Vec::new();
        for source in sources {
            match ensure_fresh(self.store, parser, source) {
                Ok(_) => ready.push(*source),
                Err(error) => {
                    warn!("Leaving {} out of the query: {}", source.name, error);
                    failures.push(SourceFailure {
                        source_id: source.id.clone(),
                        source_name: source.name.clone(),
                        error,
                    });
                }
            }
        }

        if ready.is_empty() {
            return Err(QueryError::StaleSources(
                failures.into_iter().map(|f| f.source_id).collect(),
            ));
        }

        Ok(QueryOutcome {
            matches: self.query(&ready, request)?,
            failures,
        })
    }
}
