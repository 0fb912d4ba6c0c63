//! Folding per-source results into one list

use std::cmp::Ordering;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::parser::PackageRecord;
use crate::query::engine::SourceMatches;
use crate::version::rpmvercmp::compare_evr;

/// A package together with the name of the source offering it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPackage {
    pub package: PackageRecord,
    pub source_name: String,
}

/// Merge per-source matches.
///
/// With `all_versions` every (source, package) pair is kept. Otherwise only
/// the highest version of each name survives; on equal versions the source
/// seen first wins. The result is ordered by name, stable within a name.
pub fn merge(results: Vec<SourceMatches>, all_versions: bool) -> Vec<MergedPackage> {
    let flattened = results.into_iter().flat_map(|matches| {
        let source_name = matches.source_name;
        matches
            .packages
            .into_iter()
            .map(move |package| MergedPackage {
                package,
                source_name: source_name.clone(),
            })
    });

    let mut merged: Vec<MergedPackage> = if all_versions {
        flattened.collect()
    } else {
        let mut newest: IndexMap<String, MergedPackage> = IndexMap::new();
        for candidate in flattened {
            match newest.entry(candidate.package.name.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(candidate);
                }
                Entry::Occupied(mut entry) => {
                    let ordering = compare_evr(&candidate.package.evr(), &entry.get().package.evr());
                    if ordering == Ordering::Greater {
                        entry.insert(candidate);
                    }
                }
            }
        }
        newest.into_values().collect()
    };

    merged.sort_by(|a, b| a.package.name.cmp(&b.package.name));
    merged
}
