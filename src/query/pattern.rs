//! Query pattern compilation
//!
//! Patterns use shell-style wildcards (`*`, `?`) and may carry a version
//! prefix after `=`:
//! - `curl` - substring match on the name
//! - `cur*` - wildcard match
//! - `curl=7.` - additionally keep only `version-release` starting with `7.`

use crate::cache::traits::{NameMatch, PackageFilter};
use crate::parser::PackageRecord;

const LIKE_ESCAPE: char = '\\';

/// What the caller asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub pattern: String,
    /// Match the name exactly instead of as a substring
    pub exact: bool,
    /// Match summaries as well as names
    pub search_summary: bool,
}

impl QueryRequest {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn search_summary(mut self, search_summary: bool) -> Self {
        self.search_summary = search_summary;
        self
    }
}

/// A request translated into a store filter plus post-fetch filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub filter: PackageFilter,
    pub version_prefix: Option<String>,
}

impl CompiledQuery {
    /// Whether a fetched record passes the version prefix filter
    pub fn accepts(&self, package: &PackageRecord) -> bool {
        self.version_prefix
            .as_deref()
            .is_none_or(|prefix| package.version_release().starts_with(prefix))
    }
}

pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Compile a request into a store filter
///
/// Without wildcards and without `exact` the pattern becomes `*pattern*`.
pub fn compile(request: &QueryRequest) -> CompiledQuery {
    let (name, version_prefix) = match request.pattern.split_once('=') {
        Some((name, version)) => (name, Some(version.to_string())),
        None => (request.pattern.as_str(), None),
    };

    let name = if has_wildcard(name) {
        NameMatch::Like(wildcard_to_like(name))
    } else if request.exact {
        NameMatch::Exact(name.to_string())
    } else {
        NameMatch::Like(wildcard_to_like(&format!("*{name}*")))
    };

    CompiledQuery {
        filter: PackageFilter {
            name,
            search_summary: request.search_summary,
        },
        version_prefix,
    }
}

/// Translate a shell-style wildcard into a `LIKE ... ESCAPE '\'` pattern
pub fn wildcard_to_like(pattern: &str) -> String {
    let mut like = String::with_capacity(pattern.len() + 2);
    for c in pattern.chars() {
        match c {
            '*' => like.push('%'),
            '?' => like.push('_'),
            '%' | '_' | LIKE_ESCAPE => {
                like.push(LIKE_ESCAPE);
                like.push(c);
            }
            _ => like.push(c),
        }
    }
    like
}
