//! RPM-style version comparison
//!
//! Versions and releases are split into alternating runs of digits and
//! non-digits which are compared pairwise:
//! - digit runs compare as integers, leading zeros ignored
//! - other runs compare by character value
//! - a digit run is greater than a non-digit run in the same position
//! - the string that runs out of runs first is lower
//!
//! Pre-release markers (`~`, `^`) get no special treatment, unlike rpm's
//! own `rpmvercmp`.

use std::cmp::Ordering;
use std::fmt;

/// An (epoch, version, release) triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evr {
    pub epoch: String,
    pub version: String,
    pub release: String,
}

impl Evr {
    /// Build a triple; a missing or empty epoch is treated as `"0"`
    pub fn new(epoch: Option<&str>, version: &str, release: &str) -> Self {
        let epoch = epoch.filter(|e| !e.is_empty()).unwrap_or("0");
        Self {
            epoch: epoch.to_string(),
            version: version.to_string(),
            release: release.to_string(),
        }
    }

    fn has_epoch(&self) -> bool {
        compare_segments(&self.epoch, "0") != Ordering::Equal
    }
}

/// `version-release`, prefixed by `epoch:` when the epoch is not zero
impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_epoch() {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}-{}", self.version, self.release)
    }
}

/// Compare two triples: epoch first, then version, then release
pub fn compare_evr(a: &Evr, b: &Evr) -> Ordering {
    compare_segments(&a.epoch, &b.epoch)
        .then_with(|| compare_segments(&a.version, &b.version))
        .then_with(|| compare_segments(&a.release, &b.release))
}

/// Compare two version or release strings segment by segment
pub fn compare_segments(a: &str, b: &str) -> Ordering {
    let mut left = Segments::new(a);
    let mut right = Segments::new(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = compare_segment(l, r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_segment(a: Segment<'_>, b: Segment<'_>) -> Ordering {
    match (a, b) {
        (Segment::Numeric(l), Segment::Numeric(r)) => compare_numeric(l, r),
        (Segment::Alpha(l), Segment::Alpha(r)) => l.cmp(r),
        (Segment::Numeric(_), Segment::Alpha(_)) => Ordering::Greater,
        (Segment::Alpha(_), Segment::Numeric(_)) => Ordering::Less,
    }
}

/// Compare digit strings of any length as integers
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Numeric(&'a str),
    Alpha(&'a str),
}

/// Iterator over the alternating digit / non-digit runs of a string
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let numeric = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != numeric)
            .map_or(self.rest.len(), |(i, _)| i);

        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;

        Some(if numeric {
            Segment::Numeric(run)
        } else {
            Segment::Alpha(run)
        })
    }
}
