//! Installed-vs-available status for packages

use std::cmp::Ordering;

#[cfg(test)]
use mockall::automock;

use crate::error::LookupError;
use crate::parser::PackageRecord;
use crate::version::rpmvercmp::{Evr, compare_evr};

/// Trait for looking up what is installed locally
#[cfg_attr(test, automock)]
pub trait InstalledLookup: Send + Sync {
    /// Highest installed (epoch, version, release) for `name`, if any
    fn installed_version(&self, name: &str) -> Result<Option<Evr>, LookupError>;
}

/// Status of an available package relative to the installed one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    /// Nothing with this name is installed
    NotInstalled,
    /// The installed build is the same version
    Installed,
    /// The candidate is newer than the installed build
    UpgradeAvailable { local_version: String },
    /// The candidate is older than the installed build
    DowngradeAvailable { local_version: String },
}

/// Classify `candidate` against the installed version of the same name
pub fn classify<L: InstalledLookup + ?Sized>(
    lookup: &L,
    candidate: &PackageRecord,
) -> Result<PackageStatus, LookupError> {
    let Some(local) = lookup.installed_version(&candidate.name)? else {
        return Ok(PackageStatus::NotInstalled);
    };

    let status = match compare_evr(&candidate.evr(), &local) {
        Ordering::Equal => PackageStatus::Installed,
        Ordering::Greater => PackageStatus::UpgradeAvailable {
            local_version: local.to_string(),
        },
        Ordering::Less => PackageStatus::DowngradeAvailable {
            local_version: local.to_string(),
        },
    };

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn candidate(epoch: &str, version: &str, release: &str) -> PackageRecord {
        PackageRecord {
            full_name: format!("foo-{version}-{release}.noarch"),
            name: "foo".to_string(),
            version: version.to_string(),
            release: release.to_string(),
            arch: "noarch".to_string(),
            epoch: epoch.to_string(),
            summary: None,
            size: 0,
            group: "Misc".to_string(),
            source_id: "core".to_string(),
        }
    }

    fn lookup_returning(local: Option<Evr>) -> MockInstalledLookup {
        let mut lookup = MockInstalledLookup::new();
        lookup
            .expect_installed_version()
            .withf(|name| name == "foo")
            .times(1)
            .returning(move |_| Ok(local.clone()));
        lookup
    }

    #[rstest]
    #[case(candidate("0", "1.2", "1"), Some(Evr::new(None, "1.1", "1")), PackageStatus::UpgradeAvailable { local_version: "1.1-1".to_string() })]
    #[case(candidate("0", "1.0", "1"), Some(Evr::new(None, "1.0", "1")), PackageStatus::Installed)]
    #[case(candidate("0", "1.0", "1"), Some(Evr::new(None, "1.1", "1")), PackageStatus::DowngradeAvailable { local_version: "1.1-1".to_string() })]
    #[case(candidate("0", "1.0", "1"), None, PackageStatus::NotInstalled)]
    #[case(candidate("1", "0.5", "1"), Some(Evr::new(None, "2.0", "1")), PackageStatus::UpgradeAvailable { local_version: "2.0-1".to_string() })]
    #[case(candidate("0", "2.0", "1"), Some(Evr::new(Some("1"), "1.0", "1")), PackageStatus::DowngradeAvailable { local_version: "1:1.0-1".to_string() })]
    #[case(candidate("0", "1.0", "10"), Some(Evr::new(None, "1.0", "9")), PackageStatus::UpgradeAvailable { local_version: "1.0-9".to_string() })]
    fn classify_returns_expected_status(
        #[case] candidate: PackageRecord,
        #[case] local: Option<Evr>,
        #[case] expected: PackageStatus,
    ) {
        let lookup = lookup_returning(local);

        assert_eq!(classify(&lookup, &candidate).unwrap(), expected);
    }

    #[test]
    fn classify_propagates_lookup_errors() {
        let mut lookup = MockInstalledLookup::new();
        lookup
            .expect_installed_version()
            .returning(|_| Err(LookupError::Failed("rpmdb locked".to_string())));

        let result = classify(&lookup, &candidate("0", "1.0", "1"));

        assert!(matches!(result, Err(LookupError::Failed(msg)) if msg == "rpmdb locked"));
    }
}
