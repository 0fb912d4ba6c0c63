//! Version ordering and installed-package status
//!
//! # Modules
//!
//! - [`rpmvercmp`]: (epoch, version, release) comparison used for merging
//!   and status classification
//! - [`checker`]: status classification against an installed-package lookup
//! - [`rpm`]: installed-package lookup backed by the `rpm` command

pub mod checker;
pub mod rpm;
pub mod rpmvercmp;

pub use checker::{InstalledLookup, PackageStatus, classify};
pub use rpm::RpmInstalledLookup;
pub use rpmvercmp::{Evr, compare_evr, compare_segments};
