//! Thumbnail discovery
//!
//! Given candidate roots (see [`roots`]), find the package folder in each
//! root ([`matcher`]) and pick its preview image, first from the package
//! manifest ([`manifest`]) and then by searching `ContentInfo`
//! ([`fallback`]). Roots are tried in order; the first hit wins.
//!
//! Every step treats I/O and parse failures as "nothing here".

pub mod fallback;
pub mod manifest;
pub mod matcher;
pub mod roots;
pub mod user_cfg;

use std::path::PathBuf;

use crate::log_debug;
use crate::models::Provenance;
pub use matcher::PackageName;
pub use roots::{RootResolver, SimInstall};

/// A located thumbnail and the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub path: PathBuf,
    pub provenance: Provenance,
}

/// Search `roots` in order for the thumbnail of `name`
pub fn discover_in_roots(roots: &[PathBuf], name: &PackageName) -> Option<Discovered> {
    for root in roots {
        let Some(pkg_dir) = matcher::locate_package_dir(root, name) else {
            continue;
        };
        log_debug!(
            &format!("{} -> package folder {}", name.raw, pkg_dir.display()),
            "discovery"
        );

        if let Some(path) = manifest::locate_via_manifest(&pkg_dir) {
            return Some(Discovered {
                path,
                provenance: Provenance::Manifest,
            });
        }

        if let Some(path) = fallback::locate_via_search(&pkg_dir) {
            return Some(Discovered {
                path,
                provenance: Provenance::FilesystemSearch,
            });
        }
    }
    None
}
