//! Candidate package roots
//!
//! Packages can live under the user-chosen installed-packages folder, under
//! `LocalCache/Packages`, or under the `LocalState/packages` layout of store
//! installs. FS2020 content may additionally sit in a separate (legacy)
//! store install or in an Xbox app retail folder.
//!
//! This module only generates candidates; nothing here checks existence
//! beyond what is needed to locate the installs themselves.

use std::path::{Path, PathBuf};

use super::user_cfg::installed_packages_root;
use crate::core::app_dirs;
use crate::logger;
use crate::models::{SimTarget, Source};

/// Store package id of the current simulator
pub const FS2024_STORE_ID: &str = "Microsoft.Limitless_8wekyb3d8bbwe";

/// Store package id of the legacy simulator
pub const FS2020_STORE_ID: &str = "Microsoft.FlightSimulator_8wekyb3d8bbwe";

/// Xbox app retail layouts of the legacy simulator
const RETAIL_CONTENT_ROOTS: [&str; 2] = [
    r"C:\XboxGames\Microsoft Flight Simulator\Content",
    r"C:\XboxGames\Microsoft Flight Simulator Premium Deluxe\Content",
];

/// One simulator installation: its LocalCache and resolved package folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimInstall {
    pub localcache: PathBuf,
    pub installed_root: Option<PathBuf>,
}

impl SimInstall {
    /// Resolve the installed-packages folder for `localcache`
    pub fn resolve(localcache: PathBuf) -> Self {
        let installed_root = installed_packages_root(&localcache);
        Self {
            localcache,
            installed_root,
        }
    }

    fn local_state_packages(&self) -> Option<PathBuf> {
        self.localcache
            .parent()
            .map(|p| p.join("LocalState").join("packages"))
    }

    /// Package bases in priority order: installed root, LocalCache, LocalState
    fn package_bases(&self) -> Vec<PathBuf> {
        let mut bases = Vec::with_capacity(3);
        if let Some(installed) = &self.installed_root {
            bases.push(installed.clone());
        }
        let packages = self.localcache.join("Packages");
        if self.installed_root.as_ref() != Some(&packages) {
            bases.push(packages);
        }
        if let Some(state) = self.local_state_packages() {
            bases.push(state);
        }
        bases
    }
}

/// Find the `LocalCache` folder containing the activation list
///
/// Falls back to the default store location of the current simulator.
pub fn find_localcache_root(content_xml: &Path) -> PathBuf {
    for ancestor in content_xml.ancestors().skip(1) {
        let is_localcache = ancestor
            .file_name()
            .map(|n| n.to_string_lossy().eq_ignore_ascii_case("localcache"))
            .unwrap_or(false);
        if is_localcache {
            return ancestor.to_path_buf();
        }
    }

    store_localcache(FS2024_STORE_ID)
}

fn store_localcache(package_id: &str) -> PathBuf {
    app_dirs::get_local_app_data()
        .unwrap_or_default()
        .join("Packages")
        .join(package_id)
        .join("LocalCache")
}

/// LocalCache of a store install, if present on this machine
pub fn find_store_localcache(package_id: &str) -> Option<PathBuf> {
    let candidate = store_localcache(package_id);
    candidate.is_dir().then_some(candidate)
}

fn push_variants(roots: &mut Vec<PathBuf>, base: &Path, variants: &[&str], suffix: Option<&str>) {
    for variant in variants {
        let mut root = base.join(variant);
        if let Some(suffix) = suffix {
            root = root.join(suffix);
        }
        roots.push(root);
    }
}

#[derive(Debug, Clone)]
pub struct RootResolver {
    current: SimInstall,
    legacy: Option<SimInstall>,
}

impl RootResolver {
    pub fn new(current: SimInstall, legacy: Option<SimInstall>) -> Self {
        Self { current, legacy }
    }

    /// Build the resolver from the activation list location
    pub fn from_content_xml(content_xml: &Path) -> Self {
        let current = SimInstall::resolve(find_localcache_root(content_xml));
        let legacy = find_store_localcache(FS2020_STORE_ID).map(SimInstall::resolve);

        logger::log_info(
            &format!(
                "LocalCache: {} (installed packages: {})",
                current.localcache.display(),
                current
                    .installed_root
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "none".to_string())
            ),
            Some("roots"),
        );
        if let Some(legacy) = &legacy {
            logger::log_info(
                &format!("Legacy LocalCache: {}", legacy.localcache.display()),
                Some("roots"),
            );
        }

        Self::new(current, legacy)
    }

    pub fn current(&self) -> &SimInstall {
        &self.current
    }

    pub fn legacy(&self) -> Option<&SimInstall> {
        self.legacy.as_ref()
    }

    /// Ordered candidate roots for a package of `source` / `sim`
    pub fn roots_for(&self, source: Source, sim: SimTarget) -> Vec<PathBuf> {
        match (source, sim) {
            (Source::Official, SimTarget::Fs2024) => self.official_roots(&["Official2024", "Official"]),
            (Source::Official, SimTarget::Fs2020) => self.official_2020_roots(),
            (Source::Community, _) => {
                let mut roots = Vec::new();
                for base in self.current.package_bases() {
                    push_variants(&mut roots, &base, &["Community2024", "Community"], None);
                }
                roots
            }
        }
    }

    fn official_roots(&self, variants: &[&str]) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        for base in self.current.package_bases() {
            push_variants(&mut roots, &base, variants, Some("OneStore"));
        }
        roots
    }

    fn official_2020_roots(&self) -> Vec<PathBuf> {
        const VARIANTS: [&str; 2] = ["Official2020", "Official"];
        let mut roots = self.official_roots(&VARIANTS);

        if let Some(legacy) = &self.legacy {
            for base in legacy.package_bases() {
                push_variants(&mut roots, &base, &VARIANTS, Some("OneStore"));
            }
        }

        for retail in RETAIL_CONTENT_ROOTS {
            push_variants(&mut roots, Path::new(retail), &VARIANTS, Some("OneStore"));
        }
        roots
    }
}
