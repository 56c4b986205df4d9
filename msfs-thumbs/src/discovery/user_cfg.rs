//! `UserCfg.opt` handling
//!
//! The simulator records a user-chosen package location as
//! `InstalledPackagesPath "<dir>"`. The value may contain environment
//! variable placeholders.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::core::path_utils::expand_env_vars;
use crate::log_debug;

pub const USER_CFG_FILE: &str = "UserCfg.opt";

static INSTALLED_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"InstalledPackagesPath\s+"([^"]+)""#).expect("static regex")
});

/// Extract the raw `InstalledPackagesPath` value from config text
pub fn parse_installed_packages_path(text: &str) -> Option<String> {
    INSTALLED_PATH_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Config files that may carry the override for `localcache`
fn config_candidates(localcache: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![localcache.join(USER_CFG_FILE)];
    // Profile sub-folder layouts keep the cfg in a sibling LocalCache
    if let Some(parent) = localcache.parent() {
        let sibling = parent.join("LocalCache").join(USER_CFG_FILE);
        if !candidates.contains(&sibling) {
            candidates.push(sibling);
        }
    }
    candidates
}

fn read_override(cfg_path: &Path) -> Result<Option<PathBuf>> {
    let bytes = fs::read(cfg_path)
        .with_context(|| format!("Failed to read {}", cfg_path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let Some(raw) = parse_installed_packages_path(&text) else {
        return Ok(None);
    };
    let path = PathBuf::from(expand_env_vars(&raw));
    if path.is_dir() {
        Ok(Some(path))
    } else {
        log_debug!(
            &format!(
                "InstalledPackagesPath '{}' from {} does not exist",
                path.display(),
                cfg_path.display()
            ),
            "roots"
        );
        Ok(None)
    }
}

/// Resolve the installed-packages directory for a LocalCache root
///
/// Order: a valid `UserCfg.opt` override, then `<localcache>/Packages`.
pub fn installed_packages_root(localcache: &Path) -> Option<PathBuf> {
    for cfg in config_candidates(localcache) {
        if !cfg.is_file() {
            continue;
        }
        match read_override(&cfg) {
            Ok(Some(path)) => return Some(path),
            Ok(None) => {}
            Err(e) => log_debug!(&format!("{:#}", e), "roots"),
        }
    }

    let packages = localcache.join("Packages");
    packages.is_dir().then_some(packages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_packages_path() {
        let text = "Version 1\n{Graphics\n}\nInstalledPackagesPath \"D:\\MSFS\\Packages\"\n";
        assert_eq!(
            parse_installed_packages_path(text).as_deref(),
            Some(r"D:\MSFS\Packages")
        );
        assert_eq!(parse_installed_packages_path("InstalledPackagesPath \"\""), None);
        assert_eq!(parse_installed_packages_path("nothing here"), None);
    }

    #[test]
    fn test_override_wins_when_directory_exists() {
        let temp = tempfile::tempdir().unwrap();
        let localcache = temp.path().join("LocalCache");
        let custom = temp.path().join("custom-packages");
        fs::create_dir_all(localcache.join("Packages")).unwrap();
        fs::create_dir_all(&custom).unwrap();
        fs::write(
            localcache.join(USER_CFG_FILE),
            format!("InstalledPackagesPath \"{}\"\n", custom.display()),
        )
        .unwrap();

        assert_eq!(installed_packages_root(&localcache), Some(custom));
    }

    #[test]
    fn test_override_expands_env_vars() {
        let temp = tempfile::tempdir().unwrap();
        let localcache = temp.path().join("LocalCache");
        fs::create_dir_all(&localcache).unwrap();
        fs::create_dir_all(temp.path().join("pk")).unwrap();
        std::env::set_var("MSFS_THUMBS_CFG_BASE", temp.path());
        fs::write(
            localcache.join(USER_CFG_FILE),
            "InstalledPackagesPath \"%MSFS_THUMBS_CFG_BASE%/pk\"",
        )
        .unwrap();

        let root = installed_packages_root(&localcache).unwrap();
        assert!(root.is_dir());
        assert!(root.ends_with("pk"));
    }

    #[test]
    fn test_missing_override_falls_back_to_packages() {
        let temp = tempfile::tempdir().unwrap();
        let localcache = temp.path().join("LocalCache");
        fs::create_dir_all(localcache.join("Packages")).unwrap();
        fs::write(
            localcache.join(USER_CFG_FILE),
            "InstalledPackagesPath \"/definitely/not/here\"",
        )
        .unwrap();

        assert_eq!(
            installed_packages_root(&localcache),
            Some(localcache.join("Packages"))
        );
    }

    #[test]
    fn test_no_root_at_all() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(installed_packages_root(&temp.path().join("LocalCache")), None);
    }
}
