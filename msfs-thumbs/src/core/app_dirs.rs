//! Centralized app data directory management
//!
//! All persistent data (logs, config, thumbnail cache) should use paths from
//! this module so the cache never lands beside the executable, which may be
//! read-only when installed under Program Files.

use std::path::PathBuf;

/// App identifier used for the per-user data folder
const APP_IDENTIFIER: &str = "com.msfsthumbs.tool";

/// Folder (inside the data dir and, for older builds, beside the exe) holding the cache
const CACHE_DIRNAME: &str = "cache";

/// Thumbnail map file name
const CACHE_FILE: &str = "thumbnails.json";

/// Get the app data directory for persistent storage
///
/// Returns platform-specific paths:
/// - Windows: %LOCALAPPDATA%\com.msfsthumbs.tool
/// - macOS: ~/Library/Application Support/com.msfsthumbs.tool
/// - Linux: ~/.local/share/com.msfsthumbs.tool (or $XDG_DATA_HOME)
pub fn get_app_data_dir() -> PathBuf {
    if let Some(local) = dirs::data_local_dir() {
        return local.join(APP_IDENTIFIER);
    }

    // Fallback to current directory
    PathBuf::from(".")
}

/// Get the per-user local app data root (`%LOCALAPPDATA%` on Windows)
///
/// The simulator's store packages live under `<this>/Packages/<package id>`.
pub fn get_local_app_data() -> Option<PathBuf> {
    dirs::data_local_dir()
}

/// Get the logs directory
pub fn get_logs_dir() -> PathBuf {
    get_app_data_dir().join("logs")
}

/// Get the log file path
pub fn get_log_file_path() -> PathBuf {
    get_logs_dir().join("msfs-thumbs.log")
}

/// Get the engine config file path
pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join("config.json")
}

/// Get the cache directory (database + legacy copied thumbnails)
pub fn get_cache_dir() -> PathBuf {
    get_app_data_dir().join(CACHE_DIRNAME)
}

/// Get the thumbnail cache database path inside `cache_dir`
pub fn cache_file_in(cache_dir: &std::path::Path) -> PathBuf {
    cache_dir.join(CACHE_FILE)
}

/// Cache file written by older builds next to the executable
///
/// Only read once, to carry an existing cache forward.
pub fn get_legacy_cache_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe_dir = exe.parent()?;
    Some(exe_dir.join(CACHE_DIRNAME).join(CACHE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_data_dir_not_empty() {
        let dir = get_app_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_cache_paths_nest_under_data_dir() {
        let cache = get_cache_dir();
        assert!(cache.starts_with(get_app_data_dir()));
        assert_eq!(
            cache_file_in(&cache).file_name().and_then(|n| n.to_str()),
            Some("thumbnails.json")
        );
    }

    #[test]
    fn test_legacy_cache_is_beside_exe() {
        if let Some(legacy) = get_legacy_cache_path() {
            let exe_dir = std::env::current_exe().unwrap();
            assert!(legacy.starts_with(exe_dir.parent().unwrap()));
        }
    }
}
