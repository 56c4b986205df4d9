//! Shared path helpers
//!
//! Manifest path normalization, environment expansion for config values and
//! small filesystem probes used by the locators.

use anyhow::{anyhow, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

/// Image extensions accepted as thumbnails, in preference order
pub const THUMB_EXTS: [&str; 4] = [".png", ".jpg", ".jpeg", ".webp"];

/// `%VAR%`, `${VAR}` and `$VAR` placeholders
static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Za-z_][A-Za-z0-9_()]*)%|\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("static regex")
});

/// Normalize a relative path taken from a package manifest.
///
/// Accepts both separators, drops empty and `.` segments and returns the
/// `/`-joined form. Traversal (`..`) and drive-qualified segments are rejected
/// so a manifest can never point outside its package.
pub fn normalize_manifest_path(path: &str) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split(['/', '\\']) {
        if seg.is_empty() || seg == "." {
            continue;
        }
        if seg == ".." {
            return Err(anyhow!("Path traversal is not allowed: {}", path));
        }
        if seg.contains(':') {
            return Err(anyhow!("Absolute paths are not allowed: {}", path));
        }
        parts.push(seg);
    }

    if parts.is_empty() {
        return Err(anyhow!("Path is empty"));
    }

    Ok(parts.join("/"))
}

/// Join a normalized (`/`-separated) manifest path onto `root`
pub fn join_normalized(root: &Path, normalized: &str) -> PathBuf {
    normalized
        .split('/')
        .fold(root.to_path_buf(), |acc, seg| acc.join(seg))
}

/// True if the path (already lower-cased) ends with a thumbnail extension
pub fn has_image_ext(lower: &str) -> bool {
    THUMB_EXTS.iter().any(|ext| lower.ends_with(ext))
}

/// Expand `%VAR%`, `${VAR}`, `$VAR` and a leading `~` against the process
/// environment. Unknown variables are left untouched.
pub fn expand_env_vars(value: &str) -> String {
    let expanded = ENV_VAR_RE.replace_all(value, |caps: &regex::Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match std::env::var(name) {
            Ok(v) => v,
            Err(_) => caps[0].to_string(),
        }
    });

    let expanded = expanded.into_owned();
    if expanded == "~" || expanded.starts_with("~/") || expanded.starts_with("~\\") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{}", home.display(), &expanded[1..]);
        }
    }
    expanded
}

/// Modification time of `path` in milliseconds since the Unix epoch
pub fn file_mtime_ms(path: &Path) -> Result<i64> {
    let modified = fs::metadata(path)?.modified()?;
    let millis = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    };
    Ok(millis)
}

/// Find a direct child directory named `name`, exact match first, then
/// ignoring ASCII case.
pub fn find_child_dir(parent: &Path, name: &str) -> Option<PathBuf> {
    let exact = parent.join(name);
    if exact.is_dir() {
        return Some(exact);
    }

    let read_dir = fs::read_dir(parent).ok()?;
    for entry in read_dir.flatten() {
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        if is_dir && entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
            return Some(entry.path());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_manifest_path() {
        assert_eq!(
            normalize_manifest_path(r"ContentInfo\pkg\Thumbnail.JPG").unwrap(),
            "ContentInfo/pkg/Thumbnail.JPG"
        );
        assert_eq!(
            normalize_manifest_path("./ContentInfo//thumbnail.png").unwrap(),
            "ContentInfo/thumbnail.png"
        );
        assert!(normalize_manifest_path("../outside.png").is_err());
        assert!(normalize_manifest_path(r"C:\abs.png").is_err());
        assert!(normalize_manifest_path("//").is_err());
    }

    #[test]
    fn test_join_normalized() {
        let root = Path::new("pkg");
        let joined = join_normalized(root, "ContentInfo/thumbnail.png");
        assert_eq!(joined, Path::new("pkg").join("ContentInfo").join("thumbnail.png"));
    }

    #[test]
    fn test_has_image_ext() {
        assert!(has_image_ext("contentinfo/thumbnail.webp"));
        assert!(has_image_ext("a.jpeg"));
        assert!(!has_image_ext("a.dds"));
        assert!(!has_image_ext("png"));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("MSFS_THUMBS_TEST_ROOT", "/games");
        assert_eq!(
            expand_env_vars("%MSFS_THUMBS_TEST_ROOT%/Packages"),
            "/games/Packages"
        );
        assert_eq!(
            expand_env_vars("${MSFS_THUMBS_TEST_ROOT}/Packages"),
            "/games/Packages"
        );
        assert_eq!(
            expand_env_vars("$MSFS_THUMBS_TEST_ROOT/Packages"),
            "/games/Packages"
        );
        assert_eq!(
            expand_env_vars("%MSFS_THUMBS_UNSET_VAR%/x"),
            "%MSFS_THUMBS_UNSET_VAR%/x"
        );
        assert_eq!(expand_env_vars(r"D:\MSFS\Packages"), r"D:\MSFS\Packages");
    }

    #[test]
    fn test_find_child_dir_ignores_case() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("contentinfo")).unwrap();
        let found = find_child_dir(temp.path(), "ContentInfo").unwrap();
        assert!(found.is_dir());
        assert!(find_child_dir(temp.path(), "SimObjects").is_none());
    }

    #[test]
    fn test_file_mtime_ms() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("a.png");
        fs::write(&file, b"x").unwrap();
        let mtime = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(1_700_000_000_123);
        filetime::set_file_mtime(&file, filetime::FileTime::from_system_time(mtime)).unwrap();
        assert_eq!(file_mtime_ms(&file).unwrap(), 1_700_000_000_123);
        assert!(file_mtime_ms(&temp.path().join("missing.png")).is_err());
    }
}
