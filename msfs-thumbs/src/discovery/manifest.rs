//! `layout.json` based thumbnail lookup
//!
//! Every package ships a `layout.json` listing its files. Picking the preview
//! from that list is both faster and more precise than walking the package.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::path_utils::{has_image_ext, join_normalized, normalize_manifest_path};
use crate::log_debug;

pub const MANIFEST_FILE: &str = "layout.json";

/// Read the `content[].path` entries of a package manifest
///
/// Items may be bare strings or objects with a string `path`; anything else
/// is skipped.
pub fn manifest_entries(pkg_dir: &Path) -> Result<Vec<String>> {
    let layout = pkg_dir.join(MANIFEST_FILE);
    let bytes = fs::read(&layout).with_context(|| format!("Failed to read {}", layout.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let data: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .with_context(|| format!("Malformed {}", layout.display()))?;

    let content = data
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("{} has no content array", layout.display()))?;

    Ok(content
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("path").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect())
}

/// Priority tier of a lower-cased, `/`-separated manifest path
///
/// 1: ContentInfo thumbnail, 2: ContentInfo screenshot, 3: any ContentInfo
/// image, 4: aircraft thumbnail under SimObjects/Airplanes.
fn tier_of(lower: &str) -> Option<u8> {
    if !has_image_ext(lower) {
        return None;
    }

    if lower.starts_with("contentinfo/") {
        let file_name = lower.rsplit('/').next().unwrap_or(lower);
        if lower.contains("/thumbnail") && file_name.starts_with("thumbnail") {
            return Some(1);
        }
        if lower.contains("/screenshot") {
            return Some(2);
        }
        return Some(3);
    }

    if lower.starts_with("simobjects/airplanes/") && lower.contains("thumbnail") {
        return Some(4);
    }

    None
}

/// Order manifest entries by tier, keeping manifest order inside a tier
///
/// Returns normalized relative paths; entries that do not qualify or try to
/// escape the package are dropped.
pub fn candidates_in_priority(entries: &[String]) -> Vec<String> {
    let mut ranked: Vec<(u8, String)> = entries
        .iter()
        .filter_map(|raw| normalize_manifest_path(raw).ok())
        .filter_map(|normalized| {
            let tier = tier_of(&normalized.to_lowercase())?;
            Some((tier, normalized))
        })
        .collect();
    ranked.sort_by_key(|(tier, _)| *tier);
    ranked.into_iter().map(|(_, path)| path).collect()
}

/// Best thumbnail listed in the package manifest that exists on disk
pub fn locate_via_manifest(pkg_dir: &Path) -> Option<PathBuf> {
    let entries = match manifest_entries(pkg_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log_debug!(&format!("{:#}", e), "manifest");
            return None;
        }
    };

    candidates_in_priority(&entries)
        .into_iter()
        .map(|rel| join_normalized(pkg_dir, &rel))
        .find(|abs| abs.is_file())
}
