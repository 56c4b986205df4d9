//! Cache entry definitions.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::models::Provenance;

/// Result of the latest discovery attempt for one package.
///
/// An empty `path` means "confirmed absent" and always pairs with
/// [`Provenance::None`]; use the constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub path: String,
    /// File mtime in ms since the Unix epoch
    #[serde(default, deserialize_with = "de_millis")]
    pub mtime: i64,
    /// Last scan in ms since the Unix epoch; 0 means never / unknown
    #[serde(rename = "lastScanUtc", default, deserialize_with = "de_millis")]
    pub last_scan: i64,
    #[serde(rename = "source", default = "default_provenance")]
    pub provenance: Provenance,
}

fn default_provenance() -> Provenance {
    Provenance::None
}

/// Timestamps written by older builds may be floats or null
fn de_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
        .unwrap_or(0))
}

impl CacheEntry {
    /// Thumbnail located by a discovery strategy
    pub fn found(path: PathBuf, mtime: i64, scanned_at: i64, provenance: Provenance) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            mtime,
            last_scan: scanned_at,
            provenance,
        }
        .normalized()
    }

    /// Thumbnail supplied by the caller
    pub fn declared(path: PathBuf, mtime: i64, now: i64) -> Self {
        Self::found(path, mtime, now, Provenance::ContentDeclared)
    }

    /// Negative entry: scanned, nothing found
    pub fn missing(scanned_at: i64) -> Self {
        Self {
            path: String::new(),
            mtime: 0,
            last_scan: scanned_at,
            provenance: Provenance::None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.path.is_empty()
    }

    pub fn path_buf(&self) -> Option<PathBuf> {
        (!self.path.is_empty()).then(|| PathBuf::from(&self.path))
    }

    /// Restore the path/provenance invariant on data read from disk
    pub fn normalized(mut self) -> Self {
        if self.path.is_empty() {
            self.provenance = Provenance::None;
        } else if self.provenance == Provenance::None {
            self.provenance = Provenance::FilesystemSearch;
        }
        self
    }
}
