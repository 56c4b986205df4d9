use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a package comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Marketplace / retail content (OneStore folders)
    Official,
    /// User-installed content (Community folder)
    Community,
}

/// Simulator generation a package targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimTarget {
    #[serde(rename = "fs2020", alias = "fs20")]
    Fs2020,
    #[serde(rename = "fs2024", alias = "fs24")]
    Fs2024,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Official => write!(f, "official"),
            Source::Community => write!(f, "community"),
        }
    }
}

impl fmt::Display for SimTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimTarget::Fs2020 => write!(f, "fs2020"),
            SimTarget::Fs2024 => write!(f, "fs2024"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "official" => Ok(Source::Official),
            "community" => Ok(Source::Community),
            other => Err(format!("Unknown package source: {}", other)),
        }
    }
}

impl FromStr for SimTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs2020" | "fs20" | "2020" => Ok(SimTarget::Fs2020),
            "fs2024" | "fs24" | "2024" => Ok(SimTarget::Fs2024),
            other => Err(format!("Unknown simulator: {}", other)),
        }
    }
}

/// One thumbnail lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub package: String,
    pub source: Source,
    pub sim: SimTarget,
}

impl DiscoveryRequest {
    pub fn new(package: impl Into<String>, source: Source, sim: SimTarget) -> Self {
        Self {
            package: package.into(),
            source,
            sim,
        }
    }
}

/// Cache state of a package, for row rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Never scanned
    Unknown,
    /// Cached path exists on disk
    Found,
    /// Scanned, nothing found, negative entry still fresh
    Missing,
    /// Negative entry expired, or the found file disappeared; rescan
    StaleMissing,
}

/// How a cached path was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Supplied by the caller
    #[serde(rename = "content", alias = "content-declared")]
    ContentDeclared,
    /// Listed in the package's layout.json
    #[serde(rename = "layout.json", alias = "manifest")]
    Manifest,
    /// Found by walking ContentInfo
    #[serde(rename = "search", alias = "filesystem-search")]
    FilesystemSearch,
    /// Confirmed absent
    #[serde(rename = "none")]
    None,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::ContentDeclared => "content",
            Provenance::Manifest => "layout.json",
            Provenance::FilesystemSearch => "search",
            Provenance::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_and_sim() {
        assert_eq!("Official".parse::<Source>().unwrap(), Source::Official);
        assert_eq!(" community ".parse::<Source>().unwrap(), Source::Community);
        assert!("marketplace".parse::<Source>().is_err());

        assert_eq!("fs24".parse::<SimTarget>().unwrap(), SimTarget::Fs2024);
        assert_eq!("FS2020".parse::<SimTarget>().unwrap(), SimTarget::Fs2020);
        assert!("fs2004".parse::<SimTarget>().is_err());
    }

    #[test]
    fn test_provenance_wire_names() {
        assert_eq!(
            serde_json::to_string(&Provenance::Manifest).unwrap(),
            "\"layout.json\""
        );
        let parsed: Provenance = serde_json::from_str("\"filesystem-search\"").unwrap();
        assert_eq!(parsed, Provenance::FilesystemSearch);
        assert_eq!(Provenance::None.as_str(), "none");
    }

    #[test]
    fn test_scan_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ScanStatus::StaleMissing).unwrap(),
            "\"stale_missing\""
        );
    }
}
