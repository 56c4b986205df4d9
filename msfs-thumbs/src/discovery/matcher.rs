//! Package folder matching
//!
//! Package ids in the activation list do not always equal their folder name:
//! they may carry a source/sim prefix, livery packages point at their parent
//! aircraft, and folders often have extra version or publisher tokens.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Naming prefixes used by the activation list, checked in order
const ID_PREFIXES: [&str; 4] = ["fs24-", "fs20-", "communityfs24-", "communityfs20-"];

/// Separator between an aircraft package and one of its liveries
const LIVERY_SEPARATOR: &str = "-livery-";

/// A package id split into the folder names worth trying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageName {
    /// Id exactly as listed
    pub raw: String,
    /// Id with a known prefix removed
    pub folder: String,
    /// `folder` truncated at the livery separator
    pub base: String,
}

impl PackageName {
    pub fn parse(raw: &str) -> Self {
        let folder = strip_id_prefix(raw).to_string();
        let base = match folder.to_ascii_lowercase().find(LIVERY_SEPARATOR) {
            Some(pos) => folder[..pos].to_string(),
            None => folder.clone(),
        };
        Self {
            raw: raw.to_string(),
            folder,
            base,
        }
    }

    /// Exact folder names in the order they are tried
    pub fn exact_candidates(&self) -> [&str; 3] {
        [self.base.as_str(), self.folder.as_str(), self.raw.as_str()]
    }

    /// Tokens every fuzzy match must contain
    pub fn wanted_tokens(&self) -> HashSet<String> {
        tokenize(&self.base)
    }
}

fn strip_id_prefix(name: &str) -> &str {
    for prefix in ID_PREFIXES {
        let matches = name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            return &name[prefix.len()..];
        }
    }
    name
}

/// Lower-cased tokens split on runs of `-`, `_` and whitespace
pub fn tokenize(s: &str) -> HashSet<String> {
    s.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Locate the folder of `name` directly inside `root`
///
/// Exact names are tried first. Otherwise the first subdirectory (by name)
/// whose tokens cover all wanted tokens is accepted.
pub fn locate_package_dir(root: &Path, name: &PackageName) -> Option<PathBuf> {
    for candidate in name.exact_candidates() {
        if candidate.is_empty() {
            continue;
        }
        let path = root.join(candidate);
        if path.is_dir() {
            return Some(path);
        }
    }

    let wanted = name.wanted_tokens();
    if wanted.is_empty() {
        return None;
    }
    fuzzy_match(root, &wanted)
}

fn fuzzy_match(root: &Path, wanted: &HashSet<String>) -> Option<PathBuf> {
    let read_dir = fs::read_dir(root).ok()?;

    let mut dirs: Vec<(String, PathBuf)> = read_dir
        .flatten()
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    // Stable order across filesystems
    dirs.sort_by(|a, b| a.0.cmp(&b.0));

    dirs.into_iter()
        .find(|(folder_name, _)| wanted.is_subset(&tokenize(folder_name)))
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_prefix_and_livery() {
        let name = PackageName::parse("FS24-acme-a320-livery-blue-sky");
        assert_eq!(name.raw, "FS24-acme-a320-livery-blue-sky");
        assert_eq!(name.folder, "acme-a320-livery-blue-sky");
        assert_eq!(name.base, "acme-a320");

        let community = PackageName::parse("communityfs20-mytraffic");
        assert_eq!(community.folder, "mytraffic");

        let plain = PackageName::parse("asobo-aircraft-c172");
        assert_eq!(plain.folder, plain.raw);
        assert_eq!(plain.base, plain.raw);
    }

    #[test]
    fn test_parse_livery_separator_is_case_insensitive() {
        let name = PackageName::parse("acme-a320-LIVERY-red");
        assert_eq!(name.base, "acme-a320");
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Acme__A320  neo-v2");
        let expected: HashSet<String> = ["acme", "a320", "neo", "v2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
        assert!(tokenize("--__").is_empty());
    }

    #[test]
    fn test_exact_match_prefers_base() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("acme-a320")).unwrap();
        fs::create_dir(temp.path().join("fs24-acme-a320")).unwrap();

        let name = PackageName::parse("fs24-acme-a320");
        assert_eq!(
            locate_package_dir(temp.path(), &name),
            Some(temp.path().join("acme-a320"))
        );
    }

    #[test]
    fn test_exact_match_falls_back_to_raw() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("fs24-acme-a320")).unwrap();

        let name = PackageName::parse("fs24-acme-a320");
        assert_eq!(
            locate_package_dir(temp.path(), &name),
            Some(temp.path().join("fs24-acme-a320"))
        );
    }

    #[test]
    fn test_fuzzy_superset_match() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("acme-a320-neo-v2")).unwrap();
        fs::create_dir(temp.path().join("acme-a321-neo")).unwrap();

        let name = PackageName::parse("neo_a320-acme");
        assert_eq!(
            locate_package_dir(temp.path(), &name),
            Some(temp.path().join("acme-a320-neo-v2"))
        );
    }

    #[test]
    fn test_fuzzy_requires_every_token() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("acme-a320")).unwrap();

        let name = PackageName::parse("acme-a320-neo");
        assert_eq!(locate_package_dir(temp.path(), &name), None);
    }

    #[test]
    fn test_files_are_not_package_dirs() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("acme-a320"), b"").unwrap();
        fs::write(temp.path().join("acme-a320-neo"), b"").unwrap();

        let name = PackageName::parse("acme-a320");
        assert_eq!(locate_package_dir(temp.path(), &name), None);
    }

    #[test]
    fn test_missing_root_and_empty_name() {
        let temp = tempfile::tempdir().unwrap();
        let name = PackageName::parse("acme-a320");
        assert_eq!(locate_package_dir(&temp.path().join("nope"), &name), None);

        fs::create_dir(temp.path().join("anything")).unwrap();
        assert_eq!(locate_package_dir(temp.path(), &PackageName::parse("fs24-")), None);
    }
}
