//! ContentInfo search for packages without a usable manifest

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::path_utils::{find_child_dir, THUMB_EXTS};

/// Conventional folder holding package previews
pub const CONTENT_INFO_DIR: &str = "ContentInfo";

/// First image under `ContentInfo/**`, preferring earlier extensions
///
/// Within one extension the first file in walk order wins; the walk is
/// sorted by file name so the pick is stable.
pub fn locate_via_search(pkg_dir: &Path) -> Option<PathBuf> {
    let content_info = find_child_dir(pkg_dir, CONTENT_INFO_DIR)?;

    let mut first_by_ext: [Option<PathBuf>; THUMB_EXTS.len()] = Default::default();
    for entry in WalkDir::new(&content_info)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let lower = entry.file_name().to_string_lossy().to_lowercase();
        let Some(idx) = THUMB_EXTS.iter().position(|ext| lower.ends_with(ext)) else {
            continue;
        };
        if first_by_ext[idx].is_none() {
            first_by_ext[idx] = Some(entry.into_path());
            if idx == 0 {
                break;
            }
        }
    }

    first_by_ext.into_iter().flatten().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_prefers_png_over_jpg() {
        let temp = tempfile::tempdir().unwrap();
        let ci = temp.path().join("ContentInfo").join("acme");
        fs::create_dir_all(&ci).unwrap();
        fs::write(ci.join("a.jpg"), b"").unwrap();
        fs::write(ci.join("z.PNG"), b"").unwrap();

        assert_eq!(locate_via_search(temp.path()), Some(ci.join("z.PNG")));
    }

    #[test]
    fn test_recurses_and_ignores_other_files() {
        let temp = tempfile::tempdir().unwrap();
        let deep = temp.path().join("ContentInfo").join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(temp.path().join("ContentInfo").join("readme.txt"), b"").unwrap();
        fs::write(deep.join("preview.webp"), b"").unwrap();

        assert_eq!(locate_via_search(temp.path()), Some(deep.join("preview.webp")));
    }

    #[test]
    fn test_no_content_info_or_no_images() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(locate_via_search(temp.path()), None);

        fs::create_dir_all(temp.path().join("ContentInfo")).unwrap();
        fs::write(temp.path().join("ContentInfo").join("thumb.dds"), b"").unwrap();
        assert_eq!(locate_via_search(temp.path()), None);
    }

    #[test]
    fn test_images_outside_content_info_are_ignored() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("ContentInfo")).unwrap();
        fs::write(temp.path().join("thumbnail.png"), b"").unwrap();
        assert_eq!(locate_via_search(temp.path()), None);
    }
}
