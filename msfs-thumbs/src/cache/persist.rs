//! Crash-safe file replacement for the cache database.
//!
//! Data goes to a sibling temp file named after the process and thread, is
//! synced, then renamed over the target. A crash before the rename leaves the
//! old file intact. If the temp write or rename fails the data is written
//! directly; the temp file is always removed afterwards.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::logger;

fn thread_tag() -> String {
    let id = format!("{:?}", std::thread::current().id());
    id.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `.<file>.<pid>.<thread>.tmp` next to `destination`
pub fn temp_path_for(destination: &Path) -> Result<PathBuf> {
    let file_name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid destination file name: {}", destination.display()))?;
    let temp_name = format!(".{}.{}.{}.tmp", file_name, std::process::id(), thread_tag());
    Ok(destination.with_file_name(temp_name))
}

/// Write and sync `data` into the temp file for `destination`
pub fn write_temp(destination: &Path, data: &[u8]) -> Result<PathBuf> {
    let temp_path = temp_path_for(destination)?;
    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temporary file '{}'", temp_path.display()))?;
    file.write_all(data)
        .with_context(|| format!("Failed to write temporary file '{}'", temp_path.display()))?;
    file.sync_all()?;
    Ok(temp_path)
}

/// Move a finished temp file over `destination`
pub fn commit(temp_path: &Path, destination: &Path) -> Result<()> {
    fs::rename(temp_path, destination).with_context(|| {
        format!(
            "Failed to replace '{}' with '{}'",
            destination.display(),
            temp_path.display()
        )
    })
}

/// Replace `destination` with `data`, atomically when possible
pub fn write_file_atomic(destination: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let attempt = write_temp(destination, data).and_then(|temp| commit(&temp, destination));

    let result = match attempt {
        Ok(()) => Ok(()),
        Err(e) => {
            logger::log_error(
                &format!("Atomic save failed, writing directly: {:#}", e),
                Some("cache"),
            );
            fs::write(destination, data)
                .with_context(|| format!("Failed to write '{}'", destination.display()))
        }
    };

    if let Ok(temp_path) = temp_path_for(destination) {
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }
    }

    result
}
