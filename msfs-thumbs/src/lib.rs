pub mod cache;
pub mod config;
pub mod core;
pub mod discovery;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod models;
pub mod thumbnails;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

pub use cache::{CacheEntry, CacheStore, StoreSettings};
pub use config::EngineConfig;
pub use error::{ErrorCode, ThumbError, ThumbResult};
pub use jobs::{ThumbnailReady, ThumbnailWorker};
pub use models::{DiscoveryRequest, Provenance, ScanStatus, SimTarget, Source};
pub use thumbnails::ThumbnailCache;

use crate::core::app_dirs;
use crate::core::clock::SystemClock;

const USAGE: &str = "usage: msfs-thumbs <content.xml> <package> [official|community] [fs2020|fs2024]\n       msfs-thumbs --clear";

/// Command-line entry point
pub fn run() -> Result<()> {
    let config = EngineConfig::load();
    if let Err(e) = logger::init(None) {
        eprintln!("Failed to open log file: {}", e);
    }
    if config.debug_logging {
        logger::set_log_level(logger::LogLevel::Debug);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    logger::log_info(&format!("Started with args: {:?}", args), Some("app"));

    match args.first().map(String::as_str) {
        Some("--clear") => {
            let legacy = app_dirs::get_legacy_cache_path();
            let store = CacheStore::open_with_legacy(
                &config.cache_dir(),
                legacy.as_deref(),
                StoreSettings::from_config(&config),
                Arc::new(SystemClock),
            );
            store.clear_all();
            println!("cleared {}", store.file_path().display());
            Ok(())
        }
        Some("-h") | Some("--help") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(_) if args.len() >= 2 => lookup(&args, config),
        _ => bail!("{}", USAGE),
    }
}

fn lookup(args: &[String], config: EngineConfig) -> Result<()> {
    let content_xml = PathBuf::from(&args[0]);
    let package = &args[1];
    let source: Source = match args.get(2) {
        Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
        None => Source::Community,
    };
    let sim: SimTarget = match args.get(3) {
        Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
        None => SimTarget::Fs2024,
    };

    let cache = ThumbnailCache::new(&content_xml, config);
    let found = cache.ensure_discovered(package, source, sim);
    cache.flush().context("Failed to save thumbnail cache")?;

    match found {
        Some(path) => println!("{}", path.display()),
        None => println!("not found"),
    }
    Ok(())
}
