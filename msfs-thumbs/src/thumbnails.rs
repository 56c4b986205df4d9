//! Thumbnail lookup with caching
//!
//! [`ThumbnailCache`] answers "which image represents this package" by
//! consulting the persistent cache first and running discovery only when the
//! cached answer is missing, stale, or points at a file that changed.

use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::cache::{CacheEntry, CacheStore, StoreSettings};
use crate::config::EngineConfig;
use crate::core::app_dirs;
use crate::core::clock::{Clock, SystemClock};
use crate::core::path_utils::file_mtime_ms;
use crate::discovery::{self, PackageName, RootResolver};
use crate::error::ThumbResult;
use crate::log_debug;
use crate::logger;
use crate::models::{DiscoveryRequest, ScanStatus, SimTarget, Source};

pub struct ThumbnailCache {
    store: CacheStore,
    resolver: RootResolver,
    config: EngineConfig,
    batch_pool: OnceLock<Option<ThreadPool>>,
}

impl ThumbnailCache {
    /// Build a cache for the simulator owning the activation list at
    /// `content_xml`, persisting to the configured cache directory
    pub fn new(content_xml: &Path, config: EngineConfig) -> Self {
        let resolver = RootResolver::from_content_xml(content_xml);
        let legacy = app_dirs::get_legacy_cache_path();
        let store = CacheStore::open_with_legacy(
            &config.cache_dir(),
            legacy.as_deref(),
            StoreSettings::from_config(&config),
            Arc::new(SystemClock),
        );
        Self::from_parts(store, resolver, config)
    }

    /// Assemble from an explicit resolver and cache location
    pub fn with_resolver(
        resolver: RootResolver,
        cache_dir: &Path,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = CacheStore::open(cache_dir, StoreSettings::from_config(&config), clock);
        Self::from_parts(store, resolver, config)
    }

    pub fn from_parts(store: CacheStore, resolver: RootResolver, config: EngineConfig) -> Self {
        Self {
            store,
            resolver,
            config,
            batch_pool: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn resolver(&self) -> &RootResolver {
        &self.resolver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Thumbnail for `id`, discovering it if the cache cannot answer
    pub fn ensure_discovered(&self, id: &str, source: Source, sim: SimTarget) -> Option<PathBuf> {
        if id.trim().is_empty() {
            return None;
        }

        if let Some(entry) = self.store.entry(id) {
            match entry.path_buf() {
                Some(path) => {
                    if self.is_fresh(&entry, &path) {
                        if let Err(e) = self.store.flush_pending() {
                            logger::log_error(&e.to_string(), Some("thumbnails"));
                        }
                        return Some(path);
                    }
                }
                None => {
                    if self.store.scan_status(id) == ScanStatus::Missing {
                        return None;
                    }
                }
            }
        }

        self.discover(id, source, sim)
    }

    /// Same as [`ThumbnailCache::ensure_discovered`] for a request value
    pub fn ensure(&self, request: &DiscoveryRequest) -> Option<PathBuf> {
        self.ensure_discovered(&request.package, request.source, request.sim)
    }

    fn is_fresh(&self, entry: &CacheEntry, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        match file_mtime_ms(path) {
            Ok(mtime) => (mtime - entry.mtime).abs() <= self.config.mtime_epsilon_ms,
            Err(_) => false,
        }
    }

    fn discover(&self, id: &str, source: Source, sim: SimTarget) -> Option<PathBuf> {
        let name = PackageName::parse(id);
        let roots = self.resolver.roots_for(source, sim);
        let now = self.store.now_ms();

        let Some(found) = discovery::discover_in_roots(&roots, &name) else {
            log_debug!(
                &format!("No thumbnail for {} ({} {}, {} roots)", id, source, sim, roots.len()),
                "thumbnails"
            );
            self.store.record(id, CacheEntry::missing(now));
            return None;
        };

        match file_mtime_ms(&found.path) {
            Ok(mtime) => {
                log_debug!(
                    &format!(
                        "{} -> {} [{}]",
                        id,
                        found.path.display(),
                        found.provenance.as_str()
                    ),
                    "thumbnails"
                );
                self.store.record(
                    id,
                    CacheEntry::found(found.path.clone(), mtime, now, found.provenance),
                );
                Some(found.path)
            }
            Err(e) => {
                logger::log_error(
                    &format!("Cannot stat {}: {:#}", found.path.display(), e),
                    Some("thumbnails"),
                );
                self.store.record(id, CacheEntry::missing(now));
                None
            }
        }
    }

    /// Drop the cached answer for `id` and discover again
    pub fn force_rescan(&self, id: &str, source: Source, sim: SimTarget) -> Option<PathBuf> {
        self.store.forget(id);
        self.ensure_discovered(id, source, sim)
    }

    /// Pool for [`ThumbnailCache::discover_many`], built on first use
    fn batch_pool(&self) -> Option<&ThreadPool> {
        self.batch_pool
            .get_or_init(|| {
                let threads = self.config.max_concurrent_jobs.max(1);
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("thumb-discovery-{}", i))
                    .build()
                {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        logger::log_error(
                            &format!("Thread pool unavailable, resolving sequentially: {}", e),
                            Some("thumbnails"),
                        );
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Resolve a batch in parallel, results in request order
    pub fn discover_many(&self, requests: &[DiscoveryRequest]) -> Vec<Option<PathBuf>> {
        let results = match self.batch_pool() {
            Some(pool) => pool.install(|| {
                requests
                    .par_iter()
                    .map(|request| self.ensure(request))
                    .collect()
            }),
            None => requests.iter().map(|request| self.ensure(request)).collect(),
        };

        if let Err(e) = self.store.flush_pending() {
            logger::log_error(&e.to_string(), Some("thumbnails"));
        }
        results
    }

    pub fn get(&self, id: &str) -> Option<PathBuf> {
        self.store.get(id)
    }

    pub fn get_if_exists(&self, id: &str) -> Option<PathBuf> {
        self.store.get_if_exists(id)
    }

    pub fn scan_status(&self, id: &str) -> ScanStatus {
        self.store.scan_status(id)
    }

    pub fn set_known_path(&self, id: &str, path: &Path) -> ThumbResult<()> {
        self.store.set_known_path(id, path)
    }

    pub fn forget(&self, id: &str) {
        self.store.forget(id);
    }

    pub fn clear_all(&self) {
        self.store.clear_all();
    }

    /// Persist any deferred save now
    pub fn flush(&self) -> ThumbResult<()> {
        self.store.flush_pending()
    }
}
