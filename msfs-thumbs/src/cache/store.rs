//! In-memory thumbnail map with throttled JSON persistence.
//!
//! The whole map is written on every save. Saves requested less than the
//! throttle interval after the previous one only mark the store dirty; a
//! lazily started flusher thread writes them out shortly afterwards.
//!
//! Lock order: `save_lock` before `throttle` or `db`. `throttle` and `db` are
//! never held together.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glob::Pattern;
use serde_json::Value;

use super::entry::CacheEntry;
use super::persist;
use crate::config::EngineConfig;
use crate::core::app_dirs;
use crate::core::clock::Clock;
use crate::core::path_utils::file_mtime_ms;
use crate::error::{ErrorCode, ThumbError, ThumbResult};
use crate::log_debug;
use crate::logger;
use crate::models::ScanStatus;

/// Legacy folder of per-package PNG copies, cleaned on forget/clear
const THUMBS_DIRNAME: &str = "thumbs";

/// How often an idle flusher checks whether its store is gone
const IDLE_POLL: Duration = Duration::from_secs(1);

/// Timing knobs for a store, derived from [`EngineConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    pub negative_ttl_ms: i64,
    pub throttle: Duration,
    pub flush_min: Duration,
    pub flush_max: Duration,
}

impl StoreSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        let (flush_min, flush_max) = config.flush_window();
        Self {
            negative_ttl_ms: config.negative_ttl_ms(),
            throttle: config.throttle(),
            flush_min,
            flush_max,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[derive(Debug, Default)]
struct ThrottleState {
    last_save: Option<Instant>,
    pending: bool,
    deadline: Option<Instant>,
    flusher_started: bool,
}

struct StoreInner {
    path: PathBuf,
    thumbs_dir: PathBuf,
    db: Mutex<HashMap<String, CacheEntry>>,
    save_lock: Mutex<()>,
    throttle: Mutex<ThrottleState>,
    wake: Condvar,
    settings: StoreSettings,
    clock: Arc<dyn Clock>,
}

/// A poisoned lock only means another thread panicked mid-update; the map
/// itself is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn key_of(id: &str) -> String {
    id.to_lowercase()
}

/// Package ids double as file stems in the thumbs folder
fn is_safe_stem(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', ':'])
}

impl StoreInner {
    fn save_now(&self) -> Result<()> {
        let _guard = lock(&self.save_lock);

        // Writes landing after this point re-arm the flusher
        {
            let mut throttle = lock(&self.throttle);
            throttle.pending = false;
            throttle.deadline = None;
            throttle.last_save = Some(Instant::now());
        }

        let data = {
            let db = lock(&self.db);
            let sorted: BTreeMap<&String, &CacheEntry> = db.iter().collect();
            serde_json::to_vec_pretty(&sorted)?
        };

        persist::write_file_atomic(&self.path, &data)
            .with_context(|| format!("Failed to save thumbnail cache {}", self.path.display()))
    }

    fn has_pending(&self) -> bool {
        lock(&self.throttle).pending
    }

    fn flush_pending(&self) -> Result<()> {
        if self.has_pending() {
            self.save_now()?;
        }
        Ok(())
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Err(e) = self.flush_pending() {
            logger::log_error(&format!("{:#}", e), Some("cache"));
        }
    }
}

fn run_flusher(store: Weak<StoreInner>) {
    loop {
        let Some(inner) = store.upgrade() else {
            return;
        };

        let throttle = lock(&inner.throttle);
        let deadline = throttle.deadline;
        match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                drop(throttle);
                if let Err(e) = inner.flush_pending() {
                    logger::log_error(&format!("{:#}", e), Some("cache"));
                }
            }
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                let _ = inner
                    .wake
                    .wait_timeout(throttle, wait)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            None => {
                let _ = inner
                    .wake
                    .wait_timeout(throttle, IDLE_POLL)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        }
    }
}

/// Persistent map from lower-cased package id to [`CacheEntry`]
///
/// Cheap to clone; clones share the same map and file.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

impl CacheStore {
    /// Open (or create) `thumbnails.json` inside `cache_dir`
    ///
    /// A missing or unreadable file starts an empty cache and writes `{}`.
    pub fn open(cache_dir: &Path, settings: StoreSettings, clock: Arc<dyn Clock>) -> Self {
        Self::open_with_legacy(cache_dir, None, settings, clock)
    }

    /// Like [`CacheStore::open`], first copying `legacy` into place if no
    /// cache exists yet in `cache_dir`
    pub fn open_with_legacy(
        cache_dir: &Path,
        legacy: Option<&Path>,
        settings: StoreSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let path = app_dirs::cache_file_in(cache_dir);

        if let Err(e) = fs::create_dir_all(cache_dir) {
            logger::log_error(
                &format!("Failed to create cache dir {}: {}", cache_dir.display(), e),
                Some("cache"),
            );
        }

        if let Some(legacy) = legacy {
            if !path.exists() && legacy.is_file() && legacy != path {
                match fs::copy(legacy, &path) {
                    Ok(_) => logger::log_info(
                        &format!("Migrated thumbnail cache from {}", legacy.display()),
                        Some("cache"),
                    ),
                    Err(e) => logger::log_error(
                        &format!("Failed to migrate {}: {}", legacy.display(), e),
                        Some("cache"),
                    ),
                }
            }
        }

        let (entries, rewrite) = match load_entries(&path) {
            Ok(Some(entries)) => (entries, false),
            Ok(None) => (HashMap::new(), true),
            Err(e) => {
                logger::log_error(
                    &format!("Thumbnail cache unreadable, starting empty: {:#}", e),
                    Some("cache"),
                );
                (HashMap::new(), true)
            }
        };

        logger::log_info(
            &format!("Loaded {} thumbnail entries from {}", entries.len(), path.display()),
            Some("cache"),
        );

        let store = Self {
            inner: Arc::new(StoreInner {
                path,
                thumbs_dir: cache_dir.join(THUMBS_DIRNAME),
                db: Mutex::new(entries),
                save_lock: Mutex::new(()),
                throttle: Mutex::new(ThrottleState::default()),
                wake: Condvar::new(),
                settings,
                clock,
            }),
        };

        if rewrite {
            if let Err(e) = store.inner.save_now() {
                logger::log_error(&format!("{:#}", e), Some("cache"));
            }
        }

        store
    }

    /// Location of the database file
    pub fn file_path(&self) -> &Path {
        &self.inner.path
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.db).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached thumbnail path, without checking the filesystem
    pub fn get(&self, id: &str) -> Option<PathBuf> {
        lock(&self.inner.db)
            .get(&key_of(id))
            .and_then(CacheEntry::path_buf)
    }

    /// Cached thumbnail path, only if the file is still there
    pub fn get_if_exists(&self, id: &str) -> Option<PathBuf> {
        self.get(id).filter(|path| path.exists())
    }

    pub fn entry(&self, id: &str) -> Option<CacheEntry> {
        lock(&self.inner.db).get(&key_of(id)).cloned()
    }

    pub fn scan_status(&self, id: &str) -> ScanStatus {
        let Some(entry) = self.entry(id) else {
            return ScanStatus::Unknown;
        };

        if entry.is_missing() {
            let age = self.now_ms().saturating_sub(entry.last_scan);
            if entry.last_scan == 0 || age >= self.inner.settings.negative_ttl_ms {
                ScanStatus::StaleMissing
            } else {
                ScanStatus::Missing
            }
        } else if Path::new(&entry.path).exists() {
            ScanStatus::Found
        } else {
            ScanStatus::StaleMissing
        }
    }

    /// Record a thumbnail path supplied by the caller
    pub fn set_known_path(&self, id: &str, path: &Path) -> ThumbResult<()> {
        if id.trim().is_empty() {
            return Err(ThumbError::validation("Package id is empty"));
        }
        if !path.exists() {
            return Err(ThumbError::with_details(
                ErrorCode::NotFound,
                "Thumbnail file not found",
                path.display().to_string(),
            ));
        }
        if !path.is_file() {
            return Err(ThumbError::with_details(
                ErrorCode::ValidationFailed,
                "Thumbnail path is not a file",
                path.display().to_string(),
            ));
        }

        let mtime = file_mtime_ms(path)?;
        self.record(
            id,
            CacheEntry::declared(path.to_path_buf(), mtime, self.now_ms()),
        );
        Ok(())
    }

    /// Overwrite the entry for `id` and schedule a save
    pub fn record(&self, id: &str, entry: CacheEntry) {
        lock(&self.inner.db).insert(key_of(id), entry.normalized());
        self.save_throttled();
    }

    /// Drop everything known about `id` and save immediately
    pub fn forget(&self, id: &str) {
        let key = key_of(id);
        lock(&self.inner.db).remove(&key);

        // Try the id as listed, then its lower-cased form
        let mut stems = vec![id];
        if key != id {
            stems.push(key.as_str());
        }
        for stem in stems.into_iter().filter(|s| is_safe_stem(s)) {
            let copy = self.inner.thumbs_dir.join(format!("{}.png", stem));
            if copy.is_file() {
                if let Err(e) = fs::remove_file(&copy) {
                    logger::log_error(
                        &format!("Failed to delete {}: {}", copy.display(), e),
                        Some("cache"),
                    );
                }
            }
        }

        self.save_logged();
    }

    /// Empty the cache and its thumbs folder, then save immediately
    pub fn clear_all(&self) {
        lock(&self.inner.db).clear();

        let dir = self.inner.thumbs_dir.to_string_lossy();
        let pattern = format!("{}/*.png", Pattern::escape(&dir));
        match glob::glob(&pattern) {
            Ok(paths) => {
                for path in paths.filter_map(|p| p.ok()) {
                    if let Err(e) = fs::remove_file(&path) {
                        logger::log_error(
                            &format!("Failed to delete {}: {}", path.display(), e),
                            Some("cache"),
                        );
                    }
                }
            }
            Err(e) => logger::log_error(&format!("Bad thumbs pattern: {}", e), Some("cache")),
        }

        logger::log_info("Thumbnail cache cleared", Some("cache"));
        self.save_logged();
    }

    /// Write the whole map now
    pub fn save_now(&self) -> ThumbResult<()> {
        self.inner.save_now().map_err(ThumbError::from)
    }

    /// Save now, or defer if the last save was too recent
    pub fn save_throttled(&self) {
        let settings = self.inner.settings;
        let mut throttle = lock(&self.inner.throttle);

        let elapsed = throttle.last_save.map(|last| last.elapsed());
        match elapsed {
            Some(elapsed) if elapsed < settings.throttle => {
                if !throttle.pending {
                    throttle.pending = true;
                    let delay = (settings.throttle - elapsed)
                        .max(settings.flush_min)
                        .min(settings.flush_max);
                    throttle.deadline = Some(Instant::now() + delay);
                }
                if !throttle.flusher_started {
                    if self.start_flusher() {
                        throttle.flusher_started = true;
                    } else {
                        drop(throttle);
                        self.save_logged();
                        return;
                    }
                }
                self.inner.wake.notify_all();
            }
            _ => {
                drop(throttle);
                self.save_logged();
            }
        }
    }

    /// Write a deferred save immediately, if one is waiting
    pub fn flush_pending(&self) -> ThumbResult<()> {
        self.inner.flush_pending().map_err(ThumbError::from)
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    fn start_flusher(&self) -> bool {
        let weak = Arc::downgrade(&self.inner);
        let spawned = thread::Builder::new()
            .name("thumb-cache-flush".to_string())
            .spawn(move || run_flusher(weak));
        match spawned {
            Ok(_) => {
                log_debug!("Started thumbnail cache flusher", "cache");
                true
            }
            Err(e) => {
                logger::log_error(
                    &format!("Failed to start flusher thread: {}", e),
                    Some("cache"),
                );
                false
            }
        }
    }

    fn save_logged(&self) {
        if let Err(e) = self.inner.save_now() {
            logger::log_error(&format!("{:#}", e), Some("cache"));
        }
    }
}

/// Parse the cache file
///
/// `Ok(None)` when the file does not exist. Entries that fail to parse are
/// skipped; a top level that is not an object is an error.
fn load_entries(path: &Path) -> Result<Option<HashMap<String, CacheEntry>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()))
        }
    };

    let text = String::from_utf8_lossy(&bytes);
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .with_context(|| format!("Malformed {}", path.display()))?;
    let Value::Object(map) = value else {
        return Err(anyhow::Error::new(ThumbError::corrupted(format!(
            "{} is not a JSON object",
            path.display()
        ))));
    };

    let mut entries = HashMap::with_capacity(map.len());
    for (id, raw) in map {
        match serde_json::from_value::<CacheEntry>(raw) {
            Ok(entry) => {
                entries.insert(key_of(&id), entry.normalized());
            }
            Err(e) => {
                log_debug!(&format!("Skipping cache entry {}: {}", id, e), "cache");
            }
        }
    }
    Ok(Some(entries))
}
