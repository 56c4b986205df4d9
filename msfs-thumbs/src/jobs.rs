//! Background thumbnail resolution
//!
//! UI rows ask for thumbnails as they scroll into view. [`ThumbnailWorker`]
//! runs those lookups on the blocking pool with bounded concurrency, ignores
//! repeat requests for a package that is still being resolved, and reports
//! each result on a channel.

use dashmap::DashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;

use crate::log_debug;
use crate::logger;
use crate::models::{DiscoveryRequest, ScanStatus};
use crate::thumbnails::ThumbnailCache;

/// Outcome of one background lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailReady {
    pub package: String,
    pub path: Option<PathBuf>,
    pub status: ScanStatus,
}

pub struct ThumbnailWorker {
    cache: Arc<ThumbnailCache>,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<DashSet<String>>,
    sender: UnboundedSender<ThumbnailReady>,
}

impl ThumbnailWorker {
    pub fn new(
        cache: Arc<ThumbnailCache>,
        max_concurrent: usize,
    ) -> (Self, UnboundedReceiver<ThumbnailReady>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Self {
            cache,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            in_flight: Arc::new(DashSet::new()),
            sender,
        };
        (worker, receiver)
    }

    pub fn cache(&self) -> &Arc<ThumbnailCache> {
        &self.cache
    }

    /// Queue a lookup; `false` if the package is already being resolved
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&self, request: DiscoveryRequest) -> bool {
        self.dispatch(request, false)
    }

    /// Like [`ThumbnailWorker::request`], discarding the cached answer first
    pub fn refresh(&self, request: DiscoveryRequest) -> bool {
        self.dispatch(request, true)
    }

    pub fn is_in_flight(&self, package: &str) -> bool {
        self.in_flight.contains(&package.to_lowercase())
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn dispatch(&self, request: DiscoveryRequest, forget_first: bool) -> bool {
        let key = request.package.to_lowercase();
        if key.trim().is_empty() {
            return false;
        }
        if !self.in_flight.insert(key.clone()) {
            log_debug!(&format!("{} already in flight", request.package), "jobs");
            return false;
        }

        let cache = self.cache.clone();
        let semaphore = self.semaphore.clone();
        let in_flight = self.in_flight.clone();
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    in_flight.remove(&key);
                    return;
                }
            };

            let package = request.package.clone();
            let result = tokio::task::spawn_blocking(move || {
                if forget_first {
                    cache.forget(&request.package);
                }
                let path = cache.ensure(&request);
                let status = cache.scan_status(&request.package);
                (path, status)
            })
            .await;

            in_flight.remove(&key);
            match result {
                Ok((path, status)) => {
                    // Receiver gone means nobody is listening any more
                    let _ = sender.send(ThumbnailReady {
                        package,
                        path,
                        status,
                    });
                }
                Err(e) => logger::log_error(
                    &format!("Thumbnail job for {} failed: {}", package, e),
                    Some("jobs"),
                ),
            }
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::clock::ManualClock;
    use crate::discovery::{RootResolver, SimInstall};
    use crate::models::{SimTarget, Source};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn worker(temp: &TempDir, max: usize) -> (ThumbnailWorker, UnboundedReceiver<ThumbnailReady>) {
        let install = SimInstall {
            localcache: temp.path().join("LocalCache"),
            installed_root: Some(temp.path().join("Installed")),
        };
        let cache = ThumbnailCache::with_resolver(
            RootResolver::new(install, None),
            &temp.path().join("cache"),
            EngineConfig::default(),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        );
        ThumbnailWorker::new(Arc::new(cache), max)
    }

    fn add_thumb(temp: &TempDir, package: &str) -> PathBuf {
        let dir = temp
            .path()
            .join("Installed")
            .join("Community")
            .join(package)
            .join("ContentInfo");
        fs::create_dir_all(&dir).unwrap();
        let thumb = dir.join("thumbnail.png");
        fs::write(&thumb, b"png").unwrap();
        thumb
    }

    fn community(package: &str) -> DiscoveryRequest {
        DiscoveryRequest::new(package, Source::Community, SimTarget::Fs2024)
    }

    #[tokio::test]
    async fn test_request_reports_result() {
        let temp = tempfile::tempdir().unwrap();
        let thumb = add_thumb(&temp, "acme-a320");
        let (worker, mut rx) = worker(&temp, 3);

        assert!(worker.request(community("acme-a320")));
        let ready = rx.recv().await.unwrap();
        assert_eq!(
            ready,
            ThumbnailReady {
                package: "acme-a320".to_string(),
                path: Some(thumb),
                status: ScanStatus::Found,
            }
        );
        assert!(!worker.is_in_flight("acme-a320"));
    }

    #[tokio::test]
    async fn test_duplicate_request_is_ignored() {
        let temp = tempfile::tempdir().unwrap();
        let (worker, mut rx) = worker(&temp, 3);

        assert!(worker.request(community("Nothing-Here")));
        assert!(!worker.request(community("nothing-here")));
        assert!(worker.is_in_flight("NOTHING-HERE"));
        assert!(!worker.request(DiscoveryRequest::new("", Source::Community, SimTarget::Fs2024)));

        let ready = rx.recv().await.unwrap();
        assert_eq!(ready.path, None);
        assert_eq!(ready.status, ScanStatus::Missing);
        assert!(rx.try_recv().is_err());

        // Finished packages can be requested again
        assert!(worker.request(community("nothing-here")));
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_rescans_negative_entry() {
        let temp = tempfile::tempdir().unwrap();
        let (worker, mut rx) = worker(&temp, 1);

        worker.request(community("late-pkg"));
        assert_eq!(rx.recv().await.unwrap().status, ScanStatus::Missing);

        let thumb = add_thumb(&temp, "late-pkg");
        worker.request(community("late-pkg"));
        assert_eq!(rx.recv().await.unwrap().path, None);

        assert!(worker.refresh(community("late-pkg")));
        let ready = rx.recv().await.unwrap();
        assert_eq!(ready.path.as_deref(), Some(Path::new(&thumb)));
        assert_eq!(ready.status, ScanStatus::Found);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bounded_batch_completes() {
        let temp = tempfile::tempdir().unwrap();
        for i in 0..10 {
            add_thumb(&temp, &format!("pkg-{}", i));
        }
        let (worker, mut rx) = worker(&temp, 2);

        for i in 0..10 {
            assert!(worker.request(community(&format!("pkg-{}", i))));
        }

        let mut seen = Vec::new();
        for _ in 0..10 {
            let ready = rx.recv().await.unwrap();
            assert_eq!(ready.status, ScanStatus::Found);
            seen.push(ready.package);
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 10);
        assert_eq!(worker.in_flight_count(), 0);
    }
}
