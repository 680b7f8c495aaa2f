//! Address-keyed cache of completed risk analyses.
//!
//! Entries expire a fixed TTL after insertion. Expiry is enforced on every
//! read; a background sweeper additionally evicts expired entries so the
//! map does not grow without bound.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::RiskAnalysis;

/// Default cache TTL: 24 hours
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default sweep interval: 1 hour
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cached analysis and the instant after which it is stale
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub analysis: RiskAnalysis,
    pub expires_at: DateTime<Utc>,
}

/// Thread-safe analysis cache backed by `DashMap`.
pub struct RiskCache {
    store: DashMap<String, CacheEntry>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl RiskCache {
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
        }
    }

    #[inline]
    fn key(address: &str) -> String {
        address.to_lowercase()
    }

    /// Current time according to the cache's clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Expiry instant for an entry written at `at`
    #[must_use]
    pub fn expiry_from(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Return the cached analysis if its expiry is strictly in the future.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<RiskAnalysis> {
        let key = Self::key(address);
        let now = self.clock.now();

        match self.store.get(&key) {
            Some(entry) if entry.expires_at > now => {
                debug!(address = %key, expires_at = %entry.expires_at, "Cache hit");
                Some(entry.analysis.clone())
            }
            Some(_) => {
                debug!(address = %key, "Cache miss (expired)");
                None
            }
            None => {
                debug!(address = %key, "Cache miss");
                None
            }
        }
    }

    /// Insert or replace the analysis for an address, expiring one TTL from now.
    pub fn put(&self, address: &str, analysis: RiskAnalysis) {
        self.put_until(address, analysis, self.expiry_from(self.clock.now()));
    }

    /// Insert or replace the analysis for an address with an explicit expiry.
    pub fn put_until(&self, address: &str, analysis: RiskAnalysis, expires_at: DateTime<Utc>) {
        let key = Self::key(address);
        self.store.insert(
            key.clone(),
            CacheEntry {
                analysis,
                expires_at,
            },
        );
        debug!(address = %key, expires_at = %expires_at, "Cached risk analysis");
    }

    /// Expiry of the stored entry, whether or not it is still fresh
    #[must_use]
    pub fn expires_at(&self, address: &str) -> Option<DateTime<Utc>> {
        self.store
            .get(&Self::key(address))
            .map(|entry| entry.expires_at)
    }

    /// Remove every entry whose expiry has passed.
    pub fn sweep_expired(&self) {
        let now = self.clock.now();
        self.store.retain(|_, entry| entry.expires_at > now);
        info!(remaining = self.store.len(), "Cache cleanup complete");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Handle to a running cache sweeper task.
///
/// The task stops when [`CacheSweeper::shutdown`] is called, when the handle
/// is dropped, or when the cache itself is dropped.
pub struct CacheSweeper {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl CacheSweeper {
    /// Spawn a task that sweeps `cache` every `interval`.
    ///
    /// The task holds only a weak reference, so it never keeps the cache alive.
    /// A zero interval falls back to [`DEFAULT_SWEEP_INTERVAL`].
    #[must_use]
    pub fn spawn(cache: &Arc<RiskCache>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!(
                default_secs = DEFAULT_SWEEP_INTERVAL.as_secs(),
                "Zero cache sweep interval, using default"
            );
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sweep_loop(Arc::downgrade(cache), interval, shutdown_rx));
        info!(interval_secs = interval.as_secs(), "Cache sweeper started");
        Self {
            handle: Some(handle),
            shutdown_tx,
        }
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Cache sweeper task ended abnormally");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn sweep_loop(
    cache: Weak<RiskCache>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped, stopping sweeper");
                    break;
                };
                cache.sweep_expired();
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Cache sweeper shutting down");
                    break;
                }
            }
        }
    }
}
