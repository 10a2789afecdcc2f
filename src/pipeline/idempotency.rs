//! Short-lived outcome cache keyed by the client's idempotency key.
//!
//! # Design Decisions
//! - First completion wins; a live entry is never overwritten
//! - Expired entries are treated as absent and removed lazily on lookup
//! - A background sweep drops expired entries one key at a time
//! - No in-flight marker: duplicate keys that race before the first
//!   completion both execute

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::pipeline::outcome::Outcome;

#[derive(Debug, Clone)]
struct CachedOutcome {
    outcome: Outcome,
    inserted_at: Instant,
}

/// Thread-safe TTL cache of pipeline outcomes.
#[derive(Clone)]
pub struct IdempotencyCache {
    inner: Arc<DashMap<String, CachedOutcome>>,
    ttl: Duration,
}

impl IdempotencyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, entry: &CachedOutcome, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) < self.ttl
    }

    /// Outcome previously stored for `key`, if it has not expired.
    pub fn lookup(&self, key: &str) -> Option<Outcome> {
        let now = Instant::now();
        let found = self.inner.get(key).map(|e| (self.is_live(&e, now), e.outcome.clone()));

        match found {
            Some((true, outcome)) => {
                metrics::record_idempotency_lookup("hit");
                Some(outcome)
            }
            Some((false, _)) => {
                // Re-check under the shard lock; a fresh store may have landed.
                self.inner.remove_if(key, |_, e| !self.is_live(e, now));
                metrics::record_idempotency_lookup("expired");
                metrics::record_idempotency_entries(self.inner.len());
                None
            }
            None => {
                metrics::record_idempotency_lookup("miss");
                None
            }
        }
    }

    /// Remember `outcome` for `key` unless a live entry already exists.
    ///
    /// Returns `false` when an earlier outcome was kept.
    pub fn store(&self, key: &str, outcome: Outcome) -> bool {
        let now = Instant::now();
        let fresh = CachedOutcome {
            outcome,
            inserted_at: now,
        };

        let stored = match self.inner.entry(key.to_owned()) {
            Entry::Occupied(mut existing) => {
                if self.is_live(existing.get(), now) {
                    false
                } else {
                    existing.insert(fresh);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
        };

        if !stored {
            tracing::debug!(idempotency_key = %key, "Keeping earlier cached outcome");
        }
        metrics::record_idempotency_entries(self.inner.len());
        stored
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, e| self.is_live(e, now));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_idempotency_entries(self.inner.len());
        removed
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Sweep expired entries every `interval` until shutdown.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = cache.len(), "Swept idempotency cache");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Idempotency sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}
