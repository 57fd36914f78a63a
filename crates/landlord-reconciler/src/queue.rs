use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

/// Base and cap for the `AddRateLimited` exponential backoff.
const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

struct Inner<K> {
    /// FIFO of keys ready to be handed out by `get`, minus anything already `processing`.
    queue: Vec<K>,
    /// Keys currently queued (queue membership, for O(1) dedup checks).
    dirty: HashSet<K>,
    /// Keys a worker currently holds via `get` and has not yet `done`.
    processing: HashSet<K>,
    /// Per-key consecutive-failure counts driving `add_rate_limited`'s backoff.
    failures: HashMap<K, u32>,
    shutting_down: bool,
}

impl<K: Eq + Hash + Clone> Default for Inner<K> {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            dirty: HashSet::new(),
            processing: HashSet::new(),
            failures: HashMap::new(),
            shutting_down: false,
        }
    }
}

/// Rate-limiting, deduplicating work queue (C8). Keyed by tenant id string.
///
/// Guarantees at-most-one in-flight `get` per key across all callers: a key
/// `add`ed while already queued or processing is a no-op, and a key `done`
/// while dirty (re-added during processing) is requeued rather than dropped.
pub struct WorkQueue<K: Eq + Hash + Clone + Send + Sync + 'static> {
    inner: Mutex<Inner<K>>,
    notify: Notify,
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static> Default for WorkQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static> WorkQueue<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        }
    }

    /// Enqueues `key` if it is neither already queued nor in flight.
    pub async fn add(&self, key: K) {
        let mut guard = self.inner.lock().await;
        if guard.shutting_down || guard.dirty.contains(&key) {
            return;
        }
        guard.dirty.insert(key.clone());
        if guard.processing.contains(&key) {
            // Already being worked; `done` will notice it's dirty and requeue.
            return;
        }
        guard.queue.push(key);
        drop(guard);
        self.notify.notify_one();
    }

    /// Schedules `key` for re-delivery after an exponential backoff derived
    /// from its failure count (`2^(n-1)` seconds, capped at 5 minutes), then
    /// increments the count.
    pub fn add_rate_limited(self: &Arc<Self>, key: K) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let delay = {
                let mut guard = this.inner.lock().await;
                let count = guard.failures.entry(key.clone()).or_insert(0);
                *count += 1;
                backoff_for(*count)
            };
            tokio::time::sleep(delay).await;
            this.add(key).await;
        });
    }

    /// Clears the failure count tracked for `key`. Call on success.
    pub async fn forget(&self, key: &K) {
        let mut guard = self.inner.lock().await;
        guard.failures.remove(key);
    }

    /// Blocks until a key is available or the queue is shut down. Marks the
    /// returned key (when present) as processing. `(None, true)` on shutdown
    /// with nothing left to drain.
    pub async fn get(&self) -> (Option<K>, bool) {
        loop {
            {
                let mut guard = self.inner.lock().await;
                if let Some(pos) = guard.queue.iter().position(|k| !guard.processing.contains(k)) {
                    let key = guard.queue.remove(pos);
                    guard.dirty.remove(&key);
                    guard.processing.insert(key.clone());
                    return (Some(key), false);
                }
                if guard.shutting_down {
                    return (None, true);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Marks `key` no longer in flight. If it was re-`add`ed while
    /// processing, it is moved back onto the queue immediately.
    pub async fn done(&self, key: &K) {
        let mut guard = self.inner.lock().await;
        guard.processing.remove(key);
        if guard.dirty.contains(key) {
            guard.queue.push(key.clone());
            drop(guard);
            self.notify.notify_one();
        }
    }

    /// Unblocks every current and future `get` caller with `shutdown=true`.
    pub async fn shut_down(&self) {
        let mut guard = self.inner.lock().await;
        guard.shutting_down = true;
        drop(guard);
        self.notify.notify_waiters();
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }
}

fn backoff_for(failure_count: u32) -> Duration {
    let exp = failure_count.saturating_sub(1).min(16);
    let scaled = BASE_BACKOFF.saturating_mul(1u32 << exp);
    scaled.min(MAX_BACKOFF)
}
