//! Keyed trailing-edge debounce for search and filter requests.
//!
//! Each caller (a browser session, usually) gets its own key. A call waits
//! for the configured delay; if another call for the same key arrived in the
//! meantime, the earlier one gives up without running. Dropping a pending
//! call cancels it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default delay for search boxes.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(400);

/// Tickets are process-wide so a key that is removed and re-added never sees
/// an old ticket match.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Keyed debouncer. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    latest: Arc<Mutex<HashMap<K, u64>>>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait out the delay. `true` if this is still the newest call for `key`.
    pub async fn settle(&self, key: K) -> bool {
        let ticket = NEXT_TICKET.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(key.clone(), ticket);

        let pending = Pending {
            latest: &self.latest,
            key,
            ticket,
        };
        tokio::time::sleep(self.delay).await;
        pending.is_latest()
    }

    /// Run `work` after the delay unless superseded. `None` when superseded.
    pub async fn run<F: Future>(&self, key: K, work: F) -> Option<F::Output> {
        if self.settle(key).await {
            Some(work.await)
        } else {
            None
        }
    }

    /// Number of keys with a call in flight.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, u64>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Eq + Hash + Clone> Default for Debouncer<K> {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

/// Clears the key's entry when the newest call finishes or is dropped.
struct Pending<'a, K: Eq + Hash> {
    latest: &'a Mutex<HashMap<K, u64>>,
    key: K,
    ticket: u64,
}

impl<K: Eq + Hash> Pending<'_, K> {
    fn is_latest(&self) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key)
            == Some(&self.ticket)
    }
}

impl<K: Eq + Hash> Drop for Pending<'_, K> {
    fn drop(&mut self) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if latest.get(&self.key) == Some(&self.ticket) {
            latest.remove(&self.key);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_fires() {
        let debouncer = Debouncer::new(Duration::from_millis(400));
        let fired = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..3_usize {
            let debouncer = debouncer.clone();
            let fired = Arc::clone(&fired);
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100 * i as u64)).await;
                debouncer
                    .run("session-a", async move {
                        fired.fetch_add(1, Ordering::SeqCst);
                        i
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(results, vec![None, None, Some(2)]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new(Duration::from_millis(400));
        let (a, b) = tokio::join!(debouncer.settle("a"), debouncer.settle("b"));
        assert!(a && b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_never_fires() {
        let debouncer = Debouncer::new(Duration::from_millis(400));
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let call = debouncer.run(1_u32, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(100), call).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending(), 0);
    }
}
