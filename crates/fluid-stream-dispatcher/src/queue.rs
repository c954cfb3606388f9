//!
//! # Work queue
//!
//! FIFO of object keys feeding controller workers.
//!
//! A key is queued at most once and is never handed to two workers at the same time:
//! adding a key that is being processed marks it dirty, and it is queued again once
//! the worker calls [`WorkQueue::done`].
//!
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_channel::{Sender, Receiver, unbounded};
use async_lock::Mutex;
use tracing::{debug, trace};

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;

pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(5);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(1000);

/// per key exponential backoff, `base * 2^failures` capped at `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX)
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn delay(&self, failures: u32) -> Duration {
        self.base
            .checked_mul(2_u32.saturating_pow(failures))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

struct QueueState<K> {
    dirty: HashSet<K>,
    processing: HashSet<K>,
    failures: HashMap<K, u32>,
}

impl<K> Default for QueueState<K> {
    fn default() -> Self {
        Self {
            dirty: HashSet::new(),
            processing: HashSet::new(),
            failures: HashMap::new(),
        }
    }
}

struct QueueInner<K> {
    sender: Sender<K>,
    receiver: Receiver<K>,
    state: Mutex<QueueState<K>>,
    backoff: Backoff,
}

pub struct WorkQueue<K> {
    inner: Arc<QueueInner<K>>,
}

impl<K> Clone for WorkQueue<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K> fmt::Debug for WorkQueue<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WorkQueue(queued: {})", self.inner.receiver.len())
    }
}

impl<K> Default for WorkQueue<K>
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
{
    pub fn new(backoff: Backoff) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            inner: Arc::new(QueueInner {
                sender,
                receiver,
                state: Mutex::new(QueueState::default()),
                backoff,
            }),
        }
    }

    /// queue key unless it is already waiting
    pub async fn add(&self, key: K) {
        if self.is_shutdown() {
            trace!(%key, "queue shut down, dropping");
            return;
        }

        let mut state = self.inner.state.lock().await;
        if !state.dirty.insert(key.clone()) {
            trace!(%key, "already queued");
            return;
        }

        if state.processing.contains(&key) {
            trace!(%key, "in process, deferring");
            return;
        }

        if self.inner.sender.try_send(key).is_err() {
            debug!("queue closed");
        }
    }

    /// wait for next key, `None` once the queue is shut down and drained
    pub async fn get(&self) -> Option<K> {
        let key = self.inner.receiver.recv().await.ok()?;
        let mut state = self.inner.state.lock().await;
        state.dirty.remove(&key);
        state.processing.insert(key.clone());
        Some(key)
    }

    /// release key taken by [`WorkQueue::get`], re-queue if it was added meanwhile
    pub async fn done(&self, key: &K) {
        let mut state = self.inner.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) {
            trace!(%key, "dirty while processing, re-queueing");
            if self.inner.sender.try_send(key.clone()).is_err() {
                debug!("queue closed");
            }
        }
    }

    pub fn add_after(&self, key: K, delay: Duration) {
        let queue = self.clone();
        spawn(async move {
            sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// add after backoff delay for the key, returns the delay
    pub async fn add_rate_limited(&self, key: K) -> Duration {
        let failures = {
            let mut state = self.inner.state.lock().await;
            let failures = state.failures.entry(key.clone()).or_insert(0);
            let current = *failures;
            *failures = failures.saturating_add(1);
            current
        };
        let delay = self.inner.backoff.delay(failures);
        debug!(%key, failures, ?delay, "rate limited requeue");
        self.add_after(key, delay);
        delay
    }

    /// clear failure history of key
    pub async fn forget(&self, key: &K) {
        self.inner.state.lock().await.failures.remove(key);
    }

    pub async fn failures(&self, key: &K) -> u32 {
        self.inner
            .state
            .lock()
            .await
            .failures
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    /// number of keys waiting to be picked up
    pub fn len(&self) -> usize {
        self.inner.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.receiver.is_empty()
    }

    pub fn shutdown(&self) {
        debug!("shutting down work queue");
        self.inner.sender.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.sender.is_closed()
    }
}

#[cfg(test)]
mod test {

    use std::time::Duration;

    use fluvio_future::timer::sleep;

    use super::*;

    fn queue() -> WorkQueue<String> {
        WorkQueue::default()
    }

    #[test]
    fn test_backoff_delay() {
        let backoff = Backoff::new(Duration::from_millis(5), Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::from_millis(5));
        assert_eq!(backoff.delay(1), Duration::from_millis(10));
        assert_eq!(backoff.delay(3), Duration::from_millis(40));
        assert_eq!(backoff.delay(10), Duration::from_secs(1));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(1));
    }

    #[fluvio_future::test]
    async fn test_add_dedupe() {
        let queue = queue();
        queue.add("a".to_owned()).await;
        queue.add("a".to_owned()).await;
        queue.add("b".to_owned()).await;
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.get().await.as_deref(), Some("a"));
        assert_eq!(queue.get().await.as_deref(), Some("b"));
        assert!(queue.is_empty());
    }

    #[fluvio_future::test]
    async fn test_add_while_processing() {
        let queue = queue();
        queue.add("a".to_owned()).await;
        let key = queue.get().await.expect("key");

        // never handed out twice concurrently
        queue.add("a".to_owned()).await;
        queue.add("a".to_owned()).await;
        assert!(queue.is_empty());

        queue.done(&key).await;
        assert_eq!(queue.len(), 1);
        let key = queue.get().await.expect("key");
        queue.done(&key).await;
        assert!(queue.is_empty());
    }

    #[fluvio_future::test]
    async fn test_add_after() {
        let queue = queue();
        queue.add_after("a".to_owned(), Duration::from_millis(50));
        assert!(queue.is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(queue.get().await.as_deref(), Some("a"));
    }

    #[fluvio_future::test]
    async fn test_rate_limited_grows_until_forget() {
        let queue = queue();
        let key = "a".to_owned();

        assert_eq!(queue.add_rate_limited(key.clone()).await, Duration::from_millis(5));
        assert_eq!(queue.add_rate_limited(key.clone()).await, Duration::from_millis(10));
        assert_eq!(queue.add_rate_limited(key.clone()).await, Duration::from_millis(20));
        assert_eq!(queue.failures(&key).await, 3);

        queue.forget(&key).await;
        assert_eq!(queue.failures(&key).await, 0);
        assert_eq!(queue.add_rate_limited(key.clone()).await, Duration::from_millis(5));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(queue.get().await, Some(key));
        assert!(queue.is_empty());
    }

    #[fluvio_future::test]
    async fn test_shutdown() {
        let queue = queue();
        queue.add("a".to_owned()).await;
        queue.shutdown();
        queue.add("b".to_owned()).await;

        // drains what was queued before shutdown
        assert_eq!(queue.get().await.as_deref(), Some("a"));
        assert_eq!(queue.get().await, None);
    }
}
