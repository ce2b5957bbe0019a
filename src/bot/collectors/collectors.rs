//! Pending "wait for the next X" subscriptions.
//!
//! Each registry maps a key to at most one pending collector. A collector
//! leaves its registry exactly once: when it has matched `max_usage` items,
//! when its deadline passes, when a newer collector takes its key, or on
//! shutdown. Every removal goes through the map's shard lock, so the match
//! path and the timeout path can never both fulfill the same collector.

use std::{
    fmt::Debug,
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::debug;

pub type CollectorFilter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

type Outcome<T> = Result<Vec<T>, CollectorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error("collector timed out before anything matched")]
    TimedOut,
    #[error("collector was replaced by a newer one on the same key")]
    Replaced,
    #[error("bot is shutting down")]
    Shutdown,
}

pub struct CollectorOptions<T> {
    pub filter: Option<CollectorFilter<T>>,
    pub max_usage: usize,
    /// Falls back to the registry default when unset.
    pub timeout: Option<Duration>,
}

impl<T> Default for CollectorOptions<T> {
    fn default() -> Self {
        CollectorOptions { filter: None, max_usage: 1, timeout: None }
    }
}

impl<T> Clone for CollectorOptions<T> {
    fn clone(&self) -> Self {
        CollectorOptions { filter: self.filter.clone(), max_usage: self.max_usage, timeout: self.timeout }
    }
}

impl<T> CollectorOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn max_usage(mut self, max_usage: usize) -> Self {
        self.max_usage = max_usage;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

struct Collector<T> {
    id: u64,
    filter: Option<CollectorFilter<T>>,
    max_usage: usize,
    collected: Vec<T>,
    tx: oneshot::Sender<Outcome<T>>,
    timer: Option<JoinHandle<()>>,
}

impl<T> Collector<T> {
    fn finish(self, outcome: Outcome<T>) {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        // The waiter may have given up; nothing left to do then.
        let _ = self.tx.send(outcome);
    }
}

/// The waiting half of a subscription.
pub struct Pending<T> {
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> Pending<T> {
    /// Resolves with the first collected item.
    pub async fn one(self) -> Result<T, CollectorError> {
        self.many().await?.into_iter().next().ok_or(CollectorError::TimedOut)
    }

    /// Resolves with every collected item, in arrival order. A timeout after
    /// at least one match resolves with the partial list.
    pub async fn many(self) -> Result<Vec<T>, CollectorError> {
        self.rx.await.unwrap_or(Err(CollectorError::Shutdown))
    }
}

pub struct CollectorRegistry<K, T> {
    entries: Arc<DashMap<K, Collector<T>>>,
    next_id: AtomicU64,
    default_timeout: Duration,
}

impl<K, T> CollectorRegistry<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(default_timeout: Duration) -> Self {
        CollectorRegistry { entries: Arc::new(DashMap::new()), next_id: AtomicU64::new(0), default_timeout }
    }

    /// Registers a collector and arms its deadline timer. Must be called
    /// from inside a tokio runtime.
    pub fn subscribe(&self, key: K, options: CollectorOptions<T>) -> Pending<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        let collector = Collector {
            id,
            filter: options.filter,
            max_usage: options.max_usage.max(1),
            collected: Vec::new(),
            tx,
            timer: None,
        };
        if let Some(previous) = self.entries.insert(key.clone(), collector) {
            debug!("Collector {:?} replaced by a newer subscription", key);
            previous.finish(Err(CollectorError::Replaced));
        }

        let entries = Arc::clone(&self.entries);
        let timer_key = key.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expire(&entries, &timer_key, id);
        });
        match self.entries.get_mut(&key) {
            Some(mut collector) if collector.id == id => collector.timer = Some(timer),
            // Already gone; the timer finds nothing to expire.
            _ => {}
        }

        Pending { rx }
    }

    /// Offers an arriving event to the collector under `key`. Returns true
    /// when the collector accepted it.
    ///
    /// Filters run under the registry's shard lock and must not touch this
    /// registry.
    pub fn feed(&self, key: &K, item: &T) -> bool {
        let Entry::Occupied(mut slot) = self.entries.entry(key.clone()) else {
            return false;
        };

        let accepted = slot.get().filter.as_ref().map_or(true, |filter| filter(item));
        if !accepted {
            return false;
        }

        let collector = slot.get_mut();
        collector.collected.push(item.clone());
        if collector.collected.len() >= collector.max_usage {
            let mut collector = slot.remove();
            let collected = std::mem::take(&mut collector.collected);
            debug!("Collector {:?} fulfilled with {} item(s)", key, collected.len());
            collector.finish(Ok(collected));
        }
        true
    }

    /// Rejects every pending collector. Used on shutdown.
    pub fn reject_all(&self, error: CollectorError) {
        let keys: Vec<K> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            if let Some((_, collector)) = self.entries.remove(&key) {
                collector.finish(Err(error));
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn expire<K: Eq + Hash + Debug, T>(entries: &DashMap<K, Collector<T>>, key: &K, id: u64) {
    let Some((_, mut collector)) = entries.remove_if(key, |_, collector| collector.id == id) else {
        return;
    };
    // We are the timer; dropping the handle just detaches it.
    collector.timer = None;
    let collected = std::mem::take(&mut collector.collected);
    debug!("Collector {:?} expired with {} item(s)", key, collected.len());
    let outcome = if collected.is_empty() { Err(CollectorError::TimedOut) } else { Ok(collected) };
    collector.finish(outcome);
}
