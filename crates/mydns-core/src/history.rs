// # History Log
//
// Append-only record of completed update attempts.
//
// ## Ordering
//
// Entries are stored in insertion (completion) order. `snapshot()` presents them
// newest-first: timestamp descending, ties broken by most recent insertion.
//
// ## Observation
//
// Observers either poll `snapshot()` or subscribe to the entry count through a
// watch channel. `watch()` turns that into a stream of snapshots for a live view.
//
// Growth is unbounded; entries accumulate for the lifetime of the process.

use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use crate::traits::UpdateResult;

/// In-memory history of update results
///
/// Cloning is cheap and every clone shares the same entries.
///
/// # Example
///
/// ```rust
/// use mydns_core::{HistoryLog, UpdateResult};
///
/// let history = HistoryLog::new();
/// history.append(UpdateResult::success());
/// history.append(UpdateResult::failure());
///
/// assert_eq!(history.len(), 2);
/// assert!(!history.snapshot()[0].status.is_success());
/// ```
#[derive(Debug, Clone)]
pub struct HistoryLog {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: RwLock<Vec<UpdateResult>>,
    len_tx: watch::Sender<usize>,
}

impl HistoryLog {
    /// Create an empty history
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(Vec::new()),
                len_tx,
            }),
        }
    }

    /// Append a completed attempt
    pub fn append(&self, result: UpdateResult) {
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.push(result);
        // Published under the lock so observers never see counts out of order
        self.inner.len_tx.send_replace(entries.len());
    }

    /// Entries newest-first
    pub fn snapshot(&self) -> Vec<UpdateResult> {
        let entries = self
            .inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ordered: Vec<UpdateResult> = entries.iter().rev().copied().collect();
        drop(entries);

        // Stable sort keeps the reversed insertion order for equal timestamps
        ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        ordered
    }

    /// Most recent entry by display order
    pub fn latest(&self) -> Option<UpdateResult> {
        self.snapshot().into_iter().next()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to the entry count
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.len_tx.subscribe()
    }

    /// Stream of snapshots, starting with the current one
    ///
    /// Intermediate snapshots may be coalesced when appends outpace the consumer;
    /// the latest state is always delivered.
    pub fn watch(&self) -> Pin<Box<dyn Stream<Item = Vec<UpdateResult>> + Send + 'static>> {
        let history = self.clone();
        let stream = WatchStream::new(self.subscribe()).map(move |_| history.snapshot());
        Box::pin(stream)
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}
