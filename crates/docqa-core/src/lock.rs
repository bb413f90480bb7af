//! Per-document mutual exclusion.
//!
//! Processing a document is a remove-then-insert sequence against the
//! vector index, which is not atomic against a concurrent delete or a
//! second processing run of the same document. [`DocumentLocks`] hands out
//! one async mutex per document identity so those runs queue up, while
//! work on different documents proceeds in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive access to one document, released on drop.
pub struct DocumentGuard {
    document: String,
    _guard: OwnedMutexGuard<()>,
}

impl DocumentGuard {
    /// The document this guard holds.
    pub fn document(&self) -> &str {
        &self.document
    }
}

/// Keyed lock table: document identity → async mutex.
#[derive(Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `document`.
    ///
    /// The returned guard releases the lock on drop.
    pub async fn acquire(&self, document: &str) -> DocumentGuard {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Drop entries nobody holds or waits on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry(document.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        DocumentGuard {
            document: document.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of documents with a live lock entry.
    pub fn tracked(&self) -> usize {
        match self.locks.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
