//! Typed document collections with optimistic transactions
//!
//! Each collection keeps versioned documents behind an async RwLock. A
//! mutation is a read-compute-conditionally-write cycle: the closure runs on
//! a clone of the document, and the write commits only if the version is
//! unchanged since the read. Conflicting writers retry up to the configured
//! attempt budget and then surface `Unavailable` for the caller to retry
//! manually.
//!
//! Every commit publishes the full collection snapshot on a watch channel;
//! consumers replace their local state wholesale rather than patching it.

use std::collections::HashMap;

use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A document that can live in a [`Collection`].
pub trait Document: Clone + Send + Sync + 'static {
    /// Human-readable resource name, used in NotFound/Duplicate messages.
    const RESOURCE: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Clone)]
pub(crate) struct Versioned<T> {
    pub(crate) version: u64,
    pub(crate) doc: T,
}

/// A typed in-memory document collection.
pub struct Collection<T: Document> {
    pub(crate) docs: RwLock<HashMap<Uuid, Versioned<T>>>,
    pub(crate) tx: watch::Sender<Vec<T>>,
    max_txn_attempts: u32,
}

impl<T: Document> Collection<T> {
    pub fn new(max_txn_attempts: u32) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            docs: RwLock::new(HashMap::new()),
            tx,
            max_txn_attempts,
        }
    }

    /// Insert a new document; the id must not already exist.
    pub async fn insert(&self, doc: T) -> AppResult<T> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&doc.id()) {
            return Err(AppError::DuplicateEntry(T::RESOURCE.to_string()));
        }
        docs.insert(
            doc.id(),
            Versioned {
                version: 1,
                doc: doc.clone(),
            },
        );
        let snapshot = Self::materialize(&docs);
        drop(docs);
        self.tx.send_replace(snapshot);
        Ok(doc)
    }

    /// Fetch a document or fail with NotFound.
    pub async fn get(&self, id: Uuid) -> AppResult<T> {
        self.find(id)
            .await
            .ok_or_else(|| AppError::NotFound(T::RESOURCE.to_string()))
    }

    pub async fn find(&self, id: Uuid) -> Option<T> {
        self.docs.read().await.get(&id).map(|v| v.doc.clone())
    }

    /// All documents matching the filter. Ordering is the caller's concern.
    pub async fn list<F>(&self, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.docs
            .read()
            .await
            .values()
            .filter(|v| filter(&v.doc))
            .map(|v| v.doc.clone())
            .collect()
    }

    /// Atomic single-document transaction.
    ///
    /// The closure receives a mutable clone of the current document; the
    /// write commits only if no other writer committed in between. A closure
    /// error aborts with no write. Retry exhaustion surfaces `Unavailable`.
    pub async fn update<R, F>(&self, id: Uuid, mut txn: F) -> AppResult<(T, R)>
    where
        F: FnMut(&mut T) -> AppResult<R>,
    {
        for _ in 0..self.max_txn_attempts {
            let (mut doc, version) = self.read_versioned(id).await?;
            let result = txn(&mut doc)?;

            let mut docs = self.docs.write().await;
            match docs.get_mut(&id) {
                None => return Err(AppError::NotFound(T::RESOURCE.to_string())),
                Some(entry) if entry.version == version => {
                    entry.version += 1;
                    entry.doc = doc.clone();
                    let snapshot = Self::materialize(&docs);
                    drop(docs);
                    self.tx.send_replace(snapshot);
                    return Ok((doc, result));
                }
                // Lost the race; re-read and retry
                Some(_) => continue,
            }
        }
        Err(AppError::Unavailable(format!(
            "Transaction on {} exhausted its retry budget",
            T::RESOURCE
        )))
    }

    /// Delete a document after the predicate accepts its current state.
    pub async fn remove_if<F>(&self, id: Uuid, check: F) -> AppResult<T>
    where
        F: Fn(&T) -> AppResult<()>,
    {
        let mut docs = self.docs.write().await;
        let entry = docs
            .get(&id)
            .ok_or_else(|| AppError::NotFound(T::RESOURCE.to_string()))?;
        check(&entry.doc)?;
        let removed = docs.remove(&id).map(|v| v.doc);
        let snapshot = Self::materialize(&docs);
        drop(docs);
        self.tx.send_replace(snapshot);
        removed.ok_or_else(|| AppError::NotFound(T::RESOURCE.to_string()))
    }

    pub async fn remove(&self, id: Uuid) -> AppResult<T> {
        self.remove_if(id, |_| Ok(())).await
    }

    /// Open a change subscription delivering full snapshots. Dropping the
    /// handle cancels it.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub(crate) async fn read_versioned(&self, id: Uuid) -> AppResult<(T, u64)> {
        let docs = self.docs.read().await;
        docs.get(&id)
            .map(|v| (v.doc.clone(), v.version))
            .ok_or_else(|| AppError::NotFound(T::RESOURCE.to_string()))
    }

    pub(crate) fn materialize(docs: &HashMap<Uuid, Versioned<T>>) -> Vec<T> {
        docs.values().map(|v| v.doc.clone()).collect()
    }

    pub(crate) fn publish(&self, snapshot: Vec<T>) {
        self.tx.send_replace(snapshot);
    }
}

/// Cancellable handle to a collection's change feed.
///
/// Each delivery is the authoritative full snapshot of the collection;
/// consumers must replace local state, not patch it. The subscription is
/// released when the handle is dropped.
pub struct Subscription<T> {
    rx: watch::Receiver<Vec<T>>,
}

impl<T: Clone> Subscription<T> {
    /// The latest snapshot without waiting.
    pub fn current(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next commit and return the new snapshot. `None` when the
    /// store has shut down.
    pub async fn changed(&mut self) -> Option<Vec<T>> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }
}
