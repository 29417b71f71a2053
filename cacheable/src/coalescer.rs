//! Request coalescing (single-flight).
//!
//! Concurrent loads for the same key share one execution: the first caller
//! becomes the leader and runs the loader, later callers subscribe to the
//! leader's result. The in-flight entry is removed as soon as the leader
//! finishes, so the next call after completion loads again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use cacheable_core::{CacheError, CacheResult};
use tokio::sync::watch;

/// Result shared between a leader and its waiters.
pub type SharedResult = CacheResult<Vec<u8>>;

type Slot = Option<SharedResult>;

/// Outcome of a coalesced load.
#[derive(Debug, Clone)]
pub struct Flight {
    /// The loader's result, identical for every caller of one flight.
    pub result: SharedResult,
    /// `true` when this caller received another caller's result.
    pub shared: bool,
}

enum Role {
    Leader(watch::Sender<Slot>),
    Waiter(watch::Receiver<Slot>),
}

/// Deduplicates concurrent loads keyed by composed cache key.
#[derive(Debug, Default)]
pub struct Coalescer {
    calls: Mutex<HashMap<String, watch::Receiver<Slot>>>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Join the flight for `key`, or register a new one.
    ///
    /// Lookup and registration happen under one lock acquisition.
    fn join(&self, key: &str) -> Role {
        let mut calls = self
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(rx) = calls.get(key) {
            return Role::Waiter(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        calls.insert(key.to_string(), rx);
        Role::Leader(tx)
    }

    /// Run `loader` at most once across all concurrent callers for `key`.
    ///
    /// A waiter's own loader is dropped unused. If the leader is cancelled
    /// before finishing, its waiters retry and one of them leads instead.
    pub async fn run<F, Fut>(&self, key: &str, loader: F) -> Flight
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SharedResult>,
    {
        let mut loader = Some(loader);

        loop {
            match self.join(key) {
                Role::Leader(tx) => {
                    let guard = LeaderGuard {
                        coalescer: self,
                        key,
                        tx: Some(tx),
                    };
                    let result = match loader.take() {
                        Some(load) => load().await,
                        None => Err(CacheError::loader("loader already consumed")),
                    };
                    guard.complete(result.clone());
                    return Flight {
                        result,
                        shared: false,
                    };
                }
                Role::Waiter(mut rx) => {
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(slot) => (*slot).clone(),
                        Err(_) => None,
                    };

                    match outcome {
                        Some(result) => {
                            return Flight {
                                result,
                                shared: true,
                            }
                        }
                        None => {
                            tracing::debug!(key, "In-flight load abandoned, retrying");
                        }
                    }
                }
            }
        }
    }

    fn retire(&self, key: &str) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }
}

/// Retires the in-flight entry even if the leader's future is dropped.
struct LeaderGuard<'a> {
    coalescer: &'a Coalescer,
    key: &'a str,
    tx: Option<watch::Sender<Slot>>,
}

impl LeaderGuard<'_> {
    fn complete(mut self, result: SharedResult) {
        self.coalescer.retire(self.key);
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(result));
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // Cancelled mid-load; dropping the sender wakes the waiters.
            self.coalescer.retire(self.key);
        }
    }
}
