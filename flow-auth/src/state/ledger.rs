//! Single-use ledger of outstanding OAuth states.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::*;

/// Records which opaque states are outstanding and hands each one back at most once.
///
/// Implementations must make `issue` and `consume` individually atomic: when several callers
/// race `consume` on the same state, exactly one of them observes `true`.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Record `state` as outstanding.
    ///
    /// Returns `false` if the state could not be recorded. The caller must then abort the flow
    /// and must not hand out an authorization URL carrying this state.
    async fn issue(&self, state: &str) -> bool;

    /// Atomically check that `state` is outstanding and remove it.
    ///
    /// Returns `true` exactly once per issued state; `false` for states that were never
    /// issued, were already consumed, or have expired.
    async fn consume(&self, state: &str) -> bool;
}

/// Expired entries are swept from the in-memory ledger once every this many issues.
const SWEEP_INTERVAL: usize = 64;

/// In-memory ledger with a time-to-live on every entry.
///
/// An entry is live while the current time is strictly before its expiry. Expired entries
/// are treated as absent and are swept periodically from within `issue`.
pub struct MemoryLedger {
    states: Mutex<HashMap<String, DateTime<Utc>>>,
    ttl: Duration,
    issued: AtomicUsize,
}

impl MemoryLedger {
    /// Create a new ledger with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a new ledger with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            ttl,
            issued: AtomicUsize::new(0),
        }
    }

    /// Number of entries currently held, including expired ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every expired state.
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        self.lock().retain(|_, expires_at| is_live(*expires_at, now));
    }

    /// Raw outstanding states, for local debugging only.
    #[cfg(feature = "debug-dump")]
    pub fn outstanding(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_live(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires_at
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn issue(&self, state: &str) -> bool {
        if state.is_empty() {
            return false;
        }

        let now = Utc::now();
        let Some(expires_at) = now.checked_add_signed(self.ttl) else {
            warn!("State TTL of {} overflows the representable date range", self.ttl);
            return false;
        };

        let mut states = self.lock();
        if self.issued.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            states.retain(|_, existing| is_live(*existing, now));
        }

        match states.get(state) {
            Some(existing) if is_live(*existing, now) => false,
            _ => {
                states.insert(state.to_string(), expires_at);
                true
            }
        }
    }

    async fn consume(&self, state: &str) -> bool {
        let mut states = self.lock();
        match states.remove(state) {
            Some(expires_at) => is_live(expires_at, Utc::now()),
            None => false,
        }
    }
}
