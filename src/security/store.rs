//! Rate window storage.
//!
//! # Responsibilities
//! - Hold one `RateWindow` per `ClientKey`
//! - Provide an atomic compare-and-swap so concurrent requests for the same
//!   key cannot lose updates
//! - Reclaim windows whose expiry has passed
//!
//! # Design Decisions
//! - The limiter only talks to the `WindowStore` trait; a shared TTL-backed
//!   cache can replace `MemoryWindowStore` for multi-instance deployments
//! - `MemoryWindowStore` performs CAS under the DashMap shard lock for the key

use std::fmt;

use axum::http::Method;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

/// Rate-limit bucket identity: one bucket per client and HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub client: String,
    pub method: Method,
}

impl ClientKey {
    pub fn new(client: impl Into<String>, method: Method) -> Self {
        Self {
            client: client.into(),
            method,
        }
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client, self.method)
    }
}

/// A fixed counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateWindow {
    /// A window is expired strictly after its reset instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_at
    }
}

/// Errors reported by a window store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("gave up on key {0} after repeated write conflicts")]
    Contention(String),
}

/// Keyed storage for rate windows.
pub trait WindowStore: Send + Sync {
    /// Current window for the key, if any.
    fn get(&self, key: &ClientKey) -> Result<Option<RateWindow>, StoreError>;

    /// Replace the stored window with `next` only if it still equals `current`
    /// (`None` meaning "no window stored"). The written window expires at
    /// `next.reset_at`. Returns whether the swap happened.
    fn compare_and_swap(
        &self,
        key: &ClientKey,
        current: Option<&RateWindow>,
        next: RateWindow,
    ) -> Result<bool, StoreError>;

    /// Unconditionally store a window that is reclaimable after `expires_at`.
    fn put(
        &self,
        key: ClientKey,
        window: RateWindow,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Drop every entry whose expiry is before `now`. Returns how many went.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Number of stored windows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct StoredWindow {
    window: RateWindow,
    expires_at: DateTime<Utc>,
}

/// Single-process window store.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    windows: DashMap<ClientKey, StoredWindow>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for MemoryWindowStore {
    fn get(&self, key: &ClientKey) -> Result<Option<RateWindow>, StoreError> {
        Ok(self.windows.get(key).map(|r| r.value().window))
    }

    fn compare_and_swap(
        &self,
        key: &ClientKey,
        current: Option<&RateWindow>,
        next: RateWindow,
    ) -> Result<bool, StoreError> {
        let stored = StoredWindow {
            window: next,
            expires_at: next.reset_at,
        };

        let swapped = match self.windows.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if current == Some(&entry.get().window) {
                    entry.insert(stored);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                if current.is_none() {
                    entry.insert(stored);
                    true
                } else {
                    false
                }
            }
        };
        Ok(swapped)
    }

    fn put(
        &self,
        key: ClientKey,
        window: RateWindow,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.windows.insert(key, StoredWindow { window, expires_at });
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.windows.len();
        self.windows.retain(|_, stored| stored.expires_at >= now);
        Ok(before.saturating_sub(self.windows.len()))
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}
