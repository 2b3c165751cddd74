//! In-memory session store keyed by the `storefront_session` cookie.
//!
//! Entries expire after an idle TTL; every read or write refreshes the
//! deadline. Expired entries are pruned lazily on write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use storefront_i18n::SessionData;
use uuid::Uuid;

struct SessionEntry {
    data: SessionData,
    expires_at: Instant,
}

pub(crate) struct SessionStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Session data for `id`, or `None` when unknown or expired.
    pub(crate) fn load(&self, id: &str) -> Option<SessionData> {
        let mut guard = self.lock();
        let now = Instant::now();
        match guard.get_mut(id) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                Some(entry.data.clone())
            }
            Some(_) => {
                guard.remove(id);
                None
            }
            None => None,
        }
    }

    /// Store `data` under `id`, issuing a fresh id when `id` is absent or no
    /// longer live. Returns the id the data was stored under.
    pub(crate) fn save(&self, id: Option<&str>, data: SessionData) -> String {
        let mut guard = self.lock();
        let now = Instant::now();
        guard.retain(|_, entry| entry.expires_at > now);
        let id = id
            .filter(|id| guard.contains_key(*id))
            .map_or_else(|| Uuid::new_v4().simple().to_string(), ToString::to_string);
        guard.insert(
            id.clone(),
            SessionEntry {
                data,
                expires_at: now + self.ttl,
            },
        );
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
