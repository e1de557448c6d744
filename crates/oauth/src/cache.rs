//! TTL-bounded cache from JWT `kid` to the public key that verifies it.

use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    key: DecodingKey,
    inserted_at: Instant,
}

/// Maps key ids to decoding keys, evicting on read once an entry's TTL has elapsed.
///
/// Readers never block writers and vice versa beyond the lifetime of a single `get`/`set` call;
/// there is no background sweeper, so long-lived processes should call [`cleanup`](Self::cleanup)
/// periodically to reclaim memory from keys that rotated out and were never looked up again.
pub struct JwksCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl JwksCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite `kid`, resetting its insertion time.
    pub fn set(&self, kid: impl Into<String>, key: DecodingKey) {
        self.entries.write().insert(
            kid.into(),
            Entry {
                key,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Returns the key for `kid` if present and not yet expired.
    ///
    /// An expired entry is indistinguishable from one that was never inserted; it is left in
    /// place for [`cleanup`](Self::cleanup) to remove.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        let entries = self.entries.read();
        let entry = entries.get(kid)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.key.clone())
        } else {
            None
        }
    }

    pub fn delete(&self, kid: &str) {
        self.entries.write().remove(kid);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.read().len()
    }

    /// Remove every entry whose TTL has elapsed.
    pub fn cleanup(&self) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
    }
}
