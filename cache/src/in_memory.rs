use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::{future::Cache as MokaCache, Expiry};
use uuid::Uuid;

use crate::{Cache, CacheError};

struct StoredValue {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

struct ValueExpiry;

impl Expiry<String, StoredValue> for ValueExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        if value.ttl.is_zero() {
            None
        } else {
            Some(value.ttl)
        }
    }
}

struct LockEntry {
    token: Arc<str>,
    expires_at: Instant,
}

/// The only `Cache` implementation this core ships: an in-process cache
/// backed by `moka` for TTL'd values and a `dashmap` registry for advisory
/// locks. There is no distributed backend in this corpus to reach for
/// (§4.3 is explicitly best-effort, single-process scope); a future
/// multi-node deployment would swap this for a shared store behind the
/// same trait.
pub struct InMemoryCache {
    values: MokaCache<String, StoredValue>,
    locks: DashMap<String, LockEntry>,
}

impl InMemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let values = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(ValueExpiry)
            .build();
        Self {
            values,
            locks: DashMap::new(),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Arc<[u8]>>, CacheError> {
        Ok(self.values.get(key).await.map(|v| v.bytes))
    }

    async fn set(&self, key: &str, value: Arc<[u8]>, ttl_seconds: u64) -> Result<(), CacheError> {
        self.values
            .insert(
                key.to_string(),
                StoredValue {
                    bytes: value,
                    ttl: Duration::from_secs(ttl_seconds),
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.values.invalidate(key).await;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let prefix = prefix.to_string();
        self.values.invalidate_entries_if(move |k, _| k.starts_with(&prefix))
            .map_err(|e| CacheError::BackendError(Box::new(e)))?;
        self.values.run_pending_tasks().await;
        Ok(())
    }

    async fn acquire_lock(&self, key: &str, ttl_seconds: u64) -> Result<Option<Arc<str>>, CacheError> {
        let now = Instant::now();
        let mut held = false;
        self.locks
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.expires_at > now {
                    held = true;
                }
            })
            .or_insert_with(|| LockEntry {
                token: Arc::from(Uuid::new_v4().to_string()),
                expires_at: now + Duration::from_secs(ttl_seconds),
            });
        if held {
            return Ok(None);
        }
        // Either freshly inserted, or the previous holder's lease had expired
        // and we need to stamp a new token/expiry over the stale entry.
        let mut entry = self.locks.get_mut(key).expect("just inserted or refreshed");
        if entry.expires_at <= now {
            entry.token = Arc::from(Uuid::new_v4().to_string());
            entry.expires_at = now + Duration::from_secs(ttl_seconds);
        }
        Ok(Some(entry.token.clone()))
    }

    async fn release_lock(&self, key: &str, token: &str) -> Result<(), CacheError> {
        self.locks.remove_if(key, |_, entry| entry.token.as_ref() == token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::default();
        cache.set("patterns:abc", Arc::from(b"hello".as_slice()), 120).await.unwrap();
        let got = cache.get("patterns:abc").await.unwrap();
        assert_eq!(got.as_deref(), Some(b"hello".as_slice()));
    }

    #[tokio::test]
    async fn get_on_missing_key_is_none_not_err() {
        let cache = InMemoryCache::default();
        assert!(cache.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_prefix_removes_matching_keys_only() {
        let cache = InMemoryCache::default();
        cache.set("slots:acme:ALL:2025-01-01:2025-01-07:20:0", Arc::from(b"a".as_slice()), 30).await.unwrap();
        cache.set("slots:acme:PERSONAL:2025-01-01:2025-01-07:20:0", Arc::from(b"b".as_slice()), 30).await.unwrap();
        cache.set("patterns:xyz", Arc::from(b"c".as_slice()), 120).await.unwrap();
        cache.delete_prefix("slots:acme:").await.unwrap();
        assert!(cache.get("slots:acme:ALL:2025-01-01:2025-01-07:20:0").await.unwrap().is_none());
        assert!(cache.get("slots:acme:PERSONAL:2025-01-01:2025-01-07:20:0").await.unwrap().is_none());
        assert!(cache.get("patterns:xyz").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn acquire_lock_is_exclusive_until_released() {
        let cache = InMemoryCache::default();
        let token = cache.acquire_lock("lock:patterns:c1", 30).await.unwrap();
        assert!(token.is_some());
        assert!(cache.acquire_lock("lock:patterns:c1", 30).await.unwrap().is_none());
        cache.release_lock("lock:patterns:c1", &token.unwrap()).await.unwrap();
        assert!(cache.acquire_lock("lock:patterns:c1", 30).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn release_lock_is_noop_with_wrong_token() {
        let cache = InMemoryCache::default();
        let token = cache.acquire_lock("lock:patterns:c1", 30).await.unwrap().unwrap();
        cache.release_lock("lock:patterns:c1", "not-the-token").await.unwrap();
        assert!(cache.acquire_lock("lock:patterns:c1", 30).await.unwrap().is_none());
        cache.release_lock("lock:patterns:c1", &token).await.unwrap();
    }
}
