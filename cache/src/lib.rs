use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub mod in_memory;

pub use in_memory::InMemoryCache;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    BackendError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Best-effort key/value cache with TTL and an advisory lock primitive
/// (§4.3). Every method is infallible-in-spirit: a `CacheError` means the
/// backend is unreachable, never that the requested key doesn't exist — a
/// miss is `Ok(None)`. Callers on the write path must treat `Err` the same
/// as a miss/no-op rather than aborting the write (§5).
#[automock]
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Arc<[u8]>>, CacheError>;

    /// `ttl_seconds = 0` means no expiry; reserved for values the caller
    /// explicitly manages the lifetime of (normal keys should always set a
    /// TTL from §4.3's policy table).
    async fn set(&self, key: &str, value: Arc<[u8]>, ttl_seconds: u64) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every key starting with `prefix`. Implementations may scan
    /// and delete; this is an administrative/invalidation operation, not a
    /// hot path.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError>;

    /// Atomic set-if-absent with a TTL. Returns `Some(token)` on success, or
    /// `None` if the lock is already held by someone else.
    async fn acquire_lock(&self, key: &str, ttl_seconds: u64) -> Result<Option<Arc<str>>, CacheError>;

    /// Deletes the lock only if its stored token still equals `token`,
    /// guarding against releasing a lock some other holder has since
    /// re-acquired after this holder's TTL expired.
    async fn release_lock(&self, key: &str, token: &str) -> Result<(), CacheError>;
}
