use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use service::clock::ClockService;
use service::coherence::CoherenceService;
use service::{ChangeKind, ChangeNotification, InvalidationScope, ServiceError};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Unlike the other `service_impl` structs, `CoherenceServiceImpl` carries
/// state beyond its dependencies (the broadcast sender and an ordering
/// mutex), so it is hand-written rather than generated by
/// `gen_service_impl!` — the macro only emits plain dependency-holder
/// structs.
pub trait CoherenceServiceDeps {
    type Cache: cache::Cache + Sync + Send;
    type ClockService: ClockService + Sync + Send;
}

/// How many buffered `ChangeNotification`s a lagging subscriber tolerates
/// before it starts missing the oldest ones. The transport itself is out of
/// scope (§4.7); this only bounds memory for the in-process channel.
const CHANNEL_CAPACITY: usize = 256;

/// Per-consultant serialization point for emission: the broadcast channel
/// alone guarantees ordering *within* one sender, but `invalidate` is called
/// concurrently by different request tasks, so a mutex around send+cache
/// keeps "commit order == emission order" for one consultant even when two
/// commits race to invalidate (§4.7, §5).
pub struct CoherenceServiceImpl<Deps: CoherenceServiceDeps> {
    pub cache: Arc<Deps::Cache>,
    pub clock_service: Arc<Deps::ClockService>,
    sender: broadcast::Sender<ChangeNotification>,
    order_lock: tokio::sync::Mutex<()>,
}

impl<Deps: CoherenceServiceDeps> CoherenceServiceImpl<Deps> {
    pub fn new(cache: Arc<Deps::Cache>, clock_service: Arc<Deps::ClockService>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { cache, clock_service, sender, order_lock: tokio::sync::Mutex::new(()) }
    }
}

#[async_trait]
impl<Deps: CoherenceServiceDeps> CoherenceService for CoherenceServiceImpl<Deps> {
    async fn invalidate(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        scope: InvalidationScope,
        session_type: Option<SessionType>,
    ) -> Result<(), ServiceError> {
        let _ordering = self.order_lock.lock().await;

        if matches!(scope, InvalidationScope::Patterns | InvalidationScope::All) {
            let key = format!("patterns:{consultant_id}");
            if let Err(err) = self.cache.delete(&key).await {
                tracing::warn!(%consultant_id, error = %err, "cache delete failed during invalidation, leaving entry to expire on TTL");
            }
        }
        let kinds: Vec<ChangeKind> = match scope {
            InvalidationScope::Patterns => vec![ChangeKind::PatternsUpdated],
            InvalidationScope::Slots => vec![ChangeKind::SlotsUpdated],
            InvalidationScope::All => vec![ChangeKind::PatternsUpdated, ChangeKind::SlotsUpdated],
        };
        if matches!(scope, InvalidationScope::Slots | InvalidationScope::All) {
            let prefix = format!("slots:{consultant_slug}:");
            if let Err(err) = self.cache.delete_prefix(&prefix).await {
                tracing::warn!(%consultant_id, error = %err, "cache delete_prefix failed during invalidation, leaving entries to expire on TTL");
            }
        }

        let timestamp_unix = self.clock_service.date_time_now().assume_utc().unix_timestamp();
        for kind in kinds {
            let notification = ChangeNotification {
                consultant_slug: consultant_slug.clone(),
                kind,
                session_type,
                timestamp_unix,
            };
            // No receivers is not an error: the transport is an external
            // collaborator and may not be wired up in every deployment.
            let _ = self.sender.send(notification);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache::InMemoryCache;
    use service::clock::MockClockService;

    struct Deps;
    impl CoherenceServiceDeps for Deps {
        type Cache = InMemoryCache;
        type ClockService = MockClockService;
    }

    fn build() -> CoherenceServiceImpl<Deps> {
        let mut clock = MockClockService::new();
        clock
            .expect_date_time_now()
            .returning(|| time::PrimitiveDateTime::new(time::macros::date!(2025 - 01 - 06), time::macros::time!(09:00)));
        CoherenceServiceImpl::new(Arc::new(InMemoryCache::default()), Arc::new(clock))
    }

    #[tokio::test]
    async fn invalidate_all_emits_both_kinds_in_commit_order() {
        let svc = build();
        let mut rx = svc.subscribe();
        svc.invalidate(Uuid::new_v4(), Arc::from("acme"), InvalidationScope::All, None).await.unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::PatternsUpdated);
        assert_eq!(second.kind, ChangeKind::SlotsUpdated);
    }

    #[tokio::test]
    async fn invalidate_patterns_deletes_pattern_cache_key() {
        let svc = build();
        let consultant_id = Uuid::new_v4();
        svc.cache.set(&format!("patterns:{consultant_id}"), Arc::from(b"x".as_slice()), 120).await.unwrap();
        svc.invalidate(consultant_id, Arc::from("acme"), InvalidationScope::Patterns, None).await.unwrap();
        assert!(svc.cache.get(&format!("patterns:{consultant_id}")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn two_consecutive_invalidations_preserve_commit_order() {
        let svc = build();
        let mut rx = svc.subscribe();
        svc.invalidate(Uuid::new_v4(), Arc::from("acme"), InvalidationScope::Patterns, None).await.unwrap();
        svc.invalidate(Uuid::new_v4(), Arc::from("acme"), InvalidationScope::Slots, None).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::PatternsUpdated);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::SlotsUpdated);
    }
}
