use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use mockall::automock;
use uuid::Uuid;

use crate::{ChangeNotification, InvalidationScope, ServiceError};

/// Coherence Controller (C7, §4.7): the sole component permitted to order
/// DB writes and cache mutations. `invalidate` must only ever be called
/// after the caller's transaction has committed successfully; on a cache
/// failure it logs and returns `Ok(())` rather than propagating, since a
/// cache outage must never fail a write path that already succeeded in the
/// Store (§5).
#[automock]
#[async_trait]
pub trait CoherenceService: Send + Sync {
    async fn invalidate(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        scope: InvalidationScope,
        session_type: Option<SessionType>,
    ) -> Result<(), ServiceError>;

    /// A new receiver observes every notification emitted after it
    /// subscribes; notifications for a given consultant are emitted in the
    /// same order as their underlying commits (§4.7, §5).
    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeNotification>;
}
