use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use mockall::automock;
use thiserror::Error;
use uuid::Uuid;

pub mod availability_slot;
pub mod clock;
pub mod coherence;
pub mod config;
pub mod session;
pub mod uuid_service;
pub mod weekly_pattern;

/// Error taxonomy surfaced by every service-layer operation (§7). Variants
/// map onto HTTP status in `rest::error_handler`; `Infra` bridges both
/// `DaoError` and `CacheError` under one name since the propagation policy
/// treats a DB transport failure and a cache transport failure identically
/// on the write path once they've reached this layer (the cache one should
/// already have been swallowed further down — see `coherence`).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    BadInput(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Pattern overlaps an existing range: {0}")]
    Overlap(String),

    #[error("Slot already taken")]
    SlotTaken,

    #[error("Resource busy, retry after backoff")]
    Busy,

    #[error("Deadline exceeded")]
    Deadline,

    #[error("Infrastructure failure: {0}")]
    Infra(String),

    #[error("Internal invariant broken: {0}")]
    Internal(String),
}

impl From<dao::DaoError> for ServiceError {
    fn from(err: dao::DaoError) -> Self {
        match err {
            dao::DaoError::Overlap => ServiceError::Overlap("overlapping pattern range".into()),
            dao::DaoError::NotFound => ServiceError::NotFound,
            dao::DaoError::Conflict => ServiceError::SlotTaken,
            dao::DaoError::BadState => ServiceError::Internal("illegal state transition".into()),
            other => ServiceError::Infra(other.to_string()),
        }
    }
}

impl From<cache::CacheError> for ServiceError {
    fn from(err: cache::CacheError) -> Self {
        ServiceError::Infra(err.to_string())
    }
}

/// Which cache keys an invalidation touches (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    Patterns,
    Slots,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    PatternsUpdated,
    SlotsUpdated,
}

/// Emitted by the Coherence Controller after every committed transaction
/// that also invalidated cache state (§4.7). `timestamp_unix` is stamped by
/// the injected `ClockService`, never read from the wall clock directly.
#[derive(Debug, Clone)]
pub struct ChangeNotification {
    pub consultant_slug: Arc<str>,
    pub kind: ChangeKind,
    pub session_type: Option<SessionType>,
    pub timestamp_unix: i64,
}

/// Fire-and-forget notification of a new booking (§6). Failures are logged
/// by the caller and never propagate into the booking transaction's result.
#[automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn session_booked(&self, session_id: Uuid, client_id: Uuid, consultant_id: Uuid);
}

#[derive(Debug, Clone)]
pub struct ProvisionedMeeting {
    pub link: Arc<str>,
    pub external_id: Arc<str>,
    pub password: Option<Arc<str>>,
}

/// Optional external collaborator (§6); absence must not block booking
/// admission — a session is created without a meeting link when this
/// returns `None` or errors.
#[automock]
#[async_trait]
pub trait MeetingProvisioner: Send + Sync {
    async fn create(&self, session_id: Uuid) -> Option<ProvisionedMeeting>;
}

/// Resolves the public-facing consultant slug used in booking requests and
/// slot-page URLs to the internal `consultant_id` the Store is keyed on.
/// Consultant identity/ownership itself lives outside this core (§3
/// ownership note); this is a thin lookup, not a consultant CRUD surface.
#[automock]
#[async_trait]
pub trait ConsultantDirectory: Send + Sync {
    async fn resolve_slug(&self, slug: &str) -> Result<Option<(Uuid, bool)>, ServiceError>;
}
