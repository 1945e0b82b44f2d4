use std::sync::Arc;

use async_trait::async_trait;
use core_utils::{DayOfWeek, SessionType};
use mockall::automock;
use uuid::Uuid;

use crate::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPattern {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub session_type: SessionType,
    pub day_of_week: DayOfWeek,
    pub start_time: time::Time,
    pub end_time: time::Time,
    pub is_active: bool,
    pub timezone: Arc<str>,
    pub version: Uuid,
}

impl From<&dao::WeeklyPatternEntity> for WeeklyPattern {
    fn from(entity: &dao::WeeklyPatternEntity) -> Self {
        Self {
            id: entity.id,
            consultant_id: entity.consultant_id,
            session_type: entity.session_type,
            day_of_week: entity.day_of_week,
            start_time: entity.start_time,
            end_time: entity.end_time,
            is_active: entity.is_active,
            timezone: entity.timezone.clone(),
            version: entity.version,
        }
    }
}

impl From<&WeeklyPattern> for dao::WeeklyPatternEntity {
    fn from(pattern: &WeeklyPattern) -> Self {
        Self {
            id: pattern.id,
            consultant_id: pattern.consultant_id,
            session_type: pattern.session_type,
            day_of_week: pattern.day_of_week,
            start_time: pattern.start_time,
            end_time: pattern.end_time,
            is_active: pattern.is_active,
            timezone: pattern.timezone.clone(),
            version: pattern.version,
        }
    }
}

/// Input for `create_pattern`: everything but the server-assigned `id`/`version`.
#[derive(Debug, Clone)]
pub struct NewWeeklyPattern {
    pub session_type: SessionType,
    pub day_of_week: DayOfWeek,
    pub start_time: time::Time,
    pub end_time: time::Time,
    pub is_active: bool,
    pub timezone: Arc<str>,
}

/// Partial update for `update_pattern`; `None` fields leave the stored value
/// unchanged. If either `start_time` or `end_time` is supplied, both are
/// re-validated together (§4.4).
#[derive(Debug, Clone, Default)]
pub struct WeeklyPatternDelta {
    pub start_time: Option<time::Time>,
    pub end_time: Option<time::Time>,
    pub is_active: Option<bool>,
    pub timezone: Option<Arc<str>>,
}

/// Outcome of a bulk replace: the old and new pattern sets, for callers that
/// want to report what changed (e.g. an audit log or a UI diff view).
#[derive(Debug, Clone)]
pub struct BulkReplaceOutcome {
    pub old_patterns: Arc<[WeeklyPattern]>,
    pub new_patterns: Arc<[WeeklyPattern]>,
    pub slots_blocked: u64,
    pub slots_created: u64,
}

/// Pattern Engine (C4, §4.4): CRUD over `WeeklyPattern` plus the atomic
/// bulk-replace protocol. `list_patterns` is read-through cached; every
/// mutation invalidates via the Coherence Controller after commit.
#[automock(type Transaction = dao::MockTransaction;)]
#[async_trait]
pub trait WeeklyPatternService {
    type Transaction: dao::Transaction;

    async fn list_patterns(
        &self,
        consultant_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[WeeklyPattern]>, ServiceError>;

    /// `consultant_slug` is only used to build the public slot-page cache
    /// keys this mutation invalidates (§4.3); the Store itself is keyed by
    /// `consultant_id` throughout.
    async fn create_pattern(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        new_pattern: NewWeeklyPattern,
        tx: Option<Self::Transaction>,
    ) -> Result<WeeklyPattern, ServiceError>;

    async fn update_pattern(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        id: Uuid,
        delta: WeeklyPatternDelta,
        tx: Option<Self::Transaction>,
    ) -> Result<WeeklyPattern, ServiceError>;

    /// Deletes the pattern and, in the same transaction, blocks every future
    /// unbooked slot matching its `(session_type, day_of_week, start_time)`.
    async fn delete_pattern(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;

    /// Full bulk-replace protocol (§4.4 steps 1-10): advisory lock, validate,
    /// atomic snapshot/delete/insert, diff-driven block/generate, commit,
    /// post-commit invalidation, lock release.
    async fn bulk_replace_patterns(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        new_patterns: Vec<NewWeeklyPattern>,
    ) -> Result<BulkReplaceOutcome, ServiceError>;
}
