use std::sync::Arc;

use async_trait::async_trait;
use core_utils::{DayOfWeek, SessionType};
use mockall::automock;
use uuid::Uuid;

use crate::DaoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPatternEntity {
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

/// C2 Store slice covering `WeeklyPattern` CRUD and the atomic bulk-replace
/// primitive (§4.2). Overlap detection on `createPattern`/`updatePattern` is
/// enforced here, not in the service layer, so it is covered by the same
/// transaction as the write it guards.
#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait WeeklyPatternDao {
    type Transaction: crate::Transaction;

    async fn list_patterns(
        &self,
        consultant_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[WeeklyPatternEntity]>, DaoError>;

    async fn get_pattern(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<WeeklyPatternEntity>, DaoError>;

    /// Fails `DaoError::Overlap` when an active pattern for the same
    /// `(session_type, day_of_week)` already intersects `[start_time, end_time)`.
    async fn create_pattern(
        &self,
        pattern: &WeeklyPatternEntity,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError>;

    /// Same overlap check as `create_pattern`, excluding the pattern being updated.
    async fn update_pattern(
        &self,
        pattern: &WeeklyPatternEntity,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError>;

    async fn delete_pattern(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError>;

    /// Atomically snapshots the consultant's existing patterns, deletes them,
    /// and inserts `new_patterns`. Returns `(old, new)` for the caller's diff.
    async fn replace_patterns(
        &self,
        consultant_id: Uuid,
        new_patterns: &[WeeklyPatternEntity],
        tx: Option<Self::Transaction>,
    ) -> Result<(Arc<[WeeklyPatternEntity]>, Arc<[WeeklyPatternEntity]>), DaoError>;
}
