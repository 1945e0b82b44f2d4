use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use mockall::automock;
use uuid::Uuid;

use crate::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub session_type: SessionType,
    pub date: time::Date,
    pub start_time: time::Time,
    pub end_time: time::Time,
    pub is_booked: bool,
    pub is_blocked: bool,
    pub session_id: Option<Uuid>,
}

impl From<&dao::AvailabilitySlotEntity> for AvailabilitySlot {
    fn from(entity: &dao::AvailabilitySlotEntity) -> Self {
        Self {
            id: entity.id,
            consultant_id: entity.consultant_id,
            session_type: entity.session_type,
            date: entity.date,
            start_time: entity.start_time,
            end_time: entity.end_time,
            is_booked: entity.is_booked,
            is_blocked: entity.is_blocked,
            session_id: entity.session_id,
        }
    }
}

/// Generates hourly `AvailabilitySlot` rows from active patterns (C5, §4.5).
#[automock(type Transaction = dao::MockTransaction;)]
#[async_trait]
pub trait SlotGeneratorService {
    type Transaction: dao::Transaction;

    /// Materializes slots over `[start_date, end_date]`, constrained to
    /// `end_date - start_date <= horizon_cap_days`. Returns the count of
    /// rows actually inserted (duplicates against the Store are skipped).
    async fn generate(
        &self,
        consultant_id: Uuid,
        start_date: time::Date,
        end_date: time::Date,
        session_type: Option<SessionType>,
        tx: Option<Self::Transaction>,
    ) -> Result<u64, ServiceError>;
}

#[derive(Debug, Clone, Default)]
pub struct ListSlotsQuery {
    pub session_type: Option<SessionType>,
    pub date_from: Option<time::Date>,
    pub date_to: Option<time::Date>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct SlotPage {
    pub slots: Arc<[AvailabilitySlot]>,
    pub by_date: BTreeMap<time::Date, Vec<AvailabilitySlot>>,
    pub total_count: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

/// Public read path for bookable slots (C8, §4.8). Cached per §4.3 with a
/// short TTL; falls through to the Store on a miss or when the cache is in
/// no-cache mode.
#[automock]
#[async_trait]
pub trait QueryFacadeService: Send + Sync {
    async fn list_slots(
        &self,
        consultant_slug: Arc<str>,
        query: ListSlotsQuery,
    ) -> Result<SlotPage, ServiceError>;
}
