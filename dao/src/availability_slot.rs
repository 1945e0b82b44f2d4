use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use mockall::automock;
use uuid::Uuid;

use crate::DaoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySlotEntity {
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

/// Restricts `list_future_slots` to a consultant's slots on/after `from_date`,
/// optionally narrowed to one session type and/or one date.
#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub session_type: Option<SessionType>,
    pub date: Option<time::Date>,
    pub from_date: Option<time::Date>,
    pub to_date: Option<time::Date>,
    pub only_bookable: bool,
}

/// Selects the rows `block_unbooked_slots` is allowed to touch: always
/// `is_booked=false AND date >= today` per §4.2, further narrowed to one
/// `(session_type, day_of_week)` bucket when reconciling a bulk-replace diff.
#[derive(Debug, Clone)]
pub struct BlockPredicate {
    pub session_type: SessionType,
    pub day_of_week: core_utils::DayOfWeek,
    pub start_time: time::Time,
    pub today: time::Date,
}

/// A single hourly row to insert, pre-expanded by the Slot Generator (C5)
/// from an active pattern's `[start_time, end_time)` range.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub consultant_id: Uuid,
    pub session_type: SessionType,
    pub date: time::Date,
    pub start_time: time::Time,
    pub end_time: time::Time,
}

/// C2 Store slice covering `AvailabilitySlot` generation, listing, blocking,
/// and claiming (§4.2). `claim_slot` is the contention point the coherence
/// invariants (§8, rule 5) depend on: exactly one concurrent caller may
/// observe `true`.
#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait AvailabilitySlotDao {
    type Transaction: crate::Transaction;

    async fn list_future_slots(
        &self,
        consultant_id: Uuid,
        filter: &SlotFilter,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[AvailabilitySlotEntity]>, DaoError>;

    /// Sets `is_blocked=true` on rows matching `predicate` where
    /// `is_booked=false AND date >= predicate.today`. Returns the count touched.
    async fn block_unbooked_slots(
        &self,
        consultant_id: Uuid,
        predicate: &BlockPredicate,
        tx: Option<Self::Transaction>,
    ) -> Result<u64, DaoError>;

    /// Inserts `batch`, skipping any row that would violate the
    /// `(consultant_id, session_type, date, start_time)` uniqueness key.
    /// Returns the count actually inserted.
    async fn create_slots_ignoring_duplicates(
        &self,
        batch: &[NewSlot],
        tx: Option<Self::Transaction>,
    ) -> Result<u64, DaoError>;

    /// Conditional update `WHERE is_booked=false AND is_blocked=false`.
    /// Returns whether this call won the claim.
    async fn claim_slot(
        &self,
        consultant_id: Uuid,
        session_type: SessionType,
        date: time::Date,
        start_time: time::Time,
        session_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<bool, DaoError>;

    /// Sets `is_booked=false, session_id=null` on the row pointing at `session_id`.
    async fn release_slot_by_session(
        &self,
        session_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError>;
}
