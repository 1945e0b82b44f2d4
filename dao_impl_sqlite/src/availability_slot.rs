use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use dao::{
    AvailabilitySlotDao, AvailabilitySlotEntity, BlockPredicate, DaoError, NewSlot, SlotFilter,
};
use sqlx::{query, query_as};
use time::format_description::well_known::Iso8601;
use time::{Date, Time};
use uuid::Uuid;

use crate::{ResultDbErrorExt, TransactionDaoImpl, TransactionImpl};

pub struct AvailabilitySlotDaoImpl {
    _pool: Arc<sqlx::SqlitePool>,
    transaction_dao: Arc<TransactionDaoImpl>,
}

impl AvailabilitySlotDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>, transaction_dao: Arc<TransactionDaoImpl>) -> Self {
        Self { _pool: pool, transaction_dao }
    }
}

struct AvailabilitySlotDb {
    id: Vec<u8>,
    consultant_id: Vec<u8>,
    session_type: String,
    date: String,
    start_time: String,
    end_time: String,
    is_booked: bool,
    is_blocked: bool,
    session_id: Option<Vec<u8>>,
}

impl TryFrom<&AvailabilitySlotDb> for AvailabilitySlotEntity {
    type Error = DaoError;
    fn try_from(row: &AvailabilitySlotDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::from_slice(&row.id)?,
            consultant_id: Uuid::from_slice(&row.consultant_id)?,
            session_type: SessionType::from_str(&row.session_type)
                .map_err(|_| DaoError::InvalidSessionType(row.session_type.clone()))?,
            date: Date::parse(&row.date, &Iso8601::DATE)?,
            start_time: Time::parse(&row.start_time, &Iso8601::TIME)?,
            end_time: Time::parse(&row.end_time, &Iso8601::TIME)?,
            is_booked: row.is_booked,
            is_blocked: row.is_blocked,
            session_id: row
                .session_id
                .as_ref()
                .map(|bytes| Uuid::from_slice(bytes))
                .transpose()?,
        })
    }
}

#[async_trait]
impl AvailabilitySlotDao for AvailabilitySlotDaoImpl {
    type Transaction = TransactionImpl;

    async fn list_future_slots(
        &self,
        consultant_id: Uuid,
        filter: &SlotFilter,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[AvailabilitySlotEntity]>, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let session_type_filter = filter.session_type.map(|st| st.as_str().to_string());
        let exact_date = filter.date.map(|d| d.format(&Iso8601::DATE)).transpose().map_db_error()?;
        let from_date = filter.from_date.map(|d| d.format(&Iso8601::DATE)).transpose().map_db_error()?;
        let to_date = filter.to_date.map(|d| d.format(&Iso8601::DATE)).transpose().map_db_error()?;
        let rows = query_as!(
            AvailabilitySlotDb,
            "SELECT id, consultant_id, session_type, date, start_time, end_time, is_booked, is_blocked, session_id \
             FROM availability_slot \
             WHERE consultant_id = ? \
               AND (?1 IS NULL OR session_type = ?1) \
               AND (?2 IS NULL OR date = ?2) \
               AND (?3 IS NULL OR date >= ?3) \
               AND (?4 IS NULL OR date <= ?4) \
               AND (?5 = 0 OR (is_booked = 0 AND is_blocked = 0))",
            consultant_bytes,
            session_type_filter,
            exact_date,
            from_date,
            to_date,
            filter.only_bookable,
        )
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter()
            .map(AvailabilitySlotEntity::try_from)
            .collect::<Result<Arc<[_]>, DaoError>>()
    }

    async fn block_unbooked_slots(
        &self,
        consultant_id: Uuid,
        predicate: &BlockPredicate,
        tx: Option<Self::Transaction>,
    ) -> Result<u64, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let session_type = predicate.session_type.as_str();
        let start_time = predicate.start_time.format(&Iso8601::TIME).map_db_error()?;
        let today = predicate.today.format(&Iso8601::DATE).map_db_error()?;
        let weekday_filter = predicate.day_of_week.to_number() as i64;
        let result = query!(
            "UPDATE availability_slot SET is_blocked = 1 \
             WHERE consultant_id = ? AND session_type = ? AND start_time = ? \
               AND is_booked = 0 AND date >= ? AND CAST(strftime('%w', date) AS INTEGER) = ?",
            consultant_bytes,
            session_type,
            start_time,
            today,
            weekday_filter,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(result.rows_affected())
    }

    async fn create_slots_ignoring_duplicates(
        &self,
        batch: &[NewSlot],
        tx: Option<Self::Transaction>,
    ) -> Result<u64, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let mut inserted = 0u64;
        for slot in batch {
            let id = Uuid::new_v4().as_bytes().to_vec();
            let consultant_bytes = slot.consultant_id.as_bytes().to_vec();
            let session_type = slot.session_type.as_str();
            let date = slot.date.format(&Iso8601::DATE).map_db_error()?;
            let start_time = slot.start_time.format(&Iso8601::TIME).map_db_error()?;
            let end_time = slot.end_time.format(&Iso8601::TIME).map_db_error()?;
            let result = query!(
                "INSERT OR IGNORE INTO availability_slot \
                 (id, consultant_id, session_type, date, start_time, end_time, is_booked, is_blocked, session_id) \
                 VALUES (?, ?, ?, ?, ?, ?, 0, 0, NULL)",
                id,
                consultant_bytes,
                session_type,
                date,
                start_time,
                end_time,
            )
            .execute(tx.tx.lock().await.as_mut())
            .await
            .map_db_error()?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn claim_slot(
        &self,
        consultant_id: Uuid,
        session_type: SessionType,
        date: Date,
        start_time: Time,
        session_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<bool, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let session_type_str = session_type.as_str();
        let date_str = date.format(&Iso8601::DATE).map_db_error()?;
        let start_time_str = start_time.format(&Iso8601::TIME).map_db_error()?;
        let session_bytes = session_id.as_bytes().to_vec();
        let result = query!(
            "UPDATE availability_slot SET is_booked = 1, session_id = ? \
             WHERE consultant_id = ? AND session_type = ? AND date = ? AND start_time = ? \
               AND is_booked = 0 AND is_blocked = 0",
            session_bytes,
            consultant_bytes,
            session_type_str,
            date_str,
            start_time_str,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_slot_by_session(
        &self,
        session_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let session_bytes = session_id.as_bytes().to_vec();
        query!(
            "UPDATE availability_slot SET is_booked = 0, session_id = NULL WHERE session_id = ?",
            session_bytes
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }
}
