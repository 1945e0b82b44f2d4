use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use dao::{session::PaymentStatus, session::SessionStatus, DaoError, SessionDao, SessionEntity};
use sqlx::{query, query_as};
use time::format_description::well_known::Iso8601;
use time::{Date, Time};
use uuid::Uuid;

use crate::{ResultDbErrorExt, TransactionDaoImpl, TransactionImpl};

pub struct SessionDaoImpl {
    _pool: Arc<sqlx::SqlitePool>,
    transaction_dao: Arc<TransactionDaoImpl>,
}

impl SessionDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>, transaction_dao: Arc<TransactionDaoImpl>) -> Self {
        Self { _pool: pool, transaction_dao }
    }
}

struct SessionDb {
    id: Vec<u8>,
    consultant_id: Vec<u8>,
    client_id: Vec<u8>,
    session_type: String,
    scheduled_date: String,
    scheduled_time: String,
    duration_minutes: i64,
    amount_minor: i64,
    currency: String,
    status: String,
    payment_status: String,
    booking_source: String,
    slot_id: Option<Vec<u8>>,
}

impl TryFrom<&SessionDb> for SessionEntity {
    type Error = DaoError;
    fn try_from(row: &SessionDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::from_slice(&row.id)?,
            consultant_id: Uuid::from_slice(&row.consultant_id)?,
            client_id: Uuid::from_slice(&row.client_id)?,
            session_type: SessionType::from_str(&row.session_type)
                .map_err(|_| DaoError::InvalidSessionType(row.session_type.clone()))?,
            scheduled_date: Date::parse(&row.scheduled_date, &Iso8601::DATE)?,
            scheduled_time: Time::parse(&row.scheduled_time, &Iso8601::TIME)?,
            duration_minutes: row.duration_minutes as u16,
            amount_minor: row.amount_minor,
            currency: row.currency.as_str().into(),
            status: SessionStatus::from_str(&row.status)?,
            payment_status: match row.payment_status.as_str() {
                "PENDING" => PaymentStatus::Pending,
                "PAID" => PaymentStatus::Paid,
                "REFUNDED" => PaymentStatus::Refunded,
                other => return Err(DaoError::InvalidSessionType(other.to_string())),
            },
            booking_source: row.booking_source.as_str().into(),
            slot_id: row
                .slot_id
                .as_ref()
                .map(|bytes| Uuid::from_slice(bytes))
                .transpose()?,
        })
    }
}

#[async_trait]
impl SessionDao for SessionDaoImpl {
    type Transaction = TransactionImpl;

    async fn create_session(
        &self,
        session: &SessionEntity,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let id_bytes = session.id.as_bytes().to_vec();
        let consultant_bytes = session.consultant_id.as_bytes().to_vec();
        let client_bytes = session.client_id.as_bytes().to_vec();
        let session_type = session.session_type.as_str();
        let scheduled_date = session.scheduled_date.format(&Iso8601::DATE).map_db_error()?;
        let scheduled_time = session.scheduled_time.format(&Iso8601::TIME).map_db_error()?;
        let duration_minutes = session.duration_minutes as i64;
        let status = session.status.as_str();
        let payment_status = session.payment_status.as_str();
        let booking_source = session.booking_source.as_ref();
        let slot_bytes = session.slot_id.map(|id| id.as_bytes().to_vec());
        let currency = session.currency.as_ref();
        let existing = query!(
            "SELECT COUNT(*) as count FROM session \
             WHERE consultant_id = ? AND scheduled_date = ? AND scheduled_time = ? AND status != 'CANCELLED'",
            consultant_bytes,
            scheduled_date,
            scheduled_time,
        )
        .fetch_one(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        if existing.count > 0 {
            return Err(DaoError::Conflict);
        }
        query!(
            "INSERT INTO session \
             (id, consultant_id, client_id, session_type, scheduled_date, scheduled_time, duration_minutes, \
              amount_minor, currency, status, payment_status, booking_source, slot_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            id_bytes,
            consultant_bytes,
            client_bytes,
            session_type,
            scheduled_date,
            scheduled_time,
            duration_minutes,
            session.amount_minor,
            currency,
            status,
            payment_status,
            booking_source,
            slot_bytes,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn get_session(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<SessionEntity>, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let id_bytes = id.as_bytes().to_vec();
        let row = query_as!(
            SessionDb,
            "SELECT id, consultant_id, client_id, session_type, scheduled_date, scheduled_time, duration_minutes, \
             amount_minor, currency, status, payment_status, booking_source, slot_id \
             FROM session WHERE consultant_id = ? AND id = ?",
            consultant_bytes,
            id_bytes
        )
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        row.as_ref().map(SessionEntity::try_from).transpose()
    }

    async fn list_sessions(
        &self,
        consultant_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[SessionEntity]>, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let rows = query_as!(
            SessionDb,
            "SELECT id, consultant_id, client_id, session_type, scheduled_date, scheduled_time, duration_minutes, \
             amount_minor, currency, status, payment_status, booking_source, slot_id \
             FROM session WHERE consultant_id = ?",
            consultant_bytes
        )
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter()
            .map(SessionEntity::try_from)
            .collect::<Result<Arc<[_]>, DaoError>>()
    }

    async fn cancel_session(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<SessionEntity, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let id_bytes = id.as_bytes().to_vec();
        let result = query!(
            "UPDATE session SET status = 'CANCELLED' \
             WHERE consultant_id = ? AND id = ? AND status NOT IN ('CANCELLED', 'COMPLETED')",
            consultant_bytes,
            id_bytes,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        if result.rows_affected() == 0 {
            return Err(DaoError::BadState);
        }
        let row = query_as!(
            SessionDb,
            "SELECT id, consultant_id, client_id, session_type, scheduled_date, scheduled_time, duration_minutes, \
             amount_minor, currency, status, payment_status, booking_source, slot_id \
             FROM session WHERE consultant_id = ? AND id = ?",
            consultant_bytes,
            id_bytes
        )
        .fetch_one(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        SessionEntity::try_from(&row)
    }
}
