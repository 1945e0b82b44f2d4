use std::fmt::{Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use mockall::automock;
use uuid::Uuid;

use crate::DaoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::Confirmed => "CONFIRMED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
            SessionStatus::NoShow => "NO_SHOW",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = DaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SessionStatus::Pending),
            "CONFIRMED" => Ok(SessionStatus::Confirmed),
            "COMPLETED" => Ok(SessionStatus::Completed),
            "CANCELLED" => Ok(SessionStatus::Cancelled),
            "NO_SHOW" => Ok(SessionStatus::NoShow),
            "ABANDONED" => Ok(SessionStatus::Abandoned),
            other => Err(DaoError::InvalidSessionType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntity {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub client_id: Uuid,
    pub session_type: SessionType,
    pub scheduled_date: time::Date,
    pub scheduled_time: time::Time,
    pub duration_minutes: u16,
    pub amount_minor: i64,
    pub currency: Arc<str>,
    pub status: SessionStatus,
    pub payment_status: PaymentStatus,
    pub booking_source: Arc<str>,
    pub slot_id: Option<Uuid>,
}

/// C2 Store slice covering `Session` creation and cancellation (§4.2, §4.6).
/// The caller is responsible for having already claimed the matching
/// `AvailabilitySlot` row, in the same transaction, before calling
/// `create_session`.
#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait SessionDao {
    type Transaction: crate::Transaction;

    async fn create_session(
        &self,
        session: &SessionEntity,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError>;

    async fn get_session(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<SessionEntity>, DaoError>;

    async fn list_sessions(
        &self,
        consultant_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[SessionEntity]>, DaoError>;

    /// Transitions the session to `CANCELLED`. Fails `BadState` if it is
    /// already in a terminal status.
    async fn cancel_session(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<SessionEntity, DaoError>;
}
