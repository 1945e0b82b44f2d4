use std::sync::Arc;

use async_trait::async_trait;
use core_utils::SessionType;
use mockall::automock;
use uuid::Uuid;

use crate::ServiceError;

pub use dao::session::{PaymentStatus, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub email: Arc<str>,
    pub name: Arc<str>,
    pub phone: Option<Arc<str>>,
    pub total_sessions: u32,
    pub total_amount_paid_minor: i64,
    pub currency: Arc<str>,
}

impl From<&dao::ClientEntity> for Client {
    fn from(entity: &dao::ClientEntity) -> Self {
        Self {
            id: entity.id,
            consultant_id: entity.consultant_id,
            email: entity.email.clone(),
            name: entity.name.clone(),
            phone: entity.phone.clone(),
            total_sessions: entity.total_sessions,
            total_amount_paid_minor: entity.total_amount_paid_minor,
            currency: entity.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
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

impl From<&dao::SessionEntity> for Session {
    fn from(entity: &dao::SessionEntity) -> Self {
        Self {
            id: entity.id,
            consultant_id: entity.consultant_id,
            client_id: entity.client_id,
            session_type: entity.session_type,
            scheduled_date: entity.scheduled_date,
            scheduled_time: entity.scheduled_time,
            duration_minutes: entity.duration_minutes,
            amount_minor: entity.amount_minor,
            currency: entity.currency.clone(),
            status: entity.status,
            payment_status: entity.payment_status,
            booking_source: entity.booking_source.clone(),
            slot_id: entity.slot_id,
        }
    }
}

/// How a booking reached the core (§4.6 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingSource {
    PublicBooking,
    ManuallyAdded,
    NakshaPlatform,
}

impl BookingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingSource::PublicBooking => "public_booking",
            BookingSource::ManuallyAdded => "manually_added",
            BookingSource::NakshaPlatform => "naksha_platform",
        }
    }
}

/// Input to `book` (§4.6): everything the public booking endpoint collects
/// about the client and the requested slot.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub consultant_slug: Arc<str>,
    pub session_type: SessionType,
    pub date: time::Date,
    pub time: time::Time,
    pub duration_minutes: u16,
    pub client_full_name: Arc<str>,
    pub client_email: Arc<str>,
    pub client_phone: Option<Arc<str>>,
    pub amount_minor: i64,
    pub currency: Arc<str>,
    pub notes: Option<Arc<str>>,
    pub source: BookingSource,
}

/// Booking Engine (C6, §4.6): admission and cancellation of `Session`s
/// against `AvailabilitySlot` rows.
#[automock(type Transaction = dao::MockTransaction;)]
#[async_trait]
pub trait BookingService {
    type Transaction: dao::Transaction;

    async fn book(&self, request: BookingRequest) -> Result<Session, ServiceError>;

    /// `consultant_slug` is only used to build the public slot-page cache
    /// keys this invalidates post-commit (§4.3); the Store lookup itself is
    /// keyed by `consultant_id`.
    async fn cancel(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        session_id: Uuid,
    ) -> Result<Session, ServiceError>;
}
