use std::sync::Arc;

use async_trait::async_trait;
use dao::availability_slot::SlotFilter;
use dao::client::NewClient;
use dao::session::SessionEntity;
use dao::{AvailabilitySlotDao, ClientDao, SessionDao, TransactionDao};
use service::clock::ClockService;
use service::coherence::CoherenceService;
use service::session::{BookingRequest, BookingService, Session};
use service::uuid_service::UuidService;
use service::{ConsultantDirectory, InvalidationScope, MeetingProvisioner, Notifier, ServiceError};
use uuid::Uuid;

use crate::gen_service_impl;

gen_service_impl! {
    struct BookingServiceImpl: BookingService = BookingServiceDeps {
        ConsultantDirectory: ConsultantDirectory = consultant_directory,
        ClientDao: ClientDao<Transaction = Self::Transaction> = client_dao,
        SessionDao: SessionDao<Transaction = Self::Transaction> = session_dao,
        AvailabilitySlotDao: AvailabilitySlotDao<Transaction = Self::Transaction> = availability_slot_dao,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        CoherenceService: CoherenceService = coherence_service,
        Notifier: Notifier = notifier,
        MeetingProvisioner: MeetingProvisioner = meeting_provisioner,
    }
}

impl<Deps: BookingServiceDeps> BookingServiceImpl<Deps> {
    /// Finds the slot row `claim_slot` just flipped to `is_booked=true,
    /// session_id=Some(session_id)`, so the new `Session` can carry the
    /// optional backlink (§3). Lookup, not a second claim attempt.
    async fn find_claimed_slot_id(
        &self,
        consultant_id: Uuid,
        session_type: core_utils::SessionType,
        date: time::Date,
        start_time: time::Time,
        session_id: Uuid,
        tx: Deps::Transaction,
    ) -> Result<Option<Uuid>, ServiceError> {
        let filter = SlotFilter {
            session_type: Some(session_type),
            date: Some(date),
            ..Default::default()
        };
        let slots = self
            .availability_slot_dao
            .list_future_slots(consultant_id, &filter, Some(tx))
            .await?;
        Ok(slots
            .iter()
            .find(|s| s.start_time == start_time && s.session_id == Some(session_id))
            .map(|s| s.id))
    }
}

#[async_trait]
impl<Deps: BookingServiceDeps> BookingService for BookingServiceImpl<Deps> {
    type Transaction = Deps::Transaction;

    async fn book(&self, request: BookingRequest) -> Result<Session, ServiceError> {
        let (consultant_id, is_active) = self
            .consultant_directory
            .resolve_slug(&request.consultant_slug)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if !is_active {
            return Err(ServiceError::NotFound);
        }

        let now = self.clock_service.date_time_now();
        let requested = time::PrimitiveDateTime::new(request.date, request.time);
        if requested <= now {
            return Err(ServiceError::BadInput("requested date/time is not in the future".into()));
        }
        if request.duration_minutes == 0 || request.duration_minutes > 60 {
            return Err(ServiceError::BadInput(
                "duration_minutes must be in (0, 60]; a session claims exactly one hourly slot".into(),
            ));
        }

        let tx = self.transaction_dao.new_transaction().await?;
        let client = self
            .client_dao
            .find_or_create_client(
                consultant_id,
                &request.client_email,
                &NewClient {
                    name: request.client_full_name.clone(),
                    phone: request.client_phone.clone(),
                    currency: request.currency.clone(),
                },
                Some(tx.clone()),
            )
            .await?;

        let session_id = self.uuid_service.new_uuid("session");
        let won = self
            .availability_slot_dao
            .claim_slot(consultant_id, request.session_type, request.date, request.time, session_id, Some(tx.clone()))
            .await?;
        if !won {
            return Err(ServiceError::SlotTaken);
        }

        let slot_id = self
            .find_claimed_slot_id(consultant_id, request.session_type, request.date, request.time, session_id, tx.clone())
            .await?;

        let entity = SessionEntity {
            id: session_id,
            consultant_id,
            client_id: client.id,
            session_type: request.session_type,
            scheduled_date: request.date,
            scheduled_time: request.time,
            duration_minutes: request.duration_minutes,
            amount_minor: request.amount_minor,
            currency: request.currency,
            status: dao::session::SessionStatus::Pending,
            payment_status: dao::session::PaymentStatus::Pending,
            booking_source: Arc::from(request.source.as_str()),
            slot_id,
        };
        self.session_dao.create_session(&entity, Some(tx.clone())).await?;
        self.client_dao.record_session_booked(client.id, request.amount_minor, Some(tx.clone())).await?;
        self.transaction_dao.commit(tx).await?;

        if let Err(err) = self
            .coherence_service
            .invalidate(consultant_id, request.consultant_slug.clone(), InvalidationScope::Slots, Some(request.session_type))
            .await
        {
            tracing::warn!(%consultant_id, error = %err, "post-booking cache invalidation failed");
        }

        self.notifier.session_booked(session_id, client.id, consultant_id).await;
        let _meeting = self.meeting_provisioner.create(session_id).await;

        Ok(Session::from(&entity))
    }

    async fn cancel(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        session_id: Uuid,
    ) -> Result<Session, ServiceError> {
        let tx = self.transaction_dao.new_transaction().await?;
        let cancelled = self.session_dao.cancel_session(consultant_id, session_id, Some(tx.clone())).await?;
        self.availability_slot_dao.release_slot_by_session(session_id, Some(tx.clone())).await?;
        self.transaction_dao.commit(tx).await?;

        if let Err(err) = self
            .coherence_service
            .invalidate(consultant_id, consultant_slug, InvalidationScope::Slots, Some(cancelled.session_type))
            .await
        {
            tracing::warn!(%consultant_id, error = %err, "post-cancel cache invalidation failed");
        }

        Ok(Session::from(&cancelled))
    }
}
