use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub mod availability_slot;
pub mod client;
pub mod session;
pub mod weekly_pattern;

pub use availability_slot::{AvailabilitySlotDao, AvailabilitySlotEntity};
pub use client::{ClientDao, ClientEntity};
pub use session::{SessionDao, SessionEntity};
pub use weekly_pattern::{WeeklyPatternDao, WeeklyPatternEntity};

/// Failure modes of the Store (§4.2). `Overlap`/`Conflict`/`NotFound`/`BadState`
/// are the semantic outcomes the Pattern Engine and Booking Engine branch on;
/// `DatabaseQueryError` is the catch-all transport/driver failure that maps to
/// `ServiceError::Infra` one layer up.
#[derive(Error, Debug)]
pub enum DaoError {
    #[error("Database query error: {0}")]
    DatabaseQueryError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Active pattern overlaps an existing range")]
    Overlap,

    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violated")]
    Conflict,

    #[error("Illegal state transition")]
    BadState,

    #[error("Invalid day of week number: {0}")]
    InvalidDayOfWeek(u8),

    #[error("Invalid session type: {0}")]
    InvalidSessionType(String),

    #[error(transparent)]
    TimeParse(#[from] time::error::ComponentRange),

    #[error(transparent)]
    TimeFormat(#[from] time::error::Parse),

    #[error(transparent)]
    InvalidUuid(#[from] uuid::Error),
}

/// Marker trait for an in-flight Store transaction. Every multi-row mutation
/// in this core runs under one transaction; handles are cheap to clone and
/// are threaded explicitly through the DAO/service call chain rather than
/// carried in task-local state, so callers can compose several DAO calls
/// into one commit.
#[automock]
pub trait Transaction: Clone + Send + Sync + std::fmt::Debug + 'static {}

/// Opens, reuses, and commits transactions against the Store. Every DAO
/// method expects the caller to have already opened one (or to pass `None`,
/// in which case a fresh one is opened on its behalf for a single-statement
/// operation).
#[automock(type Transaction = MockTransaction;)]
#[async_trait]
pub trait TransactionDao {
    type Transaction: Transaction;

    async fn new_transaction(&self) -> Result<Self::Transaction, DaoError>;

    async fn use_transaction(
        &self,
        tx: Option<Self::Transaction>,
    ) -> Result<Self::Transaction, DaoError>;

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), DaoError>;
}
