use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::DaoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEntity {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub email: Arc<str>,
    pub name: Arc<str>,
    pub phone: Option<Arc<str>>,
    pub total_sessions: u32,
    pub total_amount_paid_minor: i64,
    pub currency: Arc<str>,
}

/// Data supplied to `find_or_create_client` when no row for
/// `(consultant_id, email)` exists yet.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: Arc<str>,
    pub phone: Option<Arc<str>>,
    pub currency: Arc<str>,
}

/// C2 Store slice covering `Client` lookup-or-create (§4.2). Keyed on
/// `(consultant_id, email)`, idempotent.
#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait ClientDao {
    type Transaction: crate::Transaction;

    async fn find_or_create_client(
        &self,
        consultant_id: Uuid,
        email: &str,
        data: &NewClient,
        tx: Option<Self::Transaction>,
    ) -> Result<ClientEntity, DaoError>;

    async fn get_client(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<ClientEntity>, DaoError>;

    /// Increments `total_sessions` by one and `total_amount_paid_minor` by
    /// `amount_minor`, used after a session is created in the same transaction.
    async fn record_session_booked(
        &self,
        client_id: Uuid,
        amount_minor: i64,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError>;
}
