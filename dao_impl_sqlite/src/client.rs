use std::sync::Arc;

use async_trait::async_trait;
use dao::{ClientDao, ClientEntity, DaoError, NewClient};
use sqlx::{query, query_as};
use uuid::Uuid;

use crate::{ResultDbErrorExt, TransactionDaoImpl, TransactionImpl};

pub struct ClientDaoImpl {
    _pool: Arc<sqlx::SqlitePool>,
    transaction_dao: Arc<TransactionDaoImpl>,
}

impl ClientDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>, transaction_dao: Arc<TransactionDaoImpl>) -> Self {
        Self { _pool: pool, transaction_dao }
    }
}

struct ClientDb {
    id: Vec<u8>,
    consultant_id: Vec<u8>,
    email: String,
    name: String,
    phone: Option<String>,
    total_sessions: i64,
    total_amount_paid_minor: i64,
    currency: String,
}

impl TryFrom<&ClientDb> for ClientEntity {
    type Error = DaoError;
    fn try_from(row: &ClientDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::from_slice(&row.id)?,
            consultant_id: Uuid::from_slice(&row.consultant_id)?,
            email: row.email.as_str().into(),
            name: row.name.as_str().into(),
            phone: row.phone.as_deref().map(Into::into),
            total_sessions: row.total_sessions as u32,
            total_amount_paid_minor: row.total_amount_paid_minor,
            currency: row.currency.as_str().into(),
        })
    }
}

#[async_trait]
impl ClientDao for ClientDaoImpl {
    type Transaction = TransactionImpl;

    async fn find_or_create_client(
        &self,
        consultant_id: Uuid,
        email: &str,
        data: &NewClient,
        tx: Option<Self::Transaction>,
    ) -> Result<ClientEntity, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let existing = query_as!(
            ClientDb,
            "SELECT id, consultant_id, email, name, phone, total_sessions, total_amount_paid_minor, currency \
             FROM client WHERE consultant_id = ? AND email = ?",
            consultant_bytes,
            email
        )
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        if let Some(row) = existing.as_ref() {
            return ClientEntity::try_from(row);
        }
        let id = Uuid::new_v4();
        let id_bytes = id.as_bytes().to_vec();
        let name = data.name.as_ref();
        let phone = data.phone.as_deref();
        let currency = data.currency.as_ref();
        query!(
            "INSERT INTO client (id, consultant_id, email, name, phone, total_sessions, total_amount_paid_minor, currency) \
             VALUES (?, ?, ?, ?, ?, 0, 0, ?)",
            id_bytes,
            consultant_bytes,
            email,
            name,
            phone,
            currency,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(ClientEntity {
            id,
            consultant_id,
            email: email.into(),
            name: data.name.clone(),
            phone: data.phone.clone(),
            total_sessions: 0,
            total_amount_paid_minor: 0,
            currency: data.currency.clone(),
        })
    }

    async fn get_client(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<ClientEntity>, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let id_bytes = id.as_bytes().to_vec();
        let row = query_as!(
            ClientDb,
            "SELECT id, consultant_id, email, name, phone, total_sessions, total_amount_paid_minor, currency \
             FROM client WHERE consultant_id = ? AND id = ?",
            consultant_bytes,
            id_bytes
        )
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        row.as_ref().map(ClientEntity::try_from).transpose()
    }

    async fn record_session_booked(
        &self,
        client_id: Uuid,
        amount_minor: i64,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let id_bytes = client_id.as_bytes().to_vec();
        query!(
            "UPDATE client SET total_sessions = total_sessions + 1, total_amount_paid_minor = total_amount_paid_minor + ? \
             WHERE id = ?",
            amount_minor,
            id_bytes,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }
}
