use std::sync::Arc;

use async_trait::async_trait;
use dao::DaoError;
use tokio::sync::Mutex;

pub mod availability_slot;
pub mod client;
pub mod session;
pub mod weekly_pattern;

pub trait ResultDbErrorExt<T, E> {
    fn map_db_error(self) -> Result<T, DaoError>;
}
impl<T, E: std::error::Error + Send + Sync + 'static> ResultDbErrorExt<T, E> for Result<T, E> {
    fn map_db_error(self) -> Result<T, DaoError> {
        self.map_err(|err| DaoError::DatabaseQueryError(Box::new(err)))
    }
}

#[derive(Clone, Debug)]
pub struct TransactionImpl {
    pub(crate) tx: Arc<Mutex<sqlx::Transaction<'static, sqlx::Sqlite>>>,
}

impl dao::Transaction for TransactionImpl {}

pub struct TransactionDaoImpl {
    pool: Arc<sqlx::SqlitePool>,
}
impl TransactionDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl dao::TransactionDao for TransactionDaoImpl {
    type Transaction = TransactionImpl;

    async fn new_transaction(&self) -> Result<Self::Transaction, DaoError> {
        let tx = self.pool.begin().await.map_db_error()?;
        Ok(TransactionImpl {
            tx: Arc::new(Mutex::new(tx)),
        })
    }

    async fn use_transaction(
        &self,
        tx: Option<Self::Transaction>,
    ) -> Result<Self::Transaction, DaoError> {
        match tx {
            Some(tx) => Ok(tx),
            None => self.new_transaction().await,
        }
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), DaoError> {
        if let Some(tx) = Arc::into_inner(transaction.tx) {
            tx.into_inner().commit().await.map_db_error()?;
        }
        Ok(())
    }
}
