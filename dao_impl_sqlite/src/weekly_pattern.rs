use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use core_utils::{DayOfWeek, SessionType};
use dao::{DaoError, WeeklyPatternDao, WeeklyPatternEntity};
use sqlx::{query, query_as};
use time::format_description::well_known::Iso8601;
use time::Time;
use uuid::Uuid;

use crate::{ResultDbErrorExt, TransactionDaoImpl, TransactionImpl};

pub struct WeeklyPatternDaoImpl {
    _pool: Arc<sqlx::SqlitePool>,
    transaction_dao: Arc<TransactionDaoImpl>,
}

impl WeeklyPatternDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>, transaction_dao: Arc<TransactionDaoImpl>) -> Self {
        Self { _pool: pool, transaction_dao }
    }
}

struct WeeklyPatternDb {
    id: Vec<u8>,
    consultant_id: Vec<u8>,
    session_type: String,
    day_of_week: i64,
    start_time: String,
    end_time: String,
    is_active: bool,
    timezone: String,
    update_version: Vec<u8>,
}

impl TryFrom<&WeeklyPatternDb> for WeeklyPatternEntity {
    type Error = DaoError;
    fn try_from(row: &WeeklyPatternDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::from_slice(&row.id)?,
            consultant_id: Uuid::from_slice(&row.consultant_id)?,
            session_type: SessionType::from_str(&row.session_type)
                .map_err(|_| DaoError::InvalidSessionType(row.session_type.clone()))?,
            day_of_week: DayOfWeek::from_number(row.day_of_week as u8)
                .ok_or(DaoError::InvalidDayOfWeek(row.day_of_week as u8))?,
            start_time: Time::parse(&row.start_time, &Iso8601::TIME)?,
            end_time: Time::parse(&row.end_time, &Iso8601::TIME)?,
            is_active: row.is_active,
            timezone: row.timezone.as_str().into(),
            version: Uuid::from_slice(&row.update_version)?,
        })
    }
}

fn ranges_overlap(a_start: Time, a_end: Time, b_start: Time, b_end: Time) -> bool {
    a_start < b_end && b_start < a_end
}

#[async_trait]
impl WeeklyPatternDao for WeeklyPatternDaoImpl {
    type Transaction = TransactionImpl;

    async fn list_patterns(
        &self,
        consultant_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[WeeklyPatternEntity]>, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let rows = query_as!(
            WeeklyPatternDb,
            "SELECT id, consultant_id, session_type, day_of_week, start_time, end_time, is_active, timezone, update_version \
             FROM weekly_pattern WHERE consultant_id = ?",
            consultant_bytes
        )
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter()
            .map(WeeklyPatternEntity::try_from)
            .collect::<Result<Arc<[_]>, DaoError>>()
    }

    async fn get_pattern(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<WeeklyPatternEntity>, DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let id_bytes = id.as_bytes().to_vec();
        let row = query_as!(
            WeeklyPatternDb,
            "SELECT id, consultant_id, session_type, day_of_week, start_time, end_time, is_active, timezone, update_version \
             FROM weekly_pattern WHERE consultant_id = ? AND id = ?",
            consultant_bytes,
            id_bytes
        )
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        row.as_ref().map(WeeklyPatternEntity::try_from).transpose()
    }

    async fn create_pattern(
        &self,
        pattern: &WeeklyPatternEntity,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let existing = self
            .active_same_bucket(pattern.consultant_id, pattern.session_type, pattern.day_of_week, &tx)
            .await?;
        if existing
            .iter()
            .filter(|p| p.id != pattern.id)
            .any(|p| ranges_overlap(p.start_time, p.end_time, pattern.start_time, pattern.end_time))
        {
            return Err(DaoError::Overlap);
        }
        let id_bytes = pattern.id.as_bytes().to_vec();
        let consultant_bytes = pattern.consultant_id.as_bytes().to_vec();
        let session_type = pattern.session_type.as_str();
        let day_of_week = pattern.day_of_week.to_number() as i64;
        let start_time = pattern.start_time.format(&Iso8601::TIME).map_db_error()?;
        let end_time = pattern.end_time.format(&Iso8601::TIME).map_db_error()?;
        let timezone = pattern.timezone.as_ref();
        let version = pattern.version.as_bytes().to_vec();
        query!(
            "INSERT INTO weekly_pattern (id, consultant_id, session_type, day_of_week, start_time, end_time, is_active, timezone, update_version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            id_bytes,
            consultant_bytes,
            session_type,
            day_of_week,
            start_time,
            end_time,
            pattern.is_active,
            timezone,
            version,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn update_pattern(
        &self,
        pattern: &WeeklyPatternEntity,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let existing = self
            .active_same_bucket(pattern.consultant_id, pattern.session_type, pattern.day_of_week, &tx)
            .await?;
        if existing
            .iter()
            .filter(|p| p.id != pattern.id)
            .any(|p| ranges_overlap(p.start_time, p.end_time, pattern.start_time, pattern.end_time))
        {
            return Err(DaoError::Overlap);
        }
        let id_bytes = pattern.id.as_bytes().to_vec();
        let consultant_bytes = pattern.consultant_id.as_bytes().to_vec();
        let session_type = pattern.session_type.as_str();
        let day_of_week = pattern.day_of_week.to_number() as i64;
        let start_time = pattern.start_time.format(&Iso8601::TIME).map_db_error()?;
        let end_time = pattern.end_time.format(&Iso8601::TIME).map_db_error()?;
        let timezone = pattern.timezone.as_ref();
        let new_version = Uuid::new_v4().as_bytes().to_vec();
        let result = query!(
            "UPDATE weekly_pattern SET session_type = ?, day_of_week = ?, start_time = ?, end_time = ?, \
             is_active = ?, timezone = ?, update_version = ? WHERE id = ? AND consultant_id = ?",
            session_type,
            day_of_week,
            start_time,
            end_time,
            pattern.is_active,
            timezone,
            new_version,
            id_bytes,
            consultant_bytes,
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        if result.rows_affected() == 0 {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }

    async fn delete_pattern(
        &self,
        consultant_id: Uuid,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<(), DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let id_bytes = id.as_bytes().to_vec();
        let result = query!(
            "DELETE FROM weekly_pattern WHERE id = ? AND consultant_id = ?",
            id_bytes,
            consultant_bytes
        )
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        if result.rows_affected() == 0 {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }

    async fn replace_patterns(
        &self,
        consultant_id: Uuid,
        new_patterns: &[WeeklyPatternEntity],
        tx: Option<Self::Transaction>,
    ) -> Result<(Arc<[WeeklyPatternEntity]>, Arc<[WeeklyPatternEntity]>), DaoError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let old = self.list_patterns(consultant_id, Some(tx.clone())).await?;
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        query!("DELETE FROM weekly_pattern WHERE consultant_id = ?", consultant_bytes)
            .execute(tx.tx.lock().await.as_mut())
            .await
            .map_db_error()?;
        for pattern in new_patterns {
            self.create_pattern(pattern, Some(tx.clone())).await?;
        }
        Ok((old, Arc::from(new_patterns.to_vec())))
    }
}

impl WeeklyPatternDaoImpl {
    async fn active_same_bucket(
        &self,
        consultant_id: Uuid,
        session_type: SessionType,
        day_of_week: DayOfWeek,
        tx: &TransactionImpl,
    ) -> Result<Arc<[WeeklyPatternEntity]>, DaoError> {
        let consultant_bytes = consultant_id.as_bytes().to_vec();
        let session_type_str = session_type.as_str();
        let day_of_week_num = day_of_week.to_number() as i64;
        let rows = query_as!(
            WeeklyPatternDb,
            "SELECT id, consultant_id, session_type, day_of_week, start_time, end_time, is_active, timezone, update_version \
             FROM weekly_pattern WHERE consultant_id = ? AND session_type = ? AND day_of_week = ? AND is_active = 1",
            consultant_bytes,
            session_type_str,
            day_of_week_num,
        )
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter()
            .map(WeeklyPatternEntity::try_from)
            .collect::<Result<Arc<[_]>, DaoError>>()
    }
}
