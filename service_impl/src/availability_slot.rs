use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use core_utils::{enumerate_dates, enumerate_hourly, time_to_minutes, weekday, SessionType};
use dao::availability_slot::{NewSlot, SlotFilter};
use dao::{AvailabilitySlotDao, TransactionDao, WeeklyPatternDao};
use service::availability_slot::{
    AvailabilitySlot, ListSlotsQuery, QueryFacadeService, SlotGeneratorService, SlotPage,
};
use service::clock::ClockService;
use service::config::ConfigService;
use service::{ConsultantDirectory, ServiceError};
use time::format_description::well_known::Iso8601;
use uuid::Uuid;

use crate::gen_service_impl;

const MAX_BATCH: usize = 100;
const MAX_LIMIT: u32 = 200;
const DEFAULT_LIMIT: u32 = 20;

gen_service_impl! {
    struct SlotGeneratorServiceImpl: SlotGeneratorService = SlotGeneratorServiceDeps {
        WeeklyPatternDao: WeeklyPatternDao<Transaction = Self::Transaction> = weekly_pattern_dao,
        AvailabilitySlotDao: AvailabilitySlotDao<Transaction = Self::Transaction> = availability_slot_dao,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
        ConfigService: ConfigService = config_service,
    }
}

#[async_trait]
impl<Deps: SlotGeneratorServiceDeps> SlotGeneratorService for SlotGeneratorServiceImpl<Deps> {
    type Transaction = Deps::Transaction;

    async fn generate(
        &self,
        consultant_id: Uuid,
        start_date: time::Date,
        end_date: time::Date,
        session_type: Option<SessionType>,
        tx: Option<Self::Transaction>,
    ) -> Result<u64, ServiceError> {
        let config = self.config_service.get_config().await?;
        if (end_date - start_date).whole_days() > config.horizon_cap_days {
            return Err(ServiceError::BadInput(format!(
                "horizon {start_date}..{end_date} exceeds the {}-day cap",
                config.horizon_cap_days
            )));
        }

        let tx = self.transaction_dao.use_transaction(tx).await?;
        let patterns = self.weekly_pattern_dao.list_patterns(consultant_id, Some(tx.clone())).await?;
        let active: Vec<_> = patterns
            .iter()
            .filter(|p| p.is_active && session_type.map_or(true, |st| st == p.session_type))
            .collect();

        let filter = SlotFilter {
            session_type,
            from_date: Some(start_date),
            to_date: Some(end_date),
            ..Default::default()
        };
        let existing = self
            .availability_slot_dao
            .list_future_slots(consultant_id, &filter, Some(tx.clone()))
            .await?;
        let mut present: HashSet<(SessionType, time::Date, time::Time)> = HashSet::new();
        for slot in existing.iter() {
            present.insert((slot.session_type, slot.date, slot.start_time));
        }

        let mut new_slots = Vec::new();
        for date in enumerate_dates(start_date, end_date) {
            let day = weekday(date);
            for pattern in active.iter().filter(|p| p.day_of_week == day) {
                let start_min = time_to_minutes(pattern.start_time);
                let end_min = time_to_minutes(pattern.end_time);
                for (hour_start, hour_end) in enumerate_hourly(start_min, end_min) {
                    let start_time = core_utils::minutes_to_time(hour_start).expect("valid minute offset");
                    let end_time = core_utils::minutes_to_time(hour_end).expect("valid minute offset");
                    let key = (pattern.session_type, date, start_time);
                    if present.contains(&key) {
                        continue;
                    }
                    present.insert(key);
                    new_slots.push(NewSlot {
                        consultant_id,
                        session_type: pattern.session_type,
                        date,
                        start_time,
                        end_time,
                    });
                }
            }
        }

        let mut inserted = 0u64;
        for chunk in new_slots.chunks(MAX_BATCH) {
            inserted += self
                .availability_slot_dao
                .create_slots_ignoring_duplicates(chunk, Some(tx.clone()))
                .await?;
        }
        self.transaction_dao.commit(tx).await?;
        Ok(inserted)
    }
}

gen_service_impl! {
    struct QueryFacadeServiceImpl: QueryFacadeService = QueryFacadeServiceDeps {
        AvailabilitySlotDao: AvailabilitySlotDao<Transaction = Self::Transaction> = availability_slot_dao,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
        Cache: cache::Cache = cache,
        ClockService: ClockService = clock_service,
        ConfigService: ConfigService = config_service,
        ConsultantDirectory: ConsultantDirectory = consultant_directory,
    }
}

fn session_type_key(session_type: Option<SessionType>) -> &'static str {
    match session_type {
        Some(SessionType::Personal) => "PERSONAL",
        Some(SessionType::Webinar) => "WEBINAR",
        None => "ALL",
    }
}

fn slot_page_cache_key(slug: &str, query: &ListSlotsQuery, date_from: time::Date, date_to: time::Date) -> String {
    format!(
        "slots:{slug}:{}:{date_from}:{date_to}:{}:{}",
        session_type_key(query.session_type),
        query.limit,
        query.offset
    )
}

#[async_trait]
impl<Deps: QueryFacadeServiceDeps> QueryFacadeService for QueryFacadeServiceImpl<Deps> {
    async fn list_slots(
        &self,
        consultant_slug: Arc<str>,
        mut query: ListSlotsQuery,
    ) -> Result<SlotPage, ServiceError> {
        let config = self.config_service.get_config().await?;
        let today = self.clock_service.date_now();
        let date_from = query.date_from.unwrap_or(today);
        let date_to = query.date_to.unwrap_or(today + time::Duration::days(14));
        if date_to < date_from {
            return Err(ServiceError::BadInput("date_to precedes date_from".into()));
        }
        if query.limit == 0 {
            query.limit = DEFAULT_LIMIT;
        }
        if query.limit > MAX_LIMIT {
            return Err(ServiceError::BadInput(format!("limit must be <= {MAX_LIMIT}")));
        }

        let cache_key = slot_page_cache_key(&consultant_slug, &query, date_from, date_to);
        if let Ok(Some(bytes)) = self.cache.get(&cache_key).await {
            if let Ok(page) = serde_json::from_slice::<WireSlotPage>(&bytes) {
                return Ok(page.into_domain());
            }
        }

        let (consultant_id, is_active) = self
            .consultant_directory
            .resolve_slug(&consultant_slug)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if !is_active {
            return Err(ServiceError::NotFound);
        }

        let filter = SlotFilter {
            session_type: query.session_type,
            from_date: Some(date_from),
            to_date: Some(date_to),
            only_bookable: true,
            ..Default::default()
        };
        let all_matching = self
            .availability_slot_dao
            .list_future_slots(consultant_id, &filter, None)
            .await?;
        let total_count = all_matching.len() as u64;

        let page_slots: Vec<AvailabilitySlot> = all_matching
            .iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(AvailabilitySlot::from)
            .collect();

        let mut by_date: BTreeMap<time::Date, Vec<AvailabilitySlot>> = BTreeMap::new();
        for slot in &page_slots {
            by_date.entry(slot.date).or_default().push(slot.clone());
        }

        let has_more = (query.offset as u64) + (page_slots.len() as u64) < total_count;
        let page = SlotPage {
            slots: page_slots.into(),
            by_date,
            total_count,
            limit: query.limit,
            offset: query.offset,
            has_more,
        };

        let wire = WireSlotPage::from_domain(&page);
        if let Ok(bytes) = serde_json::to_vec(&wire) {
            let _ = self.cache.set(&cache_key, Arc::from(bytes), config.slot_page_cache_ttl_seconds).await;
        }
        Ok(page)
    }
}

/// Wire-stable snapshot for the slot-page cache entry, independent of
/// `AvailabilitySlot`'s in-process field order (§4.3, §4.8).
#[derive(serde::Serialize, serde::Deserialize)]
struct WireSlot {
    id: Uuid,
    consultant_id: Uuid,
    session_type: Arc<str>,
    date: String,
    start_time: String,
    end_time: String,
    is_booked: bool,
    is_blocked: bool,
    session_id: Option<Uuid>,
}

impl WireSlot {
    fn from_domain(slot: &AvailabilitySlot) -> Self {
        Self {
            id: slot.id,
            consultant_id: slot.consultant_id,
            session_type: Arc::from(slot.session_type.as_str()),
            date: slot.date.format(&Iso8601::DATE).expect("formattable date"),
            start_time: core_utils::format_hhmm(time_to_minutes(slot.start_time)),
            end_time: core_utils::format_hhmm(time_to_minutes(slot.end_time)),
            is_booked: slot.is_booked,
            is_blocked: slot.is_blocked,
            session_id: slot.session_id,
        }
    }

    fn to_domain(&self) -> AvailabilitySlot {
        AvailabilitySlot {
            id: self.id,
            consultant_id: self.consultant_id,
            session_type: self.session_type.parse().expect("round-tripped session type"),
            date: time::Date::parse(&self.date, &Iso8601::DATE).expect("round-tripped date"),
            start_time: core_utils::minutes_to_time(core_utils::parse_hhmm(&self.start_time).expect("round-tripped time"))
                .expect("valid minute offset"),
            end_time: core_utils::minutes_to_time(core_utils::parse_hhmm(&self.end_time).expect("round-tripped time"))
                .expect("valid minute offset"),
            is_booked: self.is_booked,
            is_blocked: self.is_blocked,
            session_id: self.session_id,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct WireSlotPage {
    slots: Vec<WireSlot>,
    total_count: u64,
    limit: u32,
    offset: u32,
    has_more: bool,
}

impl WireSlotPage {
    fn from_domain(page: &SlotPage) -> Self {
        Self {
            slots: page.slots.iter().map(WireSlot::from_domain).collect(),
            total_count: page.total_count,
            limit: page.limit,
            offset: page.offset,
            has_more: page.has_more,
        }
    }

    fn into_domain(self) -> SlotPage {
        let slots: Vec<AvailabilitySlot> = self.slots.iter().map(WireSlot::to_domain).collect();
        let mut by_date: BTreeMap<time::Date, Vec<AvailabilitySlot>> = BTreeMap::new();
        for slot in &slots {
            by_date.entry(slot.date).or_default().push(slot.clone());
        }
        SlotPage {
            slots: slots.into(),
            by_date,
            total_count: self.total_count,
            limit: self.limit,
            offset: self.offset,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_type_key_maps_none_to_all() {
        assert_eq!(session_type_key(None), "ALL");
        assert_eq!(session_type_key(Some(SessionType::Personal)), "PERSONAL");
    }

    #[test]
    fn cache_key_is_stable_for_equal_queries() {
        let query = ListSlotsQuery { limit: 20, offset: 0, ..Default::default() };
        let from = time::macros::date!(2025 - 01 - 06);
        let to = time::macros::date!(2025 - 01 - 20);
        let a = slot_page_cache_key("acme", &query, from, to);
        let b = slot_page_cache_key("acme", &query, from, to);
        assert_eq!(a, b);
        assert_eq!(a, "slots:acme:ALL:2025-01-06:2025-01-20:20:0");
    }
}
