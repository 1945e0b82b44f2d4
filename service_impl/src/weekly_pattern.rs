use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use core_utils::{enumerate_hourly, time_to_minutes, DayOfWeek, SessionType};
use dao::availability_slot::{BlockPredicate, NewSlot};
use dao::weekly_pattern::WeeklyPatternEntity;
use dao::{AvailabilitySlotDao, TransactionDao, WeeklyPatternDao};
use service::clock::ClockService;
use service::coherence::CoherenceService;
use service::config::ConfigService;
use service::uuid_service::UuidService;
use service::weekly_pattern::{
    BulkReplaceOutcome, NewWeeklyPattern, WeeklyPattern, WeeklyPatternDelta, WeeklyPatternService,
};
use service::{InvalidationScope, ServiceError};
use uuid::Uuid;

use crate::gen_service_impl;

gen_service_impl! {
    struct WeeklyPatternServiceImpl: WeeklyPatternService = WeeklyPatternServiceDeps {
        WeeklyPatternDao: WeeklyPatternDao<Transaction = Self::Transaction> = weekly_pattern_dao,
        AvailabilitySlotDao: AvailabilitySlotDao<Transaction = Self::Transaction> = availability_slot_dao,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
        Cache: cache::Cache = cache,
        ClockService: ClockService = clock_service,
        ConfigService: ConfigService = config_service,
        CoherenceService: CoherenceService = coherence_service,
        UuidService: UuidService = uuid_service,
    }
}

fn validate_range(start: time::Time, end: time::Time) -> Result<(), ServiceError> {
    if end <= start {
        return Err(ServiceError::BadInput(format!(
            "end_time {end} must be after start_time {start}"
        )));
    }
    Ok(())
}

fn cache_key(consultant_id: Uuid) -> String {
    format!("patterns:{consultant_id}")
}

const MAX_BATCH: usize = 100;

impl<Deps: WeeklyPatternServiceDeps> WeeklyPatternServiceImpl<Deps> {
    async fn invalidate(&self, consultant_id: Uuid, consultant_slug: Arc<str>, scope: InvalidationScope) {
        if let Err(err) = self
            .coherence_service
            .invalidate(consultant_id, consultant_slug, scope, None)
            .await
        {
            tracing::warn!(%consultant_id, ?scope, error = %err, "post-commit cache invalidation failed");
        }
    }
}

#[async_trait]
impl<Deps: WeeklyPatternServiceDeps> WeeklyPatternService for WeeklyPatternServiceImpl<Deps> {
    type Transaction = Deps::Transaction;

    async fn list_patterns(
        &self,
        consultant_id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[WeeklyPattern]>, ServiceError> {
        let key = cache_key(consultant_id);
        if tx.is_none() {
            if let Ok(Some(bytes)) = self.cache.get(&key).await {
                if let Ok(cached) = serde_json::from_slice::<Vec<WirePattern>>(&bytes) {
                    return Ok(cached.iter().map(WirePattern::to_domain).collect());
                }
            }
        }

        let entities = self.weekly_pattern_dao.list_patterns(consultant_id, tx.clone()).await?;
        let mut patterns: Vec<WeeklyPattern> = entities.iter().map(WeeklyPattern::from).collect();
        patterns.sort_by(|a, b| {
            (a.session_type, a.day_of_week, a.start_time).cmp(&(b.session_type, b.day_of_week, b.start_time))
        });
        let patterns: Arc<[WeeklyPattern]> = patterns.into();

        if tx.is_none() {
            let config = self.config_service.get_config().await?;
            let wire: Vec<WirePattern> = patterns.iter().map(WirePattern::from_domain).collect();
            if let Ok(bytes) = serde_json::to_vec(&wire) {
                let _ = self.cache.set(&key, Arc::from(bytes), config.pattern_cache_ttl_seconds).await;
            }
        }
        Ok(patterns)
    }

    async fn create_pattern(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        new_pattern: NewWeeklyPattern,
        tx: Option<Self::Transaction>,
    ) -> Result<WeeklyPattern, ServiceError> {
        validate_range(new_pattern.start_time, new_pattern.end_time)?;
        let entity = WeeklyPatternEntity {
            id: self.uuid_service.new_uuid("weekly_pattern"),
            consultant_id,
            session_type: new_pattern.session_type,
            day_of_week: new_pattern.day_of_week,
            start_time: new_pattern.start_time,
            end_time: new_pattern.end_time,
            is_active: new_pattern.is_active,
            timezone: new_pattern.timezone,
            version: self.uuid_service.new_uuid("pattern_version"),
        };
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.weekly_pattern_dao.create_pattern(&entity, Some(tx.clone())).await?;
        self.transaction_dao.commit(tx).await?;
        self.invalidate(consultant_id, consultant_slug, InvalidationScope::Patterns).await;
        Ok(WeeklyPattern::from(&entity))
    }

    async fn update_pattern(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        id: Uuid,
        delta: WeeklyPatternDelta,
        tx: Option<Self::Transaction>,
    ) -> Result<WeeklyPattern, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let existing = self
            .weekly_pattern_dao
            .get_pattern(consultant_id, id, Some(tx.clone()))
            .await?
            .ok_or(ServiceError::NotFound)?;

        let start_time = delta.start_time.unwrap_or(existing.start_time);
        let end_time = delta.end_time.unwrap_or(existing.end_time);
        if delta.start_time.is_some() || delta.end_time.is_some() {
            validate_range(start_time, end_time)?;
        }

        let updated = WeeklyPatternEntity {
            start_time,
            end_time,
            is_active: delta.is_active.unwrap_or(existing.is_active),
            timezone: delta.timezone.unwrap_or(existing.timezone),
            version: self.uuid_service.new_uuid("pattern_version"),
            ..existing
        };
        self.weekly_pattern_dao.update_pattern(&updated, Some(tx.clone())).await?;
        self.transaction_dao.commit(tx).await?;
        self.invalidate(consultant_id, consultant_slug, InvalidationScope::Patterns).await;
        Ok(WeeklyPattern::from(&updated))
    }

    async fn delete_pattern(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        id: Uuid,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let existing = self
            .weekly_pattern_dao
            .get_pattern(consultant_id, id, Some(tx.clone()))
            .await?
            .ok_or(ServiceError::NotFound)?;

        self.weekly_pattern_dao.delete_pattern(consultant_id, id, Some(tx.clone())).await?;
        let predicate = BlockPredicate {
            session_type: existing.session_type,
            day_of_week: existing.day_of_week,
            start_time: existing.start_time,
            today: self.clock_service.date_now(),
        };
        self.availability_slot_dao
            .block_unbooked_slots(consultant_id, &predicate, Some(tx.clone()))
            .await?;
        self.transaction_dao.commit(tx).await?;
        self.invalidate(consultant_id, consultant_slug, InvalidationScope::All).await;
        Ok(())
    }

    async fn bulk_replace_patterns(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        new_patterns: Vec<NewWeeklyPattern>,
    ) -> Result<BulkReplaceOutcome, ServiceError> {
        for np in &new_patterns {
            validate_range(np.start_time, np.end_time)?;
        }

        let config = self.config_service.get_config().await?;
        let lock_key = format!("lock:patterns:{consultant_id}");
        // The cache's acquire_lock reclaims once the stored token's TTL has
        // elapsed, which is exactly the stale-lock-reclamation threshold
        // (§4.4 step 1): pass the stale-age as the TTL rather than the
        // nominal (longer) lock lifetime, so a holder older than that age is
        // treated as abandoned and overridden.
        //
        // The lock is an optimistic coordinator, not a correctness boundary
        // (§9): a cache outage must degrade to no-cache mode rather than
        // fail the write (§5, S5), so only "lock held by a live holder" is
        // `Busy` — a cache transport error proceeds without a token.
        let token = match self.cache.acquire_lock(&lock_key, config.stale_lock_age_seconds).await {
            Ok(Some(token)) => Some(token),
            Ok(None) => return Err(ServiceError::Busy),
            Err(err) => {
                tracing::warn!(%consultant_id, error = %err, "cache unavailable, proceeding without advisory lock");
                None
            }
        };

        let result = self
            .bulk_replace_locked(consultant_id, consultant_slug.clone(), new_patterns, &config)
            .await;

        if let Some(token) = token {
            let _ = self.cache.release_lock(&lock_key, &token).await;
        }
        result
    }
}

impl<Deps: WeeklyPatternServiceDeps> WeeklyPatternServiceImpl<Deps> {
    async fn bulk_replace_locked(
        &self,
        consultant_id: Uuid,
        consultant_slug: Arc<str>,
        new_patterns: Vec<NewWeeklyPattern>,
        config: &service::config::Config,
    ) -> Result<BulkReplaceOutcome, ServiceError> {
        let new_entities: Vec<WeeklyPatternEntity> = new_patterns
            .into_iter()
            .map(|np| WeeklyPatternEntity {
                id: self.uuid_service.new_uuid("weekly_pattern"),
                consultant_id,
                session_type: np.session_type,
                day_of_week: np.day_of_week,
                start_time: np.start_time,
                end_time: np.end_time,
                is_active: np.is_active,
                timezone: np.timezone,
                version: self.uuid_service.new_uuid("pattern_version"),
            })
            .collect();

        let tx = self.transaction_dao.new_transaction().await?;
        let (old, new) = self
            .weekly_pattern_dao
            .replace_patterns(consultant_id, &new_entities, Some(tx.clone()))
            .await?;

        let today = self.clock_service.date_now();
        let horizon_end = today + time::Duration::days(config.horizon_default_days);
        let diff = diff_patterns(&old, &new);

        let mut slots_blocked = 0u64;
        for target in &diff.to_block {
            let predicate = BlockPredicate {
                session_type: target.session_type,
                day_of_week: target.day_of_week,
                start_time: target.start_time,
                today,
            };
            slots_blocked += self
                .availability_slot_dao
                .block_unbooked_slots(consultant_id, &predicate, Some(tx.clone()))
                .await?;
        }

        let new_slots = build_new_slots(consultant_id, &diff.to_create, today, horizon_end);
        let mut slots_created = 0u64;
        for chunk in new_slots.chunks(MAX_BATCH) {
            slots_created += self
                .availability_slot_dao
                .create_slots_ignoring_duplicates(chunk, Some(tx.clone()))
                .await?;
        }

        self.transaction_dao.commit(tx).await?;
        self.invalidate(consultant_id, consultant_slug, InvalidationScope::All).await;

        Ok(BulkReplaceOutcome {
            old_patterns: old.iter().map(WeeklyPattern::from).collect(),
            new_patterns: new.iter().map(WeeklyPattern::from).collect(),
            slots_blocked,
            slots_created,
        })
    }
}

/// Identifies one `(sessionType, dayOfWeek)` bucket whose every future
/// unbooked slot at `start_time` must be blocked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct BlockTarget {
    session_type: SessionType,
    day_of_week: DayOfWeek,
    start_time: time::Time,
}

/// A new hourly slot the generator must materialize over the rolling horizon.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CreateTarget {
    session_type: SessionType,
    day_of_week: DayOfWeek,
    start_time: time::Time,
}

struct PatternDiff {
    to_block: Vec<BlockTarget>,
    to_create: Vec<CreateTarget>,
}

/// Groups a pattern set by `(sessionType, dayOfWeek)` and expands each group's
/// active ranges into the union of hourly start-minute offsets it covers.
fn group_hour_sets(patterns: &[WeeklyPatternEntity]) -> HashMap<(SessionType, DayOfWeek), BTreeSet<u16>> {
    let mut groups: HashMap<(SessionType, DayOfWeek), BTreeSet<u16>> = HashMap::new();
    for pattern in patterns {
        if !pattern.is_active {
            continue;
        }
        let key = (pattern.session_type, pattern.day_of_week);
        let entry = groups.entry(key).or_default();
        let start_min = time_to_minutes(pattern.start_time);
        let end_min = time_to_minutes(pattern.end_time);
        for (hour_start, _) in enumerate_hourly(start_min, end_min) {
            entry.insert(hour_start);
        }
    }
    groups
}

/// `diff(oldPatterns, newPatterns) -> {toBlock, toCreate}` (§4.5): buckets
/// both sides by `(sessionType, dayOfWeek)`, unions each side's hourly
/// coverage, and takes the symmetric set difference per bucket. Output is
/// sorted and deduplicated (via `BTreeSet`/sorted `Vec`) so replays of the
/// same two pattern sets always produce the same diff.
fn diff_patterns(old: &[WeeklyPatternEntity], new: &[WeeklyPatternEntity]) -> PatternDiff {
    let old_groups = group_hour_sets(old);
    let new_groups = group_hour_sets(new);

    let mut to_block = BTreeSet::new();
    let mut to_create = BTreeSet::new();

    let mut all_keys: BTreeSet<(SessionType, DayOfWeek)> = BTreeSet::new();
    all_keys.extend(old_groups.keys().copied());
    all_keys.extend(new_groups.keys().copied());

    for key in all_keys {
        let (session_type, day_of_week) = key;
        let empty = BTreeSet::new();
        let old_hours = old_groups.get(&key).unwrap_or(&empty);
        let new_hours = new_groups.get(&key).unwrap_or(&empty);

        for removed in old_hours.difference(new_hours) {
            let start_time = core_utils::minutes_to_time(*removed).expect("valid minute offset");
            to_block.insert(BlockTarget { session_type, day_of_week, start_time });
        }
        for added in new_hours.difference(old_hours) {
            let start_time = core_utils::minutes_to_time(*added).expect("valid minute offset");
            to_create.insert(CreateTarget { session_type, day_of_week, start_time });
        }
    }

    PatternDiff {
        to_block: to_block.into_iter().collect(),
        to_create: to_create.into_iter().collect(),
    }
}

/// Expands `targets` into concrete `NewSlot` rows for every date in
/// `[today, horizon_end]` whose weekday matches, grouped into batches
/// (caller further chunks each batch to the ≤100-row persistence limit).
fn build_new_slots(
    consultant_id: Uuid,
    targets: &[CreateTarget],
    today: time::Date,
    horizon_end: time::Date,
) -> Vec<NewSlot> {
    if targets.is_empty() {
        return Vec::new();
    }
    let mut slots = Vec::new();
    for date in core_utils::enumerate_dates(today, horizon_end) {
        let weekday = core_utils::weekday(date);
        for target in targets {
            if target.day_of_week != weekday {
                continue;
            }
            let start_min = time_to_minutes(target.start_time);
            let end_time = core_utils::minutes_to_time(start_min + 60).expect("valid minute offset");
            slots.push(NewSlot {
                consultant_id,
                session_type: target.session_type,
                date,
                start_time: target.start_time,
                end_time,
            });
        }
    }
    slots
}

/// Wire-stable snapshot used only for the `list_patterns` cache entry, so a
/// `moka`-evicted/serialized round trip never depends on `WeeklyPattern`'s
/// in-process field order or `time`/`uuid` `Debug` formats.
#[derive(serde::Serialize, serde::Deserialize)]
struct WirePattern {
    id: Uuid,
    consultant_id: Uuid,
    session_type: Arc<str>,
    day_of_week: u8,
    start_time: String,
    end_time: String,
    is_active: bool,
    timezone: Arc<str>,
    version: Uuid,
}

impl WirePattern {
    fn from_domain(pattern: &WeeklyPattern) -> Self {
        Self {
            id: pattern.id,
            consultant_id: pattern.consultant_id,
            session_type: Arc::from(pattern.session_type.as_str()),
            day_of_week: pattern.day_of_week.to_number(),
            start_time: core_utils::format_hhmm(time_to_minutes(pattern.start_time)),
            end_time: core_utils::format_hhmm(time_to_minutes(pattern.end_time)),
            is_active: pattern.is_active,
            timezone: pattern.timezone.clone(),
            version: pattern.version,
        }
    }

    fn to_domain(&self) -> WeeklyPattern {
        WeeklyPattern {
            id: self.id,
            consultant_id: self.consultant_id,
            session_type: self.session_type.parse().expect("round-tripped session type"),
            day_of_week: DayOfWeek::from_number(self.day_of_week).expect("round-tripped day of week"),
            start_time: core_utils::minutes_to_time(core_utils::parse_hhmm(&self.start_time).expect("round-tripped time"))
                .expect("valid minute offset"),
            end_time: core_utils::minutes_to_time(core_utils::parse_hhmm(&self.end_time).expect("round-tripped time"))
                .expect("valid minute offset"),
            is_active: self.is_active,
            timezone: self.timezone.clone(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::time;

    fn pattern(session_type: SessionType, day: DayOfWeek, start: time::Time, end: time::Time) -> WeeklyPatternEntity {
        WeeklyPatternEntity {
            id: Uuid::new_v4(),
            consultant_id: Uuid::new_v4(),
            session_type,
            day_of_week: day,
            start_time: start,
            end_time: end,
            is_active: true,
            timezone: Arc::from("UTC"),
            version: Uuid::new_v4(),
        }
    }

    #[test]
    fn diff_shrinking_range_blocks_the_trailing_hour() {
        // S3: {PERSONAL, Wed, 09:00, 12:00} narrowed to {PERSONAL, Wed, 09:00, 10:00}.
        let old = vec![pattern(SessionType::Personal, DayOfWeek::Wednesday, time!(09:00), time!(12:00))];
        let new = vec![pattern(SessionType::Personal, DayOfWeek::Wednesday, time!(09:00), time!(10:00))];
        let diff = diff_patterns(&old, &new);
        assert_eq!(diff.to_create, vec![]);
        assert_eq!(
            diff.to_block,
            vec![
                BlockTarget { session_type: SessionType::Personal, day_of_week: DayOfWeek::Wednesday, start_time: time!(10:00) },
                BlockTarget { session_type: SessionType::Personal, day_of_week: DayOfWeek::Wednesday, start_time: time!(11:00) },
            ]
        );
    }

    #[test]
    fn diff_distinct_session_types_do_not_interact() {
        // S2: PERSONAL Tue 10-12 untouched by a brand new WEBINAR Tue 11-13.
        let old = vec![pattern(SessionType::Personal, DayOfWeek::Tuesday, time!(10:00), time!(12:00))];
        let new = vec![
            pattern(SessionType::Personal, DayOfWeek::Tuesday, time!(10:00), time!(12:00)),
            pattern(SessionType::Webinar, DayOfWeek::Tuesday, time!(11:00), time!(13:00)),
        ];
        let diff = diff_patterns(&old, &new);
        assert!(diff.to_block.is_empty());
        assert_eq!(
            diff.to_create,
            vec![
                CreateTarget { session_type: SessionType::Webinar, day_of_week: DayOfWeek::Tuesday, start_time: time!(11:00) },
                CreateTarget { session_type: SessionType::Webinar, day_of_week: DayOfWeek::Tuesday, start_time: time!(12:00) },
            ]
        );
    }

    #[test]
    fn diff_identical_pattern_sets_is_empty() {
        let patterns = vec![pattern(SessionType::Personal, DayOfWeek::Monday, time!(09:00), time!(11:00))];
        let diff = diff_patterns(&patterns, &patterns);
        assert!(diff.to_block.is_empty());
        assert!(diff.to_create.is_empty());
    }

    #[test]
    fn diff_removed_group_blocks_every_hour() {
        let old = vec![pattern(SessionType::Personal, DayOfWeek::Friday, time!(09:00), time!(11:00))];
        let diff = diff_patterns(&old, &[]);
        assert_eq!(diff.to_create, vec![]);
        assert_eq!(diff.to_block.len(), 2);
    }
}
