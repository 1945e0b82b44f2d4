use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Iso8601;
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "service-impl")]
use core_utils::{time_to_minutes, DayOfWeek, SessionType};

fn parse_date(s: &str) -> Result<time::Date, String> {
    time::Date::parse(s, &Iso8601::DATE).map_err(|e| format!("invalid date {s:?}: {e}"))
}

fn format_date(date: time::Date) -> String {
    date.format(&Iso8601::DATE).expect("formattable date")
}

#[cfg(feature = "service-impl")]
fn parse_hhmm_time(s: &str) -> Result<time::Time, String> {
    let minutes = core_utils::parse_hhmm(s).map_err(|e| format!("invalid time {s:?}: {e}"))?;
    core_utils::minutes_to_time(minutes).map_err(|e| format!("invalid time {s:?}: {e}"))
}

#[cfg(feature = "service-impl")]
fn format_hhmm_time(time: time::Time) -> String {
    core_utils::format_hhmm(time_to_minutes(time))
}

fn default_true() -> bool {
    true
}

/// One weekly recurring availability window (§3, §4.4). `day_of_week` is
/// `0..6` with `0 = Sunday`; `start_time`/`end_time` are `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeeklyPatternTO {
    #[serde(default)]
    pub id: Uuid,
    pub session_type: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
    pub timezone: Arc<str>,
    #[serde(rename = "$version")]
    #[serde(default)]
    pub version: Uuid,
}

#[cfg(feature = "service-impl")]
impl From<&service::weekly_pattern::WeeklyPattern> for WeeklyPatternTO {
    fn from(pattern: &service::weekly_pattern::WeeklyPattern) -> Self {
        Self {
            id: pattern.id,
            session_type: pattern.session_type.as_str().to_string(),
            day_of_week: pattern.day_of_week.to_number(),
            start_time: format_hhmm_time(pattern.start_time),
            end_time: format_hhmm_time(pattern.end_time),
            is_active: pattern.is_active,
            timezone: pattern.timezone.clone(),
            version: pattern.version,
        }
    }
}

/// Input for creating a pattern; mirrors `WeeklyPatternTO` minus the
/// server-assigned `id`/`$version`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewWeeklyPatternTO {
    pub session_type: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub timezone: Arc<str>,
}

#[cfg(feature = "service-impl")]
impl TryFrom<&NewWeeklyPatternTO> for service::weekly_pattern::NewWeeklyPattern {
    type Error = service::ServiceError;

    fn try_from(to: &NewWeeklyPatternTO) -> Result<Self, Self::Error> {
        Ok(Self {
            session_type: to
                .session_type
                .parse::<SessionType>()
                .map_err(|e| service::ServiceError::BadInput(e.to_string()))?,
            day_of_week: DayOfWeek::from_number(to.day_of_week)
                .ok_or_else(|| service::ServiceError::BadInput(format!("invalid day_of_week {}", to.day_of_week)))?,
            start_time: parse_hhmm_time(&to.start_time).map_err(service::ServiceError::BadInput)?,
            end_time: parse_hhmm_time(&to.end_time).map_err(service::ServiceError::BadInput)?,
            is_active: to.is_active,
            timezone: to.timezone.clone(),
        })
    }
}

/// Partial update; `None` fields leave the stored value unchanged (§4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WeeklyPatternDeltaTO {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
    pub timezone: Option<Arc<str>>,
}

#[cfg(feature = "service-impl")]
impl TryFrom<&WeeklyPatternDeltaTO> for service::weekly_pattern::WeeklyPatternDelta {
    type Error = service::ServiceError;

    fn try_from(to: &WeeklyPatternDeltaTO) -> Result<Self, Self::Error> {
        Ok(Self {
            start_time: to
                .start_time
                .as_deref()
                .map(parse_hhmm_time)
                .transpose()
                .map_err(service::ServiceError::BadInput)?,
            end_time: to
                .end_time
                .as_deref()
                .map(parse_hhmm_time)
                .transpose()
                .map_err(service::ServiceError::BadInput)?,
            is_active: to.is_active,
            timezone: to.timezone.clone(),
        })
    }
}

/// Request body for `POST /availability/patterns/bulk` (§4.4 bulk-replace
/// protocol).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkReplacePatternsRequestTO {
    pub patterns: Vec<NewWeeklyPatternTO>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkReplaceOutcomeTO {
    pub old_patterns: Vec<WeeklyPatternTO>,
    pub new_patterns: Vec<WeeklyPatternTO>,
    pub slots_blocked: u64,
    pub slots_created: u64,
}

#[cfg(feature = "service-impl")]
impl From<&service::weekly_pattern::BulkReplaceOutcome> for BulkReplaceOutcomeTO {
    fn from(outcome: &service::weekly_pattern::BulkReplaceOutcome) -> Self {
        Self {
            old_patterns: outcome.old_patterns.iter().map(WeeklyPatternTO::from).collect(),
            new_patterns: outcome.new_patterns.iter().map(WeeklyPatternTO::from).collect(),
            slots_blocked: outcome.slots_blocked,
            slots_created: outcome.slots_created,
        }
    }
}

/// Request body for `POST /availability/generate-slots`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateSlotsRequestTO {
    pub start_date: String,
    pub end_date: String,
    pub session_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateSlotsResponseTO {
    pub inserted: u64,
}

/// One bookable hourly slot (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilitySlotTO {
    pub id: Uuid,
    pub session_type: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub is_booked: bool,
    pub is_blocked: bool,
    pub session_id: Option<Uuid>,
}

#[cfg(feature = "service-impl")]
impl From<&service::availability_slot::AvailabilitySlot> for AvailabilitySlotTO {
    fn from(slot: &service::availability_slot::AvailabilitySlot) -> Self {
        Self {
            id: slot.id,
            session_type: slot.session_type.as_str().to_string(),
            date: format_date(slot.date),
            start_time: format_hhmm_time(slot.start_time),
            end_time: format_hhmm_time(slot.end_time),
            is_booked: slot.is_booked,
            is_blocked: slot.is_blocked,
            session_id: slot.session_id,
        }
    }
}

/// Query params accepted by `GET /availability/slots/{slug}` (§4.8).
#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSlotsQueryTO {
    pub session_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[cfg(feature = "service-impl")]
impl TryFrom<&ListSlotsQueryTO> for service::availability_slot::ListSlotsQuery {
    type Error = service::ServiceError;

    fn try_from(to: &ListSlotsQueryTO) -> Result<Self, Self::Error> {
        Ok(Self {
            session_type: to
                .session_type
                .as_deref()
                .map(|s| s.parse::<SessionType>())
                .transpose()
                .map_err(|e| service::ServiceError::BadInput(e.to_string()))?,
            date_from: to.date_from.as_deref().map(parse_date).transpose().map_err(service::ServiceError::BadInput)?,
            date_to: to.date_to.as_deref().map(parse_date).transpose().map_err(service::ServiceError::BadInput)?,
            limit: to.limit.unwrap_or(0),
            offset: to.offset.unwrap_or(0),
        })
    }
}

/// Page of bookable slots as returned to the public (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SlotPageTO {
    pub slots: Vec<AvailabilitySlotTO>,
    pub total_count: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

#[cfg(feature = "service-impl")]
impl From<&service::availability_slot::SlotPage> for SlotPageTO {
    fn from(page: &service::availability_slot::SlotPage) -> Self {
        Self {
            slots: page.slots.iter().map(AvailabilitySlotTO::from).collect(),
            total_count: page.total_count,
            limit: page.limit,
            offset: page.offset,
            has_more: page.has_more,
        }
    }
}

/// Request body for `POST /sessions/book` (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingRequestTO {
    pub consultant_slug: Arc<str>,
    pub session_type: String,
    pub date: String,
    pub time: String,
    pub duration_minutes: u16,
    pub client_full_name: Arc<str>,
    pub client_email: Arc<str>,
    pub client_phone: Option<Arc<str>>,
    pub amount_minor: i64,
    pub currency: Arc<str>,
    pub notes: Option<Arc<str>>,
    #[serde(default = "default_booking_source")]
    pub source: String,
}

fn default_booking_source() -> String {
    "public_booking".to_string()
}

#[cfg(feature = "service-impl")]
impl TryFrom<&BookingRequestTO> for service::session::BookingRequest {
    type Error = service::ServiceError;

    fn try_from(to: &BookingRequestTO) -> Result<Self, Self::Error> {
        let source = match to.source.as_str() {
            "public_booking" => service::session::BookingSource::PublicBooking,
            "manually_added" => service::session::BookingSource::ManuallyAdded,
            "naksha_platform" => service::session::BookingSource::NakshaPlatform,
            other => return Err(service::ServiceError::BadInput(format!("unknown booking source {other:?}"))),
        };
        Ok(Self {
            consultant_slug: to.consultant_slug.clone(),
            session_type: to
                .session_type
                .parse::<SessionType>()
                .map_err(|e| service::ServiceError::BadInput(e.to_string()))?,
            date: parse_date(&to.date).map_err(service::ServiceError::BadInput)?,
            time: parse_hhmm_time(&to.time).map_err(service::ServiceError::BadInput)?,
            duration_minutes: to.duration_minutes,
            client_full_name: to.client_full_name.clone(),
            client_email: to.client_email.clone(),
            client_phone: to.client_phone.clone(),
            amount_minor: to.amount_minor,
            currency: to.currency.clone(),
            notes: to.notes.clone(),
            source,
        })
    }
}

/// A booked (or cancelled) session (§3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionTO {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub client_id: Uuid,
    pub session_type: String,
    pub scheduled_date: String,
    pub scheduled_time: String,
    pub duration_minutes: u16,
    pub amount_minor: i64,
    pub currency: Arc<str>,
    pub status: String,
    pub payment_status: String,
    pub booking_source: Arc<str>,
    pub slot_id: Option<Uuid>,
}

#[cfg(feature = "service-impl")]
impl From<&service::session::Session> for SessionTO {
    fn from(session: &service::session::Session) -> Self {
        Self {
            id: session.id,
            consultant_id: session.consultant_id,
            client_id: session.client_id,
            session_type: session.session_type.as_str().to_string(),
            scheduled_date: format_date(session.scheduled_date),
            scheduled_time: format_hhmm_time(session.scheduled_time),
            duration_minutes: session.duration_minutes,
            amount_minor: session.amount_minor,
            currency: session.currency.clone(),
            status: session.status.as_str().to_string(),
            payment_status: session.payment_status.as_str().to_string(),
            booking_source: session.booking_source.clone(),
            slot_id: session.slot_id,
        }
    }
}
