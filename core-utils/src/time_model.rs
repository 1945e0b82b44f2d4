use std::fmt::{Display, Formatter};

use thiserror::Error;
use time::{Date, Duration, Time, Weekday};

#[derive(Debug, Error)]
pub enum TimeModelError {
    #[error("Invalid time string: {0}")]
    BadTime(String),
    #[error("Invalid date: {0}")]
    DateError(#[from] time::error::ComponentRange),
}

/// Day of week numbered the way the wire protocol expects it: 0 = Sunday.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub fn to_number(&self) -> u8 {
        match self {
            DayOfWeek::Sunday => 0,
            DayOfWeek::Monday => 1,
            DayOfWeek::Tuesday => 2,
            DayOfWeek::Wednesday => 3,
            DayOfWeek::Thursday => 4,
            DayOfWeek::Friday => 5,
            DayOfWeek::Saturday => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(DayOfWeek::Sunday),
            1 => Some(DayOfWeek::Monday),
            2 => Some(DayOfWeek::Tuesday),
            3 => Some(DayOfWeek::Wednesday),
            4 => Some(DayOfWeek::Thursday),
            5 => Some(DayOfWeek::Friday),
            6 => Some(DayOfWeek::Saturday),
            _ => None,
        }
    }
}

impl Display for DayOfWeek {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DayOfWeek::Sunday => "Sunday",
                DayOfWeek::Monday => "Monday",
                DayOfWeek::Tuesday => "Tuesday",
                DayOfWeek::Wednesday => "Wednesday",
                DayOfWeek::Thursday => "Thursday",
                DayOfWeek::Friday => "Friday",
                DayOfWeek::Saturday => "Saturday",
            }
        )
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sunday => Self::Sunday,
            Weekday::Monday => Self::Monday,
            Weekday::Tuesday => Self::Tuesday,
            Weekday::Wednesday => Self::Wednesday,
            Weekday::Thursday => Self::Thursday,
            Weekday::Friday => Self::Friday,
            Weekday::Saturday => Self::Saturday,
        }
    }
}
impl From<DayOfWeek> for Weekday {
    fn from(day_of_week: DayOfWeek) -> Self {
        match day_of_week {
            DayOfWeek::Sunday => Self::Sunday,
            DayOfWeek::Monday => Self::Monday,
            DayOfWeek::Tuesday => Self::Tuesday,
            DayOfWeek::Wednesday => Self::Wednesday,
            DayOfWeek::Thursday => Self::Thursday,
            DayOfWeek::Friday => Self::Friday,
            DayOfWeek::Saturday => Self::Saturday,
        }
    }
}

/// `weekday(date) -> 0..6` with 0=Sunday, per the wire protocol.
pub fn weekday(date: Date) -> DayOfWeek {
    DayOfWeek::from(date.weekday())
}

/// Parses `HH:MM` into minutes-of-day. Fails with `BadTime` unless the
/// string matches `^([01]?\d|2[0-3]):[0-5]\d$`.
pub fn parse_hhmm(s: &str) -> Result<u16, TimeModelError> {
    let (hour_str, minute_str) = s
        .split_once(':')
        .ok_or_else(|| TimeModelError::BadTime(s.to_string()))?;
    if hour_str.is_empty() || hour_str.len() > 2 || minute_str.len() != 2 {
        return Err(TimeModelError::BadTime(s.to_string()));
    }
    if !hour_str.bytes().all(|b| b.is_ascii_digit()) || !minute_str.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(TimeModelError::BadTime(s.to_string()));
    }
    let hour: u16 = hour_str.parse().map_err(|_| TimeModelError::BadTime(s.to_string()))?;
    let minute: u16 = minute_str.parse().map_err(|_| TimeModelError::BadTime(s.to_string()))?;
    if hour > 23 || minute > 59 {
        return Err(TimeModelError::BadTime(s.to_string()));
    }
    Ok(hour * 60 + minute)
}

/// Inverse of `parse_hhmm`: formats minutes-of-day as zero-padded `HH:MM`.
pub fn format_hhmm(minutes_of_day: u16) -> String {
    format!("{:02}:{:02}", minutes_of_day / 60, minutes_of_day % 60)
}

pub fn minutes_to_time(minutes_of_day: u16) -> Result<Time, TimeModelError> {
    Time::from_hms(
        (minutes_of_day / 60) as u8,
        (minutes_of_day % 60) as u8,
        0,
    )
    .map_err(TimeModelError::DateError)
}

pub fn time_to_minutes(t: Time) -> u16 {
    t.hour() as u16 * 60 + t.minute() as u16
}

/// Enumerates whole hours stepping by 60 minutes over `[start_min, end_min)`.
/// The final sub-hour remainder, if `end_min - start_min` is not a multiple
/// of 60, is deliberately discarded — this mirrors a policy decision in the
/// source system and is not a bug. See the pattern-engine documentation for
/// the rationale.
pub fn enumerate_hourly(start_min: u16, end_min: u16) -> Vec<(u16, u16)> {
    let mut out = Vec::new();
    let mut cursor = start_min;
    while cursor + 60 <= end_min {
        out.push((cursor, cursor + 60));
        cursor += 60;
    }
    out
}

/// Enumerates calendar dates in `[start, end]`, inclusive, stepping one
/// calendar day at a time. Timezone-neutral: operates on naive dates.
pub fn enumerate_dates(start: Date, end: Date) -> Vec<Date> {
    if start > end {
        return Vec::new();
    }
    let days = (end - start).whole_days();
    (0..=days)
        .map(|offset| start + Duration::days(offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parse_hhmm_accepts_valid_times() {
        assert_eq!(parse_hhmm("00:00").unwrap(), 0);
        assert_eq!(parse_hhmm("09:30").unwrap(), 9 * 60 + 30);
        assert_eq!(parse_hhmm("23:59").unwrap(), 23 * 60 + 59);
        assert_eq!(parse_hhmm("9:05").unwrap(), 9 * 60 + 5);
    }

    #[test]
    fn parse_hhmm_rejects_invalid_times() {
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("12:60").is_err());
        assert!(parse_hhmm("12-30").is_err());
        assert!(parse_hhmm("").is_err());
    }

    #[test]
    fn parse_format_round_trip() {
        for minutes in [0u16, 5, 60, 90, 599, 1439] {
            let s = format_hhmm(minutes);
            assert_eq!(parse_hhmm(&s).unwrap(), minutes);
        }
    }

    #[test]
    fn enumerate_hourly_discards_remainder() {
        // S1: {09:00, 10:30} yields exactly one slot {09:00, 10:00}.
        let start = parse_hhmm("09:00").unwrap();
        let end = parse_hhmm("10:30").unwrap();
        let slots = enumerate_hourly(start, end);
        assert_eq!(slots, vec![(9 * 60, 10 * 60)]);
    }

    #[test]
    fn enumerate_hourly_exact_multiple() {
        let slots = enumerate_hourly(9 * 60, 12 * 60);
        assert_eq!(slots, vec![(540, 600), (600, 660), (660, 720)]);
    }

    #[test]
    fn enumerate_hourly_empty_when_under_an_hour() {
        assert!(enumerate_hourly(9 * 60, 9 * 60 + 30).is_empty());
    }

    #[test]
    fn enumerate_dates_inclusive() {
        let start = date!(2025 - 01 - 06);
        let end = date!(2025 - 01 - 08);
        let dates = enumerate_dates(start, end);
        assert_eq!(dates, vec![date!(2025 - 01 - 06), date!(2025 - 01 - 07), date!(2025 - 01 - 08)]);
    }

    #[test]
    fn enumerate_dates_single_day() {
        let d = date!(2025 - 01 - 06);
        assert_eq!(enumerate_dates(d, d), vec![d]);
    }

    #[test]
    fn weekday_monday_is_one() {
        // 2025-01-06 is a Monday.
        assert_eq!(weekday(date!(2025 - 01 - 06)), DayOfWeek::Monday);
        assert_eq!(weekday(date!(2025 - 01 - 06)).to_number(), 1);
    }

    #[test]
    fn weekday_sunday_is_zero() {
        // 2025-01-05 is a Sunday.
        assert_eq!(weekday(date!(2025 - 01 - 05)), DayOfWeek::Sunday);
        assert_eq!(weekday(date!(2025 - 01 - 05)).to_number(), 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `parseHHMM ∘ formatHHMM = id` on the valid domain (§8 round-trip law).
        #[test]
        fn parse_format_round_trip(minutes in 0u16..1440) {
            let formatted = format_hhmm(minutes);
            prop_assert_eq!(parse_hhmm(&formatted).unwrap(), minutes);
        }

        /// Every `(slot_start, slot_end)` pair from `enumerate_hourly` is
        /// exactly 60 minutes wide and starts on a 60-minute boundary from
        /// `start_min`, and no more than one sub-hour remainder is ever
        /// dropped at the tail.
        #[test]
        fn enumerate_hourly_pairs_are_whole_hours(start_min in 0u16..1440, span in 0u16..300) {
            let end_min = (start_min + span).min(1440);
            prop_assume!(end_min >= start_min);
            let slots = enumerate_hourly(start_min, end_min);
            for (a, b) in &slots {
                prop_assert_eq!(*b - *a, 60);
                prop_assert_eq!((*a - start_min) % 60, 0);
            }
            let covered = slots.len() as u16 * 60;
            prop_assert!(covered <= end_min.saturating_sub(start_min));
            prop_assert!(end_min.saturating_sub(start_min) - covered < 60);
        }

        /// `enumerateDates` always yields exactly `end - start + 1` entries,
        /// in order, one calendar day apart.
        #[test]
        fn enumerate_dates_length_matches_span(offset_days in 0i64..120) {
            let start = time::macros::date!(2025 - 01 - 01);
            let end = start + Duration::days(offset_days);
            let dates = enumerate_dates(start, end);
            prop_assert_eq!(dates.len() as i64, offset_days + 1);
            for window in dates.windows(2) {
                prop_assert_eq!(window[1] - window[0], Duration::days(1));
            }
        }
    }
}
