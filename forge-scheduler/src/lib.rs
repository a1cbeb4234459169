#![deny(missing_docs)]
//! The recurrence algebra (spec.md §4.7): `validate`, `compute_next_run`,
//! and `next_aligned_tick`. Every function here is pure — no clock reads,
//! no I/O — so the autonomous loop (`forge-autonomous`) and the scheduler
//! CLI/API surfaces can be tested without mocking time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use forge_types::RecurrenceSpec;
use layer0::error::ScheduleError;

fn invalid_field(field: &str, reason: impl Into<String>) -> ScheduleError {
    ScheduleError::InvalidField { field: field.to_string(), reason: reason.into() }
}

fn parse_time(raw: &str) -> Result<(u32, u32), ScheduleError> {
    let (h, m) = raw.split_once(':').ok_or_else(|| invalid_field("time", format!("'{raw}' is not HH:MM")))?;
    let hour: u32 = h.parse().map_err(|_| invalid_field("time", format!("'{raw}' has a non-numeric hour")))?;
    let minute: u32 = m.parse().map_err(|_| invalid_field("time", format!("'{raw}' has a non-numeric minute")))?;
    if hour > 23 || minute > 59 {
        return Err(invalid_field("time", format!("'{raw}' is out of range")));
    }
    Ok((hour, minute))
}

fn parse_weekday(raw: &str) -> Result<Weekday, ScheduleError> {
    match raw.to_ascii_lowercase().as_str() {
        "monday" => Ok(Weekday::Mon),
        "tuesday" => Ok(Weekday::Tue),
        "wednesday" => Ok(Weekday::Wed),
        "thursday" => Ok(Weekday::Thu),
        "friday" => Ok(Weekday::Fri),
        "saturday" => Ok(Weekday::Sat),
        "sunday" => Ok(Weekday::Sun),
        _ => Err(invalid_field("day", format!("'{raw}' is not a weekday name"))),
    }
}

/// Validate a recurrence spec's type-dependent fields. A `RecurrenceSpec`
/// stored without passing this first is a bug in the caller — the
/// scheduler tool (`forge-tool`) runs this at creation time and rejects
/// the item before anything is stored.
pub fn validate(spec: &RecurrenceSpec) -> Result<(), ScheduleError> {
    match spec {
        RecurrenceSpec::Once { .. } => Ok(()),
        RecurrenceSpec::Interval { minutes } => {
            if *minutes == 0 {
                Err(invalid_field("minutes", "must be > 0"))
            } else {
                Ok(())
            }
        }
        RecurrenceSpec::Daily { time } => parse_time(time).map(|_| ()),
        RecurrenceSpec::Weekly { time, day } => {
            parse_time(time)?;
            parse_weekday(day).map(|_| ())
        }
        RecurrenceSpec::Monthly { time, day_of_month } => {
            parse_time(time)?;
            if !(1..=28).contains(day_of_month) {
                Err(invalid_field("day_of_month", "must be in [1, 28]"))
            } else {
                Ok(())
            }
        }
    }
}

fn daily_next(after: DateTime<Utc>, (hour, minute): (u32, u32)) -> DateTime<Utc> {
    let candidate = after.date_naive().and_hms_opt(hour, minute, 0).expect("validated HH:MM").and_utc();
    if candidate > after {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

fn weekly_next(after: DateTime<Utc>, target: Weekday, (hour, minute): (u32, u32)) -> DateTime<Utc> {
    let current = after.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let days_until = (wanted - current).rem_euclid(7);
    let date = after.date_naive() + Duration::days(days_until);
    let candidate = date.and_hms_opt(hour, minute, 0).expect("validated HH:MM").and_utc();
    if candidate > after {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

fn monthly_next(after: DateTime<Utc>, day_of_month: u8, (hour, minute): (u32, u32)) -> DateTime<Utc> {
    let (mut year, mut month) = (after.year(), after.month());
    loop {
        // day_of_month is validated to [1, 28], so every month has this day.
        let date = NaiveDate::from_ymd_opt(year, month, day_of_month as u32).expect("day_of_month <= 28 exists in every month");
        let candidate = date.and_hms_opt(hour, minute, 0).expect("validated HH:MM").and_utc();
        if candidate > after {
            return candidate;
        }
        if month == 12 {
            month = 1;
            year += 1;
        } else {
            month += 1;
        }
    }
}

/// Compute the next firing instant strictly after `after`, or `None` if
/// this recurrence has no future occurrence (an expired `once`). Assumes
/// `spec` already passed [`validate`] — a malformed `time`/`day` silently
/// yields `None` rather than panicking, since this function promises not
/// to fail.
pub fn compute_next_run(spec: &RecurrenceSpec, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match spec {
        RecurrenceSpec::Once { at } => (*at > after).then_some(*at),
        RecurrenceSpec::Interval { minutes } => Some(after + Duration::minutes(*minutes as i64)),
        RecurrenceSpec::Daily { time } => parse_time(time).ok().map(|t| daily_next(after, t)),
        RecurrenceSpec::Weekly { time, day } => {
            let t = parse_time(time).ok()?;
            let wd = parse_weekday(day).ok()?;
            Some(weekly_next(after, wd, t))
        }
        RecurrenceSpec::Monthly { time, day_of_month } => {
            let t = parse_time(time).ok()?;
            Some(monthly_next(after, *day_of_month, t))
        }
    }
}

/// Return the next wall-clock instant whose minute is a multiple of
/// `tick_minutes` with seconds and sub-seconds zero. Guaranteed `>= now`;
/// strictly `> now` unless `now` already sits exactly on a tick boundary.
pub fn next_aligned_tick(tick_minutes: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let tick_minutes = tick_minutes.max(1);
    let minute = now.minute();
    let already_aligned = minute % tick_minutes == 0 && now.second() == 0 && now.timestamp_subsec_nanos() == 0;
    let base_minute = (minute / tick_minutes) * tick_minutes;
    let truncated = now
        .with_minute(base_minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("base_minute and zeroed seconds/nanos are always valid");
    if already_aligned {
        truncated
    } else {
        truncated + Duration::minutes(tick_minutes as i64)
    }
}
