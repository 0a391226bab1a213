use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, TimeZone, Utc};

use crate::error::{AppError, AppResult};

/// Storage form for timestamps that take part in range queries.
/// Second precision and a fixed `+00:00` offset keep string order equal to time order.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn parse_input_timestamp(field: &str, raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| AppError::validation(format!("{field} is not an RFC3339 timestamp: {err}")))
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Dec 31, 23:59:59 UTC of the year `now` falls in.
pub fn end_of_year(now: &DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(*now)
}

/// Calendar days between the UTC dates of two instants; time of day is ignored.
pub fn whole_days_between(since: &DateTime<Utc>, now: &DateTime<Utc>) -> i64 {
    (now.date_naive() - since.date_naive()).num_days()
}
