use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::error::{Error, Result};

/// Parse a date entered as `MM/DD/YYYY`, meaning midnight at the start of
/// that day in the organisation's local time.
pub fn parse_date(date: &str, local: FixedOffset) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%m/%d/%Y")
        .map_err(|_| Error::bad_request(format!("Invalid date '{date}', expected MM/DD/YYYY")))?;
    let midnight = day.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    local
        .from_local_datetime(&midnight)
        .single()
        .map(|datetime| datetime.with_timezone(&Utc))
        .ok_or_else(|| Error::bad_request(format!("Invalid date '{date}'")))
}

/// Parse a date entered as `MM/DD/YYYY`, meaning the end of that whole day
/// in the organisation's local time, i.e. the following local midnight.
pub fn parse_end_of_date(date: &str, local: FixedOffset) -> Result<DateTime<Utc>> {
    Ok(parse_date(date, local)? + Duration::days(1))
}

/// Express an instant in the organisation's local time, for display.
pub fn to_local(instant: DateTime<Utc>, local: FixedOffset) -> DateTime<FixedOffset> {
    instant.with_timezone(&local)
}
