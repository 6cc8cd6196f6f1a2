//! Resolves canonical timezone names, e.g. "Europe/Moscow", to UTC offsets.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the current UTC offset of `canonical_timezone`, or `None` if the name is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in the timezone with the given offset.
pub fn local_today(local_offset: UtcOffset) -> Date {
    OffsetDateTime::now_utc().to_offset(local_offset).date()
}
