//! The token stored in the auth cookie and its JSON representation.

use std::cmp::max;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::auth::UserID;

mod datetime_format {
    //! Specifies how to serialize a [time::OffsetDateTime] in a custom format that
    //! avoids serialisations with datetimes containing midnight.
    //!
    //! The default serializer for [time::OffsetDateTime] will serialize
    //! "00:00:00.000000" as "0:00:00.0" and the deserializer would error out
    //! because it expects the hours to be two digits, not one.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the cookie expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Identifies the logged in user until `expires_at`.
///
/// Sessions slide: every authenticated request may push `expires_at` further out with
/// [Token::extended], but never pulls it in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(
        serialize_with = "datetime_format::serialize",
        deserialize_with = "datetime_format::deserialize"
    )]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// A token for `user_id` that is valid for `duration` after `now`.
    ///
    /// The expiry keeps the offset of `now`, so pass the local time to get cookies that
    /// expire in the server's timezone.
    pub fn issue(user_id: UserID, duration: Duration, now: OffsetDateTime) -> Self {
        Self {
            user_id,
            expires_at: now + duration,
        }
    }

    /// Whether the session has ended at `now`. A token expiring exactly at `now` has expired.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// The same session, valid for at least `duration` after `now`.
    ///
    /// "Remember me" tokens that already outlast `duration` keep their expiry.
    pub fn extended(&self, duration: Duration, now: OffsetDateTime) -> Self {
        Self {
            user_id: self.user_id,
            expires_at: max(self.expires_at, now + duration),
        }
    }
}
