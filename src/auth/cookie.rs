//! Functions for storing the auth token in an encrypted private cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    auth::{Token, UserID},
};

/// The name of the cookie that holds the serialized [Token].
pub const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Add an auth cookie for `user_id` to the cookie jar that expires `duration` from now.
///
/// The expiry in the token is expressed in the local timezone given by `local_offset`.
///
/// # Errors
///
/// Returns [Error::JSONSerializationError] if the token could not be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let now = OffsetDateTime::now_utc().to_offset(local_offset);

    set_auth_cookie_with_expiry(jar, Token::issue(user_id, duration, now))
}

fn set_auth_cookie_with_expiry(
    jar: PrivateCookieJar,
    token: Token,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = token.expires_at;
    let token_string = serde_json::to_string(&token)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Overwrite the auth cookie with an expired value so the client deletes it.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read and check the auth token from the cookie jar.
///
/// # Errors
///
/// - [Error::CookieMissing] if there is no auth cookie or it could not be decrypted.
/// - [Error::InvalidDateFormat] if the token could not be parsed.
/// - [Error::TokenExpired] if the token's expiry time has passed.
pub fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token: Token = serde_json::from_str(cookie.value_trimmed())
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), cookie.value().to_owned()))?;

    if token.is_expired_at(OffsetDateTime::now_utc()) {
        return Err(Error::TokenExpired);
    }

    Ok(token)
}

/// Push the expiry of the auth cookie out to at least `duration` from now.
///
/// Cookies that already expire later than that, e.g. "remember me" cookies, keep their
/// expiry.
///
/// # Errors
///
/// Returns the errors of [get_token_from_cookies] and [set_auth_cookie]. The cookie jar is
/// not modified if an error is returned.
pub fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;
    let now = OffsetDateTime::now_utc().to_offset(local_offset);

    set_auth_cookie_with_expiry(jar, token.extended(duration, now))
}
