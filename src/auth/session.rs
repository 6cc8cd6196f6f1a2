//! Resolving the auth cookie to the current user.

use axum_extra::extract::PrivateCookieJar;
use rusqlite::Connection;

use crate::{
    Error,
    auth::{Email, Role, User, UserID, get_token_from_cookies, get_user_by_id, get_user_role},
};

/// The logged in user, resolved once per request by the auth middleware.
///
/// Handlers receive it with `Extension(session): Extension<Session>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: UserID,
    pub email: Email,
    pub role: Role,
}

impl Session {
    /// Load the session for the user with `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if the user no longer exists.
    pub fn load(user_id: UserID, connection: &Connection) -> Result<Self, Error> {
        let user = get_user_by_id(user_id, connection)?;
        let role = get_user_role(user.id, connection)?;

        Ok(Self {
            user_id: user.id,
            email: user.email,
            role,
        })
    }

    /// Whether the user may use the admin panel.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Get the user that the auth cookie in `jar` belongs to.
///
/// Returns `None` if the cookie is missing, invalid or expired, or if the user no longer
/// exists.
///
/// # Errors
///
/// Returns an error only if the database query itself fails.
pub fn get_current_user(jar: &PrivateCookieJar, connection: &Connection) -> Result<Option<User>, Error> {
    let token = match get_token_from_cookies(jar) {
        Ok(token) => token,
        Err(_) => return Ok(None),
    };

    match get_user_by_id(token.user_id, connection) {
        Ok(user) => Ok(Some(user)),
        Err(Error::NotFound) => Ok(None),
        Err(error) => Err(error),
    }
}
