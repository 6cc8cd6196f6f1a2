//! Authentication middleware that resolves the session, extends cookies and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        DEFAULT_COOKIE_DURATION, Session, build_log_in_redirect_url,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        invalidate_auth_cookie,
        redirect::build_log_in_redirect_url_from_target,
    },
    endpoints,
    timezone::get_local_offset,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
    /// Used to resolve the user ID in the token to a [Session].
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

fn load_session(state: &AuthState, jar: &PrivateCookieJar) -> Result<Session, Error> {
    let token = get_token_from_cookies(jar)?;
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    Session::load(token.user_id, &connection)
}

/// Checks for a valid auth cookie and resolves it to a [Session].
///
/// The session and the user ID are placed into the request extensions and the request is
/// executed normally. Otherwise the response from `get_redirect` is returned with the
/// auth cookie invalidated.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        if request.uri().path().starts_with("/api") {
            tracing::warn!(
                "Missing or invalid HTMX headers for /api request. Falling back to dashboard."
            );
        } else {
            tracing::warn!("Invalid redirect URL from request URI. Falling back to dashboard.");
        }

        build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });
    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => {
            tracing::error!("Error getting local timezone. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };
    let session = match load_session(&state, &jar) {
        Ok(session) => session,
        Err(Error::DatabaseLockError) => return Error::DatabaseLockError.into_response(),
        Err(error) => {
            tracing::debug!("No valid session ({error}). Redirecting to log in page.");
            let jar = invalidate_auth_cookie(jar);
            return (jar, get_redirect(&log_in_redirect_url)).into_response();
        }
    };

    parts.extensions.insert(session.user_id);
    parts.extensions.insert(session);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let jar = match extend_auth_cookie_duration_if_needed(
        jar.clone(),
        DEFAULT_COOKIE_DURATION,
        local_offset,
    ) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Middleware that requires a logged in user for page routes.
///
/// Unauthenticated clients are redirected to the log-in page with the requested page in
/// the `redirect_url` query parameter.
///
/// Route handlers can use `Extension(session): Extension<Session>` or
/// `Extension(user_id): Extension<UserID>` to receive the current user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware that requires a logged in user for htmx API routes.
///
/// Same as [auth_guard], except that the redirect is sent as an `HX-Redirect` header so that
/// htmx navigates the whole page.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware that only lets admins through to page routes, everyone else is sent to the
/// dashboard.
///
/// Must be layered inside [auth_guard] so that the [Session] extension is present.
pub async fn admin_guard(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Response {
    if !session.is_admin() {
        tracing::warn!(
            "User {} tried to access {} without the admin role.",
            session.user_id,
            request.uri()
        );
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    next.run(request).await
}

/// Same as [admin_guard] for htmx API routes.
pub async fn admin_guard_hx(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Response {
    if !session.is_admin() {
        tracing::warn!(
            "User {} tried to access {} without the admin role.",
            session.user_id,
            request.uri()
        );
        return (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::FORBIDDEN,
        )
            .into_response();
    }

    next.run(request).await
}
