//! The log-in page and the endpoint that checks credentials and sets the auth cookie.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        Email, IdentityProvider, authenticate, get_current_user, invalidate_auth_cookie,
        normalize_redirect_url, set_auth_cookie,
    },
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, base, email_input, loading_spinner, log_in_register, password_input},
    timezone::get_local_offset,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
pub const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

const NO_SUCH_USER_ERROR_MSG: &str = "Пользователь с таким email не найден";
const PROVIDER_ERROR_MSG: &str = "Не удалось войти, попробуйте ещё раз позже";
const INTERNAL_ERROR_MSG: &str = "Произошла внутренняя ошибка, попробуйте ещё раз позже";

/// Error messages to show next to the inputs of the log-in form.
#[derive(Default)]
struct LogInFormErrors<'a> {
    email: Option<&'a str>,
    password: Option<&'a str>,
}

fn log_in_form(email: &str, errors: LogInFormErrors, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (email_input(email, errors.email))
            (password_input("", 0, errors.password))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Запомнить меня на неделю"
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Войти"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Нет аккаунта? "
                a
                    href=(endpoints::REGISTER_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Зарегистрироваться"
                }
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// The state needed to perform a log-in.
#[derive(Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            identity_provider: state.identity_provider.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// Display the log-in page, or send users who are already logged in to the dashboard.
pub async fn get_log_in_page(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Query(query): Query<RedirectQuery>,
) -> Response {
    if is_logged_in(&state.db_connection, &jar) {
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", LogInFormErrors::default(), redirect_url.as_deref());
    let content = log_in_register("Вход в аккаунт", &log_in_form);

    base("Вход", &[], &content).into_response()
}

pub(crate) fn is_logged_in(db_connection: &Mutex<Connection>, jar: &PrivateCookieJar) -> bool {
    let connection = match db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return false;
        }
    };

    match get_current_user(jar, &connection) {
        Ok(user) => user.is_some(),
        Err(error) => {
            tracing::error!("could not resolve the current user: {error}");
            false
        }
    }
}

/// Handler for log-in requests via the POST method.
///
/// On success the auth cookie is set and the client is redirected to the requested page or
/// the dashboard. Otherwise the form is returned with an error message explaining the
/// problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();

    let email = match Email::new(&user_data.email) {
        Ok(email) => email,
        Err(error) => {
            let message = error.to_string();
            let errors = LogInFormErrors {
                email: Some(&message),
                ..Default::default()
            };
            return log_in_form(&user_data.email, errors, redirect_url).into_response();
        }
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => authenticate(
            &email,
            &user_data.password,
            state.identity_provider.as_ref(),
            &connection,
        ),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    let user = match result {
        Ok(user) => user,
        Err(error) => {
            let message = error.to_string();
            let errors = match error {
                Error::NotFound => LogInFormErrors {
                    email: Some(NO_SUCH_USER_ERROR_MSG),
                    ..Default::default()
                },
                Error::InvalidCredentials => LogInFormErrors {
                    password: Some(&message),
                    ..Default::default()
                },
                Error::ProviderAuthError(reason) => {
                    tracing::warn!("identity provider rejected log-in for {email}: {reason}");
                    LogInFormErrors {
                        password: Some(PROVIDER_ERROR_MSG),
                        ..Default::default()
                    }
                }
                error => {
                    tracing::error!("Unhandled error while verifying credentials: {error}");
                    LogInFormErrors {
                        password: Some(INTERNAL_ERROR_MSG),
                        ..Default::default()
                    }
                }
            };

            return log_in_form(email.as_ref(), errors, redirect_url).into_response();
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    set_auth_cookie(jar.clone(), user.id, cookie_duration, local_offset)
        .map(|updated_jar| {
            tracing::info!("user {} logged in", user.id);
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub email: String,

    /// Password entered during log-in, checked against both credential stores.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it is either set to some string or missing
    /// entirely. Any `Some` value means "remember me".
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}


#[cfg(test)]
mod log_in_page_tests {
    use axum::{
        extract::{Query, State},
        http::StatusCode,
    };
    use axum_extra::extract::PrivateCookieJar;
    use time::UtcOffset;

    use crate::{
        auth::{DEFAULT_COOKIE_DURATION, UserID, set_auth_cookie},
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_submit_button,
            assert_hx_endpoint, assert_redirect, assert_valid_html, must_get_form,
            parse_html_document,
        },
    };

    use super::{RedirectQuery, get_log_in_page, test_support::get_test_login_state};

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let state = get_test_login_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response =
            get_log_in_page(State(state), jar, Query(RedirectQuery { redirect_url: None })).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::LOG_IN_API, "hx-post");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        assert_form_submit_button(&form);

        let register_link = form
            .select(&scraper::Selector::parse("a[href]").unwrap())
            .next()
            .expect("expected a link to the register page");
        assert_eq!(register_link.value().attr("href"), Some(endpoints::REGISTER_VIEW));
    }

    #[tokio::test]
    async fn log_in_page_preserves_redirect_url() {
        let state = get_test_login_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let redirect_url = "/transactions?month=2024-02&kind=expense".to_owned();

        let response = get_log_in_page(
            State(state),
            jar,
            Query(RedirectQuery {
                redirect_url: Some(redirect_url.clone()),
            }),
        )
        .await;

        let document = parse_html_document(response).await;
        let input = document
            .select(&scraper::Selector::parse("input[name=redirect_url]").unwrap())
            .next()
            .expect("expected a redirect_url input");
        assert_eq!(input.value().attr("value"), Some(redirect_url.as_str()));
    }

    #[tokio::test]
    async fn logged_in_user_is_redirected_to_dashboard() {
        let state = get_test_login_state();
        let jar = set_auth_cookie(
            PrivateCookieJar::new(state.cookie_key.clone()),
            UserID::new(1),
            DEFAULT_COOKIE_DURATION,
            UtcOffset::UTC,
        )
        .unwrap();

        let response =
            get_log_in_page(State(state), jar, Query(RedirectQuery { redirect_url: None })).await;

        assert_redirect(&response, endpoints::DASHBOARD_VIEW);
    }
}
