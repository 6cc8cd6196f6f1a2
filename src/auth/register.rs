//! The registration page and the endpoint that creates a new account.
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
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
        Email, IdentityProvider, ValidatedPassword, log_in::is_logged_in, register_account,
        set_auth_cookie,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, email_input,
        loading_spinner, log_in_register, password_input,
    },
    internal_server_error::get_internal_server_error_redirect,
    timezone::get_local_offset,
};

/// The minimum number of characters the password should have to be considered valid on the
/// client side. The server checks the password strength on top of this.
const PASSWORD_INPUT_MIN_LENGTH: u8 = 8;

const PROVIDER_ERROR_MSG: &str = "Не удалось создать аккаунт, попробуйте ещё раз позже";

fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Повторите пароль"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length)
                autofocus[error_message.is_some()]
            ;

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

/// Error messages to show next to the inputs of the registration form.
#[derive(Default)]
struct RegistrationFormErrors<'a> {
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn registration_form(email: &str, password: &str, errors: RegistrationFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #confirm-password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (email_input(email, errors.email))
            (password_input(password, PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, errors.confirm_password))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Зарегистрироваться"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Уже есть аккаунт? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Войти"
                }
            }
        }
    }
}

/// The state needed for creating a new account.
#[derive(Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
    pub db_connection: Arc<Mutex<Connection>>,
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
            identity_provider: state.identity_provider.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// Display the registration page, or send users who are already logged in to the dashboard.
pub async fn get_register_page(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
) -> Response {
    if is_logged_in(&state.db_connection, &jar) {
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    let registration_form = registration_form("", "", RegistrationFormErrors::default());
    let content = log_in_register("Регистрация", &registration_form);
    base("Регистрация", &[], &content).into_response()
}

#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Create an account, log the new user in and redirect them to the dashboard.
///
/// Invalid input is answered with the form and an error message next to the offending input.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let email = match Email::new(&user_data.email) {
        Ok(email) => email,
        Err(error) => {
            let message = error.to_string();
            let errors = RegistrationFormErrors {
                email: Some(&message),
                ..Default::default()
            };
            return registration_form(&user_data.email, &user_data.password, errors)
                .into_response();
        }
    };

    let validated_password = match ValidatedPassword::new(&user_data.password) {
        Ok(password) => password,
        Err(error) => {
            let message = error.to_string();
            let errors = RegistrationFormErrors {
                password: Some(&message),
                ..Default::default()
            };
            return registration_form(email.as_ref(), &user_data.password, errors)
                .into_response();
        }
    };

    if user_data.password != user_data.confirm_password {
        let message = Error::PasswordsDoNotMatch.to_string();
        let errors = RegistrationFormErrors {
            confirm_password: Some(&message),
            ..Default::default()
        };
        return registration_form(email.as_ref(), &user_data.password, errors).into_response();
    }

    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => register_account(
            &email,
            validated_password,
            state.password_hash_cost,
            state.identity_provider.as_ref(),
            &connection,
        ),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return get_internal_server_error_redirect();
        }
    };

    let user = match result {
        Ok(user) => user,
        Err(Error::DuplicateEmail) => {
            let message = Error::DuplicateEmail.to_string();
            let errors = RegistrationFormErrors {
                email: Some(&message),
                ..Default::default()
            };
            return registration_form(email.as_ref(), &user_data.password, errors)
                .into_response();
        }
        Err(Error::ProviderAuthError(reason)) => {
            tracing::warn!("identity provider rejected sign up for {email}: {reason}");
            let errors = RegistrationFormErrors {
                email: Some(PROVIDER_ERROR_MSG),
                ..Default::default()
            };
            return registration_form(email.as_ref(), &user_data.password, errors)
                .into_response();
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while registering {email}: {error}");
            return get_internal_server_error_redirect();
        }
    };

    match set_auth_cookie(jar, user.id, state.cookie_duration, local_offset) {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");

            get_internal_server_error_redirect()
        }
    }
}
