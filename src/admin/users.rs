//! The admin page listing every user, and the endpoint that changes a user's role.

use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::UtcOffset;

use crate::{
    Error,
    admin::AdminState,
    alert::Alert,
    auth::{Role, RoleId, Session, UserID, UserSummary, get_all_roles, list_users, set_user_role},
    endpoints::{self, format_endpoint},
    html::{
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    timezone::get_local_offset,
};

/// The form data sent when an admin picks a new role for a user.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role_id: RoleId,
}

/// Render the list of all users, newest first.
pub async fn get_admin_page(
    State(state): State<AdminState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let users = list_users(&connection)
        .inspect_err(|error| tracing::error!("Could not list users: {error}"))?;
    let roles = get_all_roles(&connection)
        .inspect_err(|error| tracing::error!("Could not list roles: {error}"))?;
    drop(connection);

    Ok(admin_view(&session, &users, &roles, local_offset).into_response())
}

/// A route handler that assigns the role in the form to the user in the path.
pub async fn update_user_role_endpoint(
    Path(user_id): Path<i64>,
    State(state): State<AdminState>,
    Extension(session): Extension<Session>,
    Form(form): Form<RoleForm>,
) -> Response {
    let user_id = UserID::new(user_id);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match set_user_role(user_id, form.role_id, &connection) {
        Ok(()) => {
            tracing::info!(
                "Admin {} set the role of user {user_id} to {}",
                session.user_id,
                form.role_id
            );
            Alert::SuccessSimple {
                message: "Роль обновлена".to_owned(),
            }
            .into_response()
        }
        Err(error @ (Error::UpdateMissingUser | Error::InvalidRole(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not set role of user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn role_select(user: &UserSummary, roles: &[Role]) -> Markup {
    let endpoint = format_endpoint(endpoints::USER_ROLE, user.id.as_i64());

    html! {
        select
            name="role_id"
            aria-label={ "Роль " (user.email) }
            hx-put=(endpoint)
            hx-trigger="change"
            hx-swap="none"
            hx-target-error="#alert-container"
            class=(FORM_TEXT_INPUT_STYLE)
        {
            @for role in roles {
                option value=(role.id) selected[role.id == user.role_id] { (role.name) }
            }
        }
    }
}

fn admin_view(
    session: &Session,
    users: &[UserSummary],
    roles: &[Role],
    local_offset: UtcOffset,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_VIEW, session).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-screen-lg space-y-4"
            {
                h1 class="text-xl font-bold" { "Пользователи" }

                div class="relative overflow-x-auto shadow-md sm:rounded-lg"
                {
                    table id="users" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Роль" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Зарегистрирован" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Экспорт" }
                            }
                        }

                        tbody
                        {
                            @for user in users {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (user.email) }
                                    td class=(TABLE_CELL_STYLE) { (role_select(user, roles)) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (user.created_at.to_offset(local_offset).date())
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        a
                                            href=(format_endpoint(endpoints::EXPORT_USER_TRANSACTIONS, user.id.as_i64()))
                                            class=(LINK_STYLE)
                                            download
                                        {
                                            "CSV"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Админ", &[], &content)
}
