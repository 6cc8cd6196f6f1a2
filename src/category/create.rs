//! Category creation form and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{CategoryName, create_category, domain::NewCategoryFormData},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    kind::Kind,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category creation form submission.
///
/// On success the client is sent back to the categories page on the tab for the new
/// category's kind.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryEndpointState>,
    Extension(user_id): Extension<UserID>,
    Form(new_category): Form<NewCategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&new_category.name) {
        Ok(name) => name,
        Err(error) => {
            return new_category_form_view(new_category.kind, &new_category.name, &error.to_string())
                .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_category(user_id, name, new_category.kind, &connection) {
        Ok(category) => {
            tracing::info!("user {user_id} created category {}", category.id);
            (
                HxRedirect(categories_tab_url(category.kind)),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");

            error.into_alert_response()
        }
    }
}

/// The URL of the categories page showing the tab for `kind`.
pub(super) fn categories_tab_url(kind: Kind) -> String {
    format!("{}?kind={}", endpoints::CATEGORIES_VIEW, kind)
}

/// The form for adding a category of `kind`, shown on the categories page.
pub(super) fn new_category_form_view(kind: Kind, name: &str, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::CATEGORIES_API)
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            class="w-full space-y-4"
        {
            input type="hidden" name="kind" value=(kind);

            div
            {
                label
                    for="name"
                    class=(FORM_LABEL_STYLE)
                {
                    "Новая категория"
                }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Название"
                    value=(name)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !error_message.is_empty() {
                p class=(FORM_ERROR_STYLE)
                {
                    (error_message)
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Добавить" }
        }
    }
}

#[cfg(test)]
mod create_category_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::State,
        http::{StatusCode, header::CONTENT_TYPE},
        response::IntoResponse,
    };

    use crate::{
        category::{domain::NewCategoryFormData, list_categories},
        kind::Kind,
        test_utils::{
            assert_form_error_message, assert_hx_redirect, assert_valid_html, get_header,
            get_test_connection, insert_test_user, must_get_form, parse_html_fragment,
        },
    };

    use super::{CreateCategoryEndpointState, create_category_endpoint};

    #[tokio::test]
    async fn can_create_category() {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let state = CreateCategoryEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = NewCategoryFormData {
            name: " Зарплата ".to_owned(),
            kind: Kind::Income,
        };

        let response =
            create_category_endpoint(State(state.clone()), Extension(session.user_id), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, "/categories?kind=income");
        let categories = list_categories(
            session.user_id,
            Some(Kind::Income),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name.as_ref(), "Зарплата");
    }

    #[tokio::test]
    async fn create_category_fails_on_empty_name() {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let state = CreateCategoryEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = NewCategoryFormData {
            name: "   ".to_owned(),
            kind: Kind::Expense,
        };

        let response =
            create_category_endpoint(State(state.clone()), Extension(session.user_id), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            get_header(&response, CONTENT_TYPE.as_str()),
            "text/html; charset=utf-8"
        );
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Название категории не может быть пустым");
        let categories =
            list_categories(session.user_id, None, &state.db_connection.lock().unwrap()).unwrap();
        assert!(categories.is_empty());
    }
}
