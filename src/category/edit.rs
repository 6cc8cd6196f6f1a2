//! Category rename page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{Session, UserID},
    category::{
        CategoryId, CategoryName, create::categories_tab_url, domain::RenameCategoryFormData,
        get_category, rename_category,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
};

/// The state needed for renaming a category.
#[derive(Debug, Clone)]
pub struct EditCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the page for renaming one of the user's categories.
pub async fn get_edit_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let category = get_category(category_id, session.user_id, &connection)?;
    let update_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category_id);
    let form = edit_category_form_view(&update_endpoint, category.name.as_ref(), "");

    let content = html! {
        (NavBar::new(endpoints::CATEGORIES_VIEW, &session).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Переименовать категорию" }
            (form)
        }
    };

    Ok(base("Изменить категорию", &[], &content).into_response())
}

/// Handle category rename form submission.
pub async fn rename_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<RenameCategoryFormData>,
) -> Response {
    let update_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category_id);

    let name = match CategoryName::new(&form_data.name) {
        Ok(name) => name,
        Err(error) => {
            return edit_category_form_view(&update_endpoint, &form_data.name, &error.to_string())
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

    let result = rename_category(category_id, user_id, name, &connection)
        .and_then(|_| get_category(category_id, user_id, &connection));

    match result {
        Ok(category) => (
            HxRedirect(categories_tab_url(category.kind)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::UpdateMissingCategory) => Error::UpdateMissingCategory.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while renaming category {category_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn edit_category_form_view(update_endpoint: &str, name: &str, error_message: &str) -> Markup {
    html! {
        form
            hx-put=(update_endpoint)
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label
                    for="name"
                    class=(FORM_LABEL_STYLE)
                {
                    "Название"
                }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Название"
                    value=(name)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !error_message.is_empty() {
                p class=(FORM_ERROR_STYLE)
                {
                    (error_message)
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Сохранить" }
        }
    }
}

#[cfg(test)]
mod edit_category_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };

    use crate::{
        Error,
        auth::Session,
        category::{
            Category, CategoryName, create_category, domain::RenameCategoryFormData, get_category,
        },
        endpoints,
        kind::Kind,
        test_utils::{
            assert_form_error_message, assert_form_input_with_value,
            assert_form_submit_button_with_text, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, get_test_connection, insert_test_user, must_get_form,
            parse_html_document, parse_html_fragment,
        },
    };

    use super::{EditCategoryState, get_edit_category_page, rename_category_endpoint};

    fn get_state() -> (EditCategoryState, Session, Category) {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let category = create_category(
            session.user_id,
            CategoryName::new_unchecked("Кафе"),
            Kind::Expense,
            &connection,
        )
        .unwrap();

        let state = EditCategoryState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        (state, session, category)
    }

    #[tokio::test]
    async fn edit_page_shows_prefilled_form() {
        let (state, session, category) = get_state();

        let response = get_edit_category_page(Path(category.id), State(state), Extension(session))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &endpoints::format_endpoint(endpoints::CATEGORY, category.id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "name", "text", "Кафе");
        assert_form_submit_button_with_text(&form, "Сохранить");
    }

    #[tokio::test]
    async fn edit_page_for_other_users_category_is_not_found() {
        let (state, _, category) = get_state();
        let other = insert_test_user("b@x.com", &state.db_connection.lock().unwrap());

        let result =
            get_edit_category_page(Path(category.id), State(state), Extension(other)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn rename_succeeds() {
        let (state, session, category) = get_state();
        let form = RenameCategoryFormData {
            name: "Рестораны".to_owned(),
        };

        let response = rename_category_endpoint(
            Path(category.id),
            State(state.clone()),
            Extension(session.user_id),
            Form(form),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, "/categories?kind=expense");
        let renamed = get_category(
            category.id,
            session.user_id,
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        assert_eq!(renamed.name.as_ref(), "Рестораны");
    }

    #[tokio::test]
    async fn rename_fails_on_empty_name() {
        let (state, session, category) = get_state();
        let form = RenameCategoryFormData {
            name: "".to_owned(),
        };

        let response = rename_category_endpoint(
            Path(category.id),
            State(state),
            Extension(session.user_id),
            Form(form),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Название категории не может быть пустым");
    }

    #[tokio::test]
    async fn rename_other_users_category_is_not_found() {
        let (state, _, category) = get_state();
        let other = insert_test_user("b@x.com", &state.db_connection.lock().unwrap());
        let form = RenameCategoryFormData {
            name: "Рестораны".to_owned(),
        };

        let response = rename_category_endpoint(
            Path(category.id),
            State(state),
            Extension(other.user_id),
            Form(form),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
