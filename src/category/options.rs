//! The `<option>` list for category selects, refreshed by htmx when the kind changes.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{Category, CategoryId, list_categories},
    kind::Kind,
};

/// The state needed for the category options endpoint.
#[derive(Debug, Clone)]
pub struct CategoryOptionsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryOptionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryOptionsQuery {
    pub kind: Kind,
}

/// Render the options for the user's categories of the requested kind.
pub async fn get_category_options(
    State(state): State<CategoryOptionsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<CategoryOptionsQuery>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match list_categories(user_id, Some(query.kind), &connection) {
        Ok(categories) => category_options_view(&categories, None).into_response(),
        Err(error) => {
            tracing::error!("Failed to retrieve categories for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// `<option>` elements for `categories`, with `selected` preselected.
///
/// A disabled placeholder is preselected when nothing is selected, so the browser forces the
/// user to pick a category.
pub fn category_options_view(categories: &[Category], selected: Option<CategoryId>) -> Markup {
    html! {
        option value="" disabled selected[selected.is_none()] { "Выберите категорию" }

        @for category in categories {
            option
                value=(category.id)
                selected[selected == Some(category.id)]
            {
                (category.name)
            }
        }
    }
}
