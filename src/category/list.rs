//! Categories page with a tab per kind.

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
    auth::Session,
    category::{
        Category,
        create::{categories_tab_url, new_category_form_view},
        list_categories,
    },
    endpoints,
    html::{
        CATEGORY_BADGE_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, edit_delete_action_links,
    },
    kind::{Kind, parse_kind_filter},
    navigation::NavBar,
};

/// The state needed for the categories page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoriesQuery {
    pub kind: Option<String>,
}

/// Render the categories of the selected kind, expenses by default.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Extension(session): Extension<Session>,
    Query(query): Query<CategoriesQuery>,
) -> Result<Response, Error> {
    let kind = parse_kind_filter(query.kind.as_deref()).unwrap_or(Kind::Expense);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = list_categories(session.user_id, Some(kind), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    Ok(categories_view(&session, kind, &categories).into_response())
}

fn tab(kind: Kind, selected_kind: Kind) -> Markup {
    let style = if kind == selected_kind {
        "inline-block px-4 py-2 border-b-2 border-blue-600 text-blue-600 \
        dark:text-blue-500 dark:border-blue-500"
    } else {
        "inline-block px-4 py-2 border-b-2 border-transparent \
        hover:text-gray-600 hover:border-gray-300 dark:hover:text-gray-300"
    };

    html! {
        li
        {
            a
                href=(categories_tab_url(kind))
                class=(style)
                aria-current=[(kind == selected_kind).then_some("page")]
            {
                (kind.plural_label())
            }
        }
    }
}

fn categories_view(session: &Session, kind: Kind, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW, session).into_html();

    let table_row = |category: &Category| {
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category.id);
        let delete_url = endpoints::format_endpoint(endpoints::CATEGORY, category.id);
        let confirm_message = format!("Удалить категорию «{}»?", category.name);

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    span class=(CATEGORY_BADGE_STYLE) { (category.name) }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        (edit_delete_action_links(
                            &edit_url,
                            &delete_url,
                            &confirm_message,
                            "closest tr",
                        ))
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full max-w-xl"
            {
                h1 class="text-xl font-bold" { "Категории" }

                ul class="flex flex-wrap text-sm font-medium text-center text-gray-500
                    border-b border-gray-200 dark:text-gray-400 dark:border-gray-700"
                {
                    (tab(Kind::Expense, kind))
                    (tab(Kind::Income, kind))
                }

                (new_category_form_view(kind, "", ""))

                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Название" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Действия" }
                        }
                    }

                    tbody
                    {
                        @for category in categories {
                            (table_row(category))
                        }

                        @if categories.is_empty() {
                            tr
                            {
                                td
                                    colspan="2"
                                    class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                {
                                    "Категорий пока нет."
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Категории", &[], &content)
}
