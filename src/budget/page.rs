//! The budgets page and the endpoint that sets a budget.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{Session, UserID},
    budget::{BudgetForm, BudgetProgress, budget_progress_item, list_budget_progress, upsert_budget},
    category::{Category, CategoryId, category_options_view, list_categories},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, base,
    },
    kind::Kind,
    month::Month,
    navigation::NavBar,
    timezone::{get_local_offset, local_today},
};

/// The state needed for the budgets page and endpoint.
#[derive(Debug, Clone)]
pub struct BudgetsState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BudgetsQuery {
    pub month: Option<String>,
}

/// The budgets page showing `month`.
fn budgets_month_url(month: Month) -> String {
    format!("{}?month={month}", endpoints::BUDGETS_VIEW)
}

/// Render the budgets of the selected month, the current month by default.
pub async fn get_budgets_page(
    State(state): State<BudgetsState>,
    Extension(session): Extension<Session>,
    Query(query): Query<BudgetsQuery>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let current_month = Month::containing(local_today(local_offset));
    let month = match query.month.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => raw.parse().unwrap_or_else(|error| {
            tracing::debug!("Ignoring month filter: {error}");
            current_month
        }),
        None => current_month,
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budgets = list_budget_progress(session.user_id, month, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve budgets: {error}"))?;
    let categories = list_categories(session.user_id, Some(Kind::Expense), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    drop(connection);

    Ok(budgets_view(&session, month, &categories, &budgets).into_response())
}

/// Handle the budget form. Creates the budget or replaces the limit of an existing one.
pub async fn upsert_budget_endpoint(
    State(state): State<BudgetsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = form.validate().and_then(|budget| {
        upsert_budget(user_id, &budget, &connection).map(|budget_id| (budget_id, budget.month))
    });

    match result {
        Ok((budget_id, month)) => {
            tracing::info!("user {user_id} set budget {budget_id} for {month}");
            (HxRedirect(budgets_month_url(month)), StatusCode::SEE_OTHER).into_response()
        }
        Err(error) if error.is_validation_error() => {
            let categories = match list_categories(user_id, Some(Kind::Expense), &connection) {
                Ok(categories) => categories,
                Err(error) => {
                    tracing::error!("Failed to retrieve categories: {error}");
                    return error.into_alert_response();
                }
            };

            budget_form_view(
                &form.month,
                &categories,
                form.category_id,
                form.limit_amount,
                &error.to_string(),
            )
            .into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while setting a budget: {error}");
            error.into_alert_response()
        }
    }
}

fn budget_form_view(
    month: &str,
    categories: &[Category],
    category_id: Option<CategoryId>,
    limit_amount: Option<f64>,
    error_message: &str,
) -> Markup {
    let limit_str = limit_amount.map(|amount| format!("{amount:.2}"));

    html! {
        form
            hx-post=(endpoints::BUDGETS_API)
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            class="w-full space-y-4"
        {
            input type="hidden" name="month" value=(month);

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Категория" }

                select
                    name="category_id"
                    id="category_id"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    (category_options_view(categories, category_id))
                }
            }

            div
            {
                label for="limit_amount" class=(FORM_LABEL_STYLE) { "Лимит" }

                input
                    name="limit_amount"
                    id="limit_amount"
                    type="number"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    required
                    value=[limit_str.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !error_message.is_empty() {
                p class=(FORM_ERROR_STYLE)
                {
                    (error_message)
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Сохранить бюджет" }
        }
    }
}

fn month_selector(month: Month) -> Markup {
    html! {
        div class="flex items-center justify-between gap-4"
        {
            @if let Some(previous) = month.previous() {
                a
                    href=(budgets_month_url(previous))
                    class="px-3 py-1 rounded border border-gray-300 dark:border-gray-600"
                    aria-label="Предыдущий месяц"
                {
                    "←"
                }
            } @else {
                span {}
            }

            h2 class="text-lg font-semibold" { (month.label()) }

            @if let Some(next) = month.next() {
                a
                    href=(budgets_month_url(next))
                    class="px-3 py-1 rounded border border-gray-300 dark:border-gray-600"
                    aria-label="Следующий месяц"
                {
                    "→"
                }
            } @else {
                span {}
            }
        }
    }
}

fn budgets_view(
    session: &Session,
    month: Month,
    categories: &[Category],
    budgets: &[BudgetProgress],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW, session).into_html();
    let month_str = month.to_string();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full max-w-xl"
            {
                h1 class="text-xl font-bold" { "Бюджеты" }

                (month_selector(month))

                (budget_form_view(&month_str, categories, None, None, ""))

                @if budgets.is_empty() {
                    div class="text-center text-gray-500 dark:text-gray-400"
                    {
                        "Бюджетов на этот месяц нет."
                    }
                } @else {
                    ul id="budgets" class="space-y-4"
                    {
                        @for progress in budgets {
                            (budget_progress_item(progress, true))
                        }
                    }
                }
            }
        }
    };

    base("Бюджеты", &[], &content)
}
