//! The transactions page with month, kind and category filters.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    auth::Session,
    category::{Category, CategoryId, list_categories},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, EXPENSE_TEXT_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, INCOME_TEXT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        currency_rounded_with_tooltip, edit_delete_action_links,
    },
    kind::{Kind, parse_kind_filter},
    month::Month,
    navigation::NavBar,
    timezone::{get_local_offset, local_today},
    transaction::{Transaction, TransactionFilter, list_transactions},
};

/// How many months the month filter offers, counting the current month.
const MONTH_FILTER_OPTIONS: usize = 12;

/// The query value of the month filter that turns it off.
const ALL_MONTHS: &str = "all";

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The raw filter values from the query string.
///
/// An empty value means "all". A missing month means the current month.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub month: Option<String>,
    pub kind: Option<String>,
    pub category_id: Option<String>,
}

impl TransactionsQuery {
    fn to_filter(&self, today: Date) -> TransactionFilter {
        let month = match self.month.as_deref() {
            None | Some("") => Some(Month::containing(today)),
            Some(ALL_MONTHS) => None,
            Some(raw) => match raw.parse() {
                Ok(month) => Some(month),
                Err(error) => {
                    tracing::debug!("Ignoring month filter: {error}");
                    Some(Month::containing(today))
                }
            },
        };

        let category_id = self
            .category_id
            .as_deref()
            .and_then(|raw| raw.parse::<CategoryId>().ok());

        TransactionFilter {
            month,
            kind: parse_kind_filter(self.kind.as_deref()),
            category_id,
        }
    }
}

/// Render the current user's transactions matching the filters in the query string.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Extension(session): Extension<Session>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let current_month = Month::containing(local_today(local_offset));
    let filter = query.to_filter(local_today(local_offset));

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = list_transactions(session.user_id, &filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;
    let categories = list_categories(session.user_id, None, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    drop(connection);

    Ok(transactions_view(
        &session,
        &filter,
        current_month,
        &categories,
        &transactions,
    )
    .into_response())
}

fn month_options(filter: &TransactionFilter, current_month: Month) -> Markup {
    let mut months = current_month.recent(MONTH_FILTER_OPTIONS);

    if let Some(selected) = filter.month.filter(|month| !months.contains(month)) {
        months.push(selected);
        months.sort_by(|a, b| b.cmp(a));
    }

    html! {
        option value=(ALL_MONTHS) selected[filter.month.is_none()] { "Все месяцы" }

        @for month in months {
            option value=(month) selected[filter.month == Some(month)] { (month.label()) }
        }
    }
}

fn filter_form(
    filter: &TransactionFilter,
    current_month: Month,
    categories: &[Category],
) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="grid grid-cols-1 sm:grid-cols-4 gap-4 items-end"
        {
            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Месяц" }

                select name="month" id="month" class=(FORM_TEXT_INPUT_STYLE)
                {
                    (month_options(filter, current_month))
                }
            }

            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Тип" }

                select name="kind" id="kind" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[filter.kind.is_none()] { "Все" }

                    @for kind in [Kind::Income, Kind::Expense] {
                        option value=(kind) selected[filter.kind == Some(kind)] {
                            (kind.plural_label())
                        }
                    }
                }
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Категория" }

                select name="category_id" id="category_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[filter.category_id.is_none()] { "Все" }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[filter.category_id == Some(category.id)]
                        {
                            (category.name) " (" (category.kind.label()) ")"
                        }
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Показать" }
        }
    }
}

fn transaction_row(transaction: &Transaction) -> Markup {
    let edit_url = endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
    let delete_url = endpoints::format_endpoint(endpoints::TRANSACTION, transaction.id);
    let amount_style = match transaction.kind {
        Kind::Income => INCOME_TEXT_STYLE,
        Kind::Expense => EXPENSE_TEXT_STYLE,
    };

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (transaction.date) }

            td class=(TABLE_CELL_STYLE)
            {
                (transaction.description.as_deref().unwrap_or(""))
            }

            td class=(TABLE_CELL_STYLE)
            {
                span class=(CATEGORY_BADGE_STYLE)
                {
                    (transaction.category_name.as_deref().unwrap_or("Без категории"))
                }
            }

            td class={ (TABLE_CELL_STYLE) " text-right " (amount_style) }
            {
                (currency_rounded_with_tooltip(transaction.signed_amount()))
            }

            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    (edit_delete_action_links(
                        &edit_url,
                        &delete_url,
                        "Удалить транзакцию?",
                        "closest tr",
                    ))
                }
            }
        }
    }
}

fn transactions_view(
    session: &Session,
    filter: &TransactionFilter,
    current_month: Month,
    categories: &[Category],
    transactions: &[Transaction],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW, session).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full max-w-5xl"
            {
                div class="flex justify-between items-center"
                {
                    h1 class="text-xl font-bold" { "Транзакции" }

                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                    {
                        "Добавить транзакцию"
                    }
                }

                (filter_form(filter, current_month, categories))

                div class="overflow-x-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Дата" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Описание" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Категория" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Сумма" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Действия" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                (transaction_row(transaction))
                            }

                            @if transactions.is_empty() {
                                tr
                                {
                                    td
                                        colspan="5"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "Транзакций не найдено."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Транзакции", &[], &content)
}
