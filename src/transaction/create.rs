//! The new transaction page and the endpoint that creates transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{Session, UserID},
    category::{Category, list_categories},
    endpoints,
    html::{FORM_CONTAINER_STYLE, base},
    kind::{Kind, parse_kind_filter},
    month::Month,
    navigation::NavBar,
    timezone::{get_local_offset, local_today},
    transaction::{
        TransactionForm, create_transaction,
        form::{FormAction, TransactionFormDefaults, transaction_form_view},
    },
};

/// The state needed to show the new transaction page or create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewTransactionQuery {
    pub kind: Option<String>,
}

/// Render the page for creating a transaction, an expense by default.
pub async fn get_new_transaction_page(
    State(state): State<CreateTransactionState>,
    Extension(session): Extension<Session>,
    Query(query): Query<NewTransactionQuery>,
) -> Result<Response, Error> {
    let kind = parse_kind_filter(query.kind.as_deref()).unwrap_or(Kind::Expense);
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = list_categories(session.user_id, Some(kind), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let form = transaction_form_view(
        FormAction::Create,
        &TransactionFormDefaults {
            kind,
            category_id: None,
            amount: None,
            date: local_today(local_offset),
            description: None,
        },
        &categories,
        "",
    );

    Ok(new_transaction_view(&session, &form).into_response())
}

fn new_transaction_view(session: &Session, form: &Markup) -> Markup {
    let content = html! {
        (NavBar::new(endpoints::NEW_TRANSACTION_VIEW, session).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Новая транзакция" }

            (form)
        }
    };

    base("Новая транзакция", &[], &content)
}

/// The transactions page filtered to `month`.
pub(super) fn transactions_month_url(month: Month) -> String {
    format!("{}?month={month}", endpoints::TRANSACTIONS_VIEW)
}

/// A route handler for creating a new transaction.
///
/// Redirects to the transactions page for the transaction's month on success. Invalid input
/// re-renders the form with an error message.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = form
        .validate()
        .and_then(|transaction| create_transaction(user_id, &transaction, &connection));

    match result {
        Ok(transaction) => {
            tracing::info!("user {user_id} created transaction {}", transaction.id);
            (
                HxRedirect(transactions_month_url(Month::containing(transaction.date))),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) if error.is_validation_error() => {
            let categories = match list_categories(user_id, Some(form.kind), &connection) {
                Ok(categories) => categories,
                Err(error) => {
                    tracing::error!("Failed to retrieve categories: {error}");
                    return error.into_alert_response();
                }
            };

            render_form_with_error(&form, &categories, &error)
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a transaction: {error}");
            error.into_alert_response()
        }
    }
}

fn render_form_with_error(
    form: &TransactionForm,
    categories: &[Category],
    error: &Error,
) -> Response {
    let Some(date) = form.date else {
        return Error::MissingTransactionFields.into_alert_response();
    };

    transaction_form_view(
        FormAction::Create,
        &TransactionFormDefaults {
            kind: form.kind,
            category_id: form.category_id,
            amount: form.amount,
            date,
            description: form.description.as_deref(),
        },
        categories,
        &error.to_string(),
    )
    .into_response()
}

#[cfg(test)]
mod create_transaction_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use axum_extra::extract::Form;
    use time::macros::date;

    use crate::{
        auth::Session,
        category::{Category, CategoryName, create_category},
        endpoints,
        kind::Kind,
        test_utils::{
            assert_form_error_message, assert_form_input, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, get_test_connection, insert_test_user, must_get_form,
            parse_html_document, parse_html_fragment, select_texts,
        },
        transaction::{TransactionFilter, TransactionForm, list_transactions},
    };

    use super::{
        CreateTransactionState, NewTransactionQuery, create_transaction_endpoint,
        get_new_transaction_page,
    };

    fn get_state() -> (CreateTransactionState, Session, Category) {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let groceries = create_category(
            session.user_id,
            CategoryName::new_unchecked("Продукты"),
            Kind::Expense,
            &connection,
        )
        .unwrap();
        create_category(
            session.user_id,
            CategoryName::new_unchecked("Зарплата"),
            Kind::Income,
            &connection,
        )
        .unwrap();

        let state = CreateTransactionState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, session, groceries)
    }

    #[tokio::test]
    async fn new_transaction_page_shows_form() {
        let (state, session, _) = get_state();

        let response = get_new_transaction_page(
            State(state),
            Extension(session),
            Query(NewTransactionQuery { kind: None }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "date", "date");
        assert_eq!(
            select_texts(&html, "form select[name=category_id] option"),
            ["Выберите категорию", "Продукты"]
        );
    }

    #[tokio::test]
    async fn new_transaction_page_can_start_with_income() {
        let (state, session, _) = get_state();

        let response = get_new_transaction_page(
            State(state),
            Extension(session),
            Query(NewTransactionQuery {
                kind: Some("income".to_owned()),
            }),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        assert_eq!(
            select_texts(&html, "select[name=category_id] option"),
            ["Выберите категорию", "Зарплата"]
        );
    }

    #[tokio::test]
    async fn can_create_transaction() {
        let (state, session, groceries) = get_state();
        let form = TransactionForm {
            kind: Kind::Expense,
            category_id: Some(groceries.id),
            amount: Some(500.0),
            date: Some(date!(2024 - 02 - 10)),
            description: Some("хлеб".to_owned()),
        };

        let response =
            create_transaction_endpoint(State(state.clone()), Extension(session.user_id), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, "/transactions?month=2024-02");
        let transactions = list_transactions(
            session.user_id,
            &TransactionFilter::default(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, 500.0);
        assert_eq!(transactions[0].description.as_deref(), Some("хлеб"));
    }

    #[tokio::test]
    async fn missing_category_re_renders_form() {
        let (state, session, _) = get_state();
        let form = TransactionForm {
            kind: Kind::Expense,
            category_id: None,
            amount: Some(500.0),
            date: Some(date!(2024 - 02 - 10)),
            description: None,
        };

        let response =
            create_transaction_endpoint(State(state.clone()), Extension(session.user_id), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Пожалуйста, заполните все обязательные поля");
        let transactions = list_transactions(
            session.user_id,
            &TransactionFilter::default(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn kind_mismatch_re_renders_form() {
        let (state, session, groceries) = get_state();
        let form = TransactionForm {
            kind: Kind::Income,
            category_id: Some(groceries.id),
            amount: Some(500.0),
            date: Some(date!(2024 - 02 - 10)),
            description: None,
        };

        let response =
            create_transaction_endpoint(State(state), Extension(session.user_id), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Тип операции не совпадает с типом категории");
    }

    #[tokio::test]
    async fn missing_date_returns_alert() {
        let (state, session, groceries) = get_state();
        let form = TransactionForm {
            kind: Kind::Expense,
            category_id: Some(groceries.id),
            amount: Some(500.0),
            date: None,
            description: None,
        };

        let response =
            create_transaction_endpoint(State(state), Extension(session.user_id), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
