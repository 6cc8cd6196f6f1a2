//! The edit transaction page and the endpoint that updates transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{Session, UserID},
    category::list_categories,
    endpoints::{self, format_endpoint},
    html::{FORM_CONTAINER_STYLE, base},
    month::Month,
    navigation::NavBar,
    transaction::{
        TransactionForm, TransactionId,
        create::transactions_month_url,
        form::{FormAction, TransactionFormDefaults, transaction_form_view},
        get_transaction, update_transaction,
    },
};

/// The state needed for the edit transaction page and endpoint.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the page for editing one of the user's transactions.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = get_transaction(transaction_id, session.user_id, &connection)?;
    let categories = list_categories(session.user_id, Some(transaction.kind), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let update_endpoint = format_endpoint(endpoints::TRANSACTION, transaction_id);
    let form = transaction_form_view(
        FormAction::Update(&update_endpoint),
        &TransactionFormDefaults {
            kind: transaction.kind,
            category_id: transaction.category_id,
            amount: Some(transaction.amount),
            date: transaction.date,
            description: transaction.description.as_deref(),
        },
        &categories,
        "",
    );

    let content = html! {
        (NavBar::new(endpoints::TRANSACTIONS_VIEW, &session).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Изменить транзакцию" }

            (form)
        }
    };

    Ok(base("Изменить транзакцию", &[], &content).into_response())
}

/// A route handler for updating a transaction owned by the current user.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
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

    let result = form.validate().and_then(|transaction| {
        update_transaction(transaction_id, user_id, &transaction, &connection)
            .map(|_| transaction.date)
    });

    match result {
        Ok(date) => (
            HxRedirect(transactions_month_url(Month::containing(date))),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) if error.is_validation_error() => {
            let Some(date) = form.date else {
                return error.into_alert_response();
            };

            let categories = match list_categories(user_id, Some(form.kind), &connection) {
                Ok(categories) => categories,
                Err(error) => {
                    tracing::error!("Failed to retrieve categories: {error}");
                    return error.into_alert_response();
                }
            };
            let update_endpoint = format_endpoint(endpoints::TRANSACTION, transaction_id);

            transaction_form_view(
                FormAction::Update(&update_endpoint),
                &TransactionFormDefaults {
                    kind: form.kind,
                    category_id: form.category_id,
                    amount: form.amount,
                    date,
                    description: form.description.as_deref(),
                },
                &categories,
                &error.to_string(),
            )
            .into_response()
        }
        Err(Error::UpdateMissingTransaction) => {
            Error::UpdateMissingTransaction.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating transaction {transaction_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
