use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::UserID,
    budget::{BudgetId, delete_budget},
};

/// The state needed to delete a budget.
#[derive(Debug, Clone)]
pub struct DeleteBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting one of the user's budgets, responds with an alert.
pub async fn delete_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<DeleteBudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_budget(budget_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Бюджет удалён".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingBudget) => Error::DeleteMissingBudget.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not delete budget {budget_id}: {error}");
            error.into_alert_response()
        }
    }
}
