//! The admin panel: user roles and transaction exports.
//!
//! Every route in this module must be guarded by the admin middleware.

mod export;
mod users;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use export::{export_user_transactions, write_transactions_csv};
pub use users::{get_admin_page, update_user_role_endpoint};

/// The state needed by the admin routes.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}
