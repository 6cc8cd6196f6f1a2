//! Creates the application's database tables.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    auth::{create_role_table, create_user_table},
    budget::create_budget_table,
    category::create_category_table,
    transaction::create_transaction_table,
};

/// Create all the tables for the domain models.
///
/// Foreign key enforcement is switched on for `connection` and the role table is seeded with
/// the "user" and "admin" roles. Calling this on an initialized database is a no-op.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.busy_timeout(std::time::Duration::from_secs(5))?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_role_table(&transaction)?;
    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
