//! Database operations for categories.

use rusqlite::{Connection, Row, Transaction, TransactionBehavior};

use crate::{
    Error,
    auth::UserID,
    category::{
        Category, CategoryId, CategoryName,
        domain::{DEFAULT_EXPENSE_CATEGORIES, DEFAULT_INCOME_CATEGORIES},
    },
    kind::Kind,
};

/// Create the category table.
///
/// The user table must exist before this table is created.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('income', 'expense'))
        );

        CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id, type);",
    )?;

    Ok(())
}

/// Create a category owned by `user_id` and return it with its generated ID.
pub fn create_category(
    user_id: UserID,
    name: CategoryName,
    kind: Kind,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO categories (user_id, name, type) VALUES (?1, ?2, ?3)",
        (user_id.as_i64(), name.as_ref(), kind),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id,
        name,
        kind,
    })
}

/// Insert the default income and expense categories for a new user.
pub fn seed_default_categories(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let mut statement =
        connection.prepare("INSERT INTO categories (user_id, name, type) VALUES (?1, ?2, ?3)")?;

    let defaults = DEFAULT_EXPENSE_CATEGORIES
        .iter()
        .map(|name| (name, Kind::Expense))
        .chain(
            DEFAULT_INCOME_CATEGORIES
                .iter()
                .map(|name| (name, Kind::Income)),
        );

    for (name, kind) in defaults {
        statement.execute((user_id.as_i64(), name, kind))?;
    }

    Ok(())
}

/// Retrieve a single category owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist or belongs to another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, user_id, name, type FROM categories WHERE id = ?1 AND user_id = ?2")?
        .query_row((category_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Retrieve the categories owned by `user_id` ordered by name, optionally only those of
/// `kind`.
pub fn list_categories(
    user_id: UserID,
    kind: Option<Kind>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, type FROM categories
            WHERE user_id = ?1 AND (?2 IS NULL OR type = ?2)
            ORDER BY name ASC, id ASC",
        )?
        .query_map((user_id.as_i64(), kind), map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Rename a category owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingCategory] if the category does not exist or belongs to
/// another user.
pub fn rename_category(
    category_id: CategoryId,
    user_id: UserID,
    new_name: CategoryName,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2 AND user_id = ?3",
        (new_name.as_ref(), category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category owned by `user_id` that no transaction or budget refers to.
///
/// The checks and the delete run in one transaction.
///
/// # Errors
///
/// - [Error::DeleteMissingCategory] if the category does not exist or belongs to another user.
/// - [Error::CategoryReferencedByTransaction] if a transaction refers to the category.
/// - [Error::CategoryReferencedByBudget] if a budget refers to the category. Transactions are
///   checked first.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let is_owned: bool = transaction.query_row(
        "SELECT EXISTS (SELECT 1 FROM categories WHERE id = ?1 AND user_id = ?2)",
        (category_id, user_id.as_i64()),
        |row| row.get(0),
    )?;

    if !is_owned {
        return Err(Error::DeleteMissingCategory);
    }

    let has_transactions: bool = transaction.query_row(
        "SELECT EXISTS (SELECT 1 FROM transactions WHERE category_id = ?1)",
        [category_id],
        |row| row.get(0),
    )?;

    if has_transactions {
        return Err(Error::CategoryReferencedByTransaction);
    }

    let has_budgets: bool = transaction.query_row(
        "SELECT EXISTS (SELECT 1 FROM budgets WHERE category_id = ?1)",
        [category_id],
        |row| row.get(0),
    )?;

    if has_budgets {
        return Err(Error::CategoryReferencedByBudget);
    }

    transaction.execute("DELETE FROM categories WHERE id = ?1", [category_id])?;
    transaction.commit()?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let raw_name: String = row.get(2)?;
    let name = CategoryName::new_unchecked(&raw_name);
    let kind = row.get(3)?;

    Ok(Category {
        id,
        user_id,
        name,
        kind,
    })
}
