//! Database operations for budgets.

use rusqlite::{Connection, Row};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    budget::{Budget, BudgetId, BudgetProgress, NewBudget},
    kind::Kind,
    month::Month,
};

/// Create the budget table.
///
/// The user and category tables must exist before this table is created.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budgets (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES categories(id),
            limit_amount REAL NOT NULL CHECK (limit_amount >= 0),
            month TEXT NOT NULL,
            UNIQUE(user_id, category_id, month)
        );",
    )?;

    Ok(())
}

/// Set the limit for a category and month, replacing any existing limit.
///
/// The insert and the update happen in a single statement, so two concurrent submissions
/// for the same category and month still leave exactly one budget.
///
/// # Errors
///
/// - [Error::BudgetCategoryNotFound] if the category does not exist or belongs to another
///   user.
/// - [Error::BudgetCategoryNotExpense] if the category is an income category.
pub fn upsert_budget(
    user_id: UserID,
    budget: &NewBudget,
    connection: &Connection,
) -> Result<BudgetId, Error> {
    let category_kind: Kind = connection
        .query_row(
            "SELECT type FROM categories WHERE id = ?1 AND user_id = ?2",
            (budget.category_id, user_id.as_i64()),
            |row| row.get(0),
        )
        .map_err(|error| match Error::from(error) {
            Error::NotFound => Error::BudgetCategoryNotFound,
            error => error,
        })?;

    if category_kind != Kind::Expense {
        return Err(Error::BudgetCategoryNotExpense);
    }

    connection
        .query_row(
            "INSERT INTO budgets (user_id, category_id, limit_amount, month)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, category_id, month)
            DO UPDATE SET limit_amount = excluded.limit_amount
            RETURNING id",
            (
                user_id.as_i64(),
                budget.category_id,
                budget.limit_amount,
                budget.month.first_day(),
            ),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// The user's budgets for `month` with their category names, ordered by category name.
pub fn list_budgets_for_month(
    user_id: UserID,
    month: Month,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT budgets.id, budgets.user_id, budgets.category_id, categories.name,
                budgets.limit_amount, budgets.month
            FROM budgets
            INNER JOIN categories ON categories.id = budgets.category_id
            WHERE budgets.user_id = ?1 AND budgets.month = ?2
            ORDER BY categories.name ASC, budgets.id ASC",
        )?
        .query_map((user_id.as_i64(), month.first_day()), map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// The user's budgets for `month` with the amount spent in each category during the month.
///
/// Spending is the sum of the user's expense transactions in the budget's category dated
/// from the first to the last day of the month.
pub fn list_budget_progress(
    user_id: UserID,
    month: Month,
    connection: &Connection,
) -> Result<Vec<BudgetProgress>, Error> {
    connection
        .prepare(
            "SELECT budgets.id, budgets.user_id, budgets.category_id, categories.name,
                budgets.limit_amount, budgets.month,
                (
                    SELECT COALESCE(SUM(transactions.amount), 0.0)
                    FROM transactions
                    WHERE transactions.user_id = budgets.user_id
                        AND transactions.category_id = budgets.category_id
                        AND transactions.type = 'expense'
                        AND transactions.date BETWEEN ?2 AND ?3
                )
            FROM budgets
            INNER JOIN categories ON categories.id = budgets.category_id
            WHERE budgets.user_id = ?1 AND budgets.month = ?2
            ORDER BY categories.name ASC, budgets.id ASC",
        )?
        .query_map(
            (user_id.as_i64(), month.first_day(), month.last_day()),
            |row| {
                Ok(BudgetProgress {
                    budget: map_budget_row(row)?,
                    spent: row.get(6)?,
                })
            },
        )?
        .map(|maybe_progress| maybe_progress.map_err(|error| error.into()))
        .collect()
}

/// Delete a budget owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingBudget] if the budget does not exist or belongs to another
/// user.
pub fn delete_budget(
    budget_id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budgets WHERE id = ?1 AND user_id = ?2",
        (budget_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let month: Date = row.get(5)?;

    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        limit_amount: row.get(4)?,
        month: Month::containing(month),
    })
}
