//! Database operations for transactions.

use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    category::CategoryId,
    kind::Kind,
    transaction::{Transaction, TransactionFilter, TransactionId, ValidatedTransaction},
};

const SELECT_TRANSACTION: &str = "SELECT transactions.id, transactions.user_id,
    transactions.category_id, categories.name, transactions.amount, transactions.type,
    transactions.date, transactions.description, transactions.created_at
    FROM transactions
    LEFT JOIN categories ON categories.id = transactions.category_id";

/// Create the transaction table.
///
/// The user and category tables must exist before this table is created.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            category_id INTEGER REFERENCES categories(id),
            amount REAL NOT NULL CHECK (amount >= 0),
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            date TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);",
    )?;

    Ok(())
}

/// Create a transaction owned by `user_id`.
///
/// # Errors
///
/// - [Error::MissingTransactionFields] if the category does not exist or belongs to another
///   user.
/// - [Error::KindMismatch] if the transaction's kind differs from its category's kind.
pub fn create_transaction(
    user_id: UserID,
    transaction: &ValidatedTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    check_category(
        transaction.category_id,
        transaction.kind,
        user_id,
        &sql_transaction,
    )?;

    sql_transaction.execute(
        "INSERT INTO transactions (user_id, category_id, amount, type, date, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            user_id.as_i64(),
            transaction.category_id,
            transaction.amount,
            transaction.kind,
            transaction.date,
            transaction.description.as_deref(),
            OffsetDateTime::now_utc(),
        ),
    )?;

    let id = sql_transaction.last_insert_rowid();
    let created = get_transaction(id, user_id, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(created)
}

/// Retrieve a transaction owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another user.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE transactions.id = ?1 AND transactions.user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Retrieve the transactions owned by `user_id` that match every filter in `filter`, newest
/// first.
///
/// A month filter matches the first to the last day of the month inclusive.
pub fn list_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let first_day = filter.month.map(|month| month.first_day());
    let last_day = filter.month.map(|month| month.last_day());

    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION}
            WHERE transactions.user_id = ?1
                AND (?2 IS NULL OR transactions.date BETWEEN ?2 AND ?3)
                AND (?4 IS NULL OR transactions.type = ?4)
                AND (?5 IS NULL OR transactions.category_id = ?5)
            ORDER BY transactions.date DESC, transactions.id DESC"
        ))?
        .query_map(
            (
                user_id.as_i64(),
                first_day,
                last_day,
                filter.kind,
                filter.category_id,
            ),
            map_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Replace the fields of a transaction owned by `user_id`.
///
/// # Errors
///
/// - [Error::UpdateMissingTransaction] if the transaction does not exist or belongs to
///   another user.
/// - [Error::MissingTransactionFields] or [Error::KindMismatch] as for [create_transaction].
pub fn update_transaction(
    id: TransactionId,
    user_id: UserID,
    transaction: &ValidatedTransaction,
    connection: &Connection,
) -> Result<(), Error> {
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    check_category(
        transaction.category_id,
        transaction.kind,
        user_id,
        &sql_transaction,
    )?;

    let rows_affected = sql_transaction.execute(
        "UPDATE transactions
        SET category_id = ?1, amount = ?2, type = ?3, date = ?4, description = ?5
        WHERE id = ?6 AND user_id = ?7",
        (
            transaction.category_id,
            transaction.amount,
            transaction.kind,
            transaction.date,
            transaction.description.as_deref(),
            id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    sql_transaction.commit()?;

    Ok(())
}

/// Delete a transaction owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingTransaction] if the transaction does not exist or belongs to
/// another user.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Check that the category belongs to `user_id` and has the same kind as the transaction.
fn check_category(
    category_id: CategoryId,
    kind: Kind,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let category_kind: Kind = connection
        .query_row(
            "SELECT type FROM categories WHERE id = ?1 AND user_id = ?2",
            (category_id, user_id.as_i64()),
            |row| row.get(0),
        )
        .map_err(|error| match Error::from(error) {
            Error::NotFound => Error::MissingTransactionFields,
            error => error,
        })?;

    if category_kind != kind {
        return Err(Error::KindMismatch);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        amount: row.get(4)?,
        kind: row.get(5)?,
        date: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{Date, macros::date};

    use crate::{
        Error,
        auth::Session,
        category::{Category, CategoryName, create_category},
        kind::Kind,
        month::Month,
        test_utils::{get_test_connection, insert_test_user},
        transaction::{TransactionFilter, ValidatedTransaction},
    };

    use super::{
        create_transaction, delete_transaction, get_transaction, list_transactions,
        update_transaction,
    };

    struct Fixture {
        connection: Connection,
        session: Session,
        groceries: Category,
        salary: Category,
    }

    fn fixture() -> Fixture {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let groceries = create_category(
            session.user_id,
            CategoryName::new_unchecked("Продукты"),
            Kind::Expense,
            &connection,
        )
        .unwrap();
        let salary = create_category(
            session.user_id,
            CategoryName::new_unchecked("Зарплата"),
            Kind::Income,
            &connection,
        )
        .unwrap();

        Fixture {
            connection,
            session,
            groceries,
            salary,
        }
    }

    fn expense(category: &Category, amount: f64, date: Date) -> ValidatedTransaction {
        ValidatedTransaction {
            category_id: category.id,
            amount,
            kind: Kind::Expense,
            date,
            description: None,
        }
    }

    #[test]
    fn create_and_get() {
        let Fixture {
            connection,
            session,
            groceries,
            ..
        } = fixture();
        let new_transaction = ValidatedTransaction {
            description: Some("хлеб".to_owned()),
            ..expense(&groceries, 500.0, date!(2024 - 02 - 10))
        };

        let created = create_transaction(session.user_id, &new_transaction, &connection).unwrap();
        let got = get_transaction(created.id, session.user_id, &connection).unwrap();

        assert_eq!(got.amount, 500.0);
        assert_eq!(got.kind, Kind::Expense);
        assert_eq!(got.date, date!(2024 - 02 - 10));
        assert_eq!(got.description.as_deref(), Some("хлеб"));
        assert_eq!(got.category_id, Some(groceries.id));
        assert_eq!(got.category_name.as_deref(), Some("Продукты"));
        assert_eq!(got.user_id, session.user_id);
    }

    #[test]
    fn create_fails_when_kind_differs_from_category() {
        let Fixture {
            connection,
            session,
            salary,
            ..
        } = fixture();

        let result = create_transaction(
            session.user_id,
            &expense(&salary, 100.0, date!(2024 - 02 - 10)),
            &connection,
        );

        assert_eq!(result, Err(Error::KindMismatch));
    }

    #[test]
    fn create_fails_with_other_users_category() {
        let Fixture {
            connection,
            groceries,
            ..
        } = fixture();
        let other = insert_test_user("b@x.com", &connection);

        let result = create_transaction(
            other.user_id,
            &expense(&groceries, 100.0, date!(2024 - 02 - 10)),
            &connection,
        );

        assert_eq!(result, Err(Error::MissingTransactionFields));
    }

    #[test]
    fn month_filter_includes_leap_day_and_excludes_next_month() {
        let Fixture {
            connection,
            session,
            groceries,
            ..
        } = fixture();
        let leap_day = create_transaction(
            session.user_id,
            &expense(&groceries, 1.0, date!(2024 - 02 - 29)),
            &connection,
        )
        .unwrap();
        create_transaction(
            session.user_id,
            &expense(&groceries, 2.0, date!(2024 - 03 - 01)),
            &connection,
        )
        .unwrap();
        let first_day = create_transaction(
            session.user_id,
            &expense(&groceries, 3.0, date!(2024 - 02 - 01)),
            &connection,
        )
        .unwrap();

        let got = list_transactions(
            session.user_id,
            &TransactionFilter {
                month: Some("2024-02".parse::<Month>().unwrap()),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        let ids = got.iter().map(|transaction| transaction.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![leap_day.id, first_day.id]);
    }

    #[test]
    fn list_filters_by_kind_and_category_newest_first() {
        let Fixture {
            connection,
            session,
            groceries,
            salary,
        } = fixture();
        let older = create_transaction(
            session.user_id,
            &expense(&groceries, 10.0, date!(2024 - 01 - 05)),
            &connection,
        )
        .unwrap();
        let newer = create_transaction(
            session.user_id,
            &expense(&groceries, 20.0, date!(2024 - 01 - 20)),
            &connection,
        )
        .unwrap();
        let income = create_transaction(
            session.user_id,
            &ValidatedTransaction {
                category_id: salary.id,
                amount: 1000.0,
                kind: Kind::Income,
                date: date!(2024 - 01 - 10),
                description: None,
            },
            &connection,
        )
        .unwrap();

        let all = list_transactions(session.user_id, &TransactionFilter::default(), &connection)
            .unwrap();
        let expenses = list_transactions(
            session.user_id,
            &TransactionFilter {
                kind: Some(Kind::Expense),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();
        let salary_only = list_transactions(
            session.user_id,
            &TransactionFilter {
                category_id: Some(salary.id),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        let ids = |transactions: &[crate::transaction::Transaction]| {
            transactions
                .iter()
                .map(|transaction| transaction.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&all), vec![newer.id, income.id, older.id]);
        assert_eq!(ids(&expenses), vec![newer.id, older.id]);
        assert_eq!(ids(&salary_only), vec![income.id]);
    }

    #[test]
    fn list_excludes_other_users_transactions() {
        let Fixture {
            connection,
            session,
            groceries,
            ..
        } = fixture();
        create_transaction(
            session.user_id,
            &expense(&groceries, 10.0, date!(2024 - 01 - 05)),
            &connection,
        )
        .unwrap();
        let other = insert_test_user("b@x.com", &connection);

        let got =
            list_transactions(other.user_id, &TransactionFilter::default(), &connection).unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn update_replaces_fields() {
        let Fixture {
            connection,
            session,
            groceries,
            ..
        } = fixture();
        let created = create_transaction(
            session.user_id,
            &expense(&groceries, 10.0, date!(2024 - 01 - 05)),
            &connection,
        )
        .unwrap();
        let changes = ValidatedTransaction {
            description: Some("молоко".to_owned()),
            ..expense(&groceries, 99.5, date!(2024 - 01 - 06))
        };

        update_transaction(created.id, session.user_id, &changes, &connection).unwrap();

        let got = get_transaction(created.id, session.user_id, &connection).unwrap();
        assert_eq!(got.amount, 99.5);
        assert_eq!(got.date, date!(2024 - 01 - 06));
        assert_eq!(got.description.as_deref(), Some("молоко"));
    }

    #[test]
    fn update_by_other_user_is_missing() {
        let Fixture {
            connection,
            session,
            groceries,
            ..
        } = fixture();
        let created = create_transaction(
            session.user_id,
            &expense(&groceries, 10.0, date!(2024 - 01 - 05)),
            &connection,
        )
        .unwrap();
        let other = insert_test_user("b@x.com", &connection);
        let other_category = create_category(
            other.user_id,
            CategoryName::new_unchecked("Кафе"),
            Kind::Expense,
            &connection,
        )
        .unwrap();

        let result = update_transaction(
            created.id,
            other.user_id,
            &expense(&other_category, 1.0, date!(2024 - 01 - 05)),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
        let unchanged = get_transaction(created.id, session.user_id, &connection).unwrap();
        assert_eq!(unchanged.amount, 10.0);
    }

    #[test]
    fn delete_removes_only_owned_transaction() {
        let Fixture {
            connection,
            session,
            groceries,
            ..
        } = fixture();
        let created = create_transaction(
            session.user_id,
            &expense(&groceries, 10.0, date!(2024 - 01 - 05)),
            &connection,
        )
        .unwrap();
        let other = insert_test_user("b@x.com", &connection);

        assert_eq!(
            delete_transaction(created.id, other.user_id, &connection),
            Err(Error::DeleteMissingTransaction)
        );
        assert_eq!(
            delete_transaction(created.id, session.user_id, &connection),
            Ok(())
        );
        assert_eq!(
            get_transaction(created.id, session.user_id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn negative_amount_is_rejected_by_schema() {
        let Fixture {
            connection,
            session,
            groceries,
            ..
        } = fixture();

        let result = create_transaction(
            session.user_id,
            &expense(&groceries, -1.0, date!(2024 - 01 - 05)),
            &connection,
        );

        assert!(matches!(result, Err(Error::SqlError(_))));
    }
}
