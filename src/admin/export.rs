//! Downloading a user's transactions as a CSV file.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    admin::AdminState,
    auth::{UserID, get_user_by_id},
    timezone::{get_local_offset, local_today},
    transaction::{Transaction, TransactionFilter, list_transactions},
};

/// The category column value for transactions without a category.
const UNCATEGORIZED_LABEL: &str = "Без категории";

const CSV_HEADER: [&str; 5] = ["Дата", "Тип", "Категория", "Сумма", "Описание"];

/// Write `transactions` as CSV with a header row.
///
/// # Errors
///
/// Returns [Error::CsvError] if a record could not be written.
pub fn write_transactions_csv(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for transaction in transactions {
        writer.write_record([
            transaction.date.to_string(),
            transaction.kind.label().to_owned(),
            transaction
                .category_name
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED_LABEL.to_owned()),
            format!("{:.2}", transaction.amount),
            transaction.description.clone().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

/// Replace every character outside `[A-Za-z0-9@._-]` with an underscore so that `text` is
/// safe inside a quoted `Content-Disposition` file name.
fn file_name_part(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '@' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// A route handler that sends all transactions of a user as a CSV attachment, newest first.
///
/// Responds with a 404 page if the user does not exist or has no transactions.
pub async fn export_user_transactions(
    Path(user_id): Path<i64>,
    State(state): State<AdminState>,
) -> Result<Response, Error> {
    let user_id = UserID::new(user_id);
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let transactions = list_transactions(user_id, &TransactionFilter::default(), &connection)
        .inspect_err(|error| tracing::error!("Could not get transactions to export: {error}"))?;

    if transactions.is_empty() {
        return Err(Error::NothingToExport);
    }

    let body = write_transactions_csv(&transactions)
        .inspect_err(|error| tracing::error!("Could not write CSV for user {user_id}: {error}"))?;
    let file_name = format!(
        "transactions_{}_{}.csv",
        file_name_part(user.email.as_ref()),
        local_today(local_offset)
    );

    tracing::info!(
        "Exported {} transactions for user {user_id}",
        transactions.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}
