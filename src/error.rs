//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert, internal_server_error::InternalServerError, not_found::NotFoundError,
};

/// The errors that may occur in the application.
///
/// Variants whose message is shown to the user in a form are written in Russian,
/// the remaining messages are only intended for the server logs.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The password did not match the stored password hash.
    #[error("Неверный пароль")]
    InvalidCredentials,

    /// The identity provider rejected a sign up or sign in request.
    ///
    /// The string holds the provider's reason and should only be logged.
    #[error("identity provider rejected the request: {0}")]
    ProviderAuthError(String),

    /// A user with the same email address has already registered.
    #[error("Пользователь с таким email уже существует")]
    DuplicateEmail,

    /// The email address could not be parsed.
    #[error("Некорректный email")]
    InvalidEmail,

    /// The password and the password confirmation differ.
    #[error("Пароли не совпадают")]
    PasswordsDoNotMatch,

    /// The token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The token in the auth cookie is past its expiry time.
    #[error("the auth token has expired")]
    TokenExpired,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("Слишком простой пароль: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An empty string was used to create a category name.
    #[error("Название категории не может быть пустым")]
    EmptyCategoryName,

    /// A category could not be deleted because transactions refer to it.
    #[error("Нельзя удалить категорию, которая используется в транзакциях")]
    CategoryReferencedByTransaction,

    /// A category could not be deleted because budgets refer to it.
    #[error("Нельзя удалить категорию, которая используется в бюджетах")]
    CategoryReferencedByBudget,

    /// The category, amount or date of a transaction was not provided.
    #[error("Пожалуйста, заполните все обязательные поля")]
    MissingTransactionFields,

    /// An amount was negative or not a finite number.
    #[error("Сумма должна быть неотрицательным числом")]
    InvalidAmount,

    /// The kind of a transaction differs from the kind of its category.
    #[error("Тип операции не совпадает с типом категории")]
    KindMismatch,

    /// A string could not be parsed as a transaction or category kind.
    #[error("unknown kind \"{0}\", expected \"income\" or \"expense\"")]
    InvalidKind(String),

    /// A string could not be parsed as a month, e.g. "2024-02".
    #[error("Некорректный месяц: {0}")]
    InvalidMonth(String),

    /// The category or limit of a budget was not provided.
    #[error("Выберите категорию и укажите лимит")]
    MissingBudgetFields,

    /// The budget's category does not exist or belongs to another user.
    #[error("Категория бюджета не найдена")]
    BudgetCategoryNotFound,

    /// Budgets can only be set for expense categories.
    #[error("Бюджет можно задать только для категории расходов")]
    BudgetCategoryNotExpense,

    /// The role ID does not refer to a known role.
    #[error("the role ID {0} does not refer to a valid role")]
    InvalidRole(i64),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An error occurred while writing transactions as CSV.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// The user selected for export has no transactions.
    #[error("У пользователя нет транзакций для экспорта")]
    NothingToExport,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a category that does not exist or belongs to another user.
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist or belongs to another user.
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a transaction that does not exist or belongs to another user.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist or belongs to another user.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to delete a budget that does not exist or belongs to another user.
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// Tried to change the role of a user that does not exist.
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,
}

impl Error {
    /// Whether the error was caused by invalid user input rather than a fault on the server.
    ///
    /// Handlers use this to decide whether to re-render a form with the error
    /// message or to log the error and show a generic alert.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyCategoryName
                | Error::MissingTransactionFields
                | Error::InvalidAmount
                | Error::KindMismatch
                | Error::InvalidKind(_)
                | Error::InvalidMonth(_)
                | Error::MissingBudgetFields
                | Error::BudgetCategoryNotFound
                | Error::BudgetCategoryNotExpense
                | Error::InvalidEmail
                | Error::PasswordsDoNotMatch
                | Error::TooWeak(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("users.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::CsvError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::NothingToExport => InternalServerError {
                description: "Нечего экспортировать",
                fix: "У пользователя нет транзакций для экспорта.",
            }
            .into_response_with_status(StatusCode::NOT_FOUND),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::CategoryReferencedByTransaction | Error::CategoryReferencedByBudget => (
                StatusCode::CONFLICT,
                Alert::Error {
                    message: "Не удалось удалить категорию".to_owned(),
                    details: self.to_string(),
                },
            ),
            Error::UpdateMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Не удалось изменить категорию".to_owned(),
                    details: "Категория не найдена.".to_owned(),
                },
            ),
            Error::DeleteMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Не удалось удалить категорию".to_owned(),
                    details: "Категория не найдена. \
                    Обновите страницу, возможно, она уже удалена."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Не удалось изменить транзакцию".to_owned(),
                    details: "Транзакция не найдена или у вас нет прав для её редактирования."
                        .to_owned(),
                },
            ),
            Error::DeleteMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Не удалось удалить транзакцию".to_owned(),
                    details: "Транзакция не найдена. \
                    Обновите страницу, возможно, она уже удалена."
                        .to_owned(),
                },
            ),
            Error::DeleteMissingBudget => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Не удалось удалить бюджет".to_owned(),
                    details: "Бюджет не найден. \
                    Обновите страницу, возможно, он уже удалён."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingUser => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Не удалось изменить роль".to_owned(),
                    details: "Пользователь не найден.".to_owned(),
                },
            ),
            Error::InvalidRole(role_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Не удалось изменить роль".to_owned(),
                    details: format!("Роль с ID {role_id} не существует."),
                },
            ),
            error if error.is_validation_error() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::Error {
                    message: "Проверьте введённые данные".to_owned(),
                    details: error.to_string(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Что-то пошло не так".to_owned(),
                    details: "Произошла непредвиденная ошибка, подробности в журнале сервера."
                        .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::http::StatusCode;
    use rusqlite::Connection;

    use crate::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE foo (id INTEGER PRIMARY KEY)", ())
            .unwrap();

        let result: Result<i64, Error> = connection
            .query_row("SELECT id FROM foo", [], |row| row.get(0))
            .map_err(Error::from);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn unique_email_violation_maps_to_duplicate_email() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE)",
                (),
            )
            .unwrap();
        connection
            .execute("INSERT INTO users (email) VALUES ('a@x.com')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO users (email) VALUES ('a@x.com')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::DuplicateEmail);
    }

    #[test]
    fn referenced_category_alert_is_conflict() {
        let response = Error::CategoryReferencedByBudget.into_alert_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_error_alert_is_unprocessable() {
        let response = Error::MissingTransactionFields.into_alert_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
