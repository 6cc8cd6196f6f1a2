//! Registration and log-in, the two operations that touch both credential stores.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    auth::{
        Email, IdentityProvider, PasswordHash, USER_ROLE_ID, User, ValidatedPassword,
        create_user, email_exists, get_user_by_email,
    },
    category::seed_default_categories,
};

/// Register a new user with the default role and the default categories.
///
/// Registration writes to two stores. The identity is created with `identity_provider`
/// first, then the user row and the default categories are inserted in one database
/// transaction. If the database step fails the identity is removed again, so a failed
/// registration leaves nothing behind in either store.
///
/// # Errors
///
/// - [Error::DuplicateEmail] if the email is already registered, either in the user table
///   or with the identity provider. Neither store is changed.
/// - [Error::ProviderAuthError] if the identity provider rejects the sign up.
/// - [Error::HashingError] if the password could not be hashed.
/// - [Error::SqlError] if the user or categories could not be inserted.
pub fn register_account(
    email: &Email,
    password: ValidatedPassword,
    password_hash_cost: u32,
    identity_provider: &dyn IdentityProvider,
    connection: &Connection,
) -> Result<User, Error> {
    if email_exists(email, connection)? {
        return Err(Error::DuplicateEmail);
    }

    let password_hash = PasswordHash::new(password.clone(), password_hash_cost)?;

    identity_provider.sign_up(email, &password)?;

    match insert_user_with_default_categories(email, &password_hash, connection) {
        Ok(user) => {
            tracing::info!("registered user {} ({email})", user.id);
            Ok(user)
        }
        Err(error) => {
            tracing::error!("could not store user {email}, removing identity: {error}");

            if let Err(cleanup_error) = identity_provider.remove_identity(email) {
                tracing::error!("could not remove identity for {email}: {cleanup_error}");
            }

            Err(error)
        }
    }
}

fn insert_user_with_default_categories(
    email: &Email,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let user = create_user(email, password_hash, USER_ROLE_ID, &transaction)?;
    seed_default_categories(user.id, &transaction)?;

    transaction.commit()?;

    Ok(user)
}

/// Check a user's credentials against the local hash and then the identity provider.
///
/// # Errors
///
/// - [Error::NotFound] if no user has registered with `email`.
/// - [Error::InvalidCredentials] if the password does not match the local hash.
/// - [Error::ProviderAuthError] if the identity provider rejects the password.
pub fn authenticate(
    email: &Email,
    password: &str,
    identity_provider: &dyn IdentityProvider,
    connection: &Connection,
) -> Result<User, Error> {
    let user = get_user_by_email(email, connection)?;

    if !user.password_hash.verify(password)? {
        return Err(Error::InvalidCredentials);
    }

    identity_provider.sign_in_with_password(email, password)?;

    Ok(user)
}

#[cfg(test)]
mod account_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{
            Email, IdentityProvider, SQLiteIdentityProvider, USER_ROLE_ID, ValidatedPassword,
            get_user_role,
        },
        category::list_categories,
        db::initialize,
        kind::Kind,
    };

    use super::{authenticate, register_account};

    const PASSWORD: &str = "averylongandsecurepassword";

    fn get_test_stores() -> (Connection, SQLiteIdentityProvider) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let provider =
            SQLiteIdentityProvider::new(Connection::open_in_memory().unwrap(), 4).unwrap();

        (connection, provider)
    }

    fn email() -> Email {
        Email::new("a@x.com").unwrap()
    }

    fn count_rows(table: &str, connection: &Connection) -> i64 {
        connection
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn register_seeds_default_categories_and_role() {
        let (connection, provider) = get_test_stores();

        let user = register_account(
            &email(),
            ValidatedPassword::new_unchecked(PASSWORD),
            4,
            &provider,
            &connection,
        )
        .unwrap();

        let expense_names = list_categories(user.id, Some(Kind::Expense), &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect::<Vec<_>>();
        let income_names = list_categories(user.id, Some(Kind::Income), &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            expense_names,
            vec!["Другое", "Жилье", "Кафе", "Подарки", "Продукты", "Транспорт"]
        );
        assert_eq!(income_names, vec!["Другое", "Зарплата", "Подарки", "Подработка"]);
        assert_eq!(user.role_id, USER_ROLE_ID);
        assert_eq!(get_user_role(user.id, &connection).unwrap().name, "user");
    }

    #[test]
    fn duplicate_email_creates_nothing() {
        let (connection, provider) = get_test_stores();
        register_account(
            &email(),
            ValidatedPassword::new_unchecked(PASSWORD),
            4,
            &provider,
            &connection,
        )
        .unwrap();

        let result = register_account(
            &email(),
            ValidatedPassword::new_unchecked("anotherlongandsecurepassword"),
            4,
            &provider,
            &connection,
        );

        assert_eq!(result, Err(Error::DuplicateEmail));
        assert_eq!(count_rows("users", &connection), 1);
        assert_eq!(count_rows("categories", &connection), 10);
        assert!(provider.sign_in_with_password(&email(), PASSWORD).is_ok());
    }

    #[test]
    fn failed_database_step_removes_identity() {
        let (connection, provider) = get_test_stores();
        connection.execute("DROP TABLE budgets", ()).unwrap();
        connection.execute("DROP TABLE transactions", ()).unwrap();
        connection.execute("DROP TABLE categories", ()).unwrap();

        let result = register_account(
            &email(),
            ValidatedPassword::new_unchecked(PASSWORD),
            4,
            &provider,
            &connection,
        );

        assert!(matches!(result, Err(Error::SqlError(_))));
        assert_eq!(count_rows("users", &connection), 0);
        assert!(matches!(
            provider.sign_in_with_password(&email(), PASSWORD),
            Err(Error::ProviderAuthError(_))
        ));
    }

    #[test]
    fn identity_registered_first_elsewhere_is_duplicate_email() {
        let (connection, provider) = get_test_stores();
        provider
            .sign_up(&email(), &ValidatedPassword::new_unchecked(PASSWORD))
            .unwrap();

        let result = register_account(
            &email(),
            ValidatedPassword::new_unchecked("anotherlongandsecurepassword"),
            4,
            &provider,
            &connection,
        );

        assert_eq!(result, Err(Error::DuplicateEmail));
        assert_eq!(count_rows("users", &connection), 0);
        assert_eq!(count_rows("categories", &connection), 0);
        assert!(provider.sign_in_with_password(&email(), PASSWORD).is_ok());
    }

    #[test]
    fn authenticate_checks_both_stores() {
        let (connection, provider) = get_test_stores();
        let user = register_account(
            &email(),
            ValidatedPassword::new_unchecked(PASSWORD),
            4,
            &provider,
            &connection,
        )
        .unwrap();

        assert_eq!(
            authenticate(&email(), PASSWORD, &provider, &connection).map(|user| user.id),
            Ok(user.id)
        );
        assert_eq!(
            authenticate(&email(), "wrong", &provider, &connection),
            Err(Error::InvalidCredentials)
        );
        assert_eq!(
            authenticate(
                &Email::new("nobody@x.com").unwrap(),
                PASSWORD,
                &provider,
                &connection
            ),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn authenticate_fails_when_provider_disagrees() {
        let (connection, provider) = get_test_stores();
        register_account(
            &email(),
            ValidatedPassword::new_unchecked(PASSWORD),
            4,
            &provider,
            &connection,
        )
        .unwrap();
        provider.remove_identity(&email()).unwrap();

        let result = authenticate(&email(), PASSWORD, &provider, &connection);

        assert!(matches!(result, Err(Error::ProviderAuthError(_))));
    }
}
