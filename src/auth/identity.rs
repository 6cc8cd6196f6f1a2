//! The identity provider that issues sessions independently of the app's own user table.
//!
//! The app keeps its own copy of each credential in the user table and also registers the
//! user with an [IdentityProvider]. Registration treats the two writes as a two-phase
//! operation, see [crate::auth::register_account].

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{Email, PasswordHash, ValidatedPassword},
};

/// Proof that the identity provider accepted a sign up or sign in.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSession {
    pub email: Email,
    pub issued_at: OffsetDateTime,
}

/// An external authority for user credentials.
pub trait IdentityProvider: Send + Sync {
    /// Register a new identity.
    ///
    /// # Errors
    ///
    /// - [Error::DuplicateEmail] if an identity with `email` already exists.
    /// - [Error::ProviderAuthError] if the provider rejects the identity for any other reason.
    fn sign_up(&self, email: &Email, password: &ValidatedPassword)
    -> Result<ProviderSession, Error>;

    /// Check a password against the identity registered with `email`.
    ///
    /// # Errors
    ///
    /// Returns [Error::ProviderAuthError] if the identity is unknown or the password is wrong.
    fn sign_in_with_password(&self, email: &Email, password: &str)
    -> Result<ProviderSession, Error>;

    /// Remove an identity, used to undo a sign up when the rest of registration fails.
    fn remove_identity(&self, email: &Email) -> Result<(), Error>;
}

/// An [IdentityProvider] that stores bcrypt hashes in its own SQLite table.
///
/// The provider holds its own connection so that it never contends for the lock on the
/// app's database connection.
#[derive(Debug, Clone)]
pub struct SQLiteIdentityProvider {
    connection: Arc<Mutex<Connection>>,
    password_hash_cost: u32,
}

impl SQLiteIdentityProvider {
    /// Create the identity table on `connection` if needed and wrap it in a provider.
    pub fn new(connection: Connection, password_hash_cost: u32) -> Result<Self, Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS identities (
                email TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            (),
        )?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            password_hash_cost,
        })
    }

    /// Replace the password of an existing identity.
    ///
    /// # Errors
    ///
    /// Returns [Error::ProviderAuthError] if there is no identity for `email`.
    pub fn reset_password(&self, email: &Email, password: ValidatedPassword) -> Result<(), Error> {
        let password_hash = PasswordHash::new(password, self.password_hash_cost)?;
        let connection = self.lock()?;

        let rows_affected = connection.execute(
            "UPDATE identities SET password_hash = ?1 WHERE email = ?2",
            (password_hash.as_ref(), email.as_ref()),
        )?;

        if rows_affected == 0 {
            return Err(Error::ProviderAuthError(format!("no identity for {email}")));
        }

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire identity provider lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl IdentityProvider for SQLiteIdentityProvider {
    fn sign_up(
        &self,
        email: &Email,
        password: &ValidatedPassword,
    ) -> Result<ProviderSession, Error> {
        let password_hash = PasswordHash::new(password.clone(), self.password_hash_cost)?;
        let issued_at = OffsetDateTime::now_utc();
        let connection = self.lock()?;

        let rows_affected = connection.execute(
            "INSERT OR IGNORE INTO identities (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
            (email.as_ref(), password_hash.as_ref(), issued_at),
        )?;

        if rows_affected == 0 {
            tracing::debug!("an identity for {email} already exists");
            return Err(Error::DuplicateEmail);
        }

        Ok(ProviderSession {
            email: email.clone(),
            issued_at,
        })
    }

    fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<ProviderSession, Error> {
        let raw_password_hash: String = {
            let connection = self.lock()?;

            connection
                .query_row(
                    "SELECT password_hash FROM identities WHERE email = ?1",
                    (email.as_ref(),),
                    |row| row.get(0),
                )
                .map_err(|error| match error {
                    rusqlite::Error::QueryReturnedNoRows => {
                        Error::ProviderAuthError(format!("no identity for {email}"))
                    }
                    error => error.into(),
                })?
        };

        if !PasswordHash::new_unchecked(&raw_password_hash).verify(password)? {
            return Err(Error::ProviderAuthError(format!(
                "wrong password for identity {email}"
            )));
        }

        Ok(ProviderSession {
            email: email.clone(),
            issued_at: OffsetDateTime::now_utc(),
        })
    }

    fn remove_identity(&self, email: &Email) -> Result<(), Error> {
        let connection = self.lock()?;

        connection.execute("DELETE FROM identities WHERE email = ?1", (email.as_ref(),))?;

        Ok(())
    }
}

#[cfg(test)]
mod sqlite_identity_provider_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{Email, ValidatedPassword},
    };

    use super::{IdentityProvider, SQLiteIdentityProvider};

    fn get_provider() -> SQLiteIdentityProvider {
        SQLiteIdentityProvider::new(Connection::open_in_memory().unwrap(), 4).unwrap()
    }

    fn email() -> Email {
        Email::new("a@x.com").unwrap()
    }

    #[test]
    fn sign_up_then_sign_in() {
        let provider = get_provider();
        let password = ValidatedPassword::new_unchecked("averylongandsecurepassword");

        provider.sign_up(&email(), &password).unwrap();
        let session = provider.sign_in_with_password(&email(), "averylongandsecurepassword");

        assert_eq!(session.map(|session| session.email), Ok(email()));
    }

    #[test]
    fn sign_in_with_wrong_password_fails() {
        let provider = get_provider();
        let password = ValidatedPassword::new_unchecked("averylongandsecurepassword");
        provider.sign_up(&email(), &password).unwrap();

        let result = provider.sign_in_with_password(&email(), "wrong");

        assert!(matches!(result, Err(Error::ProviderAuthError(_))));
    }

    #[test]
    fn duplicate_sign_up_is_duplicate_email() {
        let provider = get_provider();
        let password = ValidatedPassword::new_unchecked("averylongandsecurepassword");
        provider.sign_up(&email(), &password).unwrap();

        let result = provider.sign_up(&email(), &password);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn removed_identity_cannot_sign_in() {
        let provider = get_provider();
        let password = ValidatedPassword::new_unchecked("averylongandsecurepassword");
        provider.sign_up(&email(), &password).unwrap();

        provider.remove_identity(&email()).unwrap();
        let result = provider.sign_in_with_password(&email(), "averylongandsecurepassword");

        assert!(matches!(result, Err(Error::ProviderAuthError(_))));
    }

    #[test]
    fn reset_password_replaces_credential() {
        let provider = get_provider();
        let password = ValidatedPassword::new_unchecked("averylongandsecurepassword");
        provider.sign_up(&email(), &password).unwrap();

        provider
            .reset_password(
                &email(),
                ValidatedPassword::new_unchecked("anotherlongandsecurepassword"),
            )
            .unwrap();

        assert!(
            provider
                .sign_in_with_password(&email(), "anotherlongandsecurepassword")
                .is_ok()
        );
        assert!(
            provider
                .sign_in_with_password(&email(), "averylongandsecurepassword")
                .is_err()
        );
    }
}
