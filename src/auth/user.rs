//! The user table and the queries the rest of the app needs about users.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{Email, PasswordHash, RoleId, get_role},
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserID,
    pub email: Email,
    /// The local copy of the user's credential, checked before the identity provider.
    pub password_hash: PasswordHash,
    pub role_id: RoleId,
    pub created_at: OffsetDateTime,
}

/// A row of the admin user list: a user joined with the name of their role.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: UserID,
    pub email: Email,
    pub role_id: RoleId,
    pub role_name: String,
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// The role table must exist before this table is created.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role_id INTEGER NOT NULL REFERENCES roles(id),
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert a new user with the role `role_id`.
///
/// # Errors
///
/// Returns [Error::DuplicateEmail] if the email is already registered, or an
/// [Error::SqlError] if some other SQL error occurred.
pub fn create_user(
    email: &Email,
    password_hash: &PasswordHash,
    role_id: RoleId,
    connection: &Connection,
) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO users (email, password_hash, role_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        (email.as_ref(), password_hash.as_ref(), role_id, created_at),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.clone(),
        password_hash: password_hash.clone(),
        role_id,
        created_at,
    })
}

/// Get the user with the ID `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no such user.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, password_hash, role_id, created_at FROM users WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has registered with the email.
pub fn get_user_by_email(email: &Email, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, password_hash, role_id, created_at FROM users WHERE email = :email",
        )?
        .query_row(&[(":email", email.as_ref())], map_row)
        .map_err(|error| error.into())
}

/// Whether a user has already registered with `email`.
pub fn email_exists(email: &Email, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = ?1)",
            (email.as_ref(),),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// All users with their role names, newest first.
pub fn list_users(connection: &Connection) -> Result<Vec<UserSummary>, Error> {
    connection
        .prepare(
            "SELECT users.id, users.email, users.role_id, roles.name, users.created_at
            FROM users
            INNER JOIN roles ON roles.id = users.role_id
            ORDER BY users.created_at DESC, users.id DESC",
        )?
        .query_map([], |row| {
            let raw_email: String = row.get(1)?;

            Ok(UserSummary {
                id: UserID::new(row.get(0)?),
                email: Email::new_unchecked(&raw_email),
                role_id: row.get(2)?,
                role_name: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Change the role of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::InvalidRole] if `role_id` is not a known role, or
/// [Error::UpdateMissingUser] if there is no such user.
pub fn set_user_role(
    user_id: UserID,
    role_id: RoleId,
    connection: &Connection,
) -> Result<(), Error> {
    get_role(role_id, connection)?;

    let rows_affected = connection.execute(
        "UPDATE users SET role_id = ?1 WHERE id = ?2",
        (role_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Replace the local password hash of the user registered with `email`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if no user has registered with the email.
pub fn set_password_hash(
    email: &Email,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE users SET password_hash = ?1 WHERE email = ?2",
        (password_hash.as_ref(), email.as_ref()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(1)?;
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: Email::new_unchecked(&raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        role_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{ADMIN_ROLE_ID, Email, PasswordHash, USER_ROLE_ID, UserID},
        db::initialize,
    };

    use super::{
        create_user, email_exists, get_user_by_email, get_user_by_id, list_users,
        set_password_hash, set_user_role,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn insert_user(email: &str, connection: &Connection) -> crate::auth::User {
        create_user(
            &Email::new(email).unwrap(),
            &PasswordHash::new_unchecked("hunter2"),
            USER_ROLE_ID,
            connection,
        )
        .unwrap()
    }

    #[test]
    fn create_and_get_user() {
        let connection = get_test_connection();
        let user = insert_user("a@x.com", &connection);

        let by_id = get_user_by_id(user.id, &connection).unwrap();
        let by_email = get_user_by_email(&user.email, &connection).unwrap();

        for got in [by_id, by_email] {
            assert_eq!(got.id, user.id);
            assert_eq!(got.email, user.email);
            assert_eq!(got.password_hash, user.password_hash);
            assert_eq!(got.role_id, USER_ROLE_ID);
        }
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let connection = get_test_connection();
        insert_user("a@x.com", &connection);

        let result = create_user(
            &Email::new("a@x.com").unwrap(),
            &PasswordHash::new_unchecked("hunter3"),
            USER_ROLE_ID,
            &connection,
        );

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn missing_user_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            get_user_by_email(&Email::new("nobody@x.com").unwrap(), &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn email_exists_reports_registered_emails() {
        let connection = get_test_connection();
        insert_user("a@x.com", &connection);

        assert_eq!(
            email_exists(&Email::new("a@x.com").unwrap(), &connection),
            Ok(true)
        );
        assert_eq!(
            email_exists(&Email::new("b@x.com").unwrap(), &connection),
            Ok(false)
        );
    }

    #[test]
    fn list_users_is_newest_first() {
        let connection = get_test_connection();
        let first = insert_user("a@x.com", &connection);
        let second = insert_user("b@x.com", &connection);

        let ids = list_users(&connection)
            .unwrap()
            .into_iter()
            .map(|user| user.id)
            .collect::<Vec<_>>();

        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn set_user_role_changes_role() {
        let connection = get_test_connection();
        let user = insert_user("a@x.com", &connection);

        set_user_role(user.id, ADMIN_ROLE_ID, &connection).unwrap();

        let users = list_users(&connection).unwrap();
        assert_eq!(users[0].role_id, ADMIN_ROLE_ID);
        assert_eq!(users[0].role_name, "admin");
    }

    #[test]
    fn set_user_role_rejects_unknown_role_and_user() {
        let connection = get_test_connection();
        let user = insert_user("a@x.com", &connection);

        assert_eq!(
            set_user_role(user.id, 99, &connection),
            Err(Error::InvalidRole(99))
        );
        assert_eq!(
            set_user_role(UserID::new(99), ADMIN_ROLE_ID, &connection),
            Err(Error::UpdateMissingUser)
        );
    }

    #[test]
    fn set_password_hash_updates_hash() {
        let connection = get_test_connection();
        let user = insert_user("a@x.com", &connection);
        let new_hash = PasswordHash::new_unchecked("hunter3");

        set_password_hash(&user.email, &new_hash, &connection).unwrap();

        let got = get_user_by_id(user.id, &connection).unwrap();
        assert_eq!(got.password_hash, new_hash);
    }
}
