//! The fixed set of roles a user can hold.

use rusqlite::{Connection, Row};

use crate::{Error, auth::UserID};

/// Database identifier for a role.
pub type RoleId = i64;

/// The role assigned to every newly registered user.
pub const USER_ROLE_ID: RoleId = 1;
/// The role that grants access to the admin panel.
pub const ADMIN_ROLE_ID: RoleId = 2;

const ADMIN_ROLE_NAME: &str = "admin";

/// A named role, e.g. "user" or "admin".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    /// Whether the role grants access to the admin panel.
    pub fn is_admin(&self) -> bool {
        self.name == ADMIN_ROLE_NAME
    }
}

/// Create the role table and seed the built-in roles.
pub fn create_role_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        INSERT OR IGNORE INTO roles (id, name) VALUES (1, 'user'), (2, 'admin');",
    )?;

    Ok(())
}

/// All roles ordered by ID.
pub fn get_all_roles(connection: &Connection) -> Result<Vec<Role>, Error> {
    connection
        .prepare("SELECT id, name FROM roles ORDER BY id ASC")?
        .query_map([], map_row)?
        .map(|maybe_role| maybe_role.map_err(|error| error.into()))
        .collect()
}

/// Get a role by its ID.
///
/// # Errors
///
/// Returns [Error::InvalidRole] if no role has the ID `role_id`.
pub fn get_role(role_id: RoleId, connection: &Connection) -> Result<Role, Error> {
    connection
        .prepare("SELECT id, name FROM roles WHERE id = :id")?
        .query_row(&[(":id", &role_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::InvalidRole(role_id),
            error => error.into(),
        })
}

/// Resolve the role of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no such user.
pub fn get_user_role(user_id: UserID, connection: &Connection) -> Result<Role, Error> {
    connection
        .prepare(
            "SELECT roles.id, roles.name FROM users
            INNER JOIN roles ON roles.id = users.role_id
            WHERE users.id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<Role, rusqlite::Error> {
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
