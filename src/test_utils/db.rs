use rusqlite::Connection;

use crate::{
    auth::{Email, PasswordHash, Session, USER_ROLE_ID, create_user},
    db::initialize,
};

/// An in-memory database with all tables created.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// Insert a user with the "user" role and return their session.
#[track_caller]
pub(crate) fn insert_test_user(email: &str, connection: &Connection) -> Session {
    let user = create_user(
        &Email::new_unchecked(email),
        &PasswordHash::new_unchecked("hunter2"),
        USER_ROLE_ID,
        connection,
    )
    .expect("Could not create test user");

    Session::load(user.id, connection).expect("Could not load test session")
}
