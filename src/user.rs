//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{Error, password::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better
/// compile time errors, and more flexible generics that can have distinct
/// implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The user's email address, unique across all users.
    pub email: String,
    /// The user's display name, if one was given at registration.
    pub name: Option<String>,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// Create the user table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// Email uniqueness is enforced by the unique index on `user.email` rather
/// than a read-then-write check, so concurrent registrations with the same
/// email cannot both succeed.
///
/// # Errors
/// Returns [Error::EmailTaken] if `email` is already registered, or
/// [Error::SqlError] if another SQL related error occurred.
pub fn create_user(
    email: &str,
    name: Option<&str>,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, name, password) VALUES (?1, ?2, ?3)",
        (email, name, password_hash.as_str()),
    )?;

    let id = UserId::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_string(),
        name: name.map(str::to_string),
        password_hash,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
/// This function will return an error if:
/// - `user_id` does not belong to a registered user,
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, name, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], |row| {
            let raw_password_hash: String = row.get(3)?;

            Ok(User {
                id: UserId::new(row.get(0)?),
                email: row.get(1)?,
                name: row.get(2)?,
                password_hash: PasswordHash::new_unchecked(&raw_password_hash),
            })
        })
        .map_err(|error| error.into())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, password::PasswordHash};

    use super::{UserId, create_user, create_user_table, get_user_by_id};

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    #[test]
    fn insert_user_succeeds() {
        let conn = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let inserted_user = create_user(
            "foo@bar.baz",
            Some("Foo"),
            password_hash.clone(),
            &conn,
        )
        .unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.email, "foo@bar.baz");
        assert_eq!(inserted_user.name.as_deref(), Some("Foo"));
        assert_eq!(inserted_user.password_hash, password_hash);
    }

    #[test]
    fn insert_user_fails_with_duplicate_email() {
        let conn = get_db_connection();

        create_user(
            "foo@bar.baz",
            None,
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let result = create_user(
            "foo@bar.baz",
            Some("Someone Else"),
            PasswordHash::new_unchecked("hunter3"),
            &conn,
        );

        assert_eq!(result, Err(Error::EmailTaken));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let conn = get_db_connection();

        let id = UserId::new(42);

        assert_eq!(get_user_by_id(id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn get_user_succeeds_with_existing_id() {
        let conn = get_db_connection();
        let test_user = create_user(
            "foo@bar.baz",
            None,
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let retrieved_user = get_user_by_id(test_user.id, &conn).unwrap();

        assert_eq!(retrieved_user, test_user);
    }
}
