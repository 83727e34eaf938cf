//! Implements a struct that holds the state of the JSON API server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::initialize,
    password::{DEFAULT_MIN_PASSWORD_LENGTH, PasswordHash},
};

/// The state of the JSON API server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    /// "Today" is computed in this timezone when building month windows.
    pub local_timezone: String,

    /// The bcrypt cost used when hashing new passwords.
    pub bcrypt_cost: u32,

    /// The minimum password length accepted at registration.
    pub min_password_length: usize,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database, creating the tables for
    /// the domain models and seeding the default categories.
    /// `local_timezone` should be a valid, canonical timezone name, e.g.
    /// "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, local_timezone: &str) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            local_timezone: local_timezone.to_owned(),
            bcrypt_cost: PasswordHash::DEFAULT_COST,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        })
    }

    /// Override the bcrypt cost. Tests use a low cost to stay fast.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }
}
