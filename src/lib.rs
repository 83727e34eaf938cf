//! Monedero is a shared personal-finance tracker.
//!
//! Users register, own or join accounts (personal or shared wallets),
//! record income and expense transactions tagged by category, and view
//! monthly aggregate summaries. This library provides the ledger core and
//! a thin JSON API over it; authentication and presentation belong to the
//! deployment around it.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

pub mod account;
pub mod api;
mod app_state;
pub mod category;
pub mod dashboard;
mod database_id;
pub mod db;
pub mod endpoints;
pub mod membership;
pub mod password;
pub mod provisioning;
pub mod summary;
mod timezone;
pub mod transaction;
pub mod user;

pub use app_state::AppState;
pub use api::build_router;
pub use database_id::{AccountId, CategoryId, DatabaseId, TransactionId};
pub use db::initialize as initialize_db;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// How an [Error] should be reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input. Recoverable by the caller; 400-equivalent.
    Validation,
    /// A uniqueness constraint was violated; 409-equivalent.
    Conflict,
    /// The caller lacks a membership or role for the operation;
    /// 403-equivalent, revealing nothing about the resource.
    Authorization,
    /// The requested resource could not be found; 404-equivalent.
    NotFound,
    /// Storage failure or other unexpected error. Logged in full
    /// server-side, surfaced opaquely; 500-equivalent.
    Internal,
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required field was missing or empty.
    #[error("the field \"{0}\" is required")]
    MissingField(&'static str),

    /// The email address is not plausibly an email address.
    #[error("the email address is not valid")]
    InvalidEmail,

    /// The password does not meet the minimum length policy.
    #[error("the password must be at least {minimum} characters long")]
    PasswordTooShort {
        /// The configured minimum length.
        minimum: usize,
    },

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address is already registered.
    #[error("the email address is already registered")]
    EmailTaken,

    /// The user already holds a membership of the account.
    #[error("the user is already a member of the account")]
    DuplicateMember,

    /// A transaction's kind did not match its category's kind.
    #[error("the transaction type does not match the category type")]
    CategoryKindMismatch,

    /// A transaction amount was negative. Amounts are recorded in the
    /// smallest currency unit and the flow direction is carried by the
    /// kind, so negative amounts are never valid.
    #[error("{0} is a negative amount, which is not allowed")]
    NegativeAmount(i64),

    /// The caller has no membership of the account, lacks the required
    /// role, or presented no identity at all.
    #[error("forbidden")]
    Forbidden,

    /// Removing this member would leave the account without an owner.
    #[error("an account must keep at least one owner")]
    LastOwner,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A query was given an ID that does not refer to a valid row.
    #[error("a foreign key constraint was violated")]
    InvalidForeignKey,

    /// An error occurred while resolving a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl Error {
    /// Classify the error for reporting at the boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingField(_)
            | Error::InvalidEmail
            | Error::PasswordTooShort { .. }
            | Error::CategoryKindMismatch
            | Error::NegativeAmount(_)
            | Error::InvalidForeignKey => ErrorKind::Validation,
            Error::EmailTaken | Error::DuplicateMember | Error::LastOwner => {
                ErrorKind::Conflict
            }
            Error::Forbidden => ErrorKind::Authorization,
            Error::NotFound => ErrorKind::NotFound,
            Error::HashingError(_)
            | Error::InvalidTimezone(_)
            | Error::DatabaseLock
            | Error::SqlError(_) => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::EmailTaken
            }
            // The membership primary key doubles as its uniqueness
            // constraint, so code 1555 (PRIMARY KEY) shows up here too.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if (sql_error.extended_code == 2067 || sql_error.extended_code == 1555)
                    && desc.contains("membership") =>
            {
                Error::DuplicateMember
            }
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 787 =>
            {
                Error::InvalidForeignKey
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
