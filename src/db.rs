//! Database initialization and shared datetime column helpers.

use rusqlite::{Connection, Row, Transaction as SqlTransaction};
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{
    Error, account::create_account_table, category::create_category_table,
    category::seed_default_categories, membership::create_membership_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// The TEXT format datetimes are stored in. Fixed width and zero padded, so
/// SQLite's lexicographic TEXT comparison orders datetimes correctly.
const SQL_DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Format a datetime for storage.
pub(crate) fn to_sql_datetime(value: PrimitiveDateTime) -> String {
    value
        .format(SQL_DATETIME_FORMAT)
        .expect("the datetime format description is static and complete")
}

/// Read a datetime from a TEXT column.
pub(crate) fn datetime_from_column(
    row: &Row,
    index: usize,
) -> Result<PrimitiveDateTime, rusqlite::Error> {
    let raw: String = row.get(index)?;

    PrimitiveDateTime::parse(&raw, SQL_DATETIME_FORMAT).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}

/// The current wall-clock datetime in UTC, truncated to whole seconds.
pub(crate) fn now_datetime() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();

    PrimitiveDateTime::new(now.date(), now.time()).replace_nanosecond(0)
        .expect("zero nanoseconds is always valid")
}

/// Create the application tables and seed the global default categories.
///
/// Runs inside a single exclusive SQL transaction and is idempotent:
/// reopening an existing database leaves its rows untouched, and the
/// category seed is guarded against duplication.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // SQLite ships with foreign keys off; the schema relies on them.
    connection.pragma_update(None, "foreign_keys", true)?;

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&sql_transaction)?;
    create_account_table(&sql_transaction)?;
    create_membership_table(&sql_transaction)?;
    create_category_table(&sql_transaction)?;
    create_transaction_table(&sql_transaction)?;

    seed_default_categories(&sql_transaction)?;

    sql_transaction.commit()?;

    Ok(())
}
