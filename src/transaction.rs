//! Defines the transaction ledger and its database queries.
//!
//! The ledger is an append-mostly record of dated monetary facts. It has no
//! balance pre-checks and no overdraft concept. Amounts are integer cents
//! so aggregation sums are exact and order-independent.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::PrimitiveDateTime;

use crate::{
    Error,
    category::{Category, CategoryKind, get_category},
    database_id::{AccountId, CategoryId, TransactionId},
    db::{datetime_from_column, to_sql_datetime},
    membership::has_access,
    summary::WindowRange,
    user::UserId,
};

/// A single dated monetary entry scoped to one account and one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the transaction belongs to.
    pub account_id: AccountId,
    /// The category the transaction is classified under.
    pub category_id: CategoryId,
    /// The flow direction. Always equal to the category's kind.
    pub kind: CategoryKind,
    /// The amount in the smallest currency unit. Never negative.
    pub amount_cents: i64,
    /// When the transaction happened, as a wall-clock datetime in the
    /// server's configured timezone.
    pub date: PrimitiveDateTime,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// The member who recorded the transaction.
    pub created_by: UserId,
}

/// The data needed to record a new transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The account to record the transaction against.
    pub account_id: AccountId,
    /// The category to classify the transaction under.
    pub category_id: CategoryId,
    /// The flow direction. Must match the category's kind.
    pub kind: CategoryKind,
    /// The amount in the smallest currency unit. Zero is allowed.
    pub amount_cents: i64,
    /// When the transaction happened.
    pub date: PrimitiveDateTime,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// The member recording the transaction.
    pub created_by: UserId,
}

/// The editable fields of an existing transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    /// The new category.
    pub category_id: CategoryId,
    /// The new flow direction. Must match the new category's kind.
    pub kind: CategoryKind,
    /// The new amount in the smallest currency unit.
    pub amount_cents: i64,
    /// The new date.
    pub date: PrimitiveDateTime,
    /// The new description.
    pub description: Option<String>,
}

/// A half-open date filter `[from, to)` for listing an account's
/// transactions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateFilter {
    /// The first instant included.
    pub from: PrimitiveDateTime,
    /// The first instant excluded.
    pub to: PrimitiveDateTime,
}

/// Create the transaction table.
///
/// Transactions belong to exactly one account and cannot outlive it.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                date TEXT NOT NULL,
                description TEXT,
                created_by INTEGER NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT,
                FOREIGN KEY(created_by) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        category_id: row.get(2)?,
        kind: row.get(3)?,
        amount_cents: row.get(4)?,
        date: datetime_from_column(row, 5)?,
        description: row.get(6)?,
        created_by: UserId::new(row.get(7)?),
    })
}

/// Check that a category may classify a transaction of `kind` recorded by
/// `acting_user`.
///
/// A private category belonging to someone else reports [Error::NotFound]
/// rather than [Error::Forbidden], so the caller cannot learn that the
/// category exists.
fn validated_category(
    category_id: CategoryId,
    kind: CategoryKind,
    acting_user: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = get_category(category_id, connection)?;

    if category
        .owner_user_id
        .is_some_and(|owner| owner != acting_user)
    {
        return Err(Error::NotFound);
    }

    if category.kind != kind {
        return Err(Error::CategoryKindMismatch);
    }

    Ok(category)
}

/// Record a transaction against an account.
///
/// The recording user must be a member of the account. The amount must not
/// be negative (zero is allowed), and the transaction's kind must equal the
/// referenced category's kind. The ledger records facts; there is no
/// balance check.
///
/// # Errors
/// Returns:
/// - [Error::NegativeAmount] if `amount_cents` is negative,
/// - [Error::Forbidden] if the creator has no membership of the account,
/// - [Error::NotFound] if the category does not exist or is private to
///   another user,
/// - [Error::CategoryKindMismatch] if the kinds disagree.
///
/// Nothing is persisted on any of these failures.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.amount_cents < 0 {
        return Err(Error::NegativeAmount(new_transaction.amount_cents));
    }

    if !has_access(new_transaction.created_by, new_transaction.account_id, connection)? {
        return Err(Error::Forbidden);
    }

    validated_category(
        new_transaction.category_id,
        new_transaction.kind,
        new_transaction.created_by,
        connection,
    )?;

    connection.execute(
        "INSERT INTO \"transaction\" \
        (account_id, category_id, kind, amount_cents, date, description, created_by) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            new_transaction.account_id,
            new_transaction.category_id,
            new_transaction.kind,
            new_transaction.amount_cents,
            to_sql_datetime(new_transaction.date),
            &new_transaction.description,
            new_transaction.created_by.as_i64(),
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        account_id: new_transaction.account_id,
        category_id: new_transaction.category_id,
        kind: new_transaction.kind,
        amount_cents: new_transaction.amount_cents,
        date: new_transaction.date,
        description: new_transaction.description,
        created_by: new_transaction.created_by,
    })
}

/// Get a transaction by its ID, without any access check.
fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, account_id, category_id, kind, amount_cents, date, description, created_by \
            FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row_to_transaction)
        .map_err(|error| error.into())
}

/// Get an account's transactions, oldest first.
///
/// `filter` optionally restricts results to the half-open range
/// `[from, to)`.
///
/// # Errors
/// Returns [Error::Forbidden] if `acting_user` has no membership of the
/// account.
pub fn get_transactions_for_account(
    account_id: AccountId,
    acting_user: UserId,
    filter: Option<DateFilter>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if !has_access(acting_user, account_id, connection)? {
        return Err(Error::Forbidden);
    }

    // Sort by date, then ID to keep the order stable after updates.
    let (where_clause, params): (&str, Vec<String>) = match filter {
        Some(date_filter) => (
            "WHERE account_id = ?1 AND date >= ?2 AND date < ?3",
            vec![
                account_id.to_string(),
                to_sql_datetime(date_filter.from),
                to_sql_datetime(date_filter.to),
            ],
        ),
        None => ("WHERE account_id = ?1", vec![account_id.to_string()]),
    };

    let query = format!(
        "SELECT id, account_id, category_id, kind, amount_cents, date, description, created_by \
        FROM \"transaction\" {where_clause} ORDER BY date ASC, id ASC"
    );

    connection
        .prepare(&query)?
        .query_map(rusqlite::params_from_iter(params), map_row_to_transaction)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get every transaction within `window` across all accounts `user_id` is a
/// member of, oldest first.
///
/// The window is inclusive on both ends. This is the feed the aggregation
/// engine consumes for the dashboard.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_transactions_in_window(
    user_id: UserId,
    window: WindowRange,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.account_id, t.category_id, t.kind, t.amount_cents, t.date, \
            t.description, t.created_by \
            FROM \"transaction\" t \
            INNER JOIN membership m ON m.account_id = t.account_id \
            WHERE m.user_id = ?1 AND t.date BETWEEN ?2 AND ?3 \
            ORDER BY t.date ASC, t.id ASC",
        )?
        .query_map(
            (
                user_id.as_i64(),
                to_sql_datetime(window.start),
                to_sql_datetime(window.end),
            ),
            map_row_to_transaction,
        )?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Update a transaction.
///
/// The acting user must be a member of the transaction's account, and the
/// kind-match invariant must hold for the new category and kind.
///
/// # Errors
/// Returns the same errors as [create_transaction], plus [Error::NotFound]
/// if `id` does not refer to a transaction the acting user can see.
pub fn update_transaction(
    id: TransactionId,
    update: TransactionUpdate,
    acting_user: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if update.amount_cents < 0 {
        return Err(Error::NegativeAmount(update.amount_cents));
    }

    let existing = get_transaction(id, connection)?;

    if !has_access(acting_user, existing.account_id, connection)? {
        return Err(Error::Forbidden);
    }

    validated_category(update.category_id, update.kind, acting_user, connection)?;

    connection.execute(
        "UPDATE \"transaction\" \
        SET category_id = ?1, kind = ?2, amount_cents = ?3, date = ?4, description = ?5 \
        WHERE id = ?6",
        (
            update.category_id,
            update.kind,
            update.amount_cents,
            to_sql_datetime(update.date),
            &update.description,
            id,
        ),
    )?;

    Ok(Transaction {
        id,
        account_id: existing.account_id,
        category_id: update.category_id,
        kind: update.kind,
        amount_cents: update.amount_cents,
        date: update.date,
        description: update.description,
        created_by: existing.created_by,
    })
}

/// Delete a transaction.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if `id` does not refer to a transaction,
/// - [Error::Forbidden] if `acting_user` has no membership of the
///   transaction's account.
pub fn delete_transaction(
    id: TransactionId,
    acting_user: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let existing = get_transaction(id, connection)?;

    if !has_access(acting_user, existing.account_id, connection)? {
        return Err(Error::Forbidden);
    }

    connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;

    Ok(())
}
