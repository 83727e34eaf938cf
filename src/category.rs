//! Defines the category catalog and its database queries.
//!
//! Categories classify transactions and are fixed to one flow direction
//! (income or expense). A category with no owner is a global default
//! visible to every user; a category with an owner is private to that user.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CategoryId, user::UserId};

/// The flow direction of a category and of every transaction that
/// references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryKind {
    /// Money flowing in.
    Income,
    /// Money flowing out.
    Expense,
}

impl CategoryKind {
    /// The kind as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Income => "INCOME",
            CategoryKind::Expense => "EXPENSE",
        }
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "INCOME" => Ok(CategoryKind::Income),
            "EXPENSE" => Ok(CategoryKind::Expense),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A classification tag for transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// The flow direction of the category.
    pub kind: CategoryKind,
    /// The display color as a hex string, e.g. "#ef4444".
    pub color: String,
    /// The user the category is private to, or `None` for a global default.
    pub owner_user_id: Option<UserId>,
}

/// The global default categories every user sees.
///
/// Seeded once at database initialization by [seed_default_categories].
pub const DEFAULT_CATEGORIES: [(&str, CategoryKind, &str); 10] = [
    ("Salary", CategoryKind::Income, "#10b981"),
    ("Freelance", CategoryKind::Income, "#10b981"),
    ("Investments", CategoryKind::Income, "#10b981"),
    ("Food", CategoryKind::Expense, "#ef4444"),
    ("Transport", CategoryKind::Expense, "#ef4444"),
    ("Entertainment", CategoryKind::Expense, "#ef4444"),
    ("Health", CategoryKind::Expense, "#ef4444"),
    ("Education", CategoryKind::Expense, "#ef4444"),
    ("Clothing", CategoryKind::Expense, "#ef4444"),
    ("Home", CategoryKind::Expense, "#ef4444"),
];

/// Create the category table.
///
/// The partial unique index guards global defaults against duplicate
/// seeding; private categories have no name uniqueness constraint.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                color TEXT NOT NULL,
                owner_user_id INTEGER,
                FOREIGN KEY(owner_user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS category_global_name
                ON category(name) WHERE owner_user_id IS NULL",
        (),
    )?;

    Ok(())
}

/// Insert the global default categories if they are not already present.
///
/// This runs once at database initialization, not per registration:
/// the defaults are shared rows, not duplicated per user. `INSERT OR
/// IGNORE` plus the partial unique index makes reruns harmless.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn seed_default_categories(connection: &Connection) -> Result<(), Error> {
    let mut statement = connection.prepare(
        "INSERT OR IGNORE INTO category (name, kind, color, owner_user_id)
                VALUES (?1, ?2, ?3, NULL)",
    )?;

    for (name, kind, color) in DEFAULT_CATEGORIES {
        statement.execute((name, kind, color))?;
    }

    Ok(())
}

fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        color: row.get(3)?,
        owner_user_id: row.get::<usize, Option<i64>>(4)?.map(UserId::new),
    })
}

/// Create a category private to `user_id`.
///
/// No uniqueness constraint applies to private category names.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn create_category(
    user_id: UserId,
    name: &str,
    kind: CategoryKind,
    color: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO category (name, kind, color, owner_user_id) VALUES (?1, ?2, ?3, ?4)",
        (name, kind, color, user_id.as_i64()),
    )?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        name: name.to_string(),
        kind,
        color: color.to_string(),
        owner_user_id: Some(user_id),
    })
}

/// Get a category by its ID.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a category.
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, kind, color, owner_user_id FROM category WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row_to_category)
        .map_err(|error| error.into())
}

/// Get the categories visible to `user_id`: the global defaults plus the
/// user's private categories.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn categories_visible_to(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, color, owner_user_id FROM category \
            WHERE owner_user_id IS NULL OR owner_user_id = :user_id \
            ORDER BY id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_category)?
        .map(|category_result| category_result.map_err(Error::SqlError))
        .collect()
}
