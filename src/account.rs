//! Defines the account model and its database queries.
//!
//! An account is a ledger scope, either a personal wallet or a wallet
//! shared between several members. Access to an account is always mediated
//! by the membership rows defined in [crate::membership].

use rusqlite::{
    Connection, Transaction as SqlTransaction,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::{
    Error,
    database_id::AccountId,
    db::{datetime_from_column, now_datetime, to_sql_datetime},
    membership::{Role, insert_membership, role_of},
    user::UserId,
};

/// Whether an account is a single-user wallet or shared between members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountKind {
    /// A wallet created for a single user.
    Personal,
    /// A wallet that may have several members.
    Shared,
}

impl AccountKind {
    /// The kind as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Personal => "PERSONAL",
            AccountKind::Shared => "SHARED",
        }
    }
}

impl ToSql for AccountKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "PERSONAL" => Ok(AccountKind::Personal),
            "SHARED" => Ok(AccountKind::Shared),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A financial ledger scope, personal or shared among members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The display name of the account. Account names are not unique.
    pub name: String,
    /// Whether the account is personal or shared.
    pub kind: AccountKind,
    /// When the account was created.
    pub created_at: PrimitiveDateTime,
}

/// A member of an account with the user display fields joined in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSummary {
    /// The member's user ID.
    pub user_id: UserId,
    /// The member's email address.
    pub email: String,
    /// The member's display name, if they gave one.
    pub name: Option<String>,
    /// The member's role on the account.
    pub role: Role,
}

/// An account with its members and transaction count, as shown on the
/// dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountOverview {
    /// The account itself.
    #[serde(flatten)]
    pub account: Account,
    /// Everyone who holds a membership of the account.
    pub members: Vec<MemberSummary>,
    /// How many transactions have been recorded against the account.
    pub transaction_count: i64,
}

/// Create the account table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert an account row without creating a membership.
///
/// Every account must end up with an owner membership, so this is only for
/// callers that insert the membership in the same SQL transaction.
pub(crate) fn insert_account(
    name: &str,
    kind: AccountKind,
    connection: &Connection,
) -> Result<Account, Error> {
    let created_at = now_datetime();

    connection.execute(
        "INSERT INTO account (name, kind, created_at) VALUES (?1, ?2, ?3)",
        (name, kind, to_sql_datetime(created_at)),
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        name: name.to_string(),
        kind,
        created_at,
    })
}

/// Create an account and its owner membership as one atomic unit.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred. In that
/// case neither the account nor the membership is persisted.
pub fn create_account(
    owner: UserId,
    name: &str,
    kind: AccountKind,
    connection: &Connection,
) -> Result<Account, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let account = insert_account(name, kind, &sql_transaction)?;
    insert_membership(account.id, owner, Role::Owner, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(account)
}

/// Rename an account.
///
/// Only an owner of the account may rename it.
///
/// # Errors
/// Returns [Error::Forbidden] if `acting_user` is not an owner of the
/// account. A missing account also reports [Error::Forbidden], since a
/// caller with no membership must not learn whether the account exists.
pub fn rename_account(
    acting_user: UserId,
    account_id: AccountId,
    new_name: &str,
    connection: &Connection,
) -> Result<(), Error> {
    if role_of(acting_user, account_id, connection)? != Some(Role::Owner) {
        return Err(Error::Forbidden);
    }

    connection.execute(
        "UPDATE account SET name = ?1 WHERE id = ?2",
        (new_name, account_id),
    )?;

    Ok(())
}

/// Get every account `user_id` is a member of, most recently created first.
///
/// Each account comes with its member summaries and a count of its
/// transactions, ready for the dashboard.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn list_accounts_for(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<AccountOverview>, Error> {
    let accounts: Vec<Account> = connection
        .prepare(
            "SELECT account.id, account.name, account.kind, account.created_at FROM account \
            INNER JOIN membership ON membership.account_id = account.id \
            WHERE membership.user_id = :user_id \
            ORDER BY account.created_at DESC, account.id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
                created_at: datetime_from_column(row, 3)?,
            })
        })?
        .map(|account_result| account_result.map_err(Error::SqlError))
        .collect::<Result<_, _>>()?;

    accounts
        .into_iter()
        .map(|account| {
            let members = get_members(account.id, connection)?;
            let transaction_count = count_transactions(account.id, connection)?;

            Ok(AccountOverview {
                account,
                members,
                transaction_count,
            })
        })
        .collect()
}

fn get_members(account_id: AccountId, connection: &Connection) -> Result<Vec<MemberSummary>, Error> {
    connection
        .prepare(
            "SELECT user.id, user.email, user.name, membership.role FROM membership \
            INNER JOIN user ON user.id = membership.user_id \
            WHERE membership.account_id = :account_id \
            ORDER BY user.id ASC",
        )?
        .query_map(&[(":account_id", &account_id)], |row| {
            Ok(MemberSummary {
                user_id: UserId::new(row.get(0)?),
                email: row.get(1)?,
                name: row.get(2)?,
                role: row.get(3)?,
            })
        })?
        .map(|member_result| member_result.map_err(Error::SqlError))
        .collect()
}

fn count_transactions(account_id: AccountId, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE account_id = ?1",
            (account_id,),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}
