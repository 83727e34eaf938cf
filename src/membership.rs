//! Memberships are the authorization edge between a user and an account.
//!
//! A user may read or write an account's transactions if and only if a
//! membership row exists for that (user, account) pair. The role on the row
//! controls mutation rights over the account itself: only owners may rename
//! the account or manage its members.

use rusqlite::{
    Connection, Transaction as SqlTransaction,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::AccountId, user::UserId};

/// The role a user holds on an account.
///
/// Roles are checked explicitly at every owner-only entry point rather than
/// inferred from the account's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// May mutate the account itself: rename it and add or remove members.
    Owner,
    /// May read and write the account's transactions, but not manage it.
    Member,
}

impl Role {
    /// The role as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Member => "MEMBER",
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "OWNER" => Ok(Role::Owner),
            "MEMBER" => Ok(Role::Member),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A user's membership of an account.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    /// The account the membership grants access to.
    pub account_id: AccountId,
    /// The user holding the membership.
    pub user_id: UserId,
    /// The user's role on the account.
    pub role: Role,
}

/// Create the membership table.
///
/// The composite primary key makes the (account, user) pair unique, so a
/// user cannot hold two memberships of the same account.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_membership_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS membership (
                account_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                PRIMARY KEY (account_id, user_id),
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert a membership row without any role checks.
///
/// This is the raw insert used by account creation and provisioning, which
/// run it inside their own SQL transactions. Callers adding members to an
/// existing account should use [add_member] instead.
///
/// # Errors
/// Returns [Error::DuplicateMember] if the user already has a membership of
/// the account.
pub(crate) fn insert_membership(
    account_id: AccountId,
    user_id: UserId,
    role: Role,
    connection: &Connection,
) -> Result<Membership, Error> {
    connection.execute(
        "INSERT INTO membership (account_id, user_id, role) VALUES (?1, ?2, ?3)",
        (account_id, user_id.as_i64(), role),
    )?;

    Ok(Membership {
        account_id,
        user_id,
        role,
    })
}

/// Whether `user_id` holds any membership of `account_id`.
///
/// This is the authorization gate consulted before every transaction
/// operation scoped to an account.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn has_access(
    user_id: UserId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM membership WHERE account_id = ?1 AND user_id = ?2)",
            (account_id, user_id.as_i64()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// The role `user_id` holds on `account_id`, or `None` if the user is not a
/// member.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn role_of(
    user_id: UserId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Option<Role>, Error> {
    connection
        .prepare("SELECT role FROM membership WHERE account_id = :account_id AND user_id = :user_id")?
        .query_row(
            &[(":account_id", &account_id), (":user_id", &user_id.as_i64())],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            error => Err(error.into()),
        })
}

/// Add a member to an account.
///
/// Only an owner of the account may add members. The failure does not
/// reveal whether the account exists to a caller with no membership of it.
///
/// # Errors
/// Returns:
/// - [Error::Forbidden] if `acting_user` is not an owner of the account,
/// - [Error::DuplicateMember] if `new_member` already belongs to the account.
pub fn add_member(
    acting_user: UserId,
    account_id: AccountId,
    new_member: UserId,
    role: Role,
    connection: &Connection,
) -> Result<Membership, Error> {
    if role_of(acting_user, account_id, connection)? != Some(Role::Owner) {
        return Err(Error::Forbidden);
    }

    insert_membership(account_id, new_member, role, connection)
}

/// Remove a member from an account.
///
/// Only an owner of the account may remove members. Removing the last
/// remaining owner is rejected so that every account keeps a reachable
/// owner.
///
/// # Errors
/// Returns:
/// - [Error::Forbidden] if `acting_user` is not an owner of the account,
/// - [Error::LastOwner] if `member` is the only owner of the account,
/// - [Error::NotFound] if `member` has no membership of the account.
pub fn remove_member(
    acting_user: UserId,
    account_id: AccountId,
    member: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    if role_of(acting_user, account_id, &sql_transaction)? != Some(Role::Owner) {
        return Err(Error::Forbidden);
    }

    if role_of(member, account_id, &sql_transaction)? == Some(Role::Owner)
        && count_owners(account_id, &sql_transaction)? == 1
    {
        return Err(Error::LastOwner);
    }

    let rows_deleted = sql_transaction.execute(
        "DELETE FROM membership WHERE account_id = ?1 AND user_id = ?2",
        (account_id, member.as_i64()),
    )?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    sql_transaction.commit()?;

    Ok(())
}

/// The number of owner memberships of `account_id`.
fn count_owners(account_id: AccountId, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM membership WHERE account_id = ?1 AND role = 'OWNER'",
            (account_id,),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

#[cfg(test)]
mod membership_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        account::{AccountKind, create_account},
        db::initialize,
        password::PasswordHash,
        user::{User, create_user},
    };

    use super::{Role, add_member, has_access, remove_member, role_of};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(email: &str, connection: &Connection) -> User {
        create_user(email, None, PasswordHash::new_unchecked("hunter2"), connection)
            .expect("Could not create test user")
    }

    #[test]
    fn has_access_is_false_without_membership() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let outsider = create_test_user("outsider@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        assert!(has_access(owner.id, account.id, &conn).unwrap());
        assert!(!has_access(outsider.id, account.id, &conn).unwrap());
    }

    #[test]
    fn role_of_reports_owner_and_member() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let member = create_test_user("member@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        add_member(owner.id, account.id, member.id, Role::Member, &conn).unwrap();

        assert_eq!(role_of(owner.id, account.id, &conn).unwrap(), Some(Role::Owner));
        assert_eq!(role_of(member.id, account.id, &conn).unwrap(), Some(Role::Member));
    }

    #[test]
    fn role_of_is_none_without_membership() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let outsider = create_test_user("outsider@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        assert_eq!(role_of(outsider.id, account.id, &conn).unwrap(), None);
    }

    #[test]
    fn add_member_fails_for_non_owner() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let member = create_test_user("member@example.com", &conn);
        let third = create_test_user("third@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        add_member(owner.id, account.id, member.id, Role::Member, &conn).unwrap();

        let result = add_member(member.id, account.id, third.id, Role::Member, &conn);

        assert_eq!(result, Err(Error::Forbidden));
    }

    #[test]
    fn add_member_fails_on_duplicate() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let member = create_test_user("member@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        add_member(owner.id, account.id, member.id, Role::Member, &conn).unwrap();

        let result = add_member(owner.id, account.id, member.id, Role::Member, &conn);

        assert_eq!(result, Err(Error::DuplicateMember));
    }

    #[test]
    fn remove_member_succeeds_for_owner() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let member = create_test_user("member@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        add_member(owner.id, account.id, member.id, Role::Member, &conn).unwrap();
        remove_member(owner.id, account.id, member.id, &conn).unwrap();

        assert!(!has_access(member.id, account.id, &conn).unwrap());
    }

    #[test]
    fn remove_member_fails_for_non_owner() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let member = create_test_user("member@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        add_member(owner.id, account.id, member.id, Role::Member, &conn).unwrap();

        let result = remove_member(member.id, account.id, owner.id, &conn);

        assert_eq!(result, Err(Error::Forbidden));
    }

    #[test]
    fn remove_member_refuses_last_owner() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let member = create_test_user("member@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        add_member(owner.id, account.id, member.id, Role::Member, &conn).unwrap();

        let result = remove_member(owner.id, account.id, owner.id, &conn);

        assert_eq!(result, Err(Error::LastOwner));
        assert!(has_access(owner.id, account.id, &conn).unwrap());
    }

    #[test]
    fn remove_member_allows_removing_an_owner_when_another_remains() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let co_owner = create_test_user("co-owner@example.com", &conn);
        let account = create_account(owner.id, "Flat", AccountKind::Shared, &conn).unwrap();

        add_member(owner.id, account.id, co_owner.id, Role::Owner, &conn).unwrap();
        remove_member(co_owner.id, account.id, owner.id, &conn).unwrap();

        assert!(!has_access(owner.id, account.id, &conn).unwrap());
        assert_eq!(role_of(co_owner.id, account.id, &conn).unwrap(), Some(Role::Owner));
    }
}
