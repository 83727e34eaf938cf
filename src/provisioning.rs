//! New-user provisioning: registration plus default-account bootstrap.
//!
//! Registration creates the user, their default personal account, and its
//! owner membership as one SQL transaction: either all three rows commit or
//! none do, so a user can never exist without a usable account. The global
//! default categories are seeded at database initialization, not here.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error,
    account::{Account, AccountKind, insert_account},
    membership::{Role, insert_membership},
    password::PasswordHash,
    user::{User, create_user},
};

/// The name given to the account created for every new user.
pub const DEFAULT_PERSONAL_ACCOUNT_NAME: &str = "Personal Account";

/// The details a new user registers with.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// The user's display name, if they gave one.
    pub name: Option<String>,
    /// The user's email address.
    pub email: String,
    /// The user's raw password.
    pub password: String,
}

/// A freshly provisioned user with their default personal account.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedUser {
    /// The created user.
    pub user: User,
    /// The user's default personal account.
    pub account: Account,
}

/// Register a new user and bootstrap their default personal account.
///
/// Validation happens before any write. The writes (user, account, owner
/// membership) run inside one SQL transaction; a failure at any step rolls
/// everything back. Email uniqueness is enforced by the database index, so
/// two concurrent registrations with the same email cannot both succeed.
///
/// # Errors
/// Returns:
/// - [Error::MissingField] if the email or password is empty,
/// - [Error::InvalidEmail] if the email has no '@',
/// - [Error::PasswordTooShort] if the password fails the length policy,
/// - [Error::EmailTaken] if the email is already registered,
/// - [Error::HashingError] if password hashing fails.
pub fn register_user(
    registration: Registration,
    min_password_length: usize,
    bcrypt_cost: u32,
    connection: &Connection,
) -> Result<ProvisionedUser, Error> {
    if registration.email.is_empty() {
        return Err(Error::MissingField("email"));
    }

    if registration.password.is_empty() {
        return Err(Error::MissingField("password"));
    }

    if !registration.email.contains('@') {
        return Err(Error::InvalidEmail);
    }

    let password_hash =
        PasswordHash::from_raw_password(&registration.password, min_password_length, bcrypt_cost)?;

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let user = create_user(
        &registration.email,
        registration.name.as_deref(),
        password_hash,
        &sql_transaction,
    )?;
    let account = insert_account(
        DEFAULT_PERSONAL_ACCOUNT_NAME,
        AccountKind::Personal,
        &sql_transaction,
    )?;
    insert_membership(account.id, user.id, Role::Owner, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(ProvisionedUser { user, account })
}

#[cfg(test)]
mod register_user_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        account::AccountKind,
        category::{DEFAULT_CATEGORIES, categories_visible_to},
        db::initialize,
        membership::{Role, role_of},
        password::DEFAULT_MIN_PASSWORD_LENGTH,
        account::list_accounts_for,
    };

    use super::{DEFAULT_PERSONAL_ACCOUNT_NAME, Registration, register_user};

    // Low bcrypt cost to keep the tests fast.
    const TEST_BCRYPT_COST: u32 = 4;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: Some("Alice".to_string()),
            email: email.to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn count_rows(table: &str, connection: &Connection) -> i64 {
        connection
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn register_creates_user_account_and_owner_membership() {
        let conn = get_test_connection();

        let provisioned = register_user(
            registration("alice@example.com"),
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        )
        .unwrap();

        assert_eq!(provisioned.user.email, "alice@example.com");
        assert_eq!(provisioned.user.name.as_deref(), Some("Alice"));
        assert_eq!(provisioned.account.name, DEFAULT_PERSONAL_ACCOUNT_NAME);
        assert_eq!(provisioned.account.kind, AccountKind::Personal);
        assert_eq!(
            role_of(provisioned.user.id, provisioned.account.id, &conn).unwrap(),
            Some(Role::Owner)
        );

        let overviews = list_accounts_for(provisioned.user.id, &conn).unwrap();
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].members.len(), 1);
        assert_eq!(overviews[0].transaction_count, 0);
    }

    #[test]
    fn register_stores_a_hash_not_the_password() {
        let conn = get_test_connection();

        let provisioned = register_user(
            registration("alice@example.com"),
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        )
        .unwrap();

        assert!(provisioned.user.password_hash.verify("hunter2").unwrap());
        assert!(!provisioned.user.password_hash.verify("hunter3").unwrap());
    }

    #[test]
    fn new_user_sees_exactly_the_default_categories() {
        let conn = get_test_connection();

        let provisioned = register_user(
            registration("alice@example.com"),
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        )
        .unwrap();

        let categories = categories_visible_to(provisioned.user.id, &conn).unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn registering_twice_does_not_duplicate_global_categories() {
        let conn = get_test_connection();

        register_user(
            registration("alice@example.com"),
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        )
        .unwrap();
        let bob = register_user(
            registration("bob@example.com"),
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        )
        .unwrap();

        let categories = categories_visible_to(bob.user.id, &conn).unwrap();
        assert_eq!(categories.len(), 10);
    }

    #[test]
    fn duplicate_email_fails_and_writes_nothing() {
        let conn = get_test_connection();

        register_user(
            registration("alice@example.com"),
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        )
        .unwrap();

        let users_before = count_rows("user", &conn);
        let accounts_before = count_rows("account", &conn);
        let memberships_before = count_rows("membership", &conn);

        let result = register_user(
            registration("alice@example.com"),
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        );

        assert_eq!(result, Err(Error::EmailTaken));
        assert_eq!(count_rows("user", &conn), users_before);
        assert_eq!(count_rows("account", &conn), accounts_before);
        assert_eq!(count_rows("membership", &conn), memberships_before);
    }

    #[test]
    fn short_password_fails_and_writes_nothing() {
        let conn = get_test_connection();

        let result = register_user(
            Registration {
                name: None,
                email: "alice@example.com".to_string(),
                password: "12345".to_string(),
            },
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        );

        assert_eq!(result, Err(Error::PasswordTooShort { minimum: 6 }));
        assert_eq!(count_rows("user", &conn), 0);
        assert_eq!(count_rows("account", &conn), 0);
        assert_eq!(count_rows("membership", &conn), 0);
    }

    #[test]
    fn missing_email_fails() {
        let conn = get_test_connection();

        let result = register_user(
            Registration {
                name: None,
                email: String::new(),
                password: "hunter2".to_string(),
            },
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        );

        assert_eq!(result, Err(Error::MissingField("email")));
    }

    #[test]
    fn missing_password_fails() {
        let conn = get_test_connection();

        let result = register_user(
            Registration {
                name: None,
                email: "alice@example.com".to_string(),
                password: String::new(),
            },
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        );

        assert_eq!(result, Err(Error::MissingField("password")));
    }

    #[test]
    fn malformed_email_fails() {
        let conn = get_test_connection();

        let result = register_user(
            Registration {
                name: None,
                email: "not-an-email".to_string(),
                password: "hunter2".to_string(),
            },
            DEFAULT_MIN_PASSWORD_LENGTH,
            TEST_BCRYPT_COST,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidEmail));
    }
}
