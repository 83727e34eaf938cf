//! Password policy validation and hashing.
//!
//! `ValidatedPassword` wraps a string and ensures it satisfies the password
//! policy. `PasswordHash` converts a `ValidatedPassword` into a salted and
//! hashed password.

use bcrypt::{BcryptError, hash, verify};

use crate::Error;

/// The minimum password length accepted by [ValidatedPassword::new] unless
/// the caller configures a different minimum.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// A password that has been validated against the password policy, but not
/// yet hashed.
///
/// This struct can be used to construct a [PasswordHash].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create and validate a new password from a string.
    ///
    /// The policy is a minimum character count. It is a parameter rather
    /// than a fixed rule so deployments can tighten it.
    ///
    /// # Errors
    /// Returns [Error::PasswordTooShort] if the password has fewer than
    /// `minimum_length` characters.
    pub fn new(raw_password: &str, minimum_length: usize) -> Result<Self, Error> {
        if raw_password.chars().count() < minimum_length {
            return Err(Error::PasswordTooShort {
                minimum: minimum_length,
            });
        }

        Ok(Self(raw_password.to_string()))
    }

    /// Create a new `ValidatedPassword` without any validation.
    ///
    /// The caller should ensure that `raw_password` satisfies the password
    /// policy.
    pub fn new_unchecked(raw_password: &str) -> Self {
        Self(raw_password.to_string())
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create a hashed password from a validated password with the specified `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed
    /// to verify a password. Pass in [PasswordHash::DEFAULT_COST] to use the
    /// recommended cost.
    ///
    /// # Errors
    /// Returns [Error::HashingError] if the underlying hashing library fails.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        match hash(&password.0, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(error) => Err(Error::HashingError(error.to_string())),
        }
    }

    /// Create a new `PasswordHash` without any validation.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid password hash.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Validate and hash a raw password string in one step.
    ///
    /// # Errors
    /// Returns an error if the password fails the policy or could not be hashed.
    pub fn from_raw_password(
        raw_password: &str,
        minimum_length: usize,
        cost: u32,
    ) -> Result<Self, Error> {
        let validated_password = ValidatedPassword::new(raw_password, minimum_length)?;
        PasswordHash::new(validated_password, cost)
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }

    /// The hash as a string slice, for storage.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod validated_password_tests {
    use crate::Error;

    use super::{DEFAULT_MIN_PASSWORD_LENGTH, ValidatedPassword};

    #[test]
    fn new_fails_on_empty() {
        let result = ValidatedPassword::new("", DEFAULT_MIN_PASSWORD_LENGTH);

        assert_eq!(result, Err(Error::PasswordTooShort { minimum: 6 }));
    }

    #[test]
    fn new_fails_on_short_password() {
        let result = ValidatedPassword::new("hunt3", DEFAULT_MIN_PASSWORD_LENGTH);

        assert_eq!(result, Err(Error::PasswordTooShort { minimum: 6 }));
    }

    #[test]
    fn new_succeeds_at_exact_minimum() {
        let result = ValidatedPassword::new("hunter", DEFAULT_MIN_PASSWORD_LENGTH);

        assert!(result.is_ok());
    }

    #[test]
    fn new_respects_configured_minimum() {
        let result = ValidatedPassword::new("hunter2", 14);

        assert_eq!(result, Err(Error::PasswordTooShort { minimum: 14 }));
    }
}

#[cfg(test)]
mod password_hash_tests {
    use super::{DEFAULT_MIN_PASSWORD_LENGTH, PasswordHash};

    #[test]
    fn verify_accepts_matching_password() {
        let hash = PasswordHash::from_raw_password("okon", 4, 4).unwrap();

        assert!(hash.verify("okon").unwrap());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash =
            PasswordHash::from_raw_password("hunter2", DEFAULT_MIN_PASSWORD_LENGTH, 4).unwrap();

        assert!(!hash.verify("hunter3").unwrap());
    }
}
