use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use common_auth::{AuthError, AuthResult, Principal, PrincipalDirectory, DEFAULT_SCOPES};
use common_auth::{SCOPE_ADMIN, SCOPE_USER};
use rand_core::OsRng;
use thiserror::Error;
use tracing::{info, warn};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("username must be at least {} characters", MIN_USERNAME_LEN)]
    UsernameTooShort,
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("username '{0}' already exists")]
    UsernameTaken(String),
    #[error("failed to hash password: {0}")]
    Hashing(String),
}

struct UserRecord {
    password_hash: String,
    scopes: BTreeSet<String>,
}

/// In-memory principal store with argon2 password hashes.
#[derive(Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a principal with the default scopes.
    pub fn register(&self, username: &str, password: &str) -> Result<Principal, RegistrationError> {
        self.insert(username, password, DEFAULT_SCOPES.iter().copied())
    }

    pub fn insert<'a, I>(
        &self,
        username: &str,
        password: &str,
        scopes: I,
    ) -> Result<Principal, RegistrationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let username = username.trim();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(RegistrationError::UsernameTooShort);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }

        let password_hash = hash_password(password)?;
        let scopes: BTreeSet<String> = scopes.into_iter().map(str::to_string).collect();

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(username) {
            return Err(RegistrationError::UsernameTaken(username.to_string()));
        }
        users.insert(
            username.to_string(),
            UserRecord {
                password_hash,
                scopes: scopes.clone(),
            },
        );
        info!(username, "registered user");

        Ok(Principal {
            username: username.to_string(),
            scopes,
        })
    }

    /// Adds the two demo accounts used by the walkthrough.
    pub fn seed_demo_users(&self) -> Result<(), RegistrationError> {
        self.insert("alejandro", "password123", [SCOPE_USER, SCOPE_ADMIN])?;
        self.insert("maria", "password456", [SCOPE_USER])?;
        Ok(())
    }

    /// Copies the hash and scopes out so argon2 verification never runs under the lock.
    fn stored_credentials(&self, username: &str) -> Option<(String, BTreeSet<String>)> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users
            .get(username)
            .map(|record| (record.password_hash.clone(), record.scopes.clone()))
    }

    pub fn len(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PrincipalDirectory for UserDirectory {
    fn authenticate(&self, username: &str, password: &str) -> AuthResult<Principal> {
        let username = username.trim();
        let (password_hash, scopes) = self
            .stored_credentials(username)
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed = PasswordHash::new(&password_hash).map_err(|err| {
            warn!(username, error = %err, "stored password hash is unreadable");
            AuthError::InvalidCredentials
        })?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)?;

        Ok(Principal {
            username: username.to_string(),
            scopes,
        })
    }

    fn find(&self, username: &str) -> Option<Principal> {
        let username = username.trim();
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(username).map(|record| Principal {
            username: username.to_string(),
            scopes: record.scopes.clone(),
        })
    }
}

fn hash_password(password: &str) -> Result<String, RegistrationError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| RegistrationError::Hashing(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_authenticate() {
        let directory = UserDirectory::new();
        let principal = directory.register("alice", "secret123").expect("register");
        assert_eq!(principal.scopes, BTreeSet::from([SCOPE_USER.to_string()]));

        let authenticated = directory
            .authenticate("alice", "secret123")
            .expect("authenticate");
        assert_eq!(authenticated, principal);
    }

    #[test]
    fn wrong_password_and_unknown_user_are_invalid_credentials() {
        let directory = UserDirectory::new();
        directory.register("alice", "secret123").expect("register");

        assert_eq!(
            directory.authenticate("alice", "nope"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            directory.authenticate("bob", "secret123"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn register_validates_input() {
        let directory = UserDirectory::new();
        assert!(matches!(
            directory.register("al", "secret123"),
            Err(RegistrationError::UsernameTooShort)
        ));
        assert!(matches!(
            directory.register("alice", "abc"),
            Err(RegistrationError::PasswordTooShort)
        ));
        directory.register("alice", "secret123").expect("register");
        assert!(matches!(
            directory.register("alice", "another1"),
            Err(RegistrationError::UsernameTaken(name)) if name == "alice"
        ));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn passwords_are_not_stored_in_clear() {
        let directory = UserDirectory::new();
        directory.register("alice", "secret123").expect("register");
        let users = directory.users.read().expect("lock");
        let record = users.get("alice").expect("record");
        assert_ne!(record.password_hash, "secret123");
        assert!(record.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn demo_users_carry_expected_scopes() {
        let directory = UserDirectory::new();
        directory.seed_demo_users().expect("seed");

        let admin = directory.find("alejandro").expect("alejandro");
        assert!(admin.scopes.contains(SCOPE_ADMIN));
        let user = directory.find("maria").expect("maria");
        assert!(!user.scopes.contains(SCOPE_ADMIN));
        assert!(directory.find("nobody").is_none());
    }

    #[test]
    fn usernames_are_trimmed_on_every_lookup() {
        let directory = UserDirectory::new();
        let principal = directory.register(" bob ", "secret123").expect("register");
        assert_eq!(principal.username, "bob");

        for attempt in ["bob", " bob ", "bob  "] {
            let authenticated = directory
                .authenticate(attempt, "secret123")
                .expect("authenticate");
            assert_eq!(authenticated.username, "bob");
            assert_eq!(directory.find(attempt).map(|p| p.username), Some("bob".to_string()));
        }
        assert!(matches!(
            directory.register("bob ", "another1"),
            Err(RegistrationError::UsernameTaken(name)) if name == "bob"
        ));
    }

    #[test]
    fn credential_lookup_releases_lock_before_verification() {
        let directory = UserDirectory::new();
        directory.register("alice", "secret123").expect("register");

        let (hash, scopes) = directory.stored_credentials("alice").expect("stored");
        assert!(hash.starts_with("$argon2"));
        assert!(scopes.contains(SCOPE_USER));
        // Writers are free while the copied hash is being checked.
        assert!(directory.users.try_write().is_ok());
        assert!(directory.stored_credentials("nobody").is_none());
    }
}
