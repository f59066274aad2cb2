//! Account store: email/password identities and password-reset tickets.
//!
//! Profiles are separate documents in the repo; an identity only proves who
//! is calling.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::snapshot::{self, SnapshotError, SnapshotWriter};

pub const MIN_PASSWORD_LEN: usize = 6;
const ACCOUNTS_FILE: &str = "accounts.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("no account for that email")]
    NotFound,
    #[error("reset link is invalid or expired")]
    InvalidToken,
    #[error("identity store: {0}")]
    Internal(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> IdentityResult<Identity>;
    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Identity>;
    async fn find_by_uid(&self, uid: &str) -> IdentityResult<Identity>;
    /// Issues a single-use reset token for `email`; the caller delivers it.
    async fn issue_password_reset(&self, email: &str) -> IdentityResult<String>;
    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> IdentityResult<Identity>;
}

pub fn normalize_email(email: &str) -> IdentityResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(IdentityError::InvalidEmail),
    }
}

fn hash_password(password: &str) -> IdentityResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword);
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| IdentityError::Internal(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResetTicket {
    uid: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default, Serialize, Deserialize)]
struct Accounts {
    by_uid: HashMap<String, Account>,
    /// sha256(token) -> ticket; the raw token is never stored.
    resets: HashMap<String, ResetTicket>,
}

impl Accounts {
    fn uid_for_email(&self, email: &str) -> Option<&Account> {
        self.by_uid.values().find(|a| a.email == email)
    }
}

#[derive(Clone)]
pub struct InMemIdentity {
    accounts: Arc<RwLock<Accounts>>,
    snapshot: Option<Arc<SnapshotWriter>>,
    reset_ttl: Duration,
}

impl InMemIdentity {
    /// Loads `accounts.json` from `dir`; a damaged file is an error.
    pub fn open(dir: &Path) -> Result<Self, SnapshotError> {
        let path = dir.join(ACCOUNTS_FILE);
        let accounts: Accounts = snapshot::load(&path)?;
        Ok(Self {
            accounts: Arc::new(RwLock::new(accounts)),
            snapshot: Some(Arc::new(SnapshotWriter::new(path))),
            reset_ttl: Duration::hours(1),
        })
    }

    pub fn ephemeral() -> Self {
        Self { accounts: Arc::default(), snapshot: None, reset_ttl: Duration::hours(1) }
    }

    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset_ttl = ttl;
        self
    }

    fn lock_err<T>(_: T) -> IdentityError {
        IdentityError::Internal("accounts lock poisoned".into())
    }

    /// Stages under the write guard, then writes after releasing it.
    fn persist(&self, guard: RwLockWriteGuard<'_, Accounts>) {
        let staged = match &self.snapshot {
            Some(writer) => match writer.stage(&*guard) {
                Ok(staged) => Some((writer, staged)),
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialise accounts snapshot");
                    None
                }
            },
            None => None,
        };
        drop(guard);
        if let Some((writer, staged)) = staged {
            writer.store(staged);
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemIdentity {
    async fn create_account(&self, email: &str, password: &str) -> IdentityResult<Identity> {
        let email = normalize_email(email)?;
        let password_hash = hash_password(password)?;
        let mut a = self.accounts.write().map_err(Self::lock_err)?;
        if a.uid_for_email(&email).is_some() {
            return Err(IdentityError::EmailTaken);
        }
        let uid = uuid::Uuid::new_v4().simple().to_string();
        a.by_uid.insert(uid.clone(), Account { uid: uid.clone(), email: email.clone(), password_hash });
        self.persist(a);
        Ok(Identity { uid, email })
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Identity> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let account = {
            let a = self.accounts.read().map_err(Self::lock_err)?;
            a.uid_for_email(&email).cloned()
        };
        match account {
            Some(acc) if verify_password(password, &acc.password_hash) => Ok(Identity { uid: acc.uid, email: acc.email }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn find_by_uid(&self, uid: &str) -> IdentityResult<Identity> {
        let a = self.accounts.read().map_err(Self::lock_err)?;
        a.by_uid
            .get(uid)
            .map(|acc| Identity { uid: acc.uid.clone(), email: acc.email.clone() })
            .ok_or(IdentityError::NotFound)
    }

    async fn issue_password_reset(&self, email: &str) -> IdentityResult<String> {
        let email = normalize_email(email)?;
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = hex::encode(raw);
        let mut a = self.accounts.write().map_err(Self::lock_err)?;
        let uid = a.uid_for_email(&email).map(|acc| acc.uid.clone()).ok_or(IdentityError::NotFound)?;
        let now = Utc::now();
        a.resets.retain(|_, t| t.expires_at > now);
        a.resets.insert(token_digest(&token), ResetTicket { uid, expires_at: now + self.reset_ttl });
        self.persist(a);
        Ok(token)
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> IdentityResult<Identity> {
        let password_hash = hash_password(new_password)?;
        let mut a = self.accounts.write().map_err(Self::lock_err)?;
        let ticket = a.resets.remove(&token_digest(token)).ok_or(IdentityError::InvalidToken)?;
        if ticket.expires_at <= Utc::now() {
            self.persist(a);
            return Err(IdentityError::InvalidToken);
        }
        let acc = a.by_uid.get_mut(&ticket.uid).ok_or(IdentityError::NotFound)?;
        acc.password_hash = password_hash;
        let identity = Identity { uid: acc.uid.clone(), email: acc.email.clone() };
        self.persist(a);
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_sign_in() {
        let idp = InMemIdentity::ephemeral();
        let id = idp.create_account("Siti@Example.com", "hunter22").await.unwrap();
        assert_eq!(id.email, "siti@example.com");
        assert_eq!(idp.sign_in("siti@example.com", "hunter22").await.unwrap(), id);
        assert!(matches!(idp.sign_in("siti@example.com", "wrong-pw").await, Err(IdentityError::InvalidCredentials)));
        assert!(matches!(idp.create_account("siti@example.com", "another1").await, Err(IdentityError::EmailTaken)));
    }

    #[tokio::test]
    async fn rejects_weak_password_and_bad_email() {
        let idp = InMemIdentity::ephemeral();
        assert!(matches!(idp.create_account("a@b.co", "123").await, Err(IdentityError::WeakPassword)));
        assert!(matches!(idp.create_account("not-an-email", "123456").await, Err(IdentityError::InvalidEmail)));
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let idp = InMemIdentity::ephemeral();
        idp.create_account("r@example.com", "oldpass").await.unwrap();
        let token = idp.issue_password_reset("r@example.com").await.unwrap();
        idp.confirm_password_reset(&token, "newpass").await.unwrap();
        assert!(idp.sign_in("r@example.com", "newpass").await.is_ok());
        assert!(matches!(idp.confirm_password_reset(&token, "again!!").await, Err(IdentityError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_reset_token_rejected() {
        let idp = InMemIdentity::ephemeral().with_reset_ttl(Duration::seconds(-1));
        idp.create_account("x@example.com", "oldpass").await.unwrap();
        let token = idp.issue_password_reset("x@example.com").await.unwrap();
        assert!(matches!(idp.confirm_password_reset(&token, "newpass").await, Err(IdentityError::InvalidToken)));
    }

    #[tokio::test]
    async fn reset_for_unknown_email_is_not_found() {
        let idp = InMemIdentity::ephemeral();
        assert!(matches!(idp.issue_password_reset("ghost@example.com").await, Err(IdentityError::NotFound)));
    }

    #[tokio::test]
    async fn accounts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let idp = InMemIdentity::open(dir.path()).unwrap();
            idp.create_account("p@example.com", "secret1").await.unwrap()
        };
        let reopened = InMemIdentity::open(dir.path()).unwrap();
        assert_eq!(reopened.sign_in("p@example.com", "secret1").await.unwrap(), id);
    }

    #[test]
    fn damaged_accounts_file_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ACCOUNTS_FILE), b"not json").unwrap();
        assert!(InMemIdentity::open(dir.path()).is_err());
    }
}
