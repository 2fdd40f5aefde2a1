//! Credential store: persisted accounts with Argon2 password hashes.
//!
//! Lookups are exact-match on username; verification happens against the
//! stored per-account hash. Records handed to callers never carry password
//! material.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warble_common::{Error, Result};

/// One account as exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Unique account ID
    pub id: String,
    /// Username matched by the login command
    pub username: String,
    /// Permission capabilities granted to this account
    pub permissions: HashSet<String>,
}

/// Exact-match credential lookup, implemented by persisted stores.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Verify `password` for `username`.
    ///
    /// Returns `None` for an unknown username and for a wrong password
    /// alike; callers must not be able to tell the two apart.
    async fn verify(&self, username: &str, password: &str) -> Result<Option<AccountRecord>>;

    /// Permission capabilities held by `username`; empty for unknown names.
    async fn permissions_of(&self, username: &str) -> Result<HashSet<String>>;
}

/// Row shape kept internal so hashes never leave this module.
struct StoredAccount {
    record: AccountRecord,
    password_hash: String,
}

/// Credential store backed by SQLite.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCredentialStore {
    /// Open (or create) the account database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                permissions TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_username ON accounts(username);
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| Error::Internal(e.to_string()))
    }

    /// Create a new account with a freshly salted password hash.
    pub fn add_account(
        &self,
        username: &str,
        password: &str,
        permissions: &[&str],
    ) -> Result<AccountRecord> {
        if username.is_empty() {
            return Err(Error::InvalidInput("username cannot be empty".into()));
        }
        if username.len() > 64 {
            return Err(Error::InvalidInput(
                "username too long (max 64 characters)".into(),
            ));
        }
        if password.is_empty() {
            return Err(Error::InvalidInput("password cannot be empty".into()));
        }

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();
        let perms: HashSet<String> = permissions.iter().map(|p| (*p).to_string()).collect();
        let perms_json = serde_json::to_string(&perms)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO accounts (id, username, password_hash, permissions) VALUES (?1, ?2, ?3, ?4)",
            params![id, username, password_hash, perms_json],
        )?;

        tracing::info!(username, "account created");

        Ok(AccountRecord {
            id,
            username: username.to_string(),
            permissions: perms,
        })
    }

    /// Replace the permission set for `username`. Returns whether an account
    /// was updated.
    pub fn set_permissions(&self, username: &str, permissions: &[&str]) -> Result<bool> {
        let perms: HashSet<String> = permissions.iter().map(|p| (*p).to_string()).collect();
        let perms_json = serde_json::to_string(&perms)?;

        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE accounts SET permissions = ?1 WHERE username = ?2",
            params![perms_json, username],
        )?;
        Ok(rows > 0)
    }

    /// Number of stored accounts.
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn fetch(&self, username: &str) -> Result<Option<StoredAccount>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, username, password_hash, permissions FROM accounts WHERE username = ?1",
            params![username],
            |row| {
                let perms_json: String = row.get(3)?;
                Ok(StoredAccount {
                    record: AccountRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        permissions: serde_json::from_str(&perms_json).unwrap_or_default(),
                    },
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn verify(&self, username: &str, password: &str) -> Result<Option<AccountRecord>> {
        let Some(stored) = self.fetch(username)? else {
            return Ok(None);
        };

        if verify_password(password, &stored.password_hash)? {
            Ok(Some(stored.record))
        } else {
            Ok(None)
        }
    }

    async fn permissions_of(&self, username: &str) -> Result<HashSet<String>> {
        Ok(self
            .fetch(username)?
            .map(|stored| stored.record.permissions)
            .unwrap_or_default())
    }
}

/// Hash a password using Argon2 with a per-account random salt.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
