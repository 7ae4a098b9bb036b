//! Credential store: username + Argon2id password hash.

use crate::db::PracticeDb;
use crate::error::{PracticeError, PracticeResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterOutcome {
    Registered,
    AlreadyExists,
}

#[derive(Clone)]
pub struct CredentialStore {
    db: PracticeDb,
    params: Params,
}

impl CredentialStore {
    pub fn new(db: PracticeDb, params: Params) -> Self {
        Self { db, params }
    }

    /// Store a new user. An existing username is reported, never overwritten.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> PracticeResult<RegisterOutcome> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(PracticeError::EmptyCredentials);
        }

        let params = self.params.clone();
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hash_password(&params, &password))
            .await
            .map_err(|e| PracticeError::Hashing(e.to_string()))??;

        let user = username.to_string();
        let inserted = self
            .db
            .execute(move |conn| {
                let rows = conn.execute(
                    "INSERT OR IGNORE INTO users (username, password) VALUES (?1, ?2)",
                    params![user, hash],
                )?;
                Ok(rows)
            })
            .await?;

        if inserted == 0 {
            info!("Registration refused, username taken: {}", username);
            return Ok(RegisterOutcome::AlreadyExists);
        }

        info!("Registered user: {}", username);
        Ok(RegisterOutcome::Registered)
    }

    /// Check a username/password pair. Unknown users and wrong passwords
    /// both come back as `false`.
    pub async fn authenticate(&self, username: &str, password: &str) -> PracticeResult<bool> {
        let user = username.to_string();
        let stored: Option<String> = self
            .db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT password FROM users WHERE username = ?1",
                    params![user],
                    |row| row.get(0),
                );
                match result {
                    Ok(hash) => Ok(Some(hash)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        let Some(stored) = stored else {
            debug!("Login attempt for unknown user");
            return Ok(false);
        };

        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || verify_password(&stored, &password))
            .await
            .map_err(|e| PracticeError::Hashing(e.to_string()))?;

        debug!("Login attempt for {}: valid={}", username, valid);
        Ok(valid)
    }

    /// Number of stored users
    pub async fn count(&self) -> PracticeResult<u64> {
        let count: i64 = self
            .db
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .await?;
        Ok(count as u64)
    }
}

fn hash_password(params: &Params, password: &str) -> PracticeResult<String> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PracticeError::Hashing(e.to_string()))
}

/// A stored hash that fails to parse never verifies.
fn verify_password(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Cheap parameters so tests stay fast
#[cfg(test)]
pub(crate) fn test_params() -> Params {
    Params::new(256, 1, 1, None).unwrap()
}
