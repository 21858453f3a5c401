//! User registration and login.
//!
//! Passwords are hashed with Argon2id into PHC strings; the plaintext is
//! never stored or logged. Login failures are reported identically whether
//! the email is unknown or the password is wrong.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier, Version};
use tracing::{debug, info, instrument};

use crate::config::{ConfigError, HashingConfig};
use crate::error::AppError;
use crate::store::{NewUser, UserStore};

/// Argon2id hasher with tunable cost.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: HashingConfig) -> Result<Self, ConfigError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| ConfigError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Persistence(format!("password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Constant-time check of `password` against a stored PHC string. The
    /// cost parameters embedded in `hash` are the ones used.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Persistence(format!("stored hash is malformed: {}", e)))?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Registration and login over a [`UserStore`].
#[derive(Debug, Clone)]
pub struct CredentialService {
    users: UserStore,
    hasher: PasswordHasher,
    // Verified against when the email is unknown.
    dummy_hash: String,
}

impl CredentialService {
    pub fn new(users: UserStore, hasher: PasswordHasher) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash("not-a-real-password")?;
        Ok(Self {
            users,
            hasher,
            dummy_hash,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<(), AppError> {
        require("username", username)?;
        require("email", email)?;
        require("password", password)?;

        if self.users.exists(username, email).await? {
            return Err(AppError::Conflict);
        }

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Persistence(format!("hashing task failed: {}", e)))??;

        let user = self
            .users
            .insert(NewUser {
                username,
                email,
                password_hash: &password_hash,
            })
            .await?;

        info!("Registered user {} ({})", user.id, user.username);
        Ok(())
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AppError> {
        require("email", email)?;
        require("password", password)?;

        let user = self.users.find_by_email(email).await?;
        let known = user.is_some();
        let hash = match user {
            Some(user) => user.password_hash,
            None => self.dummy_hash.clone(),
        };

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Persistence(format!("verification task failed: {}", e)))??;

        if known && matches {
            debug!("Login succeeded");
            Ok(())
        } else {
            Err(AppError::Authentication)
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_hashing() -> HashingConfig {
    HashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}
