//! One-way hashing of client secrets.
//!
//! # Security
//!
//! - bcrypt (default) with a configurable cost, Argon2id as an alternative
//! - Salts come from the OS RNG, so hashing the same secret twice yields
//!   different hashes
//! - Inputs longer than [`MAX_SECRET_LENGTH`] are rejected on both hash and
//!   verify. bcrypt silently ignores everything past byte 72, which would let
//!   any secret sharing a 72-byte prefix authenticate.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};

use crate::StorageResult;
use crate::error::StorageError;
use crate::secret::MAX_SECRET_LENGTH;

/// Default bcrypt work factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

/// Hashes and verifies raw client secrets.
pub trait SecretHasher: Send + Sync {
    /// Hashes `secret` for storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if the secret is longer than
    /// [`MAX_SECRET_LENGTH`], or `StorageError::Hashing` if the underlying
    /// hash function fails.
    fn hash(&self, secret: &[u8]) -> StorageResult<Vec<u8>>;

    /// Checks `secret` against a stored hash.
    ///
    /// Never errors: a mismatch, a malformed hash and an over-long secret all
    /// yield `false`.
    fn verify(&self, hash: &[u8], secret: &[u8]) -> bool;
}

fn check_length(secret: &[u8]) -> StorageResult<()> {
    if secret.len() > MAX_SECRET_LENGTH {
        return Err(StorageError::validation(format!(
            "secret is {} bytes, maximum is {MAX_SECRET_LENGTH}",
            secret.len()
        )));
    }
    Ok(())
}

// =============================================================================
// bcrypt
// =============================================================================

/// bcrypt-based [`SecretHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Create a hasher with the given work factor.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if `cost` is outside 4..=31.
    pub fn new(cost: u32) -> StorageResult<Self> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(StorageError::validation(format!(
                "bcrypt cost must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}, got {cost}"
            )));
        }
        Ok(Self { cost })
    }

    /// Returns the configured work factor.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl SecretHasher for BcryptHasher {
    fn hash(&self, secret: &[u8]) -> StorageResult<Vec<u8>> {
        check_length(secret)?;
        let hashed = bcrypt::hash(secret, self.cost)
            .map_err(|e| StorageError::hashing(format!("bcrypt failed: {e}")))?;
        Ok(hashed.into_bytes())
    }

    fn verify(&self, hash: &[u8], secret: &[u8]) -> bool {
        if secret.len() > MAX_SECRET_LENGTH {
            return false;
        }
        let Ok(hash) = std::str::from_utf8(hash) else {
            return false;
        };
        bcrypt::verify(secret, hash).unwrap_or(false)
    }
}

// =============================================================================
// Argon2id
// =============================================================================

/// Argon2id-based [`SecretHasher`] with default parameters, PHC string output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &[u8]) -> StorageResult<Vec<u8>> {
        check_length(secret)?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret, &salt)
            .map_err(|e| StorageError::hashing(format!("argon2 failed: {e}")))?;
        Ok(hash.to_string().into_bytes())
    }

    fn verify(&self, hash: &[u8], secret: &[u8]) -> bool {
        if secret.len() > MAX_SECRET_LENGTH {
            return false;
        }
        let Ok(hash) = std::str::from_utf8(hash) else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default().verify_password(secret, &parsed).is_ok()
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Hash algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Bcrypt,
    Argon2id,
}

/// Secret hashing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashConfig {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    /// bcrypt work factor, ignored for Argon2id.
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    DEFAULT_BCRYPT_COST
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl HashConfig {
    /// Builds the configured hasher.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` for an unsupported bcrypt cost.
    pub fn build(&self) -> StorageResult<Arc<dyn SecretHasher>> {
        let hasher: Arc<dyn SecretHasher> = match self.algorithm {
            HashAlgorithm::Bcrypt => Arc::new(BcryptHasher::new(self.bcrypt_cost)?),
            HashAlgorithm::Argon2id => Arc::new(Argon2Hasher),
        };
        Ok(hasher)
    }
}
