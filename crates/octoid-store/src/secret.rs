//! Client secret generation and transport encoding.
//!
//! Secrets are random byte strings. They cross API boundaries as URL-safe
//! base64 text and are only ever persisted in hashed form (see
//! [`crate::hasher`]).
//!
//! # Example
//!
//! ```
//! use octoid_store::secret::{decode, encode, RandomSecretGenerator, SecretGenerator};
//!
//! let raw = RandomSecretGenerator.generate().unwrap();
//! assert_eq!(raw.len(), 72);
//!
//! let text = encode(&raw);
//! assert_eq!(decode(&text).unwrap(), raw);
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::StorageError;
use crate::StorageResult;

/// Maximum length in bytes of a decoded client secret.
///
/// Blowfish, the cipher underneath bcrypt, only consumes the first 72 bytes
/// of its input. Longer secrets are rejected instead of being truncated.
pub const MAX_SECRET_LENGTH: usize = 72;

/// Encodes raw secret bytes as URL-safe base64 text.
#[must_use]
pub fn encode(raw: &[u8]) -> String {
    URL_SAFE.encode(raw)
}

/// Decodes URL-safe base64 text into raw secret bytes.
///
/// # Errors
///
/// Returns `StorageError::Decode` if the text is not valid URL-safe base64.
pub fn decode(text: &str) -> StorageResult<Vec<u8>> {
    URL_SAFE
        .decode(text)
        .map_err(|e| StorageError::decode(format!("invalid client secret encoding: {e}")))
}

/// Source of server-issued client secrets.
pub trait SecretGenerator: Send + Sync {
    /// Produces a fresh raw secret.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Hashing` if no entropy is available.
    fn generate(&self) -> StorageResult<Vec<u8>>;
}

/// Generates [`MAX_SECRET_LENGTH`] bytes from the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecretGenerator;

impl SecretGenerator for RandomSecretGenerator {
    fn generate(&self) -> StorageResult<Vec<u8>> {
        let mut bytes = vec![0u8; MAX_SECRET_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| StorageError::hashing(format!("failed to read random bytes: {e}")))?;
        Ok(bytes)
    }
}

/// Returns the same secret on every call. Intended for tests and fixtures.
#[derive(Debug, Clone)]
pub struct FixedSecretGenerator(Vec<u8>);

impl FixedSecretGenerator {
    /// Create a generator that always yields `secret`.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }
}

impl SecretGenerator for FixedSecretGenerator {
    fn generate(&self) -> StorageResult<Vec<u8>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length() {
        let secret = RandomSecretGenerator.generate().unwrap();
        assert_eq!(secret.len(), MAX_SECRET_LENGTH);
    }

    #[test]
    fn test_generate_uniqueness() {
        let a = RandomSecretGenerator.generate().unwrap();
        let b = RandomSecretGenerator.generate().unwrap();
        assert_ne!(a, b, "Secrets should be unique");
    }

    #[test]
    fn test_encoding_is_url_safe() {
        let raw: Vec<u8> = (0..=255u8).collect();
        let text = encode(&raw);
        assert!(!text.contains('+'));
        assert!(!text.contains('/'));
        assert_eq!(decode(&text).unwrap(), raw);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let err = decode("not base64!!").unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));

        // Standard alphabet characters are not part of the URL-safe alphabet
        assert!(decode("ab+/").is_err());
    }

    #[test]
    fn test_fixed_generator() {
        let generator = FixedSecretGenerator::new(b"fixed".to_vec());
        assert_eq!(generator.generate().unwrap(), b"fixed");
        assert_eq!(generator.generate().unwrap(), b"fixed");
    }
}
