//! Client token generation and at-rest hashing.
//!
//! Stores keep only the SHA-256 of a client token; the token itself is
//! returned once, at creation.

use crate::errors::AuthnError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::secret::SecretString;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

/// Random bytes per generated client token.
pub const CLIENT_TOKEN_BYTES: usize = 32;

/// Generate a fresh client token (URL-safe base64, no padding).
pub fn generate_client_token() -> Result<SecretString, AuthnError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; CLIENT_TOKEN_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AuthnError::Internal("failed to generate client token".to_string()))?;
    Ok(SecretString::from(URL_SAFE_NO_PAD.encode(bytes)))
}

/// Hex-encoded SHA-256 of a client token.
pub fn hash_client_token(client_token: &str) -> String {
    hex::encode(Sha256::digest(client_token.as_bytes()))
}
