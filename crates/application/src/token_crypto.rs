//! Token crypto helpers shared by services.

use scolaris_core::{AppError, AppResult};

/// Generates a cryptographically random opaque token and its SHA-256 digest.
///
/// Returns `(raw_token_hex, sha256_digest_hex)`. Only the digest is ever
/// persisted; the raw value travels to the client or into an outbound event.
pub fn generate_token() -> AppResult<(String, String)> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate token: {error}")))?;

    let raw_token = to_hex(&bytes);
    let digest = hash_token(&raw_token);
    Ok((raw_token, digest))
}

/// Computes the SHA-256 digest of a token string for storage.
#[must_use]
pub fn hash_token(raw_token: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    to_hex(&hasher.finalize())
}

/// Generates a random temporary password for admin-created accounts.
///
/// 16 characters from an unambiguous alphanumeric alphabet; long enough to
/// pass the platform's own password rules.
pub fn generate_temporary_password() -> AppResult<String> {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|error| {
        AppError::Internal(format!("failed to generate temporary password: {error}"))
    })?;

    Ok(bytes
        .iter()
        .map(|byte| char::from(ALPHABET[usize::from(*byte) % ALPHABET.len()]))
        .collect())
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_matches_its_digest() {
        let (raw, digest) = generate_token().unwrap_or_else(|_| panic!("test token"));
        assert_eq!(raw.len(), 64);
        assert_eq!(hash_token(&raw), digest);
    }

    #[test]
    fn temporary_password_passes_password_rules() {
        let password =
            generate_temporary_password().unwrap_or_else(|_| panic!("test password"));
        assert_eq!(password.chars().count(), 16);
        assert!(scolaris_domain::validate_password(&password).is_ok());
    }
}
