use argon2::{
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use sha2::{Digest, Sha256};

// =============================================================================
// Session Tokens
// =============================================================================

/// Generate a fresh bearer token (32 random bytes, hex-encoded)
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Hash a bearer token for storage
///
/// Only the hash is persisted, so a database leak does not expose live
/// sessions.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Passwords
// =============================================================================

/// Argon2id keyed with the server pepper
///
/// The pepper lives in the environment, never in the database.
fn argon2(pepper: &str) -> Result<Argon2<'_>, argon2::Error> {
    Argon2::new_with_secret(
        pepper.as_bytes(),
        Algorithm::Argon2id,
        Version::V0x13,
        Params::default(),
    )
}

/// Hash a password into a PHC string (`$argon2id$...`)
///
/// The random salt and the cost parameters are embedded in the result.
pub fn hash_password(password: &str, pepper: &str) -> Result<String, PasswordHashError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let hasher = argon2(pepper).map_err(PasswordHashError::from)?;
    Ok(hasher.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, pepper: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    match argon2(pepper) {
        Ok(hasher) => hasher
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Failed to set up password hasher: {}", e);
            false
        }
    }
}
