//! Password hashing (Argon2id, PHC string format)

use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use subtle::ConstantTimeEq;

use crate::config::PasswordCost;
use crate::error::{LarigotError, Result};

fn hasher(params: Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str, cost: PasswordCost) -> Result<String> {
    let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
        .map_err(|e| LarigotError::PasswordHash(format!("invalid cost: {}", e)))?;
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = hasher(params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| LarigotError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string
///
/// The digest is recomputed with the stored salt and cost, then compared in
/// constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| LarigotError::PasswordHash(format!("stored hash unreadable: {}", e)))?;
    let (Some(salt), Some(expected)) = (parsed.salt, parsed.hash) else {
        return Err(LarigotError::PasswordHash("stored hash has no salt or digest".to_string()));
    };
    let params = Params::try_from(&parsed)
        .map_err(|e| LarigotError::PasswordHash(format!("stored cost unreadable: {}", e)))?;

    let computed = hasher(params.clone())
        .hash_password_customized(password.as_bytes(), None, None, params, salt)
        .map_err(|e| LarigotError::PasswordHash(e.to_string()))?;
    let Some(actual) = computed.hash else {
        return Ok(false);
    };

    Ok(actual.as_bytes().ct_eq(expected.as_bytes()).into())
}
