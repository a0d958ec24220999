use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error)]
#[error("Could not compute password hash. {0}")]
pub struct PasswordHashError(String);

fn keyed_mac(secret: &str, password: &str) -> Result<HmacSha256, PasswordHashError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| PasswordHashError(e.to_string()))?;
    mac.update(password.as_bytes());
    Ok(mac)
}

/// Hashes a password as the lowercase hex encoding of HMAC-SHA256 keyed with `secret`.
pub fn hash_password(secret: &str, password: &str) -> Result<String, PasswordHashError> {
    let digest = keyed_mac(secret, password)?.finalize().into_bytes();
    Ok(hex::encode(digest))
}

/// Checks `password` against a hash produced by [`hash_password`] in constant time. A stored hash that is not valid
/// hex never matches.
pub fn verify_password(secret: &str, password: &str, hash: &str) -> Result<bool, PasswordHashError> {
    let Ok(expected) = hex::decode(hash) else {
        return Ok(false);
    };
    Ok(keyed_mac(secret, password)?.verify_slice(&expected).is_ok())
}
