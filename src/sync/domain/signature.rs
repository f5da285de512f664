//! HMAC-SHA256 signatures for tracker webhook deliveries.

use super::SignatureError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs `body` with `secret`, returning the lowercase hex digest carried in
/// the signature header.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKey`] when the secret cannot key the MAC.
pub fn sign(body: &[u8], secret: &str) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex signature header against `body` signed with `secret`.
///
/// The digest comparison is constant-time. A header that is not valid hex
/// never verifies.
#[must_use]
pub fn verify(signature: &str, body: &[u8], secret: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}
