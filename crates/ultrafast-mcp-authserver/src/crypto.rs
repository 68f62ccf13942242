//! CSPRNG identifier generation and HS256 access-token minting.

use crate::error::{AuthServerError, AuthServerResult};
use crate::models::Claims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::RngCore;

/// Generates `len` random bytes and hex-encodes them (`2 * len` characters).
///
/// Used for session ids and authorization codes (16 bytes, per §3/§4.5/§4.6).
pub fn generate_hex_id(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generates a new refresh token value (UUIDv4, per §3).
pub fn generate_refresh_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The server's HS256 signing key. Constructing one with an empty secret is rejected:
/// an empty secret would make every minted token forgeable.
#[derive(Clone)]
pub struct SigningKey {
    secret: String,
}

impl SigningKey {
    pub fn new(secret: impl Into<String>) -> AuthServerResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthServerError::ServerError(
                "JWT signing secret must not be empty".to_string(),
            ));
        }
        Ok(Self { secret })
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Mints an access token: header `{"alg":"HS256","typ":"JWT"}`, the given claims,
    /// HMAC-SHA256 signature, all base64url without padding.
    pub fn mint_access_token(&self, claims: &Claims) -> AuthServerResult<String> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(self.secret.as_bytes());
        Ok(encode(&header, claims, &key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_id_has_expected_length_and_charset() {
        let id = generate_hex_id(16);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hex_ids_are_unique() {
        assert_ne!(generate_hex_id(16), generate_hex_id(16));
    }

    #[test]
    fn refresh_tokens_are_uuidv4_and_unique() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(SigningKey::new("").is_err());
    }

    #[test]
    fn mints_three_segment_jwt() {
        let key = SigningKey::new("test-secret-value").unwrap();
        let claims = Claims {
            sub: "u1".to_string(),
            scope: "openid".to_string(),
            client_id: "client-x".to_string(),
            iss: "http://localhost:8080".to_string(),
            iat: 1_000_000,
            exp: 1_003_600,
        };
        let token = key.mint_access_token(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }
}
