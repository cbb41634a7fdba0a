//! Signed bearer tokens.
//!
//! Tokens look like `v1.<payload>.<signature>`, where `payload` is the
//! unpadded base64url encoding of the JSON claims `{ sub, role, exp }` and
//! `signature` is the hex HMAC-SHA256 of `v1.<payload>` under the server's
//! token secret. Login lives elsewhere; tokens are minted by the CLI.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use order_tracker_core::{Role, UserId};

use crate::models::Principal;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

/// Errors from verifying or issuing an access token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer` header was sent.
    #[error("missing bearer token")]
    Missing,

    /// The token is not in `v1.<payload>.<signature>` form or its claims do not decode.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not match the payload.
    #[error("invalid token signature")]
    BadSignature,

    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// The HMAC key could not be initialised.
    #[error("signing key rejected: {0}")]
    SigningKey(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    role: Role,
    /// Unix timestamp, seconds.
    exp: i64,
}

/// Issues and verifies access tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer from the shared secret.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| AuthError::SigningKey(e.to_string()))
    }

    fn sign(&self, signing_input: &str) -> Result<String, AuthError> {
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Issue a token for `principal` valid for `ttl` from `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SigningKey` if the HMAC cannot be initialised, or
    /// `AuthError::Malformed` if the claims cannot be encoded.
    pub fn issue(
        &self,
        principal: Principal,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: principal.user_id,
            role: principal.role,
            exp: (now + ttl).timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let signing_input = format!("{TOKEN_VERSION}.{}", URL_SAFE_NO_PAD.encode(json));
        let signature = self.sign(&signing_input)?;

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token and return the principal it names.
    ///
    /// The signature is checked before the claims are decoded.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Malformed`, `AuthError::BadSignature`, or
    /// `AuthError::Expired`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let (signing_input, signature) = token
            .trim()
            .rsplit_once('.')
            .ok_or_else(|| AuthError::Malformed("missing signature".to_string()))?;
        let (version, payload) = signing_input
            .split_once('.')
            .ok_or_else(|| AuthError::Malformed("missing payload".to_string()))?;

        if version != TOKEN_VERSION {
            return Err(AuthError::Malformed(format!(
                "unsupported token version '{version}'"
            )));
        }

        let expected = self.sign(signing_input)?;
        if !constant_time_compare(&expected, &signature.to_ascii_lowercase()) {
            return Err(AuthError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        let claims: Claims =
            serde_json::from_slice(&json).map_err(|e| AuthError::Malformed(e.to_string()))?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(Principal::new(claims.sub, claims.role))
    }
}

/// Extract the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns `AuthError::Malformed` unless the value is `Bearer <token>`.
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header_value
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::Malformed("expected 'Bearer <token>'".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::Malformed("expected 'Bearer <token>'".to_string()));
    }

    Ok(token.trim())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
