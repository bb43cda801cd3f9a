//! Management plane bearer token

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the token carries no usable expiry at all.
const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Claims we read out of the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BearerClaims {
    /// Expiration timestamp
    pub exp: i64,
}

/// Bearer token for the management plane.
///
/// The raw string is passed through verbatim on every request; the expiry
/// is tracked only so callers can tell when a session has gone stale.
#[derive(Debug, Clone)]
pub struct BearerToken {
    /// Raw token string
    pub raw: String,

    /// Expiration timestamp
    pub exp: i64,
}

impl BearerToken {
    /// Build a token from a token-endpoint response.
    ///
    /// The token's own `exp` claim wins when it decodes as a JWT; opaque
    /// tokens fall back to the lifetime advertised next to them.
    /// Note: this does NOT validate the signature, only reads the claims.
    pub fn from_response(raw: String, expires_in: Option<u64>) -> Self {
        let exp = decode_exp(&raw).unwrap_or_else(|| {
            Utc::now().timestamp() + expires_in.unwrap_or(DEFAULT_LIFETIME_SECS) as i64
        });
        Self { raw, exp }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp();
        self.exp < now
    }

    /// Check if the token expires within the given number of seconds
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = Utc::now().timestamp();
        self.exp < now + seconds
    }

    /// Get expiration time
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

fn decode_exp(raw: &str) -> Option<i64> {
    // Decode without validation to extract claims; the management plane
    // is the party that actually verifies the token
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<BearerClaims>(raw, &DecodingKey::from_secret(b""), &validation)
        .ok()
        .map(|data| data.claims.exp)
}
