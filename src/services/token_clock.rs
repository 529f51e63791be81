// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Expiry arithmetic for access tokens.
//!
//! Tokens are decoded WITHOUT verifying their signature. The result is only
//! used to decide when to renew; whether a token is actually valid is
//! decided by the backend alone.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Claims the client reads from an access token.
///
/// All three are required; a token lacking any of them is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Username
    pub sub: String,
    pub user_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

fn scheduling_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    // Expiry is compared by the caller against its own clock.
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = ["exp", "sub"].iter().map(|c| c.to_string()).collect();
    validation
}

/// Decode the claims of `raw` without checking its signature.
pub fn decode_claims(raw: &str) -> Result<TokenClaims> {
    let key = DecodingKey::from_secret(&[]);
    decode::<TokenClaims>(raw, &key, &scheduling_validation())
        .map(|data| data.claims)
        .map_err(|e| ClientError::MalformedToken(e.to_string()))
}

/// Expiry of `raw` as Unix seconds.
pub fn expiry_of(raw: &str) -> Result<i64> {
    decode_claims(raw).map(|claims| claims.exp)
}

/// Whether `raw` is expired at `now` (Unix seconds). No tolerance: `now >= exp` is expired.
pub fn is_expired(raw: &str, now: i64) -> Result<bool> {
    Ok(now >= expiry_of(raw)?)
}

/// Seconds left before `raw` expires; negative once it has.
pub fn seconds_until_expiry(raw: &str, now: i64) -> Result<i64> {
    Ok(expiry_of(raw)?.saturating_sub(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint<T: Serialize>(claims: &T) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(b"backend-only-secret"),
        )
        .unwrap()
    }

    #[test]
    fn reads_expiry_without_the_signing_key() {
        let token = mint(&TokenClaims {
            sub: "alex".into(),
            user_id: 7,
            exp: 1_900_000_000,
        });
        assert_eq!(expiry_of(&token).unwrap(), 1_900_000_000);
        assert_eq!(decode_claims(&token).unwrap().user_id, 7);
    }

    #[test]
    fn expiry_comparison_has_zero_tolerance() {
        let token = mint(&TokenClaims {
            sub: "alex".into(),
            user_id: 7,
            exp: 1_000,
        });
        assert!(!is_expired(&token, 999).unwrap());
        assert!(is_expired(&token, 1_000).unwrap());
        assert_eq!(seconds_until_expiry(&token, 400).unwrap(), 600);
    }

    #[test]
    fn extreme_expiry_saturates() {
        let token = mint(&TokenClaims {
            sub: "alex".into(),
            user_id: 7,
            exp: i64::MIN,
        });
        assert_eq!(seconds_until_expiry(&token, 1_000).unwrap(), i64::MIN);
        assert!(is_expired(&token, 0).unwrap());
    }

    #[test]
    fn missing_user_id_is_malformed() {
        #[derive(Serialize)]
        struct Partial {
            sub: String,
            exp: i64,
        }
        let token = mint(&Partial {
            sub: "alex".into(),
            exp: 1_900_000_000,
        });
        assert!(matches!(
            expiry_of(&token),
            Err(ClientError::MalformedToken(_))
        ));
    }

    #[test]
    fn missing_exp_is_malformed() {
        #[derive(Serialize)]
        struct NoExp {
            sub: String,
            user_id: i64,
        }
        let token = mint(&NoExp {
            sub: "alex".into(),
            user_id: 7,
        });
        assert!(expiry_of(&token).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            expiry_of("not-a-token"),
            Err(ClientError::MalformedToken(_))
        ));
        assert!(expiry_of("").unwrap_err().is_session_terminal());
    }
}
