// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential pair and the identity projected from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated user as the rest of the application sees it.
///
/// Always taken from the stored pair's `user` record, never from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
}

/// Access token, refresh token and user record. Stored and loaded as a unit.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserIdentity,
}

// Tokens never end up in logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Authentication lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Renewing,
}

impl AuthState {
    /// Renewal happens on behalf of an already authenticated user.
    pub fn is_authenticated(self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Renewing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_tokens() {
        let pair = CredentialPair {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            user: UserIdentity {
                id: 7,
                username: "alex".into(),
            },
        };
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("alex"));
    }
}
