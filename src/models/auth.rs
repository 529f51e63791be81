//! Login, signup and token wire types.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ClientError, Result};
use crate::models::{CredentialPair, UserIdentity};

const FILL_ALL_FIELDS: &str = "Please fill in all fields";

/// Body of `POST /users/login`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(max = 50, message = "Username must be at most 50 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl LoginRequest {
    /// Build a login request, applying the same checks as the login form.
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let request = Self {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        if request.username.is_empty() || request.password.is_empty() {
            return Err(ClientError::Validation(FILL_ALL_FIELDS.to_string()));
        }
        request.validate()?;
        Ok(request)
    }
}

/// Signup form as entered by the user, including the confirmation field.
#[derive(Debug, Clone, Validate)]
pub struct SignupForm {
    #[validate(length(max = 50, message = "Username must be at most 50 characters"))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Check the form and turn it into the registration body.
    pub fn into_request(self) -> Result<RegisterRequest> {
        if self.password != self.confirm_password {
            return Err(ClientError::Validation("Passwords do not match".to_string()));
        }
        if self.username.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty()
        {
            return Err(ClientError::Validation(FILL_ALL_FIELDS.to_string()));
        }
        self.validate()?;
        Ok(RegisterRequest {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        })
    }
}

/// Body of `POST /users/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User record returned by a successful registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of `POST /users/refresh`.
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response of both the login and the refresh endpoint.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserIdentity,
}

impl From<TokenResponse> for CredentialPair {
    fn from(response: TokenResponse) -> Self {
        CredentialPair {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            user: response.user,
        }
    }
}
