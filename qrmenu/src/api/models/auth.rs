//! API request/response models for registration, login and token refresh.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use super::users::UserResponse;
use crate::{auth::password, config::PasswordConfig};

/// Password strength depends on the configured policy, see [`RegisterRequest::validate_with_policy`].
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "owner@example.com")]
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Field rules plus every password strength violation, reported together
    pub fn validate_with_policy(&self, policy: &PasswordConfig) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        for message in password::strength_violations(&self.password, policy) {
            errors.add("password", ValidationError::new("strength").with_message(message.into()));
        }

        if errors.errors().is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "owner@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Returned on registration and login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_reports_email_and_password_together() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "weak".to_string(),
        };

        let errors = request.validate_with_policy(&PasswordConfig::default()).unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields["password"].len() > 1);
    }

    #[test]
    fn test_strong_password_and_valid_email_pass() {
        let request = RegisterRequest {
            email: "owner@example.com".to_string(),
            password: "Sup3r$ecret".to_string(),
        };
        assert!(request.validate_with_policy(&PasswordConfig::default()).is_ok());
    }
}
