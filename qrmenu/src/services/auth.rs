//! Registration, login and token refresh.

use tracing::{info, instrument, warn};

use crate::{
    AppState,
    activity::{ActivityLevel, RequestMeta},
    api::models::{
        auth::{AccessTokenResponse, AuthResponse, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest},
        rules::normalize_email,
        users::CurrentUser,
    },
    auth::password::{self, Argon2Params},
    db::models::users::UserCreateDBRequest,
    errors::{Error, Result},
    types::{Operation, Role, abbrev_uuid},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Create an OWNER account and sign it in
    #[instrument(skip_all)]
    pub async fn register(&self, request: RegisterRequest, meta: &RequestMeta) -> Result<AuthResponse> {
        if !self.state.config.auth.allow_registration {
            return Err(Error::InsufficientPermissions {
                action: Operation::Create,
                resource: "accounts".to_string(),
            });
        }

        request.validate_with_policy(&self.state.config.auth.password)?;

        let email = normalize_email(&request.email);
        if self.state.storage.get_user_by_email(&email).await?.is_some() {
            return Err(Error::Conflict {
                message: "Email already registered".to_string(),
            });
        }

        let password_hash =
            password::hash_blocking(request.password, Argon2Params::from(&self.state.config.auth.password)).await?;

        // A concurrent registration can still win the race; storage reports it as a unique violation
        let user = self
            .state
            .storage
            .create_user(&UserCreateDBRequest {
                email,
                password_hash,
                role: Role::Owner,
            })
            .await?;

        let tokens = self.state.tokens.issue_pair(&CurrentUser::from(&user))?;

        info!(user_id = %abbrev_uuid(&user.id), "Registered new owner");
        self.state.activity.record(
            ActivityLevel::Success,
            "User Registration",
            Some(&user.email),
            "New owner account created",
            meta,
        );

        Ok(AuthResponse {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Unknown emails and wrong passwords fail identically
    #[instrument(skip_all)]
    pub async fn login(&self, request: LoginRequest, meta: &RequestMeta) -> Result<AuthResponse> {
        let email = normalize_email(&request.email);

        let verified = match self.state.storage.get_user_by_email(&email).await? {
            Some(user) => {
                let ok = password::verify_blocking(request.password, user.password_hash.clone()).await?;
                ok.then_some(user)
            }
            None => {
                // Spend the same Argon2 cost as a real verification
                let params = Argon2Params::from(&self.state.config.auth.password);
                if let Err(e) = password::hash_blocking(request.password, params).await {
                    warn!(error = %e, "Equalizing hash failed");
                }
                None
            }
        };

        let Some(user) = verified else {
            warn!("Failed login attempt");
            self.state
                .activity
                .record(ActivityLevel::Warning, "Failed Login", Some(&email), "Invalid credentials", meta);
            return Err(Error::Unauthenticated {
                message: Some(INVALID_CREDENTIALS.to_string()),
            });
        };

        let tokens = self.state.tokens.issue_pair(&CurrentUser::from(&user))?;

        self.state
            .activity
            .record(ActivityLevel::Info, "User Login", Some(&user.email), "Signed in", meta);

        Ok(AuthResponse {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Mint a new access token. The refresh token itself is not rotated.
    #[instrument(skip_all)]
    pub async fn refresh(&self, request: RefreshRequest) -> Result<AccessTokenResponse> {
        let claims = self.state.tokens.verify_refresh_token(&request.refresh_token)?;

        // Re-read so that role changes and deletions take effect
        let user = self
            .state
            .storage
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| Error::not_found("User", claims.user_id))?;

        let access_token = self.state.tokens.issue_access_token(&CurrentUser::from(&user))?;
        Ok(AccessTokenResponse { access_token })
    }

    /// Tokens are stateless; the client discards them
    pub fn logout(&self) -> MessageResponse {
        MessageResponse {
            message: "Logged out successfully".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_state, create_test_state_with};

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login_with_different_case() {
        let state = create_test_state();
        let service = AuthService::new(&state);
        let meta = RequestMeta::default();

        let registered = service
            .register(register_request("  Owner@Example.COM ", "Sup3r$ecret"), &meta)
            .await
            .unwrap();
        assert_eq!(registered.user.email, "owner@example.com");
        assert_eq!(registered.user.role, Role::Owner);

        let logged_in = service
            .login(login_request("OWNER@example.com", "Sup3r$ecret"), &meta)
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let claims = state.tokens.verify_access_token(&logged_in.access_token).unwrap();
        assert_eq!(claims.user_id, registered.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let state = create_test_state();
        let service = AuthService::new(&state);
        let meta = RequestMeta::default();

        service.register(register_request("dup@example.com", "Sup3r$ecret"), &meta).await.unwrap();
        let err = service
            .register(register_request("DUP@example.com", "Sup3r$ecret"), &meta)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(err.user_message(), "Email already registered");
    }

    #[tokio::test]
    async fn test_weak_password_lists_every_rule() {
        let state = create_test_state();
        let err = AuthService::new(&state)
            .register(register_request("weak@example.com", "short"), &RequestMeta::default())
            .await
            .unwrap_err();

        match err {
            Error::Validation { details } => {
                assert!(details.iter().all(|d| d.field == "password"));
                assert!(details.iter().any(|d| d.message == "Password must be at least 8 characters"));
                assert!(details.iter().any(|d| d.message.contains("uppercase")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_registration_can_be_disabled() {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let state = create_test_state_with(config);

        let err = AuthService::new(&state)
            .register(register_request("new@example.com", "Sup3r$ecret"), &RequestMeta::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let state = create_test_state();
        let service = AuthService::new(&state);
        let meta = RequestMeta::default();
        service.register(register_request("real@example.com", "Sup3r$ecret"), &meta).await.unwrap();

        let wrong_password = service
            .login(login_request("real@example.com", "Wr0ng$ecret"), &meta)
            .await
            .unwrap_err();
        let unknown = service
            .login(login_request("ghost@example.com", "Sup3r$ecret"), &meta)
            .await
            .unwrap_err();

        assert_eq!(wrong_password.user_message(), INVALID_CREDENTIALS);
        assert_eq!(unknown.user_message(), INVALID_CREDENTIALS);
        assert_eq!(wrong_password.status_code(), unknown.status_code());

        let failures = state.activity.recent(10);
        assert_eq!(failures.iter().filter(|e| e.level == ActivityLevel::Warning).count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_email_costs_a_hash() {
        // Production hashing cost so the difference is measurable
        let mut config = create_test_config();
        config.auth.password = crate::config::PasswordConfig::default();
        let state = create_test_state_with(config);
        let service = AuthService::new(&state);
        let meta = RequestMeta::default();
        service.register(register_request("real@example.com", "Sup3r$ecret"), &meta).await.unwrap();

        let started = std::time::Instant::now();
        service.login(login_request("real@example.com", "Wr0ng$ecret"), &meta).await.unwrap_err();
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        service.login(login_request("ghost@example.com", "Wr0ng$ecret"), &meta).await.unwrap_err();
        let unknown = started.elapsed();

        assert!(
            unknown * 4 >= wrong_password,
            "unknown email took {unknown:?}, wrong password took {wrong_password:?}"
        );
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token() {
        let state = create_test_state();
        let service = AuthService::new(&state);
        let registered = service
            .register(register_request("fresh@example.com", "Sup3r$ecret"), &RequestMeta::default())
            .await
            .unwrap();

        let refreshed = service
            .refresh(RefreshRequest {
                refresh_token: registered.refresh_token.clone(),
            })
            .await
            .unwrap();
        assert!(state.tokens.verify_access_token(&refreshed.access_token).is_ok());

        // An access token is not a refresh token
        let err = service
            .refresh(RefreshRequest {
                refresh_token: registered.access_token,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_refresh_for_missing_user() {
        let state = create_test_state();
        let ghost = CurrentUser {
            id: uuid::Uuid::new_v4(),
            email: "ghost@example.com".to_string(),
            role: Role::Owner,
        };
        let refresh_token = state.tokens.issue_refresh_token(&ghost).unwrap();

        let err = AuthService::new(&state)
            .refresh(RefreshRequest { refresh_token })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "User not found");
    }
}
