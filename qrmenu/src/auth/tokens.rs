//! JWT access and refresh token issuance and verification.
//!
//! Access and refresh tokens are signed with two different secrets, so neither kind of token
//! verifies as the other. Each token embeds a random `tokenId`, which makes two tokens minted for
//! the same identity in the same second distinguishable. Tokens are stateless and are never
//! revoked server-side.

use std::{fmt, time::Duration};

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::models::users::CurrentUser,
    config::AuthConfig,
    errors::Error,
    types::{Role, UserId},
};

/// Claims carried by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub token_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl From<TokenClaims> for CurrentUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Why a token was rejected. Expired and invalid are kept apart so clients know whether a
/// refresh is worth attempting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Expired(TokenKind),
    Invalid(TokenKind),
    /// Key or crypto failure on our side
    Internal(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Expired(TokenKind::Access) => write!(f, "Access token expired"),
            TokenError::Expired(TokenKind::Refresh) => write!(f, "Refresh token expired"),
            TokenError::Invalid(kind) => write!(f, "Invalid {kind} token"),
            TokenError::Internal(message) => write!(f, "JWT processing failed: {message}"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<TokenError> for Error {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Internal(message) => Error::Internal {
                operation: format!("verify JWT: {message}"),
            },
            rejected => Error::Unauthenticated {
                message: Some(rejected.to_string()),
            },
        }
    }
}

/// Access and refresh token pair returned on login and registration
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies access and refresh tokens. One instance per process, injected through
/// [`crate::AppState`].
#[derive(Clone)]
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(access_secret: &str, refresh_secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens are rejected strictly after `exp`
        validation.leeway = 0;

        Self {
            access: SigningKeys::new(access_secret, access_ttl),
            refresh: SigningKeys::new(refresh_secret, refresh_ttl),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, Error> {
        let access_secret = config.jwt_secret.as_deref().ok_or_else(|| Error::Internal {
            operation: "build token service: auth.jwt_secret is required".to_string(),
        })?;
        let refresh_secret = config.jwt_refresh_secret.as_deref().ok_or_else(|| Error::Internal {
            operation: "build token service: auth.jwt_refresh_secret is required".to_string(),
        })?;

        Ok(Self::new(
            access_secret,
            refresh_secret,
            config.access_token_expiry,
            config.refresh_token_expiry,
        ))
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn issue(&self, user: &CurrentUser, kind: TokenKind) -> Result<String, Error> {
        let keys = self.keys(kind);
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            token_id: Uuid::new_v4(),
            iat: now,
            exp: now + keys.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| Error::Internal {
            operation: format!("create {kind} JWT: {e}"),
        })
    }

    pub fn issue_access_token(&self, user: &CurrentUser) -> Result<String, Error> {
        self.issue(user, TokenKind::Access)
    }

    pub fn issue_refresh_token(&self, user: &CurrentUser) -> Result<String, Error> {
        self.issue(user, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, user: &CurrentUser) -> Result<TokenPair, Error> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user)?,
        })
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError> {
        let keys = self.keys(kind);

        decode::<TokenClaims>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired(kind),

                // Client errors - malformed tokens, bad signatures, invalid claims
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidSubject
                | ErrorKind::ImmatureSignature
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::InvalidAlgorithm => TokenError::Invalid(kind),

                // Server errors - key issues, internal failures
                ErrorKind::InvalidEcdsaKey
                | ErrorKind::InvalidRsaKey(_)
                | ErrorKind::RsaFailedSigning
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat
                | ErrorKind::MissingAlgorithm
                | ErrorKind::Crypto(_) => TokenError::Internal(e.to_string()),

                _ => TokenError::Internal(format!("unknown error: {e}")),
            })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &str = "access-secret-for-tests-0123456789abcdef";
    const REFRESH_SECRET: &str = "refresh-secret-for-tests-0123456789abcdef";

    fn service() -> TokenService {
        TokenService::new(ACCESS_SECRET, REFRESH_SECRET, Duration::from_secs(900), Duration::from_secs(604800))
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            role: Role::Owner,
        }
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let service = service();
        let user = user();

        let token = service.issue_access_token(&user).unwrap();
        let claims = service.verify_access_token(&token).unwrap();

        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_refresh_token_lifetime() {
        let service = service();
        let pair = service.issue_pair(&user()).unwrap();

        let claims = service.verify_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(claims.exp - claims.iat, 604800);
    }

    #[test]
    fn test_tokens_for_same_identity_are_distinct() {
        let service = service();
        let user = user();

        let first = service.issue_access_token(&user).unwrap();
        let second = service.issue_access_token(&user).unwrap();
        assert_ne!(first, second);

        let a = service.verify_access_token(&first).unwrap();
        let b = service.verify_access_token(&second).unwrap();
        assert_ne!(a.token_id, b.token_id);
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let service = service();
        let pair = service.issue_pair(&user()).unwrap();

        assert_eq!(
            service.verify_access_token(&pair.refresh_token).unwrap_err(),
            TokenError::Invalid(TokenKind::Access)
        );
        assert_eq!(
            service.verify_refresh_token(&pair.access_token).unwrap_err(),
            TokenError::Invalid(TokenKind::Refresh)
        );
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let service = service();
        let user = user();

        // Manually create an expired token by setting exp in the past
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            token_id: Uuid::new_v4(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(ACCESS_SECRET.as_bytes())).unwrap();

        let err = service.verify_access_token(&token).unwrap_err();
        assert_eq!(err, TokenError::Expired(TokenKind::Access));
        assert_eq!(err.to_string(), "Access token expired");

        let api_error: Error = err.into();
        assert!(matches!(
            api_error,
            Error::Unauthenticated { message: Some(ref m) } if m == "Access token expired"
        ));
    }

    #[test]
    fn test_short_ttl_expires_after_deadline() {
        let service = TokenService::new(ACCESS_SECRET, REFRESH_SECRET, Duration::from_secs(1), Duration::from_secs(60));
        let token = service.issue_access_token(&user()).unwrap();

        // Valid until expiry
        assert!(service.verify_access_token(&token).is_ok());

        std::thread::sleep(Duration::from_millis(2100));
        assert_eq!(
            service.verify_access_token(&token).unwrap_err(),
            TokenError::Expired(TokenKind::Access)
        );
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let service = service();

        for token in ["not.a.token", "invalid", "", "too.many.parts.in.this.token"] {
            let err = service.verify_access_token(token).unwrap_err();
            assert_eq!(err, TokenError::Invalid(TokenKind::Access), "token: {token}");
            assert_eq!(err.to_string(), "Invalid access token");
        }
    }

    #[test]
    fn test_from_config_requires_secrets() {
        let config = AuthConfig::default();
        assert!(matches!(TokenService::from_config(&config), Err(Error::Internal { .. })));
    }
}
