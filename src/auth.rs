// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Authentication
//!
//! JWT issuance and verification. Access tokens authenticate API calls;
//! refresh tokens can only be exchanged for a new access token.

use crate::constants::defaults::JWT_SECRET_LEN;
use crate::errors::ApiError;
use crate::models::User;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of token carried in the claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims for user authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub username: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    pub token_type: TokenType,
}

/// Identity of the caller of an authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    pub user_id: Uuid,
    pub username: String,
}

/// An access/refresh token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub access_expires_at: DateTime<Utc>,
}

/// Authentication manager for JWT tokens
#[derive(Clone)]
pub struct AuthManager {
    jwt_secret: Vec<u8>,
    token_expiry_hours: i64,
    refresh_expiry_days: i64,
}

impl AuthManager {
    /// Create a new authentication manager
    pub fn new(jwt_secret: Vec<u8>, token_expiry_hours: i64, refresh_expiry_days: i64) -> Self {
        Self {
            jwt_secret,
            token_expiry_hours,
            refresh_expiry_days,
        }
    }

    /// Issue an access and a refresh token for `user`
    pub fn issue_tokens(&self, user: &User) -> Result<TokenPair> {
        let access_expires_at = Utc::now() + Duration::hours(self.token_expiry_hours);
        Ok(TokenPair {
            access: self.encode_token(user.id, &user.username, TokenType::Access, access_expires_at)?,
            refresh: self.encode_token(
                user.id,
                &user.username,
                TokenType::Refresh,
                Utc::now() + Duration::days(self.refresh_expiry_days),
            )?,
            access_expires_at,
        })
    }

    /// Validate an access token and extract claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        self.validate_token(token, TokenType::Access)
    }

    /// Validate a refresh token and extract claims
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims> {
        self.validate_token(token, TokenType::Refresh)
    }

    /// Exchange a valid refresh token for a new access token
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<(String, DateTime<Utc>)> {
        let claims = self.validate_refresh_token(refresh_token)?;
        let user_id = Uuid::parse_str(&claims.sub).context("Invalid user ID in token")?;
        let expires_at = Utc::now() + Duration::hours(self.token_expiry_hours);
        let token = self.encode_token(user_id, &claims.username, TokenType::Access, expires_at)?;
        Ok((token, expires_at))
    }

    /// Resolve the caller from an `Authorization` header value
    ///
    /// Only `Bearer <access token>` is accepted.
    pub fn authenticate_header(&self, auth_header: Option<&str>) -> Result<AuthenticatedCaller, ApiError> {
        let token = auth_header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        let claims = self
            .validate_access_token(token)
            .map_err(|_| ApiError::Unauthenticated)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthenticated)?;

        Ok(AuthenticatedCaller {
            user_id,
            username: claims.username,
        })
    }

    fn encode_token(
        &self,
        user_id: Uuid,
        username: &str,
        token_type: TokenType,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
            token_type,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.jwt_secret),
        )?;

        Ok(token)
    }

    fn validate_token(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.jwt_secret),
            &validation,
        )?;

        if token_data.claims.token_type != expected {
            return Err(anyhow::anyhow!(
                "Expected {:?} token, got {:?}",
                expected,
                token_data.claims.token_type
            ));
        }

        Ok(token_data.claims)
    }
}

/// Generate a random JWT secret
pub fn generate_jwt_secret() -> Result<[u8; JWT_SECRET_LEN]> {
    use ring::rand::{SecureRandom, SystemRandom};

    let rng = SystemRandom::new();
    let mut secret = [0u8; JWT_SECRET_LEN];
    rng.fill(&mut secret)
        .map_err(|_| anyhow::anyhow!("Failed to generate JWT secret"))?;
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user() -> User {
        User::new(
            "tester".to_string(),
            "test@example.com".to_string(),
            "hashed_password_123".to_string(),
        )
    }

    fn create_auth_manager() -> AuthManager {
        let secret = generate_jwt_secret().unwrap().to_vec();
        AuthManager::new(secret, 24, 7)
    }

    #[test]
    fn test_generate_and_validate_token() {
        let auth_manager = create_auth_manager();
        let user = create_test_user();

        let token = auth_manager.issue_tokens(&user).unwrap().access;
        assert!(!token.is_empty());

        let claims = auth_manager.validate_access_token(&token).unwrap();
        assert_eq!(claims.username, "tester");
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let auth_manager = create_auth_manager();
        let user = create_test_user();
        let pair = auth_manager.issue_tokens(&user).unwrap();

        assert!(auth_manager.validate_access_token(&pair.refresh).is_err());
        assert!(auth_manager.validate_refresh_token(&pair.access).is_err());
        assert!(auth_manager.refresh_access_token(&pair.access).is_err());
    }

    #[test]
    fn test_refresh_access_token() {
        let auth_manager = create_auth_manager();
        let user = create_test_user();
        let pair = auth_manager.issue_tokens(&user).unwrap();

        let (access, expires_at) = auth_manager.refresh_access_token(&pair.refresh).unwrap();
        let claims = auth_manager.validate_access_token(&access).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert!(expires_at > Utc::now());
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth_manager = create_auth_manager();
        let user = create_test_user();
        let token = auth_manager
            .encode_token(
                user.id,
                &user.username,
                TokenType::Access,
                Utc::now() - Duration::hours(2),
            )
            .unwrap();

        assert!(auth_manager.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = create_auth_manager();
        let verifier = create_auth_manager();
        let token = issuer.issue_tokens(&create_test_user()).unwrap().access;

        assert!(verifier.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_authenticate_header() {
        let auth_manager = create_auth_manager();
        let user = create_test_user();
        let token = auth_manager.issue_tokens(&user).unwrap().access;

        let header = format!("Bearer {token}");
        let caller = auth_manager.authenticate_header(Some(header.as_str())).unwrap();
        assert_eq!(caller.user_id, user.id);
        assert_eq!(caller.username, "tester");
    }

    #[test]
    fn test_authenticate_header_invalid() {
        let auth_manager = create_auth_manager();

        for header in [None, Some("Invalid header"), Some("Bearer "), Some("Bearer invalid.jwt.token")] {
            let result = auth_manager.authenticate_header(header);
            assert!(matches!(result, Err(ApiError::Unauthenticated)));
        }
    }
}
