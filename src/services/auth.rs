//! Authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        auth::{CallerIdentity, Claims},
        member::Member,
    },
    repository::Repository,
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(member: &Member, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&member.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        if config.auth_bypass {
            tracing::warn!(
                "Authentication bypass is enabled; every request acts as member {}",
                config.bypass_identity.member_id
            );
        }
        Self { repository, config }
    }

    /// Check credentials and issue a JWT
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, CallerIdentity)> {
        let invalid = || AppError::Authentication("Invalid email or password".to_string());

        let member = self
            .repository
            .members
            .find_by_email(email)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&member, password)? {
            return Err(invalid());
        }

        let identity = CallerIdentity::from(&member);
        let claims = Claims::new(
            &identity,
            Utc::now().timestamp(),
            self.config.jwt_expiration_hours as i64 * 3600,
        );
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::info!("Member {} logged in", member.id);
        Ok((token, identity))
    }

    /// Resolve the caller from an `Authorization` header value.
    ///
    /// With `auth_bypass` set the configured identity is returned and the
    /// header is not inspected.
    pub fn authenticate(&self, authorization: Option<&str>) -> AppResult<CallerIdentity> {
        if self.config.auth_bypass {
            let fixed = &self.config.bypass_identity;
            return Ok(CallerIdentity {
                member_id: fixed.member_id,
                email: fixed.email.clone(),
                name: fixed.name.clone(),
            });
        }

        let header = authorization
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = Claims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;
        Ok(claims.identity())
    }
}
