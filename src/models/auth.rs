//! Authentication claims and caller identity

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::member::Member;

/// Opaque identity of the authenticated caller, handed to every lending call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CallerIdentity {
    pub member_id: i32,
    pub email: String,
    pub name: String,
}

impl From<&Member> for CallerIdentity {
    fn from(member: &Member) -> Self {
        Self {
            member_id: member.id,
            email: member.email.clone(),
            name: member.name.clone(),
        }
    }
}

/// JWT Claims for authenticated members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub member_id: i32,
    pub email: String,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(identity: &CallerIdentity, issued_at: i64, ttl_seconds: i64) -> Self {
        Self {
            sub: identity.member_id.to_string(),
            member_id: identity.member_id,
            email: identity.email.clone(),
            name: identity.name.clone(),
            exp: issued_at + ttl_seconds,
            iat: issued_at,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a JWT token (signature and expiry)
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity {
            member_id: self.member_id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}
