pub mod access;
pub mod verify;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use access::{decide, AccessDecision, AnyIdentity, DenyReason, OwnerOrManager, OwnershipPredicate, OWNER_FIELD};
pub use verify::{extract_bearer, verify};

/// Roles carried in a signed access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Manager => write!(f, "Manager"),
            Role::Employee => write!(f, "Employee"),
        }
    }
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub roles: BTreeSet<Role>,
    pub session_id: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
        session_id: impl Into<String>,
        expiry_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id: user_id.into(),
            username: username.into(),
            roles: roles.into_iter().collect(),
            session_id: session_id.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Caller identity for the lifetime of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub roles: BTreeSet<Role>,
    pub session_id: String,
}

impl Identity {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            roles: claims.roles,
            session_id: claims.session_id,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer credential was presented
    #[error("Unauthorized")]
    Unauthenticated,

    /// A credential was presented but failed signature or expiry checks
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Token signing secret not configured")]
    MissingSecret,

    #[error("Token generation error: {0}")]
    TokenGeneration(String),
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}
