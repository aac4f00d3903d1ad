//! Identity types: roles, the acting user, and the bearer token claims
//!
//! Identities are issued by the external identity provider; this crate only
//! decodes the verified `(user_id, role)` pair and trusts it.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }

    /// Librarians and administrators run the back office side of every workflow
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Librarian | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "librarian" => Ok(Role::Librarian),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// The verified user performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn reader(user_id: i32) -> Self {
        Self::new(user_id, Role::Reader)
    }

    pub fn librarian(user_id: i32) -> Self {
        Self::new(user_id, Role::Librarian)
    }

    pub fn admin(user_id: i32) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Require librarian or administrator privileges
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Librarian privileges required".to_string()))
        }
    }

    /// Borrow requests are filed by readers for themselves
    pub fn require_reader(&self) -> Result<(), AppError> {
        if self.role == Role::Reader {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Only readers may request books".to_string()))
        }
    }

    /// Require the actor to be the reader owning the record
    pub fn require_owner(&self, owner_id: i32) -> Result<(), AppError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Only the owning reader may do this".to_string()))
        }
    }

    /// Owner or staff may read a record
    pub fn require_owner_or_staff(&self, owner_id: i32) -> Result<(), AppError> {
        if self.is_staff() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Record belongs to another reader".to_string()))
        }
    }
}

/// JWT claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Encode claims into a signed token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a signed token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}
