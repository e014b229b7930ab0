//! User model, JWT claims and the per-request caller identity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Role granted to every registered user
pub const ROLE_USER: &str = "USER";

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub firstname: String,
    pub lastname: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub account_locked: bool,
    pub enabled: bool,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// Fields of a user about to be inserted
#[derive(Debug, Clone)]
pub struct NewUser {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    /// Already hashed
    pub password_hash: String,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegistrationRequest {
    #[validate(length(min = 1, message = "Firstname is mandatory"))]
    pub firstname: String,
    #[validate(length(min = 1, message = "Lastname is mandatory"))]
    pub lastname: String,
    #[validate(email(message = "Email is not well formatted"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password should be 8 characters long minimum"))]
    pub password: String,
}

impl RegistrationRequest {
    pub fn trimmed(self) -> Self {
        Self {
            firstname: self.firstname.trim().to_string(),
            lastname: self.lastname.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password,
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AuthenticationRequest {
    #[validate(email(message = "Email is not well formatted"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password should be 8 characters long minimum"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticationResponse {
    pub token: String,
    pub token_type: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// User email
    pub sub: String,
    pub user_id: i32,
    pub full_name: String,
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// Identity of the caller of one request, passed explicitly to every service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("Role {} required", role)))
        }
    }

    /// Every book and feedback operation requires a registered user
    pub fn require_user(&self) -> Result<(), AppError> {
        self.require_role(ROLE_USER)
    }
}

impl From<UserClaims> for Identity {
    fn from(claims: UserClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.sub,
            full_name: claims.full_name,
            roles: claims.roles,
        }
    }
}
