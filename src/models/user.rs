//! User model, roles and session claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use super::record::{Entity, Id};
use crate::{error::AppError, services::permissions};

pub type UserId = Id<User>;

/// Portal roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
    Librarian,
    Accountant,
    Staff,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Teacher,
        Role::Student,
        Role::Parent,
        Role::Librarian,
        Role::Accountant,
        Role::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
            Role::Parent => "Parent",
            Role::Librarian => "Librarian",
            Role::Accountant => "Accountant",
            Role::Staff => "Staff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    /// Case-insensitive parse of a role name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown role '{}'", s)))
    }
}

// Stored records may spell roles in any case
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Anything that carries a role and can be checked against the permission table
pub trait HasRole {
    fn role(&self) -> Role;
}

/// Stored user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Argon2 PHC string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Entity for User {
    const RESOURCE: &'static str = "users";
}

impl HasRole for User {
    fn role(&self) -> Role {
        self.role
    }
}

impl User {
    /// Case-insensitive match on id or email, or a name substring
    ///
    /// `query` must already be trimmed and lowercased.
    pub fn matches_query(&self, query: &str) -> bool {
        self.id.as_str().to_lowercase() == query
            || self
                .email
                .as_deref()
                .is_some_and(|e| e.to_lowercase() == query)
            || self.name.to_lowercase().contains(query)
    }
}

/// Fields written when a user is registered
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

/// Account details shown on the admin user list
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub active: bool,
    pub school_id: Option<String>,
    pub branch_id: Option<String>,
}

impl From<&User> for UserAccount {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            active: user.active,
            school_id: user.school_id.clone(),
            branch_id: user.branch_id.clone(),
        }
    }
}

/// Patch that enables or disables an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivePatch {
    pub active: bool,
}

/// Authenticated user as exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub school_id: Option<String>,
    pub branch_id: Option<String>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            school_id: user.school_id.clone(),
            branch_id: user.branch_id.clone(),
        }
    }
}

impl HasRole for SessionUser {
    fn role(&self) -> Role {
        self.role
    }
}

/// JWT claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user: SessionUser,
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

    /// Identity recorded in the audit log for this user's mutations
    pub fn actor(&self) -> &str {
        self.user.email.as_deref().unwrap_or(&self.sub)
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// Fail unless the user's role grants `capability`
    pub fn require(&self, capability: &str) -> Result<(), AppError> {
        if permissions::can(Some(&self.user), capability) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Role {} lacks permission '{}'",
                self.user.role, capability
            )))
        }
    }
}

impl HasRole for UserClaims {
    fn role(&self) -> Role {
        self.user.role
    }
}
