//! Portal authentication and user registration

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{ActivePatch, NewUser, Role, SessionUser, User, UserClaims},
        Entity,
        Filter,
    },
    repository::Repository,
};

/// Login request: the portal also asks which role the user is signing in as
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Role name, case-insensitive
    pub role: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: SessionUser,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Role,
    pub school_id: Option<String>,
    pub branch_id: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by email, expected role and password
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;
        let expected: Role = request.role.parse()?;

        let user = self
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if user.role != expected {
            tracing::info!(email = %request.email, role = %expected, "Login with mismatched role");
            return Err(AppError::Authorization(format!(
                "Access Denied: This user is not a {}",
                expected
            )));
        }
        if !user.active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }
        if !verify_password(&user, &request.password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let expires_in = self.config.jwt_expiration_hours as i64 * 3600;
        let now = self.repository.clock().now().timestamp();
        let session = SessionUser::from(&user);
        let claims = UserClaims {
            sub: user.id.to_string(),
            user: session.clone(),
            exp: now + expires_in,
            iat: now,
        };
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: session,
        })
    }

    /// Decode a bearer token issued by [`AuthService::login`]
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))
    }

    /// Create a user with a hashed password; emails are unique
    pub async fn register_user(&self, user: RegisterUser, actor: Option<&str>) -> AppResult<User> {
        user.validate()?;
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A user with email {} already exists",
                user.email
            )));
        }

        let new_user = NewUser {
            name: user.name,
            email: user.email,
            password_hash: hash_password(&user.password)?,
            role: user.role,
            active: true,
            school_id: user.school_id,
            branch_id: user.branch_id,
        };
        let created: User = self.repository.create_as(&new_user, actor).await?;
        tracing::info!(user_id = %created.id, role = %created.role, "User registered");
        Ok(created)
    }

    /// Every account, newest first
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.list_as(&Filter::new()).await
    }

    /// Enable or disable an account; disabled accounts cannot sign in
    pub async fn set_active(&self, id: &str, active: bool, actor: Option<&str>) -> AppResult<User> {
        let user: User = self
            .repository
            .update_as(id, &ActivePatch { active }, actor)
            .await?;
        tracing::info!(user_id = %user.id, active, "User activation changed");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        self.repository
            .get_as(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim();
        Ok(self
            .repository
            .list_as::<User>(&Filter::new())
            .await?
            .into_iter()
            .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))))
    }
}

/// Replace a plain `password` field on a user record with its hash
///
/// Other resources are left untouched.
pub fn seal_password_field(resource: &str, fields: &mut Map<String, Value>) -> AppResult<()> {
    if resource != User::RESOURCE {
        return Ok(());
    }
    match fields.remove("password") {
        Some(Value::String(password)) if !password.is_empty() => {
            fields.insert("passwordHash".to_string(), Value::String(hash_password(&password)?));
            Ok(())
        }
        Some(_) => Err(AppError::Validation("Password must be a non-empty string".to_string())),
        None => Ok(()),
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let Some(hash) = user.password_hash.as_deref() else {
        return Ok(false);
    };
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
