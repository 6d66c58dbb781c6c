//! Identity service: registration, login and account administration

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{ChangePassword, RegisterUser, UpdateRoles, User, UserClaims, UserQuery},
        Page,
    },
    repository::Repository,
};

/// Issued token and its lifetime in seconds
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Create a reader account
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;
        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(
                &request.email,
                &hash,
                request.display_name.as_deref(),
                false,
                false,
            )
            .await?;

        tracing::info!(user_id = user.id, "Account registered");
        Ok(user)
    }

    /// Authenticate by email and password and return a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(IssuedToken, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user.password_hash, password)? {
            tracing::warn!(user_id = user.id, "Rejected login attempt");
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        self.repository.users.touch_last_login(user.id).await?;
        let token = self.issue_token(&user)?;

        tracing::info!(user_id = user.id, role = %user.role(), "User logged in");
        Ok((token, user))
    }

    /// Create a JWT token for a user
    pub fn issue_token(&self, user: &User) -> AppResult<IssuedToken> {
        let now = Utc::now().timestamp();
        let expires_in = self.config.jwt_expiration_hours as i64 * 3600;

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role(),
            exp: now + expires_in,
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(IssuedToken { token, expires_in })
    }

    /// Change own password after checking the current one
    pub async fn change_password(&self, user_id: i32, request: ChangePassword) -> AppResult<()> {
        request.validate()?;
        let user = self.repository.users.get_by_id(user_id).await?;

        if !verify_password(&user.password_hash, &request.current_password)? {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let hash = hash_password(&request.new_password)?;
        self.repository.users.update_password(user_id, &hash).await?;
        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Create the configured administrator when it does not exist yet
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password)
        else {
            return Ok(());
        };

        if self.repository.users.email_exists(email).await? {
            return Ok(());
        }

        let hash = hash_password(password)?;
        let admin = self
            .repository
            .users
            .create(email, &hash, Some("Administrator"), true, true)
            .await?;
        tracing::info!(user_id = admin.id, "Seeded administrator account {}", email);
        Ok(())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64, Page)> {
        let page = Page::new(query.page, query.per_page);
        let (users, total) = self.repository.users.search(query, page).await?;
        Ok((users, total, page))
    }

    /// Change role flags; administrators cannot remove their own admin flag
    pub async fn update_roles(&self, acting_user_id: i32, id: i32, roles: UpdateRoles) -> AppResult<User> {
        if acting_user_id == id && !roles.is_admin {
            return Err(AppError::BusinessRule(
                "Administrators cannot remove their own admin role".to_string(),
            ));
        }

        let user = self
            .repository
            .users
            .update_roles(id, roles.is_admin, roles.is_staff)
            .await?;
        tracing::info!(user_id = id, role = %user.role(), by = acting_user_id, "Roles updated");
        Ok(user)
    }

    pub async fn delete_user(&self, acting_user_id: i32, id: i32) -> AppResult<()> {
        if acting_user_id == id {
            return Err(AppError::BusinessRule("Administrators cannot delete themselves".to_string()));
        }
        self.repository.users.soft_delete(id).await?;
        tracing::info!(user_id = id, by = acting_user_id, "Account deleted");
        Ok(())
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "wrong horse").unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("secret-pw").unwrap(), hash_password("secret-pw").unwrap());
    }

    #[test]
    fn corrupt_hash_is_an_internal_error() {
        assert!(matches!(
            verify_password("not-a-hash", "x"),
            Err(AppError::Internal(_))
        ));
    }
}
