//! Back-office account commands.
//!
//! # Usage
//!
//! ```bash
//! av-cli admin create -e editor@angelivisions.com -n "Editor" -p 'long-password' -r editor
//! av-cli admin list
//! ```

use angeli_core::{Email, Role};
use angeli_site::db::{RepositoryError, UserRepository};
use angeli_site::models::StoredUser;
use angeli_site::services::auth::{AuthError, hash_password, validate_password};
use angeli_site::store::KvStore;
use chrono::Utc;
use thiserror::Error;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, editor, guest")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password rejected or could not be hashed.
    #[error("Password error: {0}")]
    Password(#[from] AuthError),

    /// An account already uses the email.
    #[error("Account already exists with email: {0}")]
    UserExists(String),

    /// Store error.
    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create an account directly in the store.
///
/// Unlike the API, this works whether or not accounts already exist.
///
/// # Errors
///
/// Returns an error for an invalid role, email or password, a taken email,
/// or an unreachable store.
pub async fn create_user(
    store: &KvStore,
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<StoredUser, AdminError> {
    let role: Role = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    validate_password(password)?;
    let hash = hash_password(password).await?;

    tracing::info!("Creating account: {} ({})", email, role);

    let user = StoredUser::new(name.trim().to_owned(), email.clone(), role, hash, Utc::now());
    let user = UserRepository::new(store)
        .create(user)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user)
}

/// Log every account with its role and status.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn list_users(store: &KvStore) -> Result<(), AdminError> {
    let users = UserRepository::new(store).list().await?;
    if users.is_empty() {
        tracing::info!("No accounts yet; the first one can be created from /admin");
    }
    for user in &users {
        tracing::info!(
            id = %user.id,
            email = %user.email,
            role = %user.role,
            active = user.active,
            "{}",
            user.name
        );
    }
    Ok(())
}
