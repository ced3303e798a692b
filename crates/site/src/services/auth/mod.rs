//! Authentication service.
//!
//! Provides password login, first-admin bootstrap, password reset and
//! token checks for back-office accounts.

mod error;
pub mod password;
pub mod tokens;

pub use error::AuthError;
pub use password::{hash_password, validate_password, verify_password};
pub use tokens::{Claims, TokenError, TokenKind, TokenSigner};

use chrono::{DateTime, Utc};

use angeli_core::{Email, Role};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::StoredUser;
use crate::store::KvStore;

/// Hash compared against when the account does not exist, so unknown and
/// known emails take the same time to reject.
const UNKNOWN_ACCOUNT_HASH: &str = "$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// Who a successful login belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
    pub email: Email,
    pub role: Role,
    pub name: String,
    /// Hash to put in the admin-record cookie, when enabled.
    pub password_hash: String,
}

impl From<StoredUser> for LoggedIn {
    fn from(user: StoredUser) -> Self {
        Self {
            email: user.email,
            role: user.role,
            name: user.name,
            password_hash: user.password_hash,
        }
    }
}

/// Admin account remembered in the client-side fallback cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecord {
    pub email: Email,
    pub password_hash: String,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub password: &'r str,
    pub role: Role,
    pub active: bool,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    signer: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a KvStore, signer: &'a TokenSigner) -> Self {
        Self {
            users: UserRepository::new(store),
            signer,
        }
    }

    /// Check an email and password.
    ///
    /// `admin_record` is the fallback cookie, consulted only while the store
    /// holds no accounts at all.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong password.
    /// Returns `AuthError::AccountDisabled` if the password matches a deactivated account.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        admin_record: Option<&str>,
    ) -> Result<LoggedIn, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let users = self.users.list().await?;
        if let Some(user) = users.iter().find(|u| u.email == email) {
            if !verify_password(password, &user.password_hash).await {
                return Err(AuthError::InvalidCredentials);
            }
            if !user.active {
                return Err(AuthError::AccountDisabled);
            }
            return Ok(user.clone().into());
        }

        if users.is_empty()
            && let Some(record) = admin_record.and_then(|token| self.admin_record(token))
            && record.email == email
        {
            if verify_password(password, &record.password_hash).await {
                tracing::info!(email = %email, "Login accepted from admin-record cookie");
                return Ok(LoggedIn {
                    email: record.email,
                    role: Role::Admin,
                    name: String::new(),
                    password_hash: record.password_hash,
                });
            }
            return Err(AuthError::InvalidCredentials);
        }

        let _ = verify_password(password, UNKNOWN_ACCOUNT_HASH).await;
        Err(AuthError::InvalidCredentials)
    }

    /// Validate an account request, returning the normalized email.
    fn check_new_account(account: &NewAccount<'_>) -> Result<Email, AuthError> {
        if account.name.trim().is_empty() || account.email.trim().is_empty() || account.password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        let email = Email::parse(account.email)?;
        validate_password(account.password)?;
        Ok(email)
    }

    /// Create the first account. Its role is always admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyInitialized` if any account exists.
    /// Returns validation errors for blank fields, a bad email or a short password.
    pub async fn bootstrap(&self, account: &NewAccount<'_>, now: DateTime<Utc>) -> Result<StoredUser, AuthError> {
        let email = Self::check_new_account(account)?;
        let hash = hash_password(account.password).await?;
        let user = StoredUser::new(account.name.trim().to_string(), email, Role::Admin, hash, now);
        self.users.create_first(user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::AlreadyInitialized,
            other => AuthError::Repository(other),
        })
    }

    /// Create an additional account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository(RepositoryError::Conflict)` if the email is taken.
    pub async fn create_account(&self, account: &NewAccount<'_>, now: DateTime<Utc>) -> Result<StoredUser, AuthError> {
        let email = Self::check_new_account(account)?;
        let hash = hash_password(account.password).await?;
        let mut user = StoredUser::new(account.name.trim().to_string(), email, account.role, hash, now);
        user.active = account.active;
        Ok(self.users.create(user).await?)
    }

    /// Issue a reset token for an active account.
    ///
    /// Returns `None` when there is nothing to send; callers must answer the
    /// same way in both cases.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store cannot be read.
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(StoredUser, String)>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.find_by_email(&email).await? else {
            return Ok(None);
        };
        if !user.active {
            return Ok(None);
        }
        let token = self
            .signer
            .issue_reset(user.email.as_str(), now)
            .map_err(AuthError::Signing)?;
        Ok(Some((user, token)))
    }

    /// Set a new password from a reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for a short password.
    /// Returns `AuthError::InvalidToken` for a bad, expired or non-reset token.
    /// Returns `AuthError::AccountNotFound` if the account was removed.
    pub async fn reset_password(&self, token: &str, password: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        validate_password(password)?;
        let claims = self
            .signer
            .verify_at(token, TokenKind::Reset, now)
            .map_err(AuthError::InvalidToken)?;
        let email = Email::parse(&claims.sub).map_err(|_| AuthError::InvalidToken(TokenError::Malformed))?;
        let hash = hash_password(password).await?;
        self.users
            .set_password_hash(&email, hash, now)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::AccountNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Claims of a valid session token.
    #[must_use]
    pub fn session(&self, token: &str) -> Option<Claims> {
        match self.signer.verify(token, TokenKind::Session) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!(error = %e, "Session token refused");
                None
            }
        }
    }

    /// Decode a valid admin-record token.
    #[must_use]
    pub fn admin_record(&self, token: &str) -> Option<AdminRecord> {
        let claims = self.signer.verify(token, TokenKind::AdminRecord).ok()?;
        let email = Email::parse(claims.email.as_deref().unwrap_or(&claims.sub)).ok()?;
        let password_hash = claims.password_hash.filter(|h| !h.is_empty())?;
        Some(AdminRecord { email, password_hash })
    }
}
