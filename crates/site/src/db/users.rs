//! Back-office user accounts, stored as one JSON array.

use chrono::{DateTime, Utc};

use angeli_core::{Email, UserId};

use super::{CollectionRepository, RepositoryError, StoredCollection};
use crate::models::user::{StoredUser, UserPatch};
use crate::store::KvStore;

/// Conflict message for an email already held by another account.
pub const EMAIL_TAKEN: &str = "Email déjà utilisé";

/// Refusal message when a change would leave no active admin.
pub const LAST_ADMIN: &str = "Au moins un administrateur actif est requis";

fn ensure_other_admin(users: &[StoredUser], id: UserId) -> Result<(), RepositoryError> {
    if users.iter().any(|u| u.id != id && u.is_active_admin()) {
        Ok(())
    } else {
        Err(RepositoryError::Invalid(LAST_ADMIN.to_string()))
    }
}

impl StoredCollection for StoredUser {
    const KEY: &'static str = "av:admin:users";

    fn defaults() -> Vec<Self> {
        Vec::new()
    }
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    users: CollectionRepository<'a, StoredUser>,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a KvStore) -> Self {
        Self {
            users: CollectionRepository::new(store),
        }
    }

    /// All accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    /// Returns `RepositoryError::DataCorruption` if the stored list is invalid.
    pub async fn list(&self) -> Result<Vec<StoredUser>, RepositoryError> {
        self.users.load().await
    }

    /// Number of accounts. Zero means the site is not initialized yet.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list`].
    pub async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.list().await?.len())
    }

    /// # Errors
    ///
    /// Same as [`Self::list`].
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<StoredUser>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|u| &u.email == email))
    }

    /// # Errors
    ///
    /// Same as [`Self::list`].
    pub async fn get(&self, id: UserId) -> Result<Option<StoredUser>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|u| u.id == id))
    }

    /// Add an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    pub async fn create(&self, user: StoredUser) -> Result<StoredUser, RepositoryError> {
        self.users
            .modify(move |users| {
                if users.iter().any(|u| u.email == user.email) {
                    return Err(RepositoryError::Conflict(format!("email {} already exists", user.email)));
                }
                users.insert(0, user.clone());
                Ok(user)
            })
            .await
    }

    /// Add the first account, only while none exist.
    ///
    /// The emptiness check and the insert happen under one lock, so two
    /// concurrent bootstrap requests cannot both succeed in this process.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any account already exists.
    pub async fn create_first(&self, user: StoredUser) -> Result<StoredUser, RepositoryError> {
        self.users
            .modify(move |users| {
                if !users.is_empty() {
                    return Err(RepositoryError::Conflict("already initialized".to_string()));
                }
                users.push(user.clone());
                Ok(user)
            })
            .await
    }

    /// Apply an admin edit, optionally replacing the password hash.
    ///
    /// The email uniqueness check and the last-admin check run under the
    /// same lock as the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this id.
    /// Returns `RepositoryError::Conflict` if another account uses the new email.
    /// Returns `RepositoryError::Invalid` if no active admin would remain.
    pub async fn update(
        &self,
        id: UserId,
        patch: UserPatch,
        password_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StoredUser, RepositoryError> {
        self.users
            .modify(move |users| {
                if let Some(email) = &patch.email
                    && users.iter().any(|u| u.id != id && &u.email == email)
                {
                    return Err(RepositoryError::Conflict(EMAIL_TAKEN.to_string()));
                }
                let current = users
                    .iter()
                    .find(|u| u.id == id)
                    .ok_or(RepositoryError::NotFound)?;

                let mut user = current.clone();
                patch.apply(&mut user, now);
                if let Some(hash) = password_hash {
                    user.password_hash = hash;
                }
                if current.is_active_admin() && !user.is_active_admin() {
                    ensure_other_admin(users, id)?;
                }

                if let Some(slot) = users.iter_mut().find(|u| u.id == id) {
                    *slot = user.clone();
                }
                Ok(user)
            })
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this id.
    /// Returns `RepositoryError::Invalid` if it is the last active admin.
    pub async fn remove(&self, id: UserId) -> Result<StoredUser, RepositoryError> {
        self.users
            .modify(move |users| {
                let pos = users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                if users.iter().any(|u| u.id == id && u.is_active_admin()) {
                    ensure_other_admin(users, id)?;
                }
                Ok(users.remove(pos))
            })
            .await
    }

    /// Replace the password hash of an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this email.
    pub async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let email = email.clone();
        self.users
            .modify(move |users| {
                let user = users
                    .iter_mut()
                    .find(|u| u.email == email)
                    .ok_or(RepositoryError::NotFound)?;
                user.password_hash = password_hash;
                user.updated_at = now;
                Ok(())
            })
            .await
    }
}
