//! Back-office user accounts.

use angeli_core::{Email, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record as persisted, including the bcrypt hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "active_by_default")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub password_hash: String,
}

const fn active_by_default() -> bool {
    true
}

impl std::fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredUser")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("active", &self.active)
            .field("password_hash", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StoredUser {
    #[must_use]
    pub fn new(name: String, email: Email, role: Role, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            name,
            email,
            role,
            active: true,
            created_at: now,
            updated_at: now,
            password_hash,
        }
    }

    /// Active account holding the admin role.
    #[must_use]
    pub const fn is_active_admin(&self) -> bool {
        self.active && self.role.is_admin()
    }
}

/// What the API returns for a user. Never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredUser> for PublicUser {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields an admin may change on an existing account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserPatch {
    pub fn apply(self, user: &mut StoredUser, now: DateTime<Utc>) {
        patch_fields!(self => user: name, email, role, active);
        user.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> StoredUser {
        StoredUser::new(
            "Ada".to_string(),
            Email::parse("ada@angelivisions.com").unwrap(),
            Role::Admin,
            "$2b$10$abcdefghijklmnopqrstuv".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_public_projection_has_no_hash() {
        let json = serde_json::to_value(PublicUser::from(&sample())).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["email"], "ada@angelivisions.com");
    }

    #[test]
    fn test_debug_redacts_hash() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("$2b$"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_stored_user_roundtrip_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("passwordHash").is_some());
        assert!(json.get("createdAt").is_some());
        let back: StoredUser = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample_with_id(&back));
    }

    fn sample_with_id(other: &StoredUser) -> StoredUser {
        StoredUser {
            id: other.id,
            created_at: other.created_at,
            updated_at: other.updated_at,
            ..sample()
        }
    }

    #[test]
    fn test_missing_active_defaults_to_true() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json.as_object_mut().unwrap().remove("active");
        let user: StoredUser = serde_json::from_value(json).unwrap();
        assert!(user.active);
        assert!(user.is_active_admin());
    }

    #[test]
    fn test_patch_updates_timestamp() {
        let mut user = sample();
        let later = user.updated_at + chrono::Duration::seconds(5);
        UserPatch {
            active: Some(false),
            ..UserPatch::default()
        }
        .apply(&mut user, later);
        assert!(!user.active);
        assert_eq!(user.updated_at, later);
        assert!(!user.is_active_admin());
    }
}
