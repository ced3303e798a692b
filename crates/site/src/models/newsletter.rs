//! Newsletter subscribers.
//!
//! Each subscriber is a hash under `newsletter:{email}`. Hash values are plain
//! strings, so the record is converted field by field rather than through serde.

use std::collections::HashMap;

use angeli_core::Locale;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Subscriber as listed in the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub name: String,
    pub email: String,
    /// RFC 3339 timestamp; empty for addresses imported from the legacy set.
    pub subscribed_at: String,
    pub consent_given: bool,
    /// Opaque handle used by the preferences page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<Locale>,
}

impl Subscriber {
    /// A fresh subscription with a new preferences token.
    #[must_use]
    pub fn new(name: String, email: String, consent_given: bool, lang: Locale, now: DateTime<Utc>) -> Self {
        Self {
            name,
            email,
            subscribed_at: now.to_rfc3339(),
            consent_given,
            token: Some(uuid::Uuid::new_v4().to_string()),
            lang: Some(lang),
        }
    }

    /// Minimal record for an address that only exists in the old email set.
    #[must_use]
    pub fn legacy(email: String) -> Self {
        Self {
            name: String::new(),
            email,
            subscribed_at: String::new(),
            consent_given: false,
            token: None,
            lang: None,
        }
    }

    /// Rebuild from a stored hash. Returns `None` for an empty hash.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        let email = fields.get("email").filter(|e| !e.is_empty())?;
        let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Some(Self {
            name: text("name"),
            email: email.clone(),
            subscribed_at: text("subscribedAt"),
            consent_given: fields
                .get("consentGiven")
                .is_some_and(|v| matches!(v.as_str(), "true" | "1")),
            token: fields.get("token").filter(|t| !t.is_empty()).cloned(),
            lang: fields.get("lang").map(|l| Locale::from_tag_or_default(l)),
        })
    }

    /// Hash fields to write. Unset optional fields are left out.
    #[must_use]
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("subscribedAt", self.subscribed_at.clone()),
            ("consentGiven", self.consent_given.to_string()),
        ];
        if let Some(token) = &self.token {
            fields.push(("token", token.clone()));
        }
        if let Some(lang) = self.lang {
            fields.push(("lang", lang.as_str().to_string()));
        }
        fields
    }
}

/// Store key of a subscriber hash.
#[must_use]
pub fn subscriber_key(email: &str) -> String {
    format!("newsletter:{}", email.trim().to_lowercase())
}
