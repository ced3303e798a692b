//! Quote ("devis") requests sent from the public event form.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::one_or_many;
use angeli_core::QuoteId;

/// Body of the public quote form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteForm {
    pub event_type: String,
    #[serde(deserialize_with = "one_or_many")]
    pub services: Vec<String>,
    pub event_date: String,
    pub guest_count: String,
    pub location: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub description: String,
    pub consent: bool,
    pub captcha_token: String,
}

/// A stored request, as listed in the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub id: String,
    pub event_type: String,
    pub services: Vec<String>,
    pub event_date: String,
    pub guest_count: String,
    pub location: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub description: String,
    pub consent: bool,
    pub created_at: String,
}

impl QuoteRequest {
    /// Accept a submitted form. The captcha token is not kept.
    #[must_use]
    pub fn from_form(form: QuoteForm, now: DateTime<Utc>) -> Self {
        Self {
            id: QuoteId::new().to_string(),
            event_type: form.event_type,
            services: form.services,
            event_date: form.event_date,
            guest_count: form.guest_count,
            location: form.location,
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone,
            company: form.company,
            description: form.description,
            consent: form.consent,
            created_at: now.to_rfc3339(),
        }
    }

    /// Rebuild from a stored hash. Returns `None` for an empty hash.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Some(Self {
            id: text("id"),
            event_type: text("eventType"),
            services: fields.get("services").map(|raw| decode_services(raw)).unwrap_or_default(),
            event_date: text("eventDate"),
            guest_count: text("guestCount"),
            location: text("location"),
            name: text("name"),
            email: text("email"),
            phone: text("phone"),
            company: text("company"),
            description: text("description"),
            consent: fields.get("consent").is_some_and(|v| matches!(v.as_str(), "true" | "1")),
            created_at: text("createdAt"),
        })
    }

    /// Hash fields to write. The service list is stored as a JSON array.
    #[must_use]
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("eventType", self.event_type.clone()),
            (
                "services",
                serde_json::to_string(&self.services).unwrap_or_else(|_| "[]".to_string()),
            ),
            ("eventDate", self.event_date.clone()),
            ("guestCount", self.guest_count.clone()),
            ("location", self.location.clone()),
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("phone", self.phone.clone()),
            ("company", self.company.clone()),
            ("description", self.description.clone()),
            ("consent", self.consent.to_string()),
            ("createdAt", self.created_at.clone()),
        ]
    }

    /// Parsed creation time, for sorting. Unparseable values sort last.
    #[must_use]
    pub fn created(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Older entries stored the list comma-separated.
fn decode_services(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|_| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    })
}

/// Store key of a request hash.
#[must_use]
pub fn quote_key(id: &str) -> String {
    format!("devis:{id}")
}

/// Sort newest first.
pub fn sort_newest_first(requests: &mut [QuoteRequest]) {
    requests.sort_by(|a, b| b.created().cmp(&a.created()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> QuoteForm {
        serde_json::from_str(
            r#"{
                "eventType": "Mariage",
                "services": ["DJ", "Lumières"],
                "name": " Ada ",
                "email": "ada@b.com",
                "consent": true,
                "captchaToken": "abc"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_fields_roundtrip_keeps_services() {
        let request = QuoteRequest::from_form(form(), Utc::now());
        assert_eq!(request.name, "Ada");
        let map: HashMap<String, String> = request
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(map["services"], r#"["DJ","Lumières"]"#);
        assert!(!map.contains_key("captchaToken"));
        assert_eq!(QuoteRequest::from_fields(&map).unwrap(), request);
    }

    #[test]
    fn test_legacy_service_list() {
        assert_eq!(decode_services("DJ, Son ,"), vec!["DJ", "Son"]);
        assert!(QuoteRequest::from_fields(&HashMap::new()).is_none());
    }

    #[test]
    fn test_sort_newest_first() {
        let now = Utc::now();
        let older = QuoteRequest::from_form(form(), now - chrono::Duration::hours(1));
        let newer = QuoteRequest::from_form(form(), now);
        let mut broken = QuoteRequest::from_form(form(), now);
        broken.created_at = String::new();
        let mut list = vec![broken, older.clone(), newer.clone()];
        sort_newest_first(&mut list);
        assert_eq!(list[0].id, newer.id);
        assert_eq!(list[1].id, older.id);
        assert!(list[2].created_at.is_empty());
    }
}
