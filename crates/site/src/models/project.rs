//! Portfolio projects ("réalisations").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub id: u64,
    pub title: String,
    pub slug: String,
    /// Id of a [`Category`](super::Category).
    pub category: String,
    pub image: String,
    #[serde(deserialize_with = "null_as_default")]
    pub gallery: Vec<String>,
    pub description: String,
    pub full_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub services: Vec<String>,
    pub client: String,
    /// Free-form display date ("Juin 2024").
    pub date: String,
    pub guests: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Update addressed by numeric id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub id: u64,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub description: Option<String>,
    pub full_description: Option<String>,
    pub services: Option<Vec<String>>,
    pub client: Option<String>,
    pub date: Option<String>,
    pub guests: Option<String>,
    pub location: Option<String>,
}

impl ProjectPatch {
    pub fn apply(self, project: &mut Project, now: DateTime<Utc>) {
        patch_fields!(self => project:
            title,
            slug,
            category,
            image,
            gallery,
            description,
            full_description,
            services,
            client,
            date,
            guests,
            location,
        );
        project.updated_at = Some(now);
    }
}

/// Next free id: one past the largest in use.
#[must_use]
pub fn next_id(projects: &[Project]) -> u64 {
    projects.iter().map(|p| p.id).max().map_or(1, |max| max + 1)
}

/// Portfolio shown before anything has been saved.
#[must_use]
pub fn default_projects() -> Vec<Project> {
    vec![
        Project {
            id: 1,
            title: "Mariage de Luxe - Château de Versailles".to_string(),
            slug: "mariage-chateau-versailles".to_string(),
            category: "wedding".to_string(),
            image: "/elegant-wedding-ceremony.png".to_string(),
            gallery: vec![
                "/elegant-wedding-reception.png".to_string(),
                "/wedding-dance-floor.jpg".to_string(),
            ],
            description: "Un mariage d'exception dans les jardins du château avec sonorisation premium et éclairage féerique.".to_string(),
            full_description: "Organisation complète d'un mariage de prestige avec sonorisation haute qualité, éclairage d'ambiance et DJ professionnel.".to_string(),
            services: vec!["Sonorisation".to_string(), "Éclairage".to_string(), "DJ".to_string()],
            client: "M. et Mme Dubois".to_string(),
            date: "Juin 2024".to_string(),
            guests: "150 invités".to_string(),
            location: "Château de Versailles".to_string(),
            created_at: None,
            updated_at: None,
        },
        Project {
            id: 2,
            title: "Événement Corporate - Lancement Produit".to_string(),
            slug: "evenement-corporate-lancement".to_string(),
            category: "corporate".to_string(),
            image: "/corporate-event-stage.jpg".to_string(),
            gallery: vec!["/corporate-presentation.jpg".to_string()],
            description: "Lancement produit avec spectacle audiovisuel immersif et sonorisation professionnelle.".to_string(),
            full_description: "Événement corporate avec mapping vidéo, sonorisation multi-zones et coordination technique complète.".to_string(),
            services: vec!["Vidéo Mapping".to_string(), "Sonorisation".to_string(), "Régie technique".to_string()],
            client: "TechCorp Industries".to_string(),
            date: "Mars 2024".to_string(),
            guests: "300 invités".to_string(),
            location: "Palais des Congrès, Paris".to_string(),
            created_at: None,
            updated_at: None,
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(&[]), 1);
        assert_eq!(next_id(&default_projects()), 3);
    }

    #[test]
    fn test_patch_stamps_update_time() {
        let mut project = default_projects().remove(0);
        let now = Utc::now();
        let patch: ProjectPatch = serde_json::from_str(r#"{"id":1,"guests":"200 invités"}"#).unwrap();
        patch.apply(&mut project, now);
        assert_eq!(project.guests, "200 invités");
        assert_eq!(project.client, "M. et Mme Dubois");
        assert_eq!(project.updated_at, Some(now));
    }
}
