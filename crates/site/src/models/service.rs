//! Service offerings listed on the services page.

use serde::{Deserialize, Serialize};

use super::null_as_default;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceItem {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    /// Tailwind gradient classes, e.g. `from-blue-500 to-cyan-500`.
    pub color: String,
    /// Logo or icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn service(id: &str, title: &str, description: &str, features: &[&str], color: &str) -> ServiceItem {
    ServiceItem {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        features: features.iter().map(ToString::to_string).collect(),
        color: color.to_string(),
        image: Some("/placeholder.svg?height=128&width=128".to_string()),
    }
}

/// Catalogue shown before anything has been saved.
#[must_use]
pub fn default_services() -> Vec<ServiceItem> {
    vec![
        service(
            "production",
            "Production Musicale",
            "Compositions originales, jingles personnalisés, musiques d'ambiance pour vos événements",
            &["Jingles d'entreprise", "Musiques d'ambiance", "Compositions originales", "Arrangements personnalisés"],
            "from-blue-500 to-cyan-500",
        ),
        service(
            "organization",
            "Organisation d'Événements",
            "Gestion complète de vos événements : logistique, venue, traiteur, décoration et animation",
            &["Galas & réceptions", "Événements d'entreprise", "Soirées privées", "Conventions & séminaires"],
            "from-cyan-500 to-teal-500",
        ),
        service(
            "booking",
            "Booking DJ & Musiciens",
            "DJs professionnels, animation live audiovisuel, VJing et performances audiovisuelles personnalisées",
            &["DJ sets professionnels", "VJ live performances", "Animation interactive", "Streaming en direct"],
            "from-teal-500 to-emerald-500",
        ),
        service(
            "technical",
            "Prestations Techniques",
            "Sonorisation, éclairage scénique, vidéo mapping et conception technique d'événements",
            &["Sonorisation événementielle", "Éclairage scénique", "Murs de LED", "VJ / Vidéo mapping", "Régie technique"],
            "from-emerald-500 to-blue-500",
        ),
        service(
            "led-walls",
            "Murs de LED",
            "Écrans LED haute définition pour créer des expériences visuelles immersives et spectaculaires",
            &["Écrans LED géants", "Affichage haute résolution", "Installation sur-mesure", "Contenu personnalisé"],
            "from-blue-600 to-cyan-600",
        ),
        service(
            "media",
            "Captations et prises de vue",
            "Captations multicaméras, émissions TV et création de podcasts pour vos événements",
            &["Captations multicaméras", "Émissions TV", "Création de Podcasts", "Post-production vidéo"],
            "from-blue-700 to-cyan-800",
        ),
        service(
            "sport",
            "Événements Sportifs",
            "Organisation et animation d'événements sportifs : remises de prix, galas sportifs et couverture médiatique",
            &["Galas & remises de prix", "Soirées supporters", "Couverture médiatique", "Animation & sono de stade"],
            "from-orange-500 to-red-500",
        ),
    ]
}
