//! Portfolio categories.

use serde::{Deserialize, Serialize};

use super::Project;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    /// Derived on read; whatever a client sends is overwritten.
    pub project_count: usize,
}

/// Fill `project_count` from the current project list.
pub fn count_projects(categories: &mut [Category], projects: &[Project]) {
    for category in categories {
        category.project_count = projects
            .iter()
            .filter(|p| p.category == category.id)
            .count();
    }
}

fn category(id: &str, label: &str, description: &str, color: &str) -> Category {
    Category {
        id: id.to_string(),
        label: label.to_string(),
        description: Some(description.to_string()),
        color: color.to_string(),
        project_count: 0,
    }
}

#[must_use]
pub fn default_categories() -> Vec<Category> {
    vec![
        category("corporate", "Entreprise", "Événements d'entreprise", "from-blue-500 to-cyan-500"),
        category("production", "Production Musicale", "Création musicale", "from-purple-500 to-pink-500"),
        category("mapping", "Vidéo Mapping", "Spectacles visuels", "from-indigo-500 to-purple-500"),
        category("media", "Captations et prises de vue", "Captations et podcasts", "from-green-500 to-emerald-500"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::default_projects;

    #[test]
    fn test_count_projects() {
        let mut categories = default_categories();
        count_projects(&mut categories, &default_projects());
        let corporate = categories.iter().find(|c| c.id == "corporate").map(|c| c.project_count);
        assert_eq!(corporate, Some(1));
        let mapping = categories.iter().find(|c| c.id == "mapping").map(|c| c.project_count);
        assert_eq!(mapping, Some(0));
    }
}
