//! Blog posts ("Eside Culture").
//!
//! A post body is an ordered list of typed blocks rather than one HTML blob so
//! the editor can rearrange images and embeds.

use serde::{Deserialize, Serialize};

use super::{null_as_default, present_or_null};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlogBlock {
    Paragraph {
        html: String,
    },
    Image {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Embed {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsDirective {
    pub index: bool,
    pub follow: bool,
}

/// Per-post search and social metadata overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlogSeo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots: Option<RobotsDirective>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

const fn published_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    /// ISO-8601 publication date.
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Drafts are hidden from visitors.
    #[serde(default = "published_by_default")]
    pub published: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocks: Vec<BlogBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<BlogSeo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostPatch {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub excerpt: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub cover_image: Option<Option<String>>,
    pub published: Option<bool>,
    pub blocks: Option<Vec<BlogBlock>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub seo: Option<Option<BlogSeo>>,
}

impl BlogPostPatch {
    pub fn apply(self, post: &mut BlogPost) {
        patch_fields!(self => post:
            slug,
            title,
            date,
            author,
            excerpt,
            cover_image,
            published,
            blocks,
            seo,
        );
    }
}

#[must_use]
pub fn default_posts() -> Vec<BlogPost> {
    vec![BlogPost {
        id: "lancement-agence".to_string(),
        slug: "lancement-agence".to_string(),
        title: "Lancement d'Angeli Visions".to_string(),
        date: "2024-09-01T00:00:00Z".to_string(),
        author: Some("Danilo Angeli".to_string()),
        excerpt: Some(
            "Nous sommes fiers d'annoncer officiellement le lancement de notre agence...".to_string(),
        ),
        cover_image: None,
        published: true,
        blocks: vec![BlogBlock::Paragraph {
            html: "<p>Bienvenue sur le blog d'Angeli Visions. Nous sommes une agence dédiée à l'excellence...</p>"
                .to_string(),
        }],
        seo: Some(BlogSeo {
            tags: vec!["Lancement".to_string(), "Agence".to_string()],
            ..BlogSeo::default()
        }),
    }]
}
