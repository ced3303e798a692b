//! Artist roster entries (DJs, musicians, live acts).

use angeli_core::LocalizedString;
use serde::{Deserialize, Deserializer, Serialize};

use super::{null_as_default, one_or_many};

/// A labelled external link (social profile or streaming page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkItem {
    pub platform: String,
    pub url: String,
}

/// An artist the agency books.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artist {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(rename = "type", deserialize_with = "localized_list")]
    pub kind: Vec<LocalizedString>,
    #[serde(deserialize_with = "localized_list")]
    pub musical_genre: Vec<LocalizedString>,
    #[serde(deserialize_with = "localized_text")]
    pub description: LocalizedString,
    #[serde(deserialize_with = "null_as_default")]
    pub photos: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub videos: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub socials: Vec<LinkItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub music_links: Vec<LinkItem>,
    #[serde(deserialize_with = "localized_list")]
    pub tags: Vec<LocalizedString>,
    pub available: bool,
    pub featured: bool,
    pub order: i64,
}

/// Partial update sent by the back-office; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistPatch {
    pub id: String,
    pub slug: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<Vec<LocalizedString>>,
    pub musical_genre: Option<Vec<LocalizedString>>,
    pub description: Option<LocalizedString>,
    pub photos: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub socials: Option<Vec<LinkItem>>,
    pub music_links: Option<Vec<LinkItem>>,
    pub tags: Option<Vec<LocalizedString>>,
    pub available: Option<bool>,
    pub featured: Option<bool>,
    pub order: Option<i64>,
}

impl ArtistPatch {
    pub fn apply(self, artist: &mut Artist) {
        patch_fields!(self => artist:
            slug,
            name,
            kind,
            musical_genre,
            description,
            photos,
            videos,
            socials,
            music_links,
            tags,
            available,
            featured,
            order,
        );
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrLocalized {
    Text(String),
    Localized(LocalizedString),
}

impl From<TextOrLocalized> for LocalizedString {
    fn from(value: TextOrLocalized) -> Self {
        match value {
            TextOrLocalized::Text(text) => Self::uniform(&text),
            TextOrLocalized::Localized(localized) => localized,
        }
    }
}

/// Older records stored plain French strings where translations now live.
fn localized_text<'de, D>(deserializer: D) -> Result<LocalizedString, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrLocalized>::deserialize(deserializer)?
        .map(Into::into)
        .unwrap_or_default())
}

fn localized_list<'de, D>(deserializer: D) -> Result<Vec<LocalizedString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(one_or_many::<D, TextOrLocalized>(deserializer)?
        .into_iter()
        .map(Into::into)
        .collect())
}

/// Roster shown before anything has been saved.
#[must_use]
pub fn default_artists() -> Vec<Artist> {
    vec![
        Artist {
            id: "dj-phoenix".to_string(),
            slug: "dj-phoenix".to_string(),
            name: "DJ Phoenix".to_string(),
            kind: vec![LocalizedString::uniform("DJ")],
            musical_genre: vec![LocalizedString::uniform("Electro-House")],
            description: LocalizedString::new(
                "<p>DJ Phoenix enflamme les pistes depuis plus de 10 ans, entre électronique, deep house et afrobeat.</p>",
                "<p>DJ Phoenix has been igniting dance floors for over 10 years with electronic, deep house and afrobeat.</p>",
                "<p>DJ Phoenix lleva más de 10 años encendiendo las pistas con electrónica, deep house y afrobeat.</p>",
            ),
            photos: vec!["/placeholder.svg?height=600&width=800&text=DJ+Phoenix+1".to_string()],
            videos: vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()],
            socials: vec![LinkItem {
                platform: "Instagram".to_string(),
                url: "https://instagram.com/djphoenix".to_string(),
            }],
            music_links: Vec::new(),
            tags: vec![
                LocalizedString::uniform("Deep House"),
                LocalizedString::uniform("Afrobeat"),
                LocalizedString::new("Électro", "Electro", "Electro"),
            ],
            available: true,
            featured: true,
            order: 1,
        },
        Artist {
            id: "elena-strings".to_string(),
            slug: "elena-strings".to_string(),
            name: "Elena Strings".to_string(),
            kind: vec![LocalizedString::new("Musicien(ne)", "Musician", "Músico")],
            musical_genre: vec![
                LocalizedString::uniform("Pop"),
                LocalizedString::new("Classique", "Classical", "Clásico"),
            ],
            description: LocalizedString::new(
                "<p>Violoniste classique, Elena apporte élégance et raffinement à vos cérémonies et cocktails.</p>",
                "<p>A classical violinist, Elena brings elegance and refinement to ceremonies and cocktails.</p>",
                "<p>Violinista clásica, Elena aporta elegancia y refinamiento a ceremonias y cócteles.</p>",
            ),
            photos: vec!["/placeholder.svg?height=600&width=800&text=Elena+Strings+1".to_string()],
            videos: Vec::new(),
            socials: vec![LinkItem {
                platform: "Facebook".to_string(),
                url: "https://facebook.com/elenastrings".to_string(),
            }],
            music_links: Vec::new(),
            tags: vec![
                LocalizedString::new("Classique", "Classical", "Clásico"),
                LocalizedString::new("Cérémonie", "Ceremony", "Ceremonia"),
            ],
            available: true,
            featured: true,
            order: 2,
        },
        Artist {
            id: "duo-nova".to_string(),
            slug: "duo-nova".to_string(),
            name: "Duo Nova".to_string(),
            kind: vec![LocalizedString::new("DJ & Musicien", "DJ & Musician", "DJ y Músico")],
            musical_genre: vec![LocalizedString::uniform("House"), LocalizedString::uniform("Funk")],
            description: LocalizedString::new(
                "<p>Le Duo Nova fusionne DJ set et saxophone live pour une ambiance de fête inoubliable.</p>",
                "<p>Duo Nova blends a DJ set with live saxophone for an unforgettable party atmosphere.</p>",
                "<p>Duo Nova fusiona DJ set y saxofón en directo para una fiesta inolvidable.</p>",
            ),
            photos: vec!["/placeholder.svg?height=600&width=800&text=Duo+Nova+1".to_string()],
            videos: Vec::new(),
            socials: Vec::new(),
            music_links: Vec::new(),
            tags: vec![LocalizedString::uniform("Saxo Live"), LocalizedString::uniform("Club")],
            available: true,
            featured: false,
            order: 3,
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_scalar_fields_are_widened() {
        let json = r#"{
            "id": "duo-nova",
            "name": "Duo Nova",
            "type": {"fr": "DJ", "en": "DJ", "es": "DJ"},
            "musicalGenre": null,
            "description": "<p>Texte</p>",
            "tags": ["House", {"fr": "Fête", "en": "Party", "es": "Fiesta"}],
            "socials": null
        }"#;
        let artist: Artist = serde_json::from_str(json).unwrap();
        assert_eq!(artist.kind, vec![LocalizedString::uniform("DJ")]);
        assert!(artist.musical_genre.is_empty());
        assert_eq!(artist.description.en, "<p>Texte</p>");
        assert_eq!(artist.tags.len(), 2);
        assert!(artist.socials.is_empty());
        assert_eq!(artist.order, 0);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut artist = default_artists().remove(0);
        let patch: ArtistPatch =
            serde_json::from_str(r#"{"id":"dj-phoenix","available":false,"order":9}"#).unwrap();
        patch.apply(&mut artist);
        assert!(!artist.available);
        assert_eq!(artist.order, 9);
        assert_eq!(artist.name, "DJ Phoenix");
    }

    #[test]
    fn test_serializes_type_field_name() {
        let json = serde_json::to_value(&default_artists()[0]).unwrap();
        assert!(json.get("type").is_some());
        assert!(json.get("musicalGenre").is_some());
    }
}
