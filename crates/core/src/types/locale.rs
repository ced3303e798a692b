//! Site locales and per-locale text.

use serde::{Deserialize, Serialize};

/// Error returned when a locale tag is not supported.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported locale: {0}")]
pub struct LocaleError(pub String);

/// A locale the site is published in. French is the house language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    En,
    Es,
}

impl Locale {
    /// Every supported locale, default first.
    pub const ALL: [Self; 3] = [Self::Fr, Self::En, Self::Es];

    /// Two-letter tag used in URLs (`/fr/...`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Parse a tag such as `en` or `es-MX`, falling back to the default locale.
    #[must_use]
    pub fn from_tag_or_default(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        primary.to_ascii_lowercase().parse().unwrap_or_default()
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fr" => Ok(Self::Fr),
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            _ => Err(LocaleError(s.to_owned())),
        }
    }
}

/// A piece of text translated into each site locale.
///
/// Missing translations deserialize as empty strings; [`LocalizedString::get`]
/// falls back to French for them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedString {
    #[serde(default)]
    pub fr: String,
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub es: String,
}

impl LocalizedString {
    /// Same text in every locale (proper nouns, genre names).
    #[must_use]
    pub fn uniform(text: &str) -> Self {
        Self {
            fr: text.to_owned(),
            en: text.to_owned(),
            es: text.to_owned(),
        }
    }

    /// Build from explicit translations.
    #[must_use]
    pub fn new(fr: &str, en: &str, es: &str) -> Self {
        Self {
            fr: fr.to_owned(),
            en: en.to_owned(),
            es: es.to_owned(),
        }
    }

    /// Text for `locale`, or the French text when that translation is blank.
    #[must_use]
    pub fn get(&self, locale: Locale) -> &str {
        let text = match locale {
            Locale::Fr => &self.fr,
            Locale::En => &self.en,
            Locale::Es => &self.es,
        };
        if text.trim().is_empty() { &self.fr } else { text }
    }
}
