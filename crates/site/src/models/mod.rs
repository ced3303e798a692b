//! Domain types stored in the content store and exchanged with the front-end.
//!
//! All records serialize with camelCase field names. Records written by older
//! deployments are accepted as-is: missing fields take their defaults and a
//! few fields that used to be scalars are widened to lists on read.

/// Copy every `Some` field of a patch onto the target record.
macro_rules! patch_fields {
    ($patch:ident => $target:ident: $($field:ident),+ $(,)?) => {
        $(if let Some(value) = $patch.$field { $target.$field = value; })+
    };
}

pub mod artist;
pub mod blog;
pub mod category;
pub mod newsletter;
pub mod project;
pub mod quote;
pub mod service;
pub mod team;
pub mod user;

pub use artist::{Artist, ArtistPatch, LinkItem};
pub use blog::{BlogBlock, BlogPost, BlogPostPatch, BlogSeo};
pub use category::Category;
pub use newsletter::Subscriber;
pub use project::{Project, ProjectPatch};
pub use quote::{QuoteForm, QuoteRequest};
pub use service::ServiceItem;
pub use team::{SocialLinks, TeamMember, TeamMemberPatch};
pub use user::{PublicUser, StoredUser, UserPatch};

use serde::{Deserialize, Deserializer};

/// Accept `null`, a single value, or a list.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
    })
}

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Distinguish an explicit `null` (`Some(None)`) from an absent field (`None`).
///
/// Pair with `#[serde(default)]`.
pub(crate) fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// URL slug from a display name: `"Élena Strings!"` becomes `"elena-strings"`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn fold_accent(c: char) -> Vec<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'À' | 'Á' | 'Â' | 'Ä' | 'Ã' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' | 'Ò' | 'Ó' | 'Ô' | 'Ö' | 'Õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'œ' | 'Œ' => return vec!['o', 'e'],
        'æ' | 'Æ' => return vec!['a', 'e'],
        other => other,
    };
    vec![folded]
}
