//! Team members shown on the "about" section.

use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Portrait used until an editor uploads a photo.
pub const PLACEHOLDER_PHOTO: &str = "/placeholder.svg?height=240&width=240";

/// Optional social profile links.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: String,
    pub photo: String,
    /// Responsibilities shown as tags.
    #[serde(deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub socials: SocialLinks,
    /// Display position, 0-based.
    pub order: i64,
}

/// Editable fields of a member. `id` and `order` are managed by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberPatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub roles: Option<Vec<String>>,
    pub socials: Option<SocialLinks>,
}

impl TeamMemberPatch {
    pub fn apply(self, member: &mut TeamMember) {
        patch_fields!(self => member: name, title, email, photo, roles, socials);
    }
}

/// Renumber `order` to 0..n following the current sequence.
pub fn reindex(members: &mut [TeamMember]) {
    for (index, member) in members.iter_mut().enumerate() {
        member.order = i64::try_from(index).unwrap_or(i64::MAX);
    }
}

/// Sort by `order`; ties keep their stored sequence.
pub fn sort_by_order(members: &mut [TeamMember]) {
    members.sort_by_key(|m| m.order);
}

/// Put `ids` first in the given sequence, then every member the list missed.
///
/// Unknown ids are ignored. Orders are renumbered from zero.
#[must_use]
pub fn reorder(members: Vec<TeamMember>, ids: &[String]) -> Vec<TeamMember> {
    let mut remaining = members;
    let mut ordered = Vec::with_capacity(remaining.len());
    for id in ids {
        if let Some(pos) = remaining.iter().position(|m| &m.id == id) {
            ordered.push(remaining.remove(pos));
        }
    }
    ordered.extend(remaining);
    reindex(&mut ordered);
    ordered
}

fn member(id: &str, name: &str, title: &str, email: &str, roles: &[&str], socials: SocialLinks, order: i64) -> TeamMember {
    TeamMember {
        id: id.to_string(),
        name: name.to_string(),
        title: title.to_string(),
        email: email.to_string(),
        photo: "/placeholder.svg?height=320&width=480".to_string(),
        roles: roles.iter().map(ToString::to_string).collect(),
        socials,
        order,
    }
}

/// Team shown before anything has been saved.
#[must_use]
pub fn default_team() -> Vec<TeamMember> {
    vec![
        member(
            "t-1",
            "Camille Angeli",
            "Direction artistique",
            "camille@angelivisions.com",
            &["Programmation", "Direction"],
            SocialLinks {
                instagram: Some("https://instagram.com/angelivisions".to_string()),
                linkedin: Some("https://linkedin.com".to_string()),
                ..SocialLinks::default()
            },
            0,
        ),
        member(
            "t-2",
            "Alex Martin",
            "Production",
            "alex@angelivisions.com",
            &["Production", "Logistique"],
            SocialLinks {
                linkedin: Some("https://linkedin.com".to_string()),
                website: Some("https://angelivisions.com".to_string()),
                ..SocialLinks::default()
            },
            1,
        ),
        member(
            "t-3",
            "Sofia Ben",
            "Communication",
            "sofia@angelivisions.com",
            &["Social", "Presse"],
            SocialLinks {
                twitter: Some("https://x.com".to_string()),
                instagram: Some("https://instagram.com".to_string()),
                ..SocialLinks::default()
            },
            2,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(members: &[TeamMember]) -> Vec<&str> {
        members.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_reorder_moves_listed_first_and_keeps_rest() {
        let reordered = reorder(default_team(), &["t-3".to_string(), "ghost".to_string()]);
        assert_eq!(ids(&reordered), vec!["t-3", "t-1", "t-2"]);
        let orders: Vec<i64> = reordered.iter().map(|m| m.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_reindex_after_removal() {
        let mut team = default_team();
        team.remove(0);
        reindex(&mut team);
        assert_eq!(team[0].order, 0);
        assert_eq!(team[1].order, 1);
    }

    #[test]
    fn test_patch_leaves_missing_fields() {
        let mut member = default_team().remove(1);
        TeamMemberPatch {
            title: Some("Régie".to_string()),
            ..TeamMemberPatch::default()
        }
        .apply(&mut member);
        assert_eq!(member.title, "Régie");
        assert_eq!(member.name, "Alex Martin");
        assert_eq!(member.roles.len(), 2);
    }
}
