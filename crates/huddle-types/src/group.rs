use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Group visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    #[default]
    Public,
    Private,
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::Public => write!(f, "public"),
            GroupType::Private => write!(f, "private"),
        }
    }
}

/// Populated member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Admin/member reference: the backend sends either a bare id or a
/// populated user, depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupMember {
    Id(String),
    Profile(MemberProfile),
}

impl GroupMember {
    pub fn id(&self) -> &str {
        match self {
            GroupMember::Id(id) => id,
            GroupMember::Profile(profile) => &profile.id,
        }
    }

    /// Name when populated, id otherwise.
    pub fn display_name(&self) -> &str {
        match self {
            GroupMember::Profile(profile) if !profile.name.is_empty() => &profile.name,
            other => other.id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: GroupType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<GroupMember>,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.id() == user_id)
    }
}

/// Payload of `GET /users/get-user-groups`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroups {
    #[serde(default)]
    pub groups: Vec<Group>,
}

/// Payload of `GET /group/group-data/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAnalytics {
    pub group: Group,
}

/// Body of `POST /group/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GroupType,
}
