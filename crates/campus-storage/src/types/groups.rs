//! Group aggregate types.
//!
//! A group embeds its admin/member rosters and join-request queue and is
//! read and written as a whole document by the store.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GroupId, RequestId, Roster, StudentId};

/// Whether joining is immediate or goes through the request queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Public,
    Private,
}

/// Error type for parsing GroupType from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGroupTypeError(pub String);

impl std::fmt::Display for ParseGroupTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid group type: {}", self.0)
    }
}

impl std::error::Error for ParseGroupTypeError {}

impl FromStr for GroupType {
    type Err = ParseGroupTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(GroupType::Public),
            "private" => Ok(GroupType::Private),
            _ => Err(ParseGroupTypeError(s.to_string())),
        }
    }
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Public => "public",
            GroupType::Private => "private",
        }
    }
}

/// Visibility flag, settable independently of [`GroupType`]. Validated on
/// create/update but never consulted by the membership engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
}

/// Error type for parsing Privacy from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePrivacyError(pub String);

impl std::fmt::Display for ParsePrivacyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid privacy: {}", self.0)
    }
}

impl std::error::Error for ParsePrivacyError {}

impl FromStr for Privacy {
    type Err = ParsePrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Privacy::Public),
            "private" => Ok(Privacy::Private),
            _ => Err(ParsePrivacyError(s.to_string())),
        }
    }
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Private => "private",
        }
    }
}

/// Join-request lifecycle. Pending requests may become accepted or rejected
/// exactly once; non-pending requests are immutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// A student's intent to join a private group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: RequestId,
    pub student_id: StudentId,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

/// Per-group feature toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub allow_file_sharing: bool,
    pub allow_chat: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            allow_file_sharing: true,
            allow_chat: true,
        }
    }
}

/// Group record
#[derive(Clone, Debug)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    pub privacy: Privacy,
    /// Authoritative owner, distinct from `admins.first()`.
    pub owner: StudentId,
    /// Ordered; the first entry is the primary admin.
    pub admins: Roster,
    pub members: Roster,
    pub requests: Vec<JoinRequest>,
    pub invite_code: String,
    pub settings: GroupSettings,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a group
#[derive(Clone, Debug)]
pub struct CreateGroupParams {
    pub name: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    pub privacy: Privacy,
    pub settings: GroupSettings,
}

impl Group {
    /// A fresh group: the creator is the sole admin and the owner, and is
    /// NOT inserted into `members`.
    pub fn create(
        id: GroupId,
        params: CreateGroupParams,
        creator: StudentId,
        invite_code: String,
        now: DateTime<Utc>,
    ) -> Self {
        let mut admins = Roster::new();
        admins.insert(creator);
        Self {
            id,
            name: params.name,
            description: params.description,
            group_type: params.group_type,
            privacy: params.privacy,
            owner: creator,
            admins,
            members: Roster::new(),
            requests: Vec::new(),
            invite_code,
            settings: params.settings,
            created_at: now,
        }
    }

    pub fn request(&self, id: &RequestId) -> Option<&JoinRequest> {
        self.requests.iter().find(|r| r.id == *id)
    }

    pub fn request_mut(&mut self, id: &RequestId) -> Option<&mut JoinRequest> {
        self.requests.iter_mut().find(|r| r.id == *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_group_type_parse() {
        assert_eq!("public".parse::<GroupType>().unwrap(), GroupType::Public);
        assert_eq!("private".parse::<GroupType>().unwrap(), GroupType::Private);
    }

    #[test]
    fn test_group_type_parse_invalid() {
        assert!("open".parse::<GroupType>().is_err());
        assert!("Public".parse::<GroupType>().is_err()); // Case sensitive
        assert!("".parse::<GroupType>().is_err());
    }

    #[test]
    fn test_group_type_roundtrip() {
        for group_type in [GroupType::Public, GroupType::Private] {
            let s = group_type.as_str();
            let parsed: GroupType = s.parse().unwrap();
            assert_eq!(group_type, parsed);
        }
    }

    #[test]
    fn test_privacy_independent_of_group_type() {
        assert_eq!("private".parse::<Privacy>().unwrap(), Privacy::Private);
        assert!("hidden".parse::<Privacy>().is_err());
    }

    #[test]
    fn test_request_status_serde_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let back: RequestStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(back, RequestStatus::Rejected);
    }

    #[test]
    fn test_create_sets_sole_admin_and_owner() {
        let creator = StudentId(Uuid::new_v4());
        let group = Group::create(
            GroupId(Uuid::new_v4()),
            CreateGroupParams {
                name: "rust club".to_string(),
                description: None,
                group_type: GroupType::Private,
                privacy: Privacy::Public,
                settings: GroupSettings::default(),
            },
            creator,
            "deadbeef".to_string(),
            chrono::Utc::now(),
        );
        assert_eq!(group.owner, creator);
        assert_eq!(group.admins.first(), Some(&creator));
        assert_eq!(group.admins.len(), 1);
        assert!(group.members.is_empty());
        assert!(group.requests.is_empty());
    }
}
