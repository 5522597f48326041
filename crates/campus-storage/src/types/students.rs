//! Student profile types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StudentId;

/// A link to an external profile, e.g. `{platform: "GitHub", url: "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// Student record
#[derive(Clone, Debug)]
pub struct Student {
    pub id: StudentId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub social_links: Vec<SocialLink>,
    /// Ed25519 verifying key used to authenticate this student's requests.
    pub public_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for registering a student
#[derive(Clone, Debug)]
pub struct CreateStudentParams {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub public_key: Vec<u8>,
}

/// Profile update; `None` fields keep their current value. Email and the
/// verifying key are immutable through this path.
#[derive(Clone, Debug, Default)]
pub struct UpdateStudentParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub department: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub social_links: Option<Vec<SocialLink>>,
}
