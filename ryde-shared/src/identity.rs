use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Female,
    Male,
    Other,
}

/// The slice of the platform user record the booking core reads.
/// Everything else about a user is opaque pass-through data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub gender: Gender,
    pub verified: bool,
    pub blacklisted: bool,
    /// Community tags the user belongs to, checked against
    /// community-only listings.
    pub communities: Vec<String>,
}

impl UserProfile {
    pub fn in_community(&self, community_id: &str) -> bool {
        self.communities.iter().any(|c| c == community_id)
    }
}
