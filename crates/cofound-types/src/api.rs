use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Match, MatchStatus, Message, UserPublic};

// -- Token claims --

/// Claims read from identity provider tokens. `sub` is the provider's
/// subject identifier, not our user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<usize>,
    /// Authorized party: the origin the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
}

// -- Pagination --

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchListQuery {
    pub status_filter: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

// -- Users --

/// Profile fields the matching core does not use (skills, links,
/// preferences) are accepted and ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct OnboardingRequest {
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 2, max = 255, message = "name must be between 2 and 255 characters"))]
    pub name: String,
    pub role_intent: String,
    #[validate(length(max = 2000, message = "bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 500, message = "avatar_url must be at most 500 characters"))]
    pub avatar_url: Option<String>,
    #[validate(length(max = 255, message = "location must be at most 255 characters"))]
    pub location: Option<String>,
    #[validate(range(min = 0, max = 70, message = "experience_years must be between 0 and 70"))]
    pub experience_years: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0, max = 50, message = "previous_startups must be between 0 and 50"))]
    pub previous_startups: i32,
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 2, max = 255, message = "name must be between 2 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2000, message = "bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 500, message = "avatar_url must be at most 500 characters"))]
    pub avatar_url: Option<String>,
    pub role_intent: Option<String>,
    #[validate(length(max = 255, message = "location must be at most 255 characters"))]
    pub location: Option<String>,
    #[validate(range(min = 0, max = 70, message = "experience_years must be between 0 and 70"))]
    pub experience_years: Option<i32>,
    #[validate(range(min = 0, max = 50, message = "previous_startups must be between 0 and 50"))]
    pub previous_startups: Option<i32>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.role_intent.is_none()
            && self.location.is_none()
            && self.experience_years.is_none()
            && self.previous_startups.is_none()
    }
}

// -- Matches --

#[derive(Debug, Deserialize)]
pub struct IntroRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct IntroRespondRequest {
    pub accept: bool,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchStatusUpdate {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteResponse {
    pub message: String,
    pub match_id: Uuid,
    pub invites_remaining: u32,
    pub auto_connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntroRequestedResponse {
    pub message: String,
    pub match_id: Uuid,
    pub intro_requested_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntroRespondedResponse {
    pub message: String,
    pub match_id: Uuid,
    pub accepted: bool,
    pub status: MatchStatus,
}

/// A match seen from one participant, carrying the other party's profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchWithUser {
    #[serde(flatten)]
    pub record: Match,
    pub target_user: UserPublic,
}

// -- Profiles --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileActionResponse {
    pub message: String,
    pub match_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileCounts {
    pub discover_count: u64,
    pub saved_count: u64,
    pub matches_count: u64,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub match_id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageWithSender {
    #[serde(flatten)]
    pub record: Message,
    pub sender: Option<UserPublic>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub match_id: Uuid,
    pub other_user: UserPublic,
    pub last_message: Option<MessageWithSender>,
    pub unread_count: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub total_unread: u64,
    /// match_id -> unread count, only for threads with unread messages
    pub conversations: HashMap<Uuid, u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub message: String,
    pub message_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub message: String,
    pub match_id: Uuid,
    pub marked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extra_fields_are_ignored() {
        let req: OnboardingRequest = serde_json::from_value(json!({
            "email": "ada@example.com",
            "name": "Ada",
            "role_intent": "founder",
            "linkedin_url": "https://example.com/ada",
        }))
        .unwrap();
        assert_eq!(req.previous_startups, 0);
        assert!(req.validate().is_ok());

        let update: ProfileUpdate =
            serde_json::from_value(json!({ "skills": ["rust"], "bio": "hi" })).unwrap();
        assert_eq!(update.bio.as_deref(), Some("hi"));
        assert!(!update.is_empty());

        let empty: ProfileUpdate = serde_json::from_value(json!({ "skills": [] })).unwrap();
        assert!(empty.is_empty());
    }
}
