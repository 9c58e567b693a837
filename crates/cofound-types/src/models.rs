use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Returned when a stored or submitted string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// -- Users --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleIntent {
    Founder,
    Cofounder,
    EarlyEmployee,
}

impl RoleIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Founder => "founder",
            Self::Cofounder => "cofounder",
            Self::EarlyEmployee => "early_employee",
        }
    }

    /// The role this user is looking for. Founders see cofounders and vice
    /// versa; early employees are not filtered.
    pub fn complement(&self) -> Option<RoleIntent> {
        match self {
            Self::Founder => Some(Self::Cofounder),
            Self::Cofounder => Some(Self::Founder),
            Self::EarlyEmployee => None,
        }
    }
}

impl FromStr for RoleIntent {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "founder" => Ok(Self::Founder),
            "cofounder" => Ok(Self::Cofounder),
            "early_employee" => Ok(Self::EarlyEmployee),
            other => Err(UnknownVariant { kind: "role_intent", value: other.to_string() }),
        }
    }
}

impl fmt::Display for RoleIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A profile as stored by the profile directory. Only `role_intent`,
/// `is_active` and `is_banned` drive matching decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role_intent: RoleIntent,
    pub location: Option<String>,
    pub experience_years: Option<i32>,
    pub previous_startups: i32,
    pub is_active: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            name: self.name.clone(),
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
            role_intent: self.role_intent,
            location: self.location.clone(),
            experience_years: self.experience_years,
            previous_startups: self.previous_startups,
        }
    }
}

/// Profile fields shown to other users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role_intent: RoleIntent,
    pub location: Option<String>,
    pub experience_years: Option<i32>,
    pub previous_startups: i32,
}

// -- Matches --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Viewed,
    Saved,
    Dismissed,
    IntroRequested,
    Connected,
}

impl MatchStatus {
    /// Statuses a participant may set directly through a status update.
    pub const USER_SETTABLE: [MatchStatus; 3] = [Self::Viewed, Self::Saved, Self::Dismissed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Viewed => "viewed",
            Self::Saved => "saved",
            Self::Dismissed => "dismissed",
            Self::IntroRequested => "intro_requested",
            Self::Connected => "connected",
        }
    }

    pub fn is_user_settable(&self) -> bool {
        Self::USER_SETTABLE.contains(self)
    }
}

impl FromStr for MatchStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "viewed" => Ok(Self::Viewed),
            "saved" => Ok(Self::Saved),
            "dismissed" => Ok(Self::Dismissed),
            "intro_requested" => Ok(Self::IntroRequested),
            "connected" => Ok(Self::Connected),
            other => Err(UnknownVariant { kind: "match status", value: other.to_string() }),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-dimension compatibility scores. The scoring algorithm does not exist
/// yet, so every row is created with zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScores {
    pub match_score: i32,
    pub match_explanation: Option<String>,
    pub complementarity_score: i32,
    pub commitment_alignment_score: i32,
    pub location_fit_score: i32,
    pub intent_score: i32,
    pub interest_overlap_score: i32,
    pub preference_alignment_score: i32,
}

/// Directed interest of `user_id` in `target_user_id`. The reverse direction
/// is a separate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_user_id: Uuid,
    #[serde(flatten)]
    pub scores: MatchScores,
    pub status: MatchStatus,
    pub intro_requested_at: Option<DateTime<Utc>>,
    pub intro_accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.target_user_id == user_id
    }

    /// The participant that is not `user_id`. Callers check participation first.
    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.user_id == user_id {
            self.target_user_id
        } else {
            self.user_id
        }
    }
}

// -- Messages --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    IntroRequest,
    IntroResponse,
    Message,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntroRequest => "intro_request",
            Self::IntroResponse => "intro_response",
            Self::Message => "message",
        }
    }
}

impl FromStr for MessageType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intro_request" => Ok(Self::IntroRequest),
            "intro_response" => Ok(Self::IntroResponse),
            "message" => Ok(Self::Message),
            other => Err(UnknownVariant { kind: "message type", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
