//! Wire types shared by the REST client and the state stores.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel `user_id` carried by assistant-authored messages.
pub const ASSISTANT_USER_ID: i64 = 0;

/// Author of a message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the logged-in user.
    #[default]
    User,
    /// Produced by the backend assistant.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conversation partition selecting which assistant persona answers.
///
/// Switching context fully replaces the displayed message list; lists from
/// different contexts are never merged.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ChatContext {
    /// Product onboarding (Ava).
    #[default]
    Onboarding,
    /// Customer support (Elijah).
    Support,
    /// Marketing (Lucas).
    Marketing,
}

impl ChatContext {
    /// All selectable contexts, in display order.
    pub const ALL: [Self; 3] = [Self::Onboarding, Self::Support, Self::Marketing];

    /// Wire name of the context (also the display label).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Onboarding => "Onboarding",
            Self::Support => "Support",
            Self::Marketing => "Marketing",
        }
    }
}

impl fmt::Display for ChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChatContext {
    type Err = UnknownContext;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("onboarding") => Ok(Self::Onboarding),
            s if s.eq_ignore_ascii_case("support") => Ok(Self::Support),
            s if s.eq_ignore_ascii_case("marketing") => Ok(Self::Marketing),
            other => Err(UnknownContext(other.to_string())),
        }
    }
}

/// Error returned when parsing an unknown context name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownContext(pub String);

impl fmt::Display for UnknownContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown chat context: {:?}", self.0)
    }
}

impl std::error::Error for UnknownContext {}

/// Quick action a user can trigger instead of typing a message.
///
/// The backend answers a known action with a single assistant message and
/// rejects unknown ones with a validation error.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ActionType {
    /// Generate a summary report for the current context.
    CreateReport,
    /// Request a call back from a human.
    CallLead,
    /// Schedule a meeting.
    ScheduleMeeting,
    /// Forward-compatibility escape hatch for actions this client predates.
    Other(String),
}

impl ActionType {
    /// Wire name of the action.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateReport => "create_report",
            Self::CallLead => "call_lead",
            Self::ScheduleMeeting => "schedule_meeting",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for ActionType {
    fn from(value: &str) -> Self {
        match value {
            "create_report" => Self::CreateReport,
            "call_lead" => Self::CallLead,
            "schedule_meeting" => Self::ScheduleMeeting,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

/// A chat message as the backend stores it.
///
/// A client-optimistic message carries a temporary negative `id` until it is
/// reconciled with the server-assigned record; server ids are always
/// positive, so the two spaces never collide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned identity (negative while optimistic).
    pub id: i64,
    /// Author of the message.
    pub role: Role,
    /// Message text; may contain lightweight markup rendered downstream.
    pub content: String,
    /// Creation time, server-authoritative once reconciled.
    pub timestamp: DateTime<Utc>,
    /// Owning user id; [`ASSISTANT_USER_ID`] for assistant messages.
    #[serde(default)]
    pub user_id: i64,
    /// Conversation partition this message belongs to.
    #[serde(default)]
    pub context: ChatContext,
    /// User turn this message replies to, when the backend links them.
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Whether the content was amended after creation.
    #[serde(default)]
    pub is_edited: bool,
    /// Soft-deletion flag; deleted messages are excluded from display.
    #[serde(default)]
    pub is_deleted: bool,
}

impl Message {
    /// Whether this is a client-optimistic entry awaiting reconciliation.
    #[must_use]
    pub const fn is_optimistic(&self) -> bool {
        self.id < 0
    }
}

/// Identity record of the logged-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned account id.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Optional given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Optional family name.
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Bearer credential returned by login and registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Opaque bearer token attached to authenticated calls.
    pub access_token: String,
    /// Token scheme, `"bearer"` in practice.
    pub token_type: String,
}

/// Payload for creating a message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Message text.
    pub content: String,
    /// Author role, `user` for interactive sends.
    pub role: Role,
    /// Conversation partition to file the message under.
    pub context: ChatContext,
}

/// Payload for replacing a message's content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateMessageRequest {
    /// Replacement text.
    pub content: String,
}

/// Payload for triggering a quick action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClickActionRequest {
    /// Wire name of the action.
    pub action_type: ActionType,
    /// Conversation partition the action applies to.
    pub context: ChatContext,
}

/// Payload for creating an account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Desired unique login name.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Contact email.
    pub email: String,
    /// Optional given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Optional family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}
