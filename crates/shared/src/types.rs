//! Common types used across Handraise

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Hand-off lifecycle
// =============================================================================

/// Lifecycle status of a hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Pending,
    Assigned,
    Resolved,
}

impl HandoffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoffStatus::Pending => "pending",
            HandoffStatus::Assigned => "assigned",
            HandoffStatus::Resolved => "resolved",
        }
    }

    /// Terminal statuses admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandoffStatus::Resolved)
    }

    /// Whether a transition from `self` to `to` is legal
    ///
    /// Legal: pending -> assigned, pending -> resolved, assigned -> resolved.
    pub fn can_transition_to(&self, to: HandoffStatus) -> bool {
        matches!(
            (self, to),
            (HandoffStatus::Pending, HandoffStatus::Assigned)
                | (HandoffStatus::Pending, HandoffStatus::Resolved)
                | (HandoffStatus::Assigned, HandoffStatus::Resolved)
        )
    }
}

impl std::fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel the end user's conversation lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Web,
    Whatsapp,
    Telegram,
    Sms,
    Api,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Web => "web",
            Channel::Whatsapp => "whatsapp",
            Channel::Telegram => "telegram",
            Channel::Sms => "sms",
            Channel::Api => "api",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Hand-off record
// =============================================================================

/// A request to transfer a conversation from automation to a human operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub id: Uuid,
    /// Bot/workspace scope every other id lives under
    pub tenant_id: Uuid,
    /// Channel-scoped end-user id
    pub user_id: String,
    /// Thread the end user's conversation lives in
    pub user_thread_id: String,
    pub user_channel: Channel,
    pub status: HandoffStatus,
    /// Set when an operator picks the hand-off up
    pub operator_id: Option<Uuid>,
    /// Operator-side thread, opened at assignment time
    pub operator_thread_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub assigned_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    /// Operator annotations, append-only
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Handoff {
    /// Build a new pending hand-off for a user conversation
    pub fn new(
        tenant_id: Uuid,
        user_id: impl Into<String>,
        user_thread_id: impl Into<String>,
        user_channel: Channel,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            user_id: user_id.into(),
            user_thread_id: user_thread_id.into(),
            user_channel,
            status: HandoffStatus::Pending,
            operator_id: None,
            operator_thread_id: None,
            created_at: OffsetDateTime::now_utc(),
            assigned_at: None,
            resolved_at: None,
            comments: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether this record belongs to the given user conversation tuple
    pub fn matches_conversation(
        &self,
        user_id: &str,
        user_thread_id: &str,
        user_channel: Channel,
    ) -> bool {
        self.user_id == user_id
            && self.user_thread_id == user_thread_id
            && self.user_channel == user_channel
    }
}

// =============================================================================
// Comment
// =============================================================================

/// An operator annotation attached to a hand-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub handoff_id: Uuid,
    /// Denormalized from the hand-off at creation time
    pub thread_id: String,
    pub operator_id: Uuid,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Comment {
    pub fn new(handoff: &Handoff, operator_id: Uuid, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handoff_id: handoff.id,
            thread_id: handoff.user_thread_id.clone(),
            operator_id,
            body: body.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

// =============================================================================
// Operator presence
// =============================================================================

/// Point-in-time presence snapshot for an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPresence {
    pub tenant_id: Uuid,
    pub operator_id: Uuid,
    pub online: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use HandoffStatus::*;

        assert!(Pending.can_transition_to(Assigned));
        assert!(Pending.can_transition_to(Resolved));
        assert!(Assigned.can_transition_to(Resolved));

        assert!(!Assigned.can_transition_to(Assigned));
        assert!(!Assigned.can_transition_to(Pending));
        assert!(!Resolved.can_transition_to(Pending));
        assert!(!Resolved.can_transition_to(Assigned));
        assert!(!Resolved.can_transition_to(Resolved));
    }

    #[test]
    fn test_new_handoff_is_pending() {
        let handoff = Handoff::new(Uuid::new_v4(), "u-1", "t-1", Channel::Web);

        assert_eq!(handoff.status, HandoffStatus::Pending);
        assert!(handoff.is_active());
        assert!(handoff.operator_id.is_none());
        assert!(handoff.operator_thread_id.is_none());
        assert!(handoff.assigned_at.is_none());
        assert!(handoff.comments.is_empty());
    }

    #[test]
    fn test_matches_conversation() {
        let handoff = Handoff::new(Uuid::new_v4(), "u-1", "t-1", Channel::Web);

        assert!(handoff.matches_conversation("u-1", "t-1", Channel::Web));
        assert!(!handoff.matches_conversation("u-2", "t-1", Channel::Web));
        assert!(!handoff.matches_conversation("u-1", "t-2", Channel::Web));
        assert!(!handoff.matches_conversation("u-1", "t-1", Channel::Whatsapp));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&HandoffStatus::Pending).unwrap();
        assert_eq!(json, r#""pending""#);

        let status: HandoffStatus = serde_json::from_str(r#""resolved""#).unwrap();
        assert_eq!(status, HandoffStatus::Resolved);
    }

    #[test]
    fn test_comment_denormalizes_thread() {
        let handoff = Handoff::new(Uuid::new_v4(), "u-1", "t-1", Channel::Web);
        let comment = Comment::new(&handoff, Uuid::new_v4(), "hello");

        assert_eq!(comment.handoff_id, handoff.id);
        assert_eq!(comment.thread_id, "t-1");
    }
}
