//! Consumed contract of the messaging collaborator
//!
//! The messaging pipeline owns conversation threads and transcript delivery.
//! This core only opens operator-side threads and pushes context
//! notifications through it; dispatch semantics (ordering, timeouts) are the
//! pipeline's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use handraise_shared::HandoffResult;

/// One entry of a conversation's recent history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEvent {
    pub thread_id: String,
    pub sender: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Payload delivered to a conversation via the event-delivery pipeline
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyPayload {
    /// Tells the end user's conversation that an operator joined
    OperatorJoined {
        handoff_id: Uuid,
        operator_id: Uuid,
        history: Vec<ConversationEvent>,
    },

    /// Seeds the operator's fresh conversation with the user-side context
    HandoffContext {
        handoff_id: Uuid,
        user_thread_id: String,
        history: Vec<ConversationEvent>,
    },
}

/// Messaging operations consumed by the hand-off core
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Open a fresh operator-side conversation, returning its thread id
    async fn open_operator_conversation(
        &self,
        tenant_id: Uuid,
        operator_id: Uuid,
    ) -> HandoffResult<String>;

    /// Deliver a notification into a conversation thread
    async fn notify_conversation(
        &self,
        tenant_id: Uuid,
        thread_id: &str,
        payload: NotifyPayload,
    ) -> HandoffResult<()>;

    /// Most recent `count` events of a conversation thread
    async fn recent_events(
        &self,
        tenant_id: Uuid,
        thread_id: &str,
        count: usize,
    ) -> HandoffResult<Vec<ConversationEvent>>;
}
