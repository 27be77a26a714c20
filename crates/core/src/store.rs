//! Consumed contract of the durable hand-off store
//!
//! The store owns hand-off records and comments; this core never touches its
//! schema or queries. Filtering and ordering of thread lookups is the
//! caller's responsibility.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use handraise_shared::{Comment, Handoff, HandoffResult, HandoffStatus};

/// Partial update applied to a stored hand-off
#[derive(Debug, Clone, Default)]
pub struct HandoffPatch {
    pub status: Option<HandoffStatus>,
    pub operator_id: Option<Uuid>,
    pub operator_thread_id: Option<String>,
    pub assigned_at: Option<OffsetDateTime>,
    pub resolved_at: Option<OffsetDateTime>,
}

impl HandoffPatch {
    /// Fields written by a `pending -> assigned` transition
    pub fn assignment(
        operator_id: Uuid,
        operator_thread_id: impl Into<String>,
        at: OffsetDateTime,
    ) -> Self {
        Self {
            status: Some(HandoffStatus::Assigned),
            operator_id: Some(operator_id),
            operator_thread_id: Some(operator_thread_id.into()),
            assigned_at: Some(at),
            resolved_at: None,
        }
    }

    /// Fields written by a transition into `resolved`
    pub fn resolution(at: OffsetDateTime) -> Self {
        Self {
            status: Some(HandoffStatus::Resolved),
            resolved_at: Some(at),
            ..Self::default()
        }
    }

    /// Apply the patched fields to a record, leaving unset fields alone
    pub fn apply(&self, handoff: &mut Handoff) {
        if let Some(status) = self.status {
            handoff.status = status;
        }
        if let Some(operator_id) = self.operator_id {
            handoff.operator_id = Some(operator_id);
        }
        if let Some(ref thread_id) = self.operator_thread_id {
            handoff.operator_thread_id = Some(thread_id.clone());
        }
        if let Some(at) = self.assigned_at {
            handoff.assigned_at = Some(at);
        }
        if let Some(at) = self.resolved_at {
            handoff.resolved_at = Some(at);
        }
    }
}

/// Durable CRUD + query over hand-off records and their comments
#[async_trait]
pub trait HandoffStore: Send + Sync {
    /// Persist a new hand-off
    async fn insert(&self, handoff: &Handoff) -> HandoffResult<Handoff>;

    /// Fetch a hand-off by id within a tenant
    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> HandoffResult<Option<Handoff>>;

    /// All hand-offs whose user-thread or operator-thread matches `thread_id`
    async fn get_by_thread(&self, tenant_id: Uuid, thread_id: &str)
        -> HandoffResult<Vec<Handoff>>;

    /// Apply a partial update; NotFound when the id is unknown
    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: HandoffPatch,
    ) -> HandoffResult<Handoff>;

    /// Persist a comment against an existing hand-off
    async fn insert_comment(&self, comment: &Comment) -> HandoffResult<Comment>;

    /// Flip an operator's durable online flag
    async fn set_operator_online(
        &self,
        tenant_id: Uuid,
        operator_id: Uuid,
        online: bool,
    ) -> HandoffResult<()>;

    /// Read an operator's durable online flag
    async fn operator_online(&self, tenant_id: Uuid, operator_id: Uuid) -> HandoffResult<bool>;
}
