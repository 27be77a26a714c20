//! Change event envelope and serialization

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use handraise_shared::{Handoff, OperatorPresence};

/// Resource a change event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Handoff,
    Agent,
}

/// Kind of mutation behind a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
}

/// Envelope published to subscribers for every mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub resource: Resource,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub id: Uuid,
    pub payload: serde_json::Value,
}

impl ChangeEvent {
    /// Event for a freshly created hand-off
    pub fn handoff_created(handoff: &Handoff) -> Self {
        Self::for_handoff(ChangeKind::Create, handoff)
    }

    /// Event for a mutated hand-off (assignment, resolution, comment)
    pub fn handoff_updated(handoff: &Handoff) -> Self {
        Self::for_handoff(ChangeKind::Update, handoff)
    }

    fn for_handoff(kind: ChangeKind, handoff: &Handoff) -> Self {
        Self {
            resource: Resource::Handoff,
            kind,
            id: handoff.id,
            payload: to_payload(handoff),
        }
    }

    /// Event for an operator presence change
    pub fn presence_updated(presence: &OperatorPresence) -> Self {
        Self {
            resource: Resource::Agent,
            kind: ChangeKind::Update,
            id: presence.operator_id,
            payload: to_payload(presence),
        }
    }
}

fn to_payload<T: Serialize>(value: &T) -> serde_json::Value {
    match serde_json::to_value(value) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to serialize fanout payload");
            serde_json::Value::Null
        }
    }
}
