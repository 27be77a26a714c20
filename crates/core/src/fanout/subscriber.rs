//! One live subscriber to a tenant's change feed

use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ChangeEvent;

/// Handle for a connected subscriber
///
/// Events are pushed through an unbounded channel, so delivery to one
/// subscriber is in-order and never blocks the publisher.
#[derive(Debug)]
pub struct Subscriber {
    /// Unique id for this subscription
    pub subscriber_id: Uuid,

    /// Tenant scope this subscriber sees events for
    pub tenant_id: Uuid,

    /// Channel to push events to the consumer
    sender: mpsc::UnboundedSender<ChangeEvent>,
}

impl Subscriber {
    pub(crate) fn new(tenant_id: Uuid, sender: mpsc::UnboundedSender<ChangeEvent>) -> Self {
        Self {
            subscriber_id: Uuid::new_v4(),
            tenant_id,
            sender,
        }
    }

    /// Push an event to this subscriber
    ///
    /// Returns Err when the consumer side is gone.
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ChangeEvent) -> Result<(), mpsc::error::SendError<ChangeEvent>> {
        self.sender.send(event)
    }

    /// Whether the consumer side has hung up
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
