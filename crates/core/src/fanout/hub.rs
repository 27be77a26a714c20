//! Tenant-scoped subscriber registry and publish loop

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::ChangeEvent;
use super::subscriber::Subscriber;

/// Publishes change events to all live subscribers of a tenant
pub struct FanoutHub {
    /// Map of tenant_id -> list of subscribers
    tenants: RwLock<HashMap<Uuid, Vec<Arc<Subscriber>>>>,
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new()
    }
}

impl FanoutHub {
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Register a subscriber for a tenant's change feed
    ///
    /// Returns the subscriber handle and the receiving end of its channel.
    pub async fn subscribe(
        &self,
        tenant_id: Uuid,
    ) -> (Arc<Subscriber>, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Arc::new(Subscriber::new(tenant_id, tx));

        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id)
            .or_default()
            .push(Arc::clone(&subscriber));

        tracing::debug!(
            tenant_id = %tenant_id,
            subscriber_id = %subscriber.subscriber_id,
            feed_size = tenants.get(&tenant_id).map(|s| s.len()).unwrap_or(0),
            "Subscriber joined tenant feed"
        );

        (subscriber, rx)
    }

    /// Drop a subscriber from a tenant's change feed
    pub async fn unsubscribe(&self, tenant_id: Uuid, subscriber_id: Uuid) {
        let mut tenants = self.tenants.write().await;
        if let Some(subscribers) = tenants.get_mut(&tenant_id) {
            subscribers.retain(|s| s.subscriber_id != subscriber_id);
            if subscribers.is_empty() {
                tenants.remove(&tenant_id);
            }
            tracing::debug!(
                tenant_id = %tenant_id,
                subscriber_id = %subscriber_id,
                "Subscriber left tenant feed"
            );
        }
    }

    /// Broadcast an event to every subscriber of a tenant
    ///
    /// Best-effort at-most-once: send errors are counted and logged, never
    /// propagated. Subscribers not connected at publish time miss the event.
    pub async fn publish(&self, tenant_id: Uuid, event: ChangeEvent) {
        let tenants = self.tenants.read().await;
        let Some(subscribers) = tenants.get(&tenant_id) else {
            tracing::debug!(
                tenant_id = %tenant_id,
                event_id = %event.id,
                "No subscribers for tenant - event dropped"
            );
            return;
        };

        let mut delivered = 0;
        let mut failed = 0;
        for subscriber in subscribers {
            match subscriber.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    failed += 1;
                    tracing::warn!(
                        subscriber_id = %subscriber.subscriber_id,
                        "Failed to send event to subscriber (likely disconnected)"
                    );
                }
            }
        }

        tracing::debug!(
            tenant_id = %tenant_id,
            resource = ?event.resource,
            kind = ?event.kind,
            event_id = %event.id,
            delivered,
            failed,
            "Published change event"
        );
    }

    /// Drop subscribers whose consumer side has hung up
    pub async fn prune_closed(&self) {
        let mut tenants = self.tenants.write().await;
        for subscribers in tenants.values_mut() {
            subscribers.retain(|s| !s.is_closed());
        }
        tenants.retain(|_, subscribers| !subscribers.is_empty());
    }

    /// Number of live subscribers for a tenant
    pub async fn subscriber_count(&self, tenant_id: Uuid) -> usize {
        let tenants = self.tenants.read().await;
        tenants.get(&tenant_id).map(|s| s.len()).unwrap_or(0)
    }
}
