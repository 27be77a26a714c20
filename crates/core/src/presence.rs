//! Operator presence sessions
//!
//! An operator is online exactly while a live session timer is registered
//! for them. Every qualifying operator action (assign, resolve, comment, or
//! an explicit ping) rearms the timer; when it fires with no activity in
//! between, the operator flips offline and the change is fanned out.
//!
//! The timer registry is instance state: separate managers (other tenants,
//! test instances) never interfere with each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use uuid::Uuid;

use handraise_shared::{HandoffResult, OperatorPresence};

use crate::config::Config;
use crate::fanout::{ChangeEvent, FanoutHub};
use crate::store::HandoffStore;

/// Registry entry for one operator's session timer
struct TimerSlot {
    /// Monotonic rearm counter; a firing task only acts when its epoch is
    /// still the registered one, so a superseded timer can never expire the
    /// session even if the abort lost the race
    epoch: u64,
    handle: JoinHandle<()>,
}

/// Tracks operator online/offline state and owns the session timers
pub struct PresenceManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn HandoffStore>,
    fanout: Arc<FanoutHub>,
    config: Config,
    /// (tenant, operator) -> live timer; at most one per operator
    timers: Mutex<HashMap<(Uuid, Uuid), TimerSlot>>,
    next_epoch: AtomicU64,
}

impl PresenceManager {
    pub fn new(store: Arc<dyn HandoffStore>, fanout: Arc<FanoutHub>, config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fanout,
                config,
                timers: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Mark an operator online and (re)arm their session timer
    ///
    /// Any previous timer for the operator is superseded first; there is
    /// never more than one live timer per operator.
    pub async fn set_online(&self, tenant_id: Uuid, operator_id: Uuid) -> HandoffResult<()> {
        self.inner
            .store
            .set_operator_online(tenant_id, operator_id, true)
            .await?;
        self.inner.arm_timer(tenant_id, operator_id);
        Ok(())
    }

    /// Refresh an operator's session window; called on every qualifying
    /// operator action
    pub async fn extend(&self, tenant_id: Uuid, operator_id: Uuid) -> HandoffResult<()> {
        self.set_online(tenant_id, operator_id).await
    }

    /// Mark an operator offline and cancel their timer
    ///
    /// Idempotent: going offline twice stores the flag again but emits no
    /// second fanout event.
    pub async fn set_offline(&self, tenant_id: Uuid, operator_id: Uuid) -> HandoffResult<()> {
        self.inner.cancel_timer(tenant_id, operator_id);

        let was_online = self
            .inner
            .store
            .operator_online(tenant_id, operator_id)
            .await?;
        self.inner
            .store
            .set_operator_online(tenant_id, operator_id, false)
            .await?;

        if was_online {
            tracing::info!(
                tenant_id = %tenant_id,
                operator_id = %operator_id,
                "Operator went offline"
            );
            self.inner.publish_offline(tenant_id, operator_id).await;
        }
        Ok(())
    }

    /// Read the operator's durable online flag
    pub async fn is_online(&self, tenant_id: Uuid, operator_id: Uuid) -> HandoffResult<bool> {
        self.inner.store.operator_online(tenant_id, operator_id).await
    }
}

impl Inner {
    fn arm_timer(self: &Arc<Self>, tenant_id: Uuid, operator_id: Uuid) {
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };

        // The registry lock is held across spawn + insert, so the new task
        // cannot observe the map before its own slot is registered.
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.session_timeout_for(tenant_id);
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            inner.expire(tenant_id, operator_id, epoch).await;
        });

        if let Some(old) = timers.insert((tenant_id, operator_id), TimerSlot { epoch, handle }) {
            old.handle.abort();
        }
    }

    fn cancel_timer(&self, tenant_id: Uuid, operator_id: Uuid) {
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };
        if let Some(slot) = timers.remove(&(tenant_id, operator_id)) {
            slot.handle.abort();
        }
    }

    /// Timer callback: flip the operator offline unless superseded
    async fn expire(self: Arc<Self>, tenant_id: Uuid, operator_id: Uuid, epoch: u64) {
        {
            let Ok(mut timers) = self.timers.lock() else {
                return;
            };
            match timers.get(&(tenant_id, operator_id)) {
                Some(slot) if slot.epoch == epoch => {
                    timers.remove(&(tenant_id, operator_id));
                }
                // Rearmed or cancelled while this task was sleeping
                _ => return,
            }
        }

        // An explicit set_offline may have raced the timer; re-read before
        // flipping anything.
        match self.store.operator_online(tenant_id, operator_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    operator_id = %operator_id,
                    "Session timer fired for operator already offline"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    tenant_id = %tenant_id,
                    operator_id = %operator_id,
                    "Failed to read operator presence on session expiry"
                );
                return;
            }
        }

        // A rearm that slipped in after this timer was dequeued wins; the
        // fresh session keeps the operator online.
        if let Ok(timers) = self.timers.lock() {
            if timers.contains_key(&(tenant_id, operator_id)) {
                return;
            }
        }

        if let Err(e) = self
            .store
            .set_operator_online(tenant_id, operator_id, false)
            .await
        {
            tracing::error!(
                error = ?e,
                tenant_id = %tenant_id,
                operator_id = %operator_id,
                "Failed to mark operator offline on session expiry"
            );
            return;
        }

        tracing::info!(
            tenant_id = %tenant_id,
            operator_id = %operator_id,
            "Operator session expired"
        );
        self.publish_offline(tenant_id, operator_id).await;
    }

    async fn publish_offline(&self, tenant_id: Uuid, operator_id: Uuid) {
        let presence = OperatorPresence {
            tenant_id,
            operator_id,
            online: false,
        };
        self.fanout
            .publish(tenant_id, ChangeEvent::presence_updated(&presence))
            .await;
    }
}
