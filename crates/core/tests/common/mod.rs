//! In-memory doubles for the store and messaging collaborators

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use handraise_core::{
    ActiveHandoffCache, ChangeEvent, Config, ConversationEvent, FanoutHub, HandoffPatch,
    HandoffStateMachine, HandoffStore, MessagingClient, NotifyPayload, PresenceManager,
};
use handraise_shared::{Comment, Handoff, HandoffError, HandoffResult};

// =============================================================================
// Store double
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    handoffs: Mutex<HashMap<Uuid, Handoff>>,
    presence: Mutex<HashMap<(Uuid, Uuid), bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-terminal hand-offs stored for a tenant
    pub fn active_count(&self, tenant_id: Uuid) -> usize {
        self.handoffs
            .lock()
            .unwrap()
            .values()
            .filter(|h| h.tenant_id == tenant_id && h.is_active())
            .count()
    }
}

#[async_trait]
impl HandoffStore for MemoryStore {
    async fn insert(&self, handoff: &Handoff) -> HandoffResult<Handoff> {
        self.handoffs
            .lock()
            .unwrap()
            .insert(handoff.id, handoff.clone());
        Ok(handoff.clone())
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> HandoffResult<Option<Handoff>> {
        Ok(self
            .handoffs
            .lock()
            .unwrap()
            .get(&id)
            .filter(|h| h.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_by_thread(
        &self,
        tenant_id: Uuid,
        thread_id: &str,
    ) -> HandoffResult<Vec<Handoff>> {
        Ok(self
            .handoffs
            .lock()
            .unwrap()
            .values()
            .filter(|h| {
                h.tenant_id == tenant_id
                    && (h.user_thread_id == thread_id
                        || h.operator_thread_id.as_deref() == Some(thread_id))
            })
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: HandoffPatch,
    ) -> HandoffResult<Handoff> {
        let mut handoffs = self.handoffs.lock().unwrap();
        let handoff = handoffs
            .get_mut(&id)
            .filter(|h| h.tenant_id == tenant_id)
            .ok_or_else(|| HandoffError::NotFound(format!("hand-off {id}")))?;
        patch.apply(handoff);
        Ok(handoff.clone())
    }

    async fn insert_comment(&self, comment: &Comment) -> HandoffResult<Comment> {
        let mut handoffs = self.handoffs.lock().unwrap();
        let handoff = handoffs
            .get_mut(&comment.handoff_id)
            .ok_or_else(|| HandoffError::NotFound(format!("hand-off {}", comment.handoff_id)))?;
        handoff.comments.push(comment.clone());
        Ok(comment.clone())
    }

    async fn set_operator_online(
        &self,
        tenant_id: Uuid,
        operator_id: Uuid,
        online: bool,
    ) -> HandoffResult<()> {
        self.presence
            .lock()
            .unwrap()
            .insert((tenant_id, operator_id), online);
        Ok(())
    }

    async fn operator_online(&self, tenant_id: Uuid, operator_id: Uuid) -> HandoffResult<bool> {
        Ok(self
            .presence
            .lock()
            .unwrap()
            .get(&(tenant_id, operator_id))
            .copied()
            .unwrap_or(false))
    }
}

// =============================================================================
// Messaging double
// =============================================================================

#[derive(Default)]
pub struct MemoryMessaging {
    thread_counter: AtomicUsize,
    /// (thread_id, payload) pairs in delivery order
    pub notifications: Mutex<Vec<(String, NotifyPayload)>>,
}

impl MemoryMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingClient for MemoryMessaging {
    async fn open_operator_conversation(
        &self,
        _tenant_id: Uuid,
        _operator_id: Uuid,
    ) -> HandoffResult<String> {
        let n = self.thread_counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!("op-thread-{n}"))
    }

    async fn notify_conversation(
        &self,
        _tenant_id: Uuid,
        thread_id: &str,
        payload: NotifyPayload,
    ) -> HandoffResult<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((thread_id.to_string(), payload));
        Ok(())
    }

    async fn recent_events(
        &self,
        _tenant_id: Uuid,
        thread_id: &str,
        count: usize,
    ) -> HandoffResult<Vec<ConversationEvent>> {
        let event = ConversationEvent {
            thread_id: thread_id.to_string(),
            sender: "user".to_string(),
            body: "I need a human".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        Ok(std::iter::repeat(event).take(count.min(2)).collect())
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub messaging: Arc<MemoryMessaging>,
    pub cache: Arc<ActiveHandoffCache>,
    pub fanout: Arc<FanoutHub>,
    pub presence: Arc<PresenceManager>,
    pub machine: HandoffStateMachine,
}

pub fn harness() -> Harness {
    harness_with_config(Config::default())
}

pub fn harness_with_config(config: Config) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let messaging = Arc::new(MemoryMessaging::new());
    let cache = Arc::new(ActiveHandoffCache::new());
    let fanout = Arc::new(FanoutHub::new());
    let presence = Arc::new(PresenceManager::new(
        Arc::clone(&store) as Arc<dyn HandoffStore>,
        Arc::clone(&fanout),
        config.clone(),
    ));
    let machine = HandoffStateMachine::new(
        Arc::clone(&store) as Arc<dyn HandoffStore>,
        Arc::clone(&messaging) as Arc<dyn MessagingClient>,
        Arc::clone(&cache),
        Arc::clone(&fanout),
        Arc::clone(&presence),
        config,
    );

    Harness {
        store,
        messaging,
        cache,
        fanout,
        presence,
        machine,
    }
}

/// Drain everything currently buffered on a subscriber channel
pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
