//! In-memory index of active hand-offs
//!
//! Maps conversation threads to the currently active hand-off so the
//! message-delivery path can decide in O(1) whether an inbound message
//! belongs to a hand-off and where to route it. The store stays
//! authoritative: the cache starts empty on restart and is repopulated
//! lazily, so it is always a subset of what the store reports as active.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use handraise_shared::Handoff;

/// Thread-safe index from (tenant, thread) to the active hand-off
///
/// Once assigned, a hand-off is reachable under both its user-thread and
/// operator-thread keys; routing must work from either side of the
/// conversation. Both keys are written and evicted under a single lock
/// guard so a reader never observes a half-applied transition.
pub struct ActiveHandoffCache {
    /// tenant -> thread -> active hand-off
    entries: RwLock<HashMap<Uuid, HashMap<String, Handoff>>>,
}

impl Default for ActiveHandoffCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveHandoffCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up the active hand-off indexed under a thread
    pub fn get(&self, tenant_id: Uuid, thread_id: &str) -> Option<Handoff> {
        let entries = self.entries.read().ok()?;
        entries.get(&tenant_id)?.get(thread_id).cloned()
    }

    /// Index a hand-off under its user thread and, when assigned, its
    /// operator thread
    pub fn insert(&self, handoff: &Handoff) {
        if let Ok(mut entries) = self.entries.write() {
            let threads = entries.entry(handoff.tenant_id).or_default();
            threads.insert(handoff.user_thread_id.clone(), handoff.clone());
            if let Some(ref operator_thread_id) = handoff.operator_thread_id {
                threads.insert(operator_thread_id.clone(), handoff.clone());
            }
        }
    }

    /// Evict a hand-off from both of its thread keys
    pub fn remove(&self, handoff: &Handoff) {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(threads) = entries.get_mut(&handoff.tenant_id) {
                threads.remove(&handoff.user_thread_id);
                if let Some(ref operator_thread_id) = handoff.operator_thread_id {
                    threads.remove(operator_thread_id);
                }
                if threads.is_empty() {
                    entries.remove(&handoff.tenant_id);
                }
            }
        }
    }

    /// Drop every entry for a tenant
    pub fn clear_tenant(&self, tenant_id: Uuid) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&tenant_id);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.read() {
            CacheStats {
                tenants: entries.len(),
                thread_keys: entries.values().map(|t| t.len()).sum(),
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Cache statistics
#[derive(Default, Debug)]
pub struct CacheStats {
    pub tenants: usize,
    pub thread_keys: usize,
}
