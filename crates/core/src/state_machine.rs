//! Hand-off lifecycle coordination
//!
//! Owns the `pending -> assigned -> resolved` state machine and mediates
//! every create/assign/resolve/comment intent: consults the active-handoff
//! cache and the store, applies transition rules, persists the result, keeps
//! the cache consistent and fans the change out.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use handraise_shared::{Channel, Comment, Handoff, HandoffError, HandoffResult, HandoffStatus};

use crate::cache::ActiveHandoffCache;
use crate::config::Config;
use crate::fanout::{ChangeEvent, FanoutHub};
use crate::messaging::{MessagingClient, NotifyPayload};
use crate::presence::PresenceManager;
use crate::store::{HandoffPatch, HandoffStore};

/// Coordinates hand-off state transitions across store, cache, presence and
/// fanout
pub struct HandoffStateMachine {
    store: Arc<dyn HandoffStore>,
    messaging: Arc<dyn MessagingClient>,
    cache: Arc<ActiveHandoffCache>,
    fanout: Arc<FanoutHub>,
    presence: Arc<PresenceManager>,
    config: Config,
}

impl HandoffStateMachine {
    pub fn new(
        store: Arc<dyn HandoffStore>,
        messaging: Arc<dyn MessagingClient>,
        cache: Arc<ActiveHandoffCache>,
        fanout: Arc<FanoutHub>,
        presence: Arc<PresenceManager>,
        config: Config,
    ) -> Self {
        Self {
            store,
            messaging,
            cache,
            fanout,
            presence,
            config,
        }
    }

    /// Request a hand-off for a user conversation
    ///
    /// Idempotent: when a non-terminal hand-off already exists for the same
    /// (tenant, user, thread, channel) tuple, that record is returned
    /// unchanged instead of an error - duplicate inbound triggers for one
    /// conversation are expected. The duplicate check is read-then-write,
    /// not a transactional compare-and-set: two identical creates racing
    /// from different processes can both pass it, and only a store-level
    /// uniqueness constraint would close that window.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        user_id: &str,
        user_thread_id: &str,
        user_channel: Channel,
    ) -> HandoffResult<Handoff> {
        if user_id.trim().is_empty() {
            return Err(HandoffError::Validation("user_id cannot be empty".into()));
        }
        if user_thread_id.trim().is_empty() {
            return Err(HandoffError::Validation(
                "user_thread_id cannot be empty".into(),
            ));
        }

        if let Some(existing) = self.cache.get(tenant_id, user_thread_id) {
            if existing.is_active()
                && existing.matches_conversation(user_id, user_thread_id, user_channel)
            {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    handoff_id = %existing.id,
                    "Duplicate hand-off trigger, returning cached active record"
                );
                return Ok(existing);
            }
        }

        let mut matches: Vec<Handoff> = self
            .store
            .get_by_thread(tenant_id, user_thread_id)
            .await?
            .into_iter()
            .filter(|h| {
                h.is_active() && h.matches_conversation(user_id, user_thread_id, user_channel)
            })
            .collect();
        matches.sort_by_key(|h| h.created_at);

        if let Some(existing) = matches.into_iter().next() {
            // Lazy cache repopulation - e.g. first hit after a restart
            self.cache.insert(&existing);
            tracing::debug!(
                tenant_id = %tenant_id,
                handoff_id = %existing.id,
                "Duplicate hand-off trigger, returning stored active record"
            );
            return Ok(existing);
        }

        let handoff = self
            .store
            .insert(&Handoff::new(tenant_id, user_id, user_thread_id, user_channel))
            .await?;
        self.cache.insert(&handoff);

        tracing::info!(
            tenant_id = %tenant_id,
            handoff_id = %handoff.id,
            user_thread_id = %handoff.user_thread_id,
            channel = %handoff.user_channel,
            "Hand-off created"
        );
        self.fanout
            .publish(tenant_id, ChangeEvent::handoff_created(&handoff))
            .await;
        Ok(handoff)
    }

    /// Assign a pending hand-off to an operator
    ///
    /// Opens a fresh operator-side conversation, re-indexes the cache under
    /// both thread keys, refreshes the operator's presence session, fans the
    /// update out and pushes context notifications into both conversations.
    pub async fn assign(
        &self,
        tenant_id: Uuid,
        handoff_id: Uuid,
        operator_id: Uuid,
    ) -> HandoffResult<Handoff> {
        let handoff = self.load(tenant_id, handoff_id).await?;
        ensure_transition(handoff.status, HandoffStatus::Assigned)?;

        let operator_thread_id = self
            .messaging
            .open_operator_conversation(tenant_id, operator_id)
            .await?;

        let updated = self
            .store
            .update(
                tenant_id,
                handoff_id,
                HandoffPatch::assignment(
                    operator_id,
                    operator_thread_id,
                    OffsetDateTime::now_utc(),
                ),
            )
            .await?;
        self.cache.insert(&updated);
        self.presence.extend(tenant_id, operator_id).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            handoff_id = %handoff_id,
            operator_id = %operator_id,
            "Hand-off assigned"
        );
        self.fanout
            .publish(tenant_id, ChangeEvent::handoff_updated(&updated))
            .await;
        self.spawn_context_notifications(&updated);
        Ok(updated)
    }

    /// Resolve a hand-off, ending the human conversation
    pub async fn resolve(&self, tenant_id: Uuid, handoff_id: Uuid) -> HandoffResult<Handoff> {
        let handoff = self.load(tenant_id, handoff_id).await?;
        ensure_transition(handoff.status, HandoffStatus::Resolved)?;

        let updated = self
            .store
            .update(
                tenant_id,
                handoff_id,
                HandoffPatch::resolution(OffsetDateTime::now_utc()),
            )
            .await?;
        // No longer active: evict from both thread keys
        self.cache.remove(&updated);

        if let Some(operator_id) = updated.operator_id {
            self.presence.extend(tenant_id, operator_id).await?;
        }

        tracing::info!(
            tenant_id = %tenant_id,
            handoff_id = %handoff_id,
            "Hand-off resolved"
        );
        self.fanout
            .publish(tenant_id, ChangeEvent::handoff_updated(&updated))
            .await;
        Ok(updated)
    }

    /// Attach an operator comment to an existing hand-off
    pub async fn comment(
        &self,
        tenant_id: Uuid,
        handoff_id: Uuid,
        operator_id: Uuid,
        body: &str,
    ) -> HandoffResult<Handoff> {
        if body.trim().is_empty() {
            return Err(HandoffError::Validation("body cannot be empty".into()));
        }
        if body.len() > self.config.max_comment_length {
            return Err(HandoffError::Validation(format!(
                "body too long (max {} bytes)",
                self.config.max_comment_length
            )));
        }

        let mut handoff = self.load(tenant_id, handoff_id).await?;
        let comment = self
            .store
            .insert_comment(&Comment::new(&handoff, operator_id, body))
            .await?;
        handoff.comments.push(comment);

        if handoff.is_active() {
            // Keep the cached routing copy in step with the store
            self.cache.insert(&handoff);
        }
        self.presence.extend(tenant_id, operator_id).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            handoff_id = %handoff_id,
            operator_id = %operator_id,
            "Comment added to hand-off"
        );
        self.fanout
            .publish(tenant_id, ChangeEvent::handoff_updated(&handoff))
            .await;
        Ok(handoff)
    }

    /// Routing lookup for the message-delivery path
    ///
    /// Cache hit first; on miss, falls back to the store (either thread
    /// side) and lazily re-inserts an active match, keeping the cache a
    /// subset of the store's active set.
    pub async fn lookup_active(
        &self,
        tenant_id: Uuid,
        thread_id: &str,
    ) -> HandoffResult<Option<Handoff>> {
        if let Some(handoff) = self.cache.get(tenant_id, thread_id) {
            if handoff.is_active() {
                return Ok(Some(handoff));
            }
        }

        let mut matches: Vec<Handoff> = self
            .store
            .get_by_thread(tenant_id, thread_id)
            .await?
            .into_iter()
            .filter(Handoff::is_active)
            .collect();
        matches.sort_by_key(|h| h.created_at);

        match matches.into_iter().next() {
            Some(handoff) => {
                self.cache.insert(&handoff);
                Ok(Some(handoff))
            }
            None => Ok(None),
        }
    }

    async fn load(&self, tenant_id: Uuid, handoff_id: Uuid) -> HandoffResult<Handoff> {
        self.store
            .get_by_id(tenant_id, handoff_id)
            .await?
            .ok_or_else(|| HandoffError::NotFound(format!("hand-off {handoff_id}")))
    }

    /// Push recent conversation history into both sides of a fresh
    /// assignment (fire and forget)
    fn spawn_context_notifications(&self, handoff: &Handoff) {
        let (Some(operator_id), Some(operator_thread_id)) =
            (handoff.operator_id, handoff.operator_thread_id.clone())
        else {
            return;
        };

        let messaging = Arc::clone(&self.messaging);
        let tenant_id = handoff.tenant_id;
        let handoff_id = handoff.id;
        let user_thread_id = handoff.user_thread_id.clone();
        let history_count = self.config.recent_history_count;

        tokio::spawn(async move {
            let history = match messaging
                .recent_events(tenant_id, &user_thread_id, history_count)
                .await
            {
                Ok(history) => history,
                Err(e) => {
                    tracing::error!(
                        error = ?e,
                        handoff_id = %handoff_id,
                        "Failed to fetch conversation history for assignment"
                    );
                    Vec::new()
                }
            };

            if let Err(e) = messaging
                .notify_conversation(
                    tenant_id,
                    &user_thread_id,
                    NotifyPayload::OperatorJoined {
                        handoff_id,
                        operator_id,
                        history: history.clone(),
                    },
                )
                .await
            {
                tracing::error!(
                    error = ?e,
                    handoff_id = %handoff_id,
                    "Failed to notify user conversation of assignment"
                );
            }

            if let Err(e) = messaging
                .notify_conversation(
                    tenant_id,
                    &operator_thread_id,
                    NotifyPayload::HandoffContext {
                        handoff_id,
                        user_thread_id,
                        history,
                    },
                )
                .await
            {
                tracing::error!(
                    error = ?e,
                    handoff_id = %handoff_id,
                    "Failed to notify operator conversation of assignment"
                );
            }
        });
    }
}

fn ensure_transition(from: HandoffStatus, to: HandoffStatus) -> HandoffResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(HandoffError::IllegalTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_transition_rejects_terminal() {
        let err = ensure_transition(HandoffStatus::Resolved, HandoffStatus::Assigned)
            .expect_err("terminal status must not transition");
        match err {
            HandoffError::IllegalTransition { from, to } => {
                assert_eq!(from, HandoffStatus::Resolved);
                assert_eq!(to, HandoffStatus::Assigned);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ensure_transition_rejects_reassignment() {
        assert!(ensure_transition(HandoffStatus::Assigned, HandoffStatus::Assigned).is_err());
        assert!(ensure_transition(HandoffStatus::Pending, HandoffStatus::Assigned).is_ok());
    }
}
