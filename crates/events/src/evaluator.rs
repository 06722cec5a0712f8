//! Join-event evaluation and notification fan-out.
//!
//! [`JoinEvaluator`] sits between the gateway subscription and the
//! dispatcher. Every presence transition is classified; only genuine
//! joins are evaluated against the owner's rules, matches are
//! deduplicated by destination channel, and the resulting intents are
//! dispatched concurrently with settle-all semantics. No failure on
//! this path ever escapes to the event loop.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use joinwatch_core::presence::{classify, VoiceTransition};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{DispatchError, NotificationDispatcher};
use crate::intent::{NotificationIntent, PresenceUpdate};
use crate::service::RuleService;

/// Delivery seam between the evaluator and the dispatcher. Tests
/// substitute a recording implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(&self, intent: &NotificationIntent) -> Result<(), DispatchError>;
}

#[async_trait]
impl Notifier for NotificationDispatcher {
    async fn send_notification(&self, intent: &NotificationIntent) -> Result<(), DispatchError> {
        NotificationDispatcher::send_notification(self, intent).await
    }
}

/// Evaluates presence transitions and fans matching intents out.
pub struct JoinEvaluator {
    rules: RuleService,
    notifier: Arc<dyn Notifier>,
}

impl JoinEvaluator {
    pub fn new(rules: RuleService, notifier: Arc<dyn Notifier>) -> Self {
        Self { rules, notifier }
    }

    /// Process one presence transition.
    ///
    /// Leaves, moves, and no-op transitions return immediately with no
    /// side effects. Rule lookup failures are logged and abort the
    /// event; dispatch failures are logged per intent and never block
    /// sibling intents.
    pub async fn handle_presence(&self, event: &PresenceUpdate) {
        let channel_id = match classify(
            event.previous_channel_id.as_deref(),
            event.new_channel_id.as_deref(),
        ) {
            VoiceTransition::Join { channel_id } => channel_id,
            _ => return,
        };

        let matched = match self
            .rules
            .applicable_rules(&event.guild_id, &channel_id, &event.user_id)
            .await
        {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(
                    guild_id = %event.guild_id,
                    channel_id = %channel_id,
                    error = %e,
                    "Rule lookup failed, skipping join event"
                );
                return;
            }
        };
        if matched.is_empty() {
            return;
        }

        // One intent per distinct destination; the earliest-created
        // matching rule claims it.
        let mut claimed = HashSet::new();
        let intents: Vec<NotificationIntent> = matched
            .into_iter()
            .filter(|rule| claimed.insert(rule.destination_channel_id.clone()))
            .map(|rule| NotificationIntent {
                guild_id: event.guild_id.clone(),
                watched_channel_id: channel_id.clone(),
                user_id: event.user_id.clone(),
                destination_channel_id: rule.destination_channel_id.clone(),
                rule_id: rule.id,
                rule_name: rule.name,
            })
            .collect();

        // Settle-all: every intent runs to completion regardless of
        // sibling failures.
        let sends = intents.iter().map(|intent| async move {
            if let Err(e) = self.notifier.send_notification(intent).await {
                tracing::error!(
                    guild_id = %intent.guild_id,
                    watched_channel_id = %intent.watched_channel_id,
                    destination = %intent.destination_channel_id,
                    rule_id = %intent.rule_id,
                    error = %e,
                    "Notification dispatch failed"
                );
            }
        });
        futures::future::join_all(sends).await;
    }

    /// Run the evaluation loop over a gateway subscription.
    ///
    /// Exits when the channel closes or the token is cancelled. Lagged
    /// receivers log the number of skipped events and keep going.
    pub async fn run(&self, mut receiver: broadcast::Receiver<PresenceUpdate>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Join evaluator cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.handle_presence(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Join evaluator lagged, presence events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Presence stream closed, join evaluator shutting down");
                        break;
                    }
                },
            }
        }
    }
}
