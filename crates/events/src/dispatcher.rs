//! Notification delivery with duplicate suppression and bounded retry.
//!
//! [`NotificationDispatcher`] takes a [`NotificationIntent`], resolves
//! it against live remote state, renders the embed, and sends it.
//! Failure handling is per-class:
//!
//! - permanent resolution failures (missing/forbidden entities, wrong
//!   channel type) skip the intent silently and still suppress its key,
//!   so a structurally broken rule does not hammer the API on every
//!   event;
//! - transient resolution failures propagate unmarked and become
//!   eligible again on the next event;
//! - rate-limited sends wait the signalled backoff and retry exactly
//!   once; transient send failures retry on a linear backoff up to two
//!   more times; both surface the final error when exhausted.

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use joinwatch_gateway::{Channel, ChatGateway, EmbedField, EmbedMessage, GatewayError, Member};

use crate::intent::NotificationIntent;
use crate::suppression::{Clock, SuppressionKey, SuppressionMap, SystemClock};

/// Unit of the platform's rate-limit `retry_after` signal.
///
/// Some platforms signal milliseconds, others seconds; this is
/// configuration, not an assumption baked into the retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfterUnit {
    Millis,
    Seconds,
}

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// TTL of the duplicate-suppression window.
    pub duplicate_window: Duration,
    /// Backoff used when a rate-limit signal carries no usable delay.
    pub rate_limit_fallback: Duration,
    pub retry_after_unit: RetryAfterUnit,
    /// Linear backoff step for transient send retries (`attempt × step`).
    pub transient_backoff_step: Duration,
    /// Additional attempts after a transient send failure.
    pub transient_retries: u32,
    /// Timezone label rendered next to the send time.
    pub timezone_label: String,
    /// Offset applied to the rendered send time, minutes east of UTC.
    pub utc_offset_minutes: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            duplicate_window: Duration::from_millis(5000),
            rate_limit_fallback: Duration::from_millis(1000),
            retry_after_unit: RetryAfterUnit::Millis,
            transient_backoff_step: Duration::from_millis(1000),
            transient_retries: 2,
            timezone_label: "UTC".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

/// Errors surfaced to the caller of `send_notification`.
///
/// Permanent resolution failures never appear here; they are absorbed
/// as silent skips.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A remote lookup failed transiently; nothing was sent and the
    /// key was not suppressed.
    #[error("Transient resolution failure: {0}")]
    Resolution(GatewayError),

    /// Both the rate-limited attempt and its single retry failed.
    #[error("Rate-limit retry exhausted: {0}")]
    RateLimitExhausted(GatewayError),

    /// The send failed after exhausting its retry budget (or failed
    /// permanently, which is not retried).
    #[error("Send failed: {0}")]
    SendFailed(GatewayError),
}

/// Outcome classification for one resolution step.
enum ResolveFailure {
    Permanent(String),
    Transient(GatewayError),
}

impl From<GatewayError> for ResolveFailure {
    fn from(e: GatewayError) -> Self {
        if e.is_permanent() {
            ResolveFailure::Permanent(e.to_string())
        } else {
            // Rate limits during resolution are treated as transient:
            // nothing was sent, so the next event may retry.
            ResolveFailure::Transient(e)
        }
    }
}

/// Remote state gathered before rendering.
struct ResolvedIntent {
    voice_channel: Channel,
    member: Member,
}

/// Delivers notification intents to the platform.
pub struct NotificationDispatcher {
    gateway: Arc<dyn ChatGateway>,
    config: DispatcherConfig,
    suppression: SuppressionMap,
    render_offset: FixedOffset,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn ChatGateway>, config: DispatcherConfig) -> Self {
        Self::with_clock(gateway, config, Arc::new(SystemClock))
    }

    /// Construct with an injected clock for deterministic window tests.
    pub fn with_clock(
        gateway: Arc<dyn ChatGateway>,
        config: DispatcherConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let suppression = SuppressionMap::new(config.duplicate_window, clock);
        let render_offset =
            FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| {
                tracing::warn!(
                    utc_offset_minutes = config.utc_offset_minutes,
                    "Configured UTC offset out of range, rendering times in UTC"
                );
                Utc.fix()
            });
        Self {
            gateway,
            config,
            suppression,
            render_offset,
        }
    }

    /// Deliver one intent, idempotent by suppression.
    ///
    /// Returns `Ok(())` for successful sends, window-suppressed
    /// duplicates, and permanently skipped intents alike; only
    /// retry-worthy failures surface as errors.
    pub async fn send_notification(&self, intent: &NotificationIntent) -> Result<(), DispatchError> {
        let key = SuppressionKey {
            destination_channel_id: intent.destination_channel_id.clone(),
            user_id: intent.user_id.clone(),
            watched_channel_id: intent.watched_channel_id.clone(),
        };
        if self.suppression.is_suppressed(&key) {
            tracing::debug!(
                destination = %intent.destination_channel_id,
                user_id = %intent.user_id,
                "Duplicate notification inside window, skipping"
            );
            return Ok(());
        }

        let resolved = match self.resolve(intent).await {
            Ok(resolved) => resolved,
            Err(ResolveFailure::Permanent(reason)) => {
                tracing::warn!(
                    guild_id = %intent.guild_id,
                    rule_id = %intent.rule_id,
                    destination = %intent.destination_channel_id,
                    reason,
                    "Permanent resolution failure, suppressing intent"
                );
                // Suppress so a structurally broken rule is not
                // re-resolved on every join within the window.
                self.suppression.mark(key);
                return Ok(());
            }
            Err(ResolveFailure::Transient(e)) => return Err(DispatchError::Resolution(e)),
        };

        let message = self.render(intent, &resolved);
        self.send_with_retry(&intent.destination_channel_id, &message)
            .await?;

        self.suppression.mark(key);
        Ok(())
    }

    /// Cancel all pending suppression state. In-flight sends are not
    /// interrupted; they complete or fail naturally.
    pub fn cleanup(&self) {
        self.suppression.cleanup();
    }

    /// Look up guild, voice channel, member, and destination, in that
    /// order, classifying each failure.
    async fn resolve(&self, intent: &NotificationIntent) -> Result<ResolvedIntent, ResolveFailure> {
        // The guild lookup only verifies the owner still exists.
        self.gateway.get_guild(&intent.guild_id).await?;

        let voice_channel = self
            .gateway
            .get_guild_channel(&intent.guild_id, &intent.watched_channel_id)
            .await?;
        if !voice_channel.is_voice() {
            return Err(ResolveFailure::Permanent(format!(
                "watched channel {} is not a voice channel",
                voice_channel.id
            )));
        }

        let member = self
            .gateway
            .get_member(&intent.guild_id, &intent.user_id)
            .await?;

        let destination = self
            .gateway
            .get_channel(&intent.destination_channel_id)
            .await?;
        if !destination.is_text() {
            return Err(ResolveFailure::Permanent(format!(
                "destination channel {} is not a text channel",
                destination.id
            )));
        }

        Ok(ResolvedIntent {
            voice_channel,
            member,
        })
    }

    /// Build the embed for a resolved intent.
    fn render(&self, intent: &NotificationIntent, resolved: &ResolvedIntent) -> EmbedMessage {
        let now = Utc::now();
        let local = now.with_timezone(&self.render_offset);

        EmbedMessage {
            title: intent.rule_name.clone(),
            author_name: resolved.member.display_name.clone(),
            author_icon_url: resolved.member.avatar_url.clone(),
            fields: vec![
                EmbedField {
                    name: "Voice channel".to_string(),
                    value: resolved.voice_channel.name.clone(),
                },
                EmbedField {
                    name: "Time".to_string(),
                    value: format!(
                        "{} {}",
                        local.format("%Y-%m-%d %H:%M:%S"),
                        self.config.timezone_label
                    ),
                },
            ],
            footer: format!("Rule {}", intent.rule_id),
            timestamp: now.to_rfc3339(),
        }
    }

    /// Send with the per-class retry policy.
    async fn send_with_retry(
        &self,
        channel_id: &str,
        message: &EmbedMessage,
    ) -> Result<(), DispatchError> {
        let first = match self.gateway.send_message(channel_id, message).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if first.is_rate_limit() {
            // Wait the server-specified backoff and retry exactly once.
            let delay = self.rate_limit_delay(&first);
            tracing::warn!(
                channel_id,
                delay_ms = delay.as_millis() as u64,
                "Send rate limited, retrying once after backoff"
            );
            tokio::time::sleep(delay).await;
            return self
                .gateway
                .send_message(channel_id, message)
                .await
                .map_err(DispatchError::RateLimitExhausted);
        }

        if !first.is_transient() {
            return Err(DispatchError::SendFailed(first));
        }

        // Linear backoff: attempt × step.
        let mut last = first;
        for attempt in 1..=self.config.transient_retries {
            let delay = self.config.transient_backoff_step * attempt;
            tracing::warn!(
                channel_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last,
                "Transient send failure, retrying"
            );
            tokio::time::sleep(delay).await;
            match self.gateway.send_message(channel_id, message).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => last = e,
                // A non-transient failure mid-chain ends the retries.
                Err(e) => return Err(DispatchError::SendFailed(e)),
            }
        }
        Err(DispatchError::SendFailed(last))
    }

    /// Delay for a rate-limited send: the signalled value in the
    /// configured unit, or the fallback when missing or non-finite.
    fn rate_limit_delay(&self, error: &GatewayError) -> Duration {
        let GatewayError::RateLimited { retry_after } = error else {
            return self.config.rate_limit_fallback;
        };
        match retry_after {
            Some(value) if value.is_finite() && *value >= 0.0 => match self.config.retry_after_unit
            {
                RetryAfterUnit::Millis => Duration::from_millis(*value as u64),
                RetryAfterUnit::Seconds => Duration::from_secs_f64(*value),
            },
            _ => self.config.rate_limit_fallback,
        }
    }
}
