//! The [`ChatGateway`] capability trait.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{Channel, EmbedMessage, Guild, Member};

/// Minimal request/response surface the notifier needs from the
/// platform. Adapters implement this per SDK; tests provide mocks.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Resolve a guild by id.
    async fn get_guild(&self, guild_id: &str) -> Result<Guild, GatewayError>;

    /// Resolve a channel within a guild. Adapters may serve this from a
    /// cache; it is the hot path during dispatch.
    async fn get_guild_channel(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Channel, GatewayError>;

    /// Resolve a member of a guild by user id.
    async fn get_member(&self, guild_id: &str, user_id: &str) -> Result<Member, GatewayError>;

    /// Resolve a channel globally (used for destination channels, which
    /// may live outside the join's guild).
    async fn get_channel(&self, channel_id: &str) -> Result<Channel, GatewayError>;

    /// Post an embed message to a channel.
    async fn send_message(
        &self,
        channel_id: &str,
        message: &EmbedMessage,
    ) -> Result<(), GatewayError>;
}
