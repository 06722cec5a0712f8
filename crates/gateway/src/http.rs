//! REST adapter for the platform HTTP API.
//!
//! [`HttpGateway`] implements [`ChatGateway`] over `reqwest`, mapping
//! HTTP statuses onto the [`GatewayError`] classes and keeping a
//! process-local cache of guild-channel lookups (the hot path during
//! dispatch). Retry is NOT handled here; the dispatcher owns the retry
//! policy and this adapter reports each failure exactly once.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::client::ChatGateway;
use crate::error::GatewayError;
use crate::types::{Channel, ChannelKind, EmbedMessage, Guild, Member};

/// HTTP request timeout for a single API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ChatGateway`] backed by the platform REST API.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
    // (guild_id, channel_id) -> resolved channel.
    channel_cache: RwLock<HashMap<(String, String), Channel>>,
}

impl HttpGateway {
    /// Create an adapter for the API at `base_url` using a bot token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            channel_cache: RwLock::new(HashMap::new()),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        entity: &str,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response, entity).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Network(format!("malformed response body: {e}")))
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn get_guild(&self, guild_id: &str) -> Result<Guild, GatewayError> {
        let payload: GuildPayload = self
            .get_json(&format!("/guilds/{guild_id}"), "guild")
            .await?;
        Ok(Guild {
            id: payload.id,
            name: payload.name,
        })
    }

    async fn get_guild_channel(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Channel, GatewayError> {
        let key = (guild_id.to_string(), channel_id.to_string());
        if let Some(channel) = self.channel_cache.read().await.get(&key) {
            return Ok(channel.clone());
        }

        let channel = self.get_channel(channel_id).await?;
        if channel.guild_id != guild_id {
            return Err(GatewayError::NotFound(format!(
                "channel {channel_id} in guild {guild_id}"
            )));
        }
        self.channel_cache.write().await.insert(key, channel.clone());
        tracing::debug!(guild_id, channel_id, "Cached guild channel lookup");
        Ok(channel)
    }

    async fn get_member(&self, guild_id: &str, user_id: &str) -> Result<Member, GatewayError> {
        let payload: MemberPayload = self
            .get_json(&format!("/guilds/{guild_id}/members/{user_id}"), "member")
            .await?;
        Ok(Member {
            display_name: payload
                .nick
                .unwrap_or_else(|| payload.user.username.clone()),
            user_id: payload.user.id,
            avatar_url: payload.user.avatar_url,
        })
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, GatewayError> {
        let payload: ChannelPayload = self
            .get_json(&format!("/channels/{channel_id}"), "channel")
            .await?;
        Ok(Channel {
            id: payload.id,
            guild_id: payload.guild_id.unwrap_or_default(),
            name: payload.name,
            kind: channel_kind(payload.kind),
        })
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &EmbedMessage,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let body = serde_json::json!({
            "embeds": [{
                "title": message.title,
                "author": {
                    "name": message.author_name,
                    "icon_url": message.author_icon_url,
                },
                "fields": message.fields.iter().map(|f| {
                    serde_json::json!({ "name": f.name, "value": f.value })
                }).collect::<Vec<_>>(),
                "footer": { "text": message.footer },
                "timestamp": message.timestamp,
            }],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;
        check_status(response, "destination channel").await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GuildPayload {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ChannelPayload {
    id: String,
    guild_id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Deserialize)]
struct MemberPayload {
    user: UserPayload,
    nick: Option<String>,
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    username: String,
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

/// Map the platform's numeric channel type onto [`ChannelKind`].
fn channel_kind(wire_type: u8) -> ChannelKind {
    match wire_type {
        0 => ChannelKind::Text,
        2 => ChannelKind::Voice,
        _ => ChannelKind::Other,
    }
}

// ---------------------------------------------------------------------------
// Status / error mapping
// ---------------------------------------------------------------------------

/// Classify a non-success response into a [`GatewayError`].
async fn check_status(
    response: reqwest::Response,
    entity: &str,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status.as_u16() {
        429 => {
            let retry_after = response
                .json::<RateLimitBody>()
                .await
                .ok()
                .and_then(|b| b.retry_after);
            Err(GatewayError::RateLimited { retry_after })
        }
        403 => Err(GatewayError::Forbidden(entity.to_string())),
        404 => Err(GatewayError::NotFound(entity.to_string())),
        s if status.is_server_error() => Err(GatewayError::Server { status: s }),
        s => Err(GatewayError::Network(format!("unexpected HTTP {s}"))),
    }
}

fn map_request_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_mapping() {
        assert_eq!(channel_kind(0), ChannelKind::Text);
        assert_eq!(channel_kind(2), ChannelKind::Voice);
        assert_eq!(channel_kind(13), ChannelKind::Other);
    }

    #[test]
    fn new_normalizes_trailing_slash() {
        let gateway = HttpGateway::new("https://api.example.test/", "token").unwrap();
        assert_eq!(gateway.base_url, "https://api.example.test");
    }
}
