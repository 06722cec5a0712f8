//! Remote entity shapes, reduced to the fields the notifier reads.

use serde::{Deserialize, Serialize};

/// A guild (server/community) on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
}

/// Channel classification, collapsed to what dispatch cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Voice,
    Text,
    Other,
}

/// A channel within a guild.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn is_voice(&self) -> bool {
        self.kind == ChannelKind::Voice
    }

    pub fn is_text(&self) -> bool {
        self.kind == ChannelKind::Text
    }
}

/// A guild member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// One name/value pair inside an embed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// The structured message payload accepted by `send_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedMessage {
    pub title: String,
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: String,
    /// ISO-8601 timestamp attached to the embed.
    pub timestamp: String,
}
