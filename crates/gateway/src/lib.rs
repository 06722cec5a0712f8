//! Capability interface over the remote chat platform.
//!
//! The notifier core only ever reads a handful of fields from remote
//! guilds, channels, and members, so the platform SDK is abstracted
//! behind the minimal [`ChatGateway`] trait. [`HttpGateway`] is the
//! REST adapter; tests substitute their own implementations.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::ChatGateway;
pub use error::GatewayError;
pub use http::HttpGateway;
pub use types::{Channel, ChannelKind, EmbedField, EmbedMessage, Guild, Member};
