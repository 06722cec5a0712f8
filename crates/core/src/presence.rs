//! Voice presence-transition classification.
//!
//! A presence update carries the previous and new voice channel, either
//! of which may be absent. Only a genuine join (no previous channel,
//! some new channel) triggers rule evaluation; leaves and moves between
//! channels are ignored by the notifier.

/// Classification of a single voice presence transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceTransition {
    /// The user connected to a voice channel from nothing.
    Join { channel_id: String },
    /// The user disconnected from voice entirely.
    Leave,
    /// The user moved between two different voice channels.
    Move,
    /// No observable channel change (both sides equal or both absent).
    NoChange,
}

/// Classify a `(previous, new)` channel pair.
pub fn classify(previous: Option<&str>, new: Option<&str>) -> VoiceTransition {
    match (previous, new) {
        (None, Some(channel)) => VoiceTransition::Join {
            channel_id: channel.to_string(),
        },
        (Some(_), None) => VoiceTransition::Leave,
        (Some(prev), Some(next)) if prev != next => VoiceTransition::Move,
        _ => VoiceTransition::NoChange,
    }
}
