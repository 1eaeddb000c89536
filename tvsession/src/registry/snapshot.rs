use crate::source::ChannelId;
use serde::Serialize;

/// Immutable read model of the shared session, republished on every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayerSnapshot {
	pub is_playing: bool,
	pub is_buffering: bool,
	pub is_play_ready: bool,
	pub position_ms: i64,
	pub duration_ms: i64,
	pub error: Option<String>,
	pub is_retrying: bool,
	/// Reload attempts since playback was last ready. Never capped, so callers can stop on their own.
	pub retry_attempts: u64,
	pub retrying_since_ms: Option<i64>,
	pub channel_id: Option<ChannelId>,
	pub channel_name: Option<String>,
	/// Trick-play ran into the end of a recording; the UI may offer to jump to live.
	pub live_jump_offered: bool,
}
