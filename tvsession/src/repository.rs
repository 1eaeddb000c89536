use crate::source::{ChannelId, MovieId, PlaybackSource, Program};
use async_trait::async_trait;
use static_assertions::assert_obj_safe;

/// A playable stream for a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedStream {
	pub url: String,
	pub is_vod: bool,
}

/// Catalog and persistence the session relies on.
///
/// Only URL resolution may take a while. The other calls are made while the session state is
/// locked and must return promptly, implementations queue slow writes themselves.
#[async_trait]
pub trait Repository: Send + Sync {
	async fn resolve_stream_url(&self, source: &PlaybackSource) -> Result<ResolvedStream, RepositoryError>;

	fn save_resume_position(&self, movie_id: &MovieId, position: i64);
	fn record_channel_history(&self, channel_id: &ChannelId);
	/// Memory and cache housekeeping, called on a coarse interval.
	fn periodic_maintenance(&self);

	fn saved_resume_position(&self, _movie_id: &MovieId) -> Option<i64> {
		None
	}

	/// The program on air right now, used when switching to a neighbouring channel.
	fn current_program(&self, _channel_id: &ChannelId) -> Option<Program> {
		None
	}

	/// Asks the catalog to refresh the schedule of a channel that is about to play.
	fn trigger_program_update(&self, _channel_id: &ChannelId) {}
}

assert_obj_safe!(Repository);

/// Type erased error that works for all kinds of repository implementations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
	#[error("Entity not found")]
	NotFound,
	#[error("Invalid stream url: {0}")]
	InvalidUrl(String),
	#[error("Connection error: {0}")]
	Connection(anyhow::Error),
}
