use crate::repository::{Repository, RepositoryError, ResolvedStream};
use crate::source::{ChannelId, MovieId, PlaybackSource, Program};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct FakeRepositoryLog {
	pub resolutions: Vec<String>,
	pub saved_positions: HashMap<MovieId, i64>,
	pub history: Vec<ChannelId>,
	pub program_updates: Vec<ChannelId>,
	pub maintenance_runs: usize,
	pub current_programs: HashMap<ChannelId, Program>,
	pub fail_resolution: bool,
}

/// Resolves sources to predictable urls. Resolution of a url can be held back with
/// [`FakeRepository::gate`] until [`FakeRepository::open_gate`] is called.
#[derive(Clone, Default)]
pub struct FakeRepository {
	log: Arc<Mutex<FakeRepositoryLog>>,
	gates: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
}

impl FakeRepository {
	pub fn log(&self) -> MutexGuard<'_, FakeRepositoryLog> {
		self.log.lock()
	}

	pub fn gate(&self, url: &str) {
		self.gates.lock().insert(url.to_string(), Arc::default());
	}

	pub fn open_gate(&self, url: &str) {
		if let Some(gate) = self.gates.lock().remove(url) {
			gate.notify_one();
		}
	}

	pub fn url_of(source: &PlaybackSource) -> String {
		match source {
			PlaybackSource::Channel(channel) => match (channel.program(), channel.start_abs_time()) {
				(Some(program), _) => format!("http://tv/{}/archive/{}.m3u8", channel.id(), program.start_time),
				(None, Some(start_abs_time)) => format!("http://tv/{}/shift/{start_abs_time}.m3u8", channel.id()),
				(None, None) => format!("http://tv/{}/live.m3u8", channel.id()),
			},
			PlaybackSource::Movie(movie) => format!("http://vod/{}.mp4", movie.movie_id),
		}
	}
}

#[async_trait]
impl Repository for FakeRepository {
	async fn resolve_stream_url(&self, source: &PlaybackSource) -> Result<ResolvedStream, RepositoryError> {
		let url = Self::url_of(source);
		let gate = self.gates.lock().get(&url).cloned();
		if let Some(gate) = gate {
			gate.notified().await;
		}

		let mut log = self.log();
		log.resolutions.push(url.clone());
		if log.fail_resolution {
			return Err(RepositoryError::NotFound);
		}

		Ok(ResolvedStream {
			url,
			is_vod: matches!(source, PlaybackSource::Movie(_)),
		})
	}

	fn save_resume_position(&self, movie_id: &MovieId, position: i64) {
		self.log().saved_positions.insert(movie_id.clone(), position);
	}

	fn record_channel_history(&self, channel_id: &ChannelId) {
		self.log().history.push(channel_id.clone());
	}

	fn periodic_maintenance(&self) {
		self.log().maintenance_runs += 1;
	}

	fn saved_resume_position(&self, movie_id: &MovieId) -> Option<i64> {
		self.log().saved_positions.get(movie_id).copied()
	}

	fn current_program(&self, channel_id: &ChannelId) -> Option<Program> {
		self.log().current_programs.get(channel_id).cloned()
	}

	fn trigger_program_update(&self, channel_id: &ChannelId) {
		self.log().program_updates.push(channel_id.clone());
	}
}
