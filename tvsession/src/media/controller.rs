use crate::configuration::Configuration;
use crate::media::engine::{EngineEnvelope, EngineEventSender, EngineFactory, EngineState, MediaEngine};
use crate::media::error::MediaError;
use crate::media::track::{AudioTrack, VideoGeometry, language_of_locale, preferred_audio_languages};
use crate::utils::time_source::TimeSource;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// The stream currently handed to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenStream {
	pub url: String,
	pub is_vod: bool,
	pub start_position: Option<i64>,
}

/// Owns one media engine and offers playback control that knows nothing about channels or movies.
pub struct MediaSessionController {
	factory: Arc<dyn EngineFactory>,
	event_sender: mpsc::UnboundedSender<EngineEnvelope>,
	generation: u64,
	engine: Option<Box<dyn MediaEngine>>,
	stream: Option<OpenStream>,
	current_error: Option<MediaError>,
	audio_tracks: watch::Sender<Vec<AudioTrack>>,
	selected_audio_track: Option<AudioTrack>,
	last_preferred_language: Option<String>,
	last_user_audio_track_change: Option<i64>,
	system_language: Option<String>,
	fallback_audio_language: String,
	video_geometry: Option<VideoGeometry>,
	time_source: TimeSource,
}

impl MediaSessionController {
	pub(crate) fn new(
		factory: Arc<dyn EngineFactory>,
		event_sender: mpsc::UnboundedSender<EngineEnvelope>,
		configuration: &Configuration,
		time_source: TimeSource,
	) -> Self {
		let system_language = configuration
			.system_language
			.clone()
			.or_else(|| sys_locale::get_locale().and_then(|locale| language_of_locale(&locale)));

		Self {
			factory,
			event_sender,
			generation: 0,
			engine: None,
			stream: None,
			current_error: None,
			audio_tracks: watch::channel(Vec::new()).0,
			selected_audio_track: None,
			last_preferred_language: None,
			last_user_audio_track_change: None,
			system_language,
			fallback_audio_language: configuration.fallback_audio_language.clone(),
			video_geometry: None,
			time_source,
		}
	}

	/// Creates the engine unless there already is one.
	pub fn initialize(&mut self) -> anyhow::Result<()> {
		if self.engine.is_some() {
			return Ok(());
		}

		let generation = self.generation + 1;
		let engine = self
			.factory
			.create(EngineEventSender::new(generation, self.event_sender.clone()))?;
		self.generation = generation;
		self.engine = Some(engine);
		info!(generation, "Created media engine");
		Ok(())
	}

	pub fn is_initialized(&self) -> bool {
		self.engine.is_some()
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub(crate) fn accepts_generation(&self, generation: u64) -> bool {
		self.engine.is_some() && generation == self.generation
	}

	/// Opens `url` unless it is already open. Failures to set up the stream become the current
	/// error and are returned so the caller can start recovery.
	pub fn open_stream(
		&mut self,
		url: &str,
		is_vod: bool,
		start_position: Option<i64>,
		pause_after: Option<bool>,
	) -> Result<(), MediaError> {
		if self.stream.as_ref().is_some_and(|stream| stream.url == url) {
			debug!(url, "Stream is already open");
			return Ok(());
		}

		if let Err(error) = self.initialize() {
			return Err(self.fail(error));
		}

		self.stop_engine();
		self.stream = None;
		self.select_audio_track(None, false);

		let languages = preferred_audio_languages(
			self.last_preferred_language.as_deref(),
			self.system_language.as_deref(),
			&self.fallback_audio_language,
		);
		let Some(engine) = self.engine.as_mut() else {
			return Ok(());
		};
		engine.set_preferred_audio_languages(&languages);

		info!(url, is_vod, ?start_position, "Opening stream");
		if let Err(error) = engine.open(url, is_vod, start_position) {
			return Err(self.fail(error));
		}
		if let Some(pause_after) = pause_after {
			engine.set_play_when_ready(!pause_after);
		}
		engine.prepare();

		self.stream = Some(OpenStream {
			url: url.to_string(),
			is_vod,
			start_position,
		});
		Ok(())
	}

	fn fail(&mut self, error: anyhow::Error) -> MediaError {
		let error = MediaError::from(error);
		error!(%error, "Failed to open stream");
		self.current_error = Some(error.clone());
		error
	}

	pub fn close_stream(&mut self) {
		self.current_error = None;
		if let Some(stream) = self.stream.take() {
			info!(url = %stream.url, "Closing stream");
		}
		self.stop_engine();
		self.select_audio_track(None, false);
		self.audio_tracks.send_replace(Vec::new());
		self.video_geometry = None;
	}

	fn stop_engine(&mut self) {
		self.current_error = None;
		if let Some(engine) = self.engine.as_mut() {
			engine.stop();
		}
	}

	pub fn stream(&self) -> Option<&OpenStream> {
		self.stream.as_ref()
	}

	pub fn current_error(&self) -> Option<&MediaError> {
		self.current_error.as_ref()
	}

	pub(crate) fn report_error(&mut self, error: MediaError) {
		warn!(%error, class = ?error.class(), "Media engine reported an error");
		self.current_error = Some(error);
	}

	fn engine_state(&self) -> EngineState {
		self.engine.as_ref().map(|engine| engine.state()).unwrap_or_default()
	}

	pub fn is_play_ready(&self) -> bool {
		self.stream.is_some() && self.engine_state() == EngineState::Ready
	}

	pub fn is_buffering(&self) -> bool {
		self.engine_state() == EngineState::Buffering
	}

	pub fn is_playback_ended(&self) -> bool {
		self.engine_state() == EngineState::Ended
	}

	pub fn total_buffered_duration(&self) -> i64 {
		self.engine
			.as_ref()
			.map(|engine| engine.total_buffered_duration())
			.unwrap_or_default()
	}

	pub fn live_offset(&self) -> Option<i64> {
		self.engine.as_ref().and_then(|engine| engine.live_offset())
	}

	pub fn position(&self) -> i64 {
		self.engine
			.as_ref()
			.map(|engine| engine.current_position())
			.unwrap_or_default()
	}

	pub fn duration(&self) -> i64 {
		self.engine.as_ref().map(|engine| engine.duration()).unwrap_or_default()
	}

	pub fn seek_to(&mut self, position: i64) {
		if let Some(engine) = self.engine.as_mut() {
			engine.seek_to(position);
		}
	}

	/// Paused means the engine won't play once it is ready. Without an engine that's always the case.
	pub fn pause(&self) -> bool {
		!self.engine.as_ref().is_some_and(|engine| engine.play_when_ready())
	}

	pub fn set_pause(&mut self, pause: bool) {
		if let Some(engine) = self.engine.as_mut() {
			engine.set_play_when_ready(!pause);
		}
	}

	/// `None` goes back to the engine's own choice. A choice made by the user becomes the most
	/// preferred language for following streams.
	pub fn select_audio_track(&mut self, track: Option<AudioTrack>, from_user: bool) {
		if from_user {
			self.last_user_audio_track_change = Some(self.time_source.now_milliseconds());
			if let Some(language) = track.as_ref().and_then(|track| track.language.clone()) {
				self.last_preferred_language = Some(language);
			}
		}

		if let Some(engine) = self.engine.as_mut() {
			engine.select_audio_track(track.as_ref().map(|track| &track.id));
		}
		self.selected_audio_track = track;
	}

	pub fn selected_audio_track(&self) -> Option<&AudioTrack> {
		self.selected_audio_track.as_ref()
	}

	pub fn audio_tracks(&self) -> Vec<AudioTrack> {
		self.audio_tracks.borrow().clone()
	}

	pub fn subscribe_audio_tracks(&self) -> watch::Receiver<Vec<AudioTrack>> {
		self.audio_tracks.subscribe()
	}

	pub(crate) fn update_audio_tracks(&mut self, tracks: Vec<AudioTrack>) {
		self.selected_audio_track = tracks.iter().find(|track| track.is_selected).cloned();
		self.audio_tracks.send_replace(tracks);
	}

	/// Milliseconds since the unix epoch of the last audio track change made by the user.
	pub fn last_user_audio_track_change(&self) -> Option<i64> {
		self.last_user_audio_track_change
	}

	pub fn video_geometry(&self) -> Option<VideoGeometry> {
		self.video_geometry
	}

	pub(crate) fn set_video_geometry(&mut self, width: u32, height: u32) {
		self.video_geometry = Some(VideoGeometry { width, height });
	}

	/// Jumps back to the live edge and prepares again, keeping the open stream.
	pub fn restart_stream(&mut self) {
		if let Some(engine) = self.engine.as_mut() {
			info!("Restarting stream at its default position");
			self.current_error = None;
			engine.seek_to_default_position();
			engine.prepare();
		}
	}

	/// Replaces the engine with a fresh one. Returns the stream that was open, with the position
	/// it had reached, so the caller can restore it.
	pub fn reinit(&mut self) -> Option<OpenStream> {
		let position = self.position();
		let saved_stream = self.stream.clone().map(|stream| OpenStream {
			start_position: Some(position),
			..stream
		});

		self.destroy();
		if let Err(error) = self.initialize() {
			self.fail(error);
		}
		saved_stream
	}

	pub fn destroy(&mut self) {
		self.close_stream();
		if let Some(mut engine) = self.engine.take() {
			engine.release();
			info!(generation = self.generation, "Released media engine");
		}
	}
}
