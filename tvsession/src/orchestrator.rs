use crate::configuration::{Configuration, milliseconds};
use crate::error::TvSessionError;
use crate::media::controller::{MediaSessionController, OpenStream};
use crate::media::engine::{EngineEnvelope, EngineEvent, EngineFactory};
use crate::media::error::{ErrorClass, MediaError};
use crate::media::track::{AudioTrack, VideoGeometry};
use crate::orchestrator::load_job::{LoadJob, LoadOptions};
use crate::orchestrator::retry::{RetryState, should_delay_retry};
use crate::orchestrator::seek_process::{SeekDirection, SeekProcess, SeekRejection};
use crate::registry::snapshot::PlayerSnapshot;
use crate::repository::{Repository, RepositoryError, ResolvedStream};
use crate::source::position::Position;
use crate::source::{ChannelSource, MovieSource, PlaybackSource};
use crate::utils::time_source::TimeSource;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub mod load_job;
pub mod retry;
pub mod seek_process;

const RETRY_DELAY: &str = "retry_delay";

/// Turns playback sources into a running stream and keeps it running.
///
/// The orchestrator is a cheap handle; clones share the same session. Engine events are applied
/// one at a time by a background task, and every operation takes the same lock, so session state
/// is never mutated concurrently.
#[derive(Clone)]
pub struct PlaybackOrchestrator {
	inner: Arc<Inner>,
}

struct Inner {
	state: Mutex<State>,
	repository: Arc<dyn Repository>,
	configuration: Configuration,
	time_source: TimeSource,
	runtime: Handle,
	source: watch::Sender<Option<PlaybackSource>>,
}

struct State {
	controller: MediaSessionController,
	source: Option<PlaybackSource>,
	load_job: Option<LoadJob>,
	seek_process: Option<SeekProcess>,
	retry: RetryState,
	play_ready_ticks: u64,
	history_recorded: bool,
	playback_ended_handled: bool,
	live_jump_offered: bool,
	released: bool,
	event_pump: Option<AbortHandle>,
}

impl PlaybackOrchestrator {
	/// Must be called from within a tokio runtime. The engine is created by [`Self::initialize`]
	/// or, at the latest, by the first stream that gets opened.
	pub fn new(
		factory: Arc<dyn EngineFactory>,
		repository: Arc<dyn Repository>,
		configuration: Configuration,
		time_source: TimeSource,
	) -> Result<Self, TvSessionError> {
		let runtime = Handle::try_current()?;
		let (event_sender, event_receiver) = mpsc::unbounded_channel();
		let controller = MediaSessionController::new(factory, event_sender, &configuration, time_source.clone());

		let inner = Arc::new(Inner {
			state: Mutex::new(State::new(controller)),
			repository,
			configuration,
			time_source,
			runtime,
			source: watch::channel(None).0,
		});
		let event_pump = inner
			.runtime
			.spawn(pump_engine_events(Arc::downgrade(&inner), event_receiver));
		inner.state.lock().event_pump = Some(event_pump.abort_handle());

		Ok(Self { inner })
	}

	pub fn initialize(&self) -> Result<(), TvSessionError> {
		self.inner
			.state
			.lock()
			.controller
			.initialize()
			.map_err(TvSessionError::EngineConstruction)
	}

	/// Whether the orchestrator still owns a working engine.
	pub fn is_initialized(&self) -> bool {
		let state = self.inner.state.lock();
		!state.released && state.controller.is_initialized()
	}

	pub fn is_released(&self) -> bool {
		self.inner.state.lock().released
	}

	pub fn play(&self, source: impl Into<PlaybackSource>) {
		self.load(source, LoadOptions::default());
	}

	pub fn play_channel(&self, channel: ChannelSource) {
		self.play(channel);
	}

	pub fn play_movie(&self, movie: MovieSource) {
		self.play(movie);
	}

	/// Resolves the url of `source` in a new load job, cancelling the one in flight.
	pub fn load(&self, source: impl Into<PlaybackSource>, options: LoadOptions) {
		let mut state = self.inner.state.lock();
		if state.released {
			warn!("Ignoring load of a released orchestrator");
			return;
		}
		self.inner.load(&mut state, source.into(), options);
	}

	pub fn open_playback_source(
		&self,
		source: impl Into<PlaybackSource>,
		url: &str,
		is_vod: bool,
		position: Option<i64>,
		pause_after: Option<bool>,
	) {
		let mut state = self.inner.state.lock();
		if state.released {
			return;
		}
		self.inner
			.open_playback_source(&mut state, source.into(), url, is_vod, position, pause_after);
	}

	pub fn close_playback_source(&self) {
		let mut state = self.inner.state.lock();
		self.inner.close_playback_source(&mut state);
	}

	/// Plays the neighbouring channel of the current one and returns it.
	pub fn jump_channel(&self, direction: isize) -> Option<PlaybackSource> {
		let mut state = self.inner.state.lock();
		self.inner.jump_channel(&mut state, direction)
	}

	/// Health tick. Counts ready time, advances trick-play and records watch history.
	pub fn tick(&self) {
		let mut state = self.inner.state.lock();
		if state.released {
			return;
		}
		self.inner.tick(&mut state);
	}

	pub fn handle_error(&self, immediate: bool) {
		let mut state = self.inner.state.lock();
		self.inner.handle_error(&mut state, immediate);
	}

	/// While trick-play runs this is the pause state that will be restored afterwards.
	pub fn pause(&self) -> bool {
		self.inner.state.lock().pause()
	}

	pub fn set_pause(&self, pause: bool) {
		let mut state = self.inner.state.lock();
		self.inner.set_pause(&mut state, pause);
	}

	pub fn seek_direction(&self) -> SeekDirection {
		self.inner.state.lock().seek_direction()
	}

	/// Starts, reverses or (with [`SeekDirection::None`]) commits trick-play.
	pub fn set_seek_direction(&self, direction: SeekDirection) -> Result<(), SeekRejection> {
		let mut state = self.inner.state.lock();
		self.inner.set_seek_direction(&mut state, direction)
	}

	pub fn target_seek(&self) -> Position {
		let state = self.inner.state.lock();
		self.inner.target_seek(&state)
	}

	pub fn user_readable_position(&self) -> Position {
		let state = self.inner.state.lock();
		self.inner.user_readable_position(&state)
	}

	pub fn select_audio_track(&self, track: Option<AudioTrack>) {
		self.inner.state.lock().controller.select_audio_track(track, true);
	}

	pub fn audio_tracks(&self) -> Vec<AudioTrack> {
		self.inner.state.lock().controller.audio_tracks()
	}

	pub fn subscribe_audio_tracks(&self) -> watch::Receiver<Vec<AudioTrack>> {
		self.inner.state.lock().controller.subscribe_audio_tracks()
	}

	pub fn video_geometry(&self) -> Option<VideoGeometry> {
		self.inner.state.lock().controller.video_geometry()
	}

	pub fn current_source(&self) -> Option<PlaybackSource> {
		self.inner.state.lock().source.clone()
	}

	pub fn subscribe_source(&self) -> watch::Receiver<Option<PlaybackSource>> {
		self.inner.source.subscribe()
	}

	pub fn is_playing_or_planning(&self) -> bool {
		let state = self.inner.state.lock();
		state.source.is_some() || state.load_job.is_some()
	}

	pub fn current_error(&self) -> Option<MediaError> {
		self.inner.state.lock().controller.current_error().cloned()
	}

	pub fn is_retrying(&self) -> bool {
		self.inner.state.lock().retry.is_retrying()
	}

	pub fn retry_attempts(&self) -> u64 {
		self.inner.state.lock().retry.attempts()
	}

	pub fn play_ready_ticks(&self) -> u64 {
		self.inner.state.lock().play_ready_ticks
	}

	pub fn is_play_ready(&self) -> bool {
		self.inner.state.lock().controller.is_play_ready()
	}

	pub fn live_jump_offered(&self) -> bool {
		self.inner.state.lock().live_jump_offered
	}

	pub fn snapshot(&self) -> PlayerSnapshot {
		let state = self.inner.state.lock();
		self.inner.snapshot(&state)
	}

	/// Stops everything and destroys the engine. The orchestrator can't be used afterwards.
	pub fn release(&self) {
		let mut state = self.inner.state.lock();
		self.inner.release(&mut state);
	}
}

async fn pump_engine_events(inner: Weak<Inner>, mut events: mpsc::UnboundedReceiver<EngineEnvelope>) {
	while let Some(envelope) = events.recv().await {
		let Some(inner) = inner.upgrade() else {
			break;
		};
		inner.handle_engine_event(envelope);
	}
}

impl State {
	fn new(controller: MediaSessionController) -> Self {
		Self {
			controller,
			source: None,
			load_job: None,
			seek_process: None,
			retry: RetryState::default(),
			play_ready_ticks: 0,
			history_recorded: false,
			playback_ended_handled: false,
			live_jump_offered: false,
			released: false,
			event_pump: None,
		}
	}

	fn channel(&self) -> Option<&ChannelSource> {
		self.source.as_ref().and_then(PlaybackSource::as_channel)
	}

	fn pause(&self) -> bool {
		match self.seek_process {
			Some(process) => process.pause_before_process(),
			None => self.controller.pause(),
		}
	}

	fn seek_direction(&self) -> SeekDirection {
		self.seek_process
			.map_or(SeekDirection::None, |process| process.direction())
	}

	/// Ends trick-play without committing its target, optionally seeking somewhere else.
	fn discard_seek_process(&mut self, seek: Option<i64>) {
		let Some(process) = self.seek_process.take() else {
			return;
		};
		if let Some(seek) = seek {
			self.controller.seek_to(seek);
		}
		self.controller.set_pause(process.pause_before_process());
	}
}

impl Inner {
	fn now(&self) -> i64 {
		self.time_source.now_milliseconds()
	}

	fn handle_engine_event(self: &Arc<Self>, envelope: EngineEnvelope) {
		let mut state = self.state.lock();
		if state.released || !state.controller.accepts_generation(envelope.generation) {
			debug!(generation = envelope.generation, "Dropping event of a replaced engine");
			return;
		}

		match envelope.event {
			EngineEvent::StateChanged(engine_state) => {
				debug!(?engine_state, "Engine state changed");
				self.on_player_change(&mut state);
			}
			EngineEvent::Error(error) => {
				state.controller.report_error(error);
				state.discard_seek_process(None);
				self.handle_error(&mut state, false);
			}
			EngineEvent::TracksChanged(tracks) => state.controller.update_audio_tracks(tracks),
			EngineEvent::VideoGeometryChanged { width, height } => {
				state.controller.set_video_geometry(width, height);
			}
		}
	}

	fn on_player_change(self: &Arc<Self>, state: &mut State) {
		if state.controller.is_play_ready() {
			if state.retry.is_retrying() {
				info!(attempts = state.retry.attempts(), "Playback recovered");
			}
			state.retry.reset();
		}

		if !state.controller.is_playback_ended() {
			state.playback_ended_handled = false;
			return;
		}
		if state.playback_ended_handled {
			return;
		}
		state.playback_ended_handled = true;

		self.commit_seek_process(state, None);
		if state.load_job.is_some() {
			return;
		}
		if let Some(live_channel) = state.channel().map(ChannelSource::live_instance) {
			info!(channel = %live_channel.id(), "Playback ended, returning to live");
			self.load(state, live_channel.into(), LoadOptions::default());
		}
	}

	fn load(self: &Arc<Self>, state: &mut State, source: PlaybackSource, options: LoadOptions) {
		let job = LoadJob::new();
		let job_id = job.id();
		let token = job.token();
		if state.load_job.replace(job).is_some() {
			debug!("Replaced load job in flight");
		}

		info!(source = source.title(), ?options, "Loading playback source");
		if options.close_before_load {
			self.close_stream_prepare_source(state, source.clone());
		}

		let inner = Arc::clone(self);
		self.runtime.spawn(async move {
			let resolved = tokio::select! {
				() = token.cancelled() => {
					debug!(source = source.title(), "Load job cancelled while resolving url");
					return;
				}
				resolved = inner.repository.resolve_stream_url(&source) => resolved,
			};
			inner.finish_load(job_id, &token, source, resolved, options);
		});
	}

	fn finish_load(
		self: &Arc<Self>,
		job_id: Uuid,
		token: &CancellationToken,
		source: PlaybackSource,
		resolved: Result<ResolvedStream, RepositoryError>,
		options: LoadOptions,
	) {
		let mut state = self.state.lock();
		if token.is_cancelled() || state.released {
			debug!(source = source.title(), "Load job cancelled before opening the stream");
			return;
		}
		if state.load_job.as_ref().is_some_and(|job| job.id() == job_id) {
			state.load_job = None;
		}

		let stream = match resolved {
			Ok(stream) => stream,
			Err(error) => {
				error!(%error, source = source.title(), "Failed to resolve stream url");
				if state.retry.is_retrying() {
					warn!(attempts = state.retry.attempts(), "Giving up retrying without a stream url");
					state.retry.reset();
				}
				return;
			}
		};

		if options.discard_seek_process {
			state.discard_seek_process(None);
		}
		let start_position = match &source {
			PlaybackSource::Channel(channel) => channel.start_position(),
			PlaybackSource::Movie(movie) => {
				movie.start_position(self.repository.saved_resume_position(&movie.movie_id))
			}
		};
		let channel_id = source.as_channel().map(|channel| channel.id().clone());

		self.open_playback_source(
			&mut state,
			source,
			&stream.url,
			stream.is_vod,
			start_position,
			options.pause_after,
		);
		if let Some(channel_id) = channel_id {
			self.repository.trigger_program_update(&channel_id);
		}
	}

	fn open_playback_source(
		self: &Arc<Self>,
		state: &mut State,
		source: PlaybackSource,
		url: &str,
		is_vod: bool,
		position: Option<i64>,
		pause_after: Option<bool>,
	) {
		self.close_stream_prepare_source(state, source);
		if state.controller.open_stream(url, is_vod, position, pause_after).is_err() {
			self.handle_error(state, false);
		}
	}

	/// Closes the running stream and shows `source` as the current one.
	fn close_stream_prepare_source(&self, state: &mut State, source: PlaybackSource) {
		if state.source.is_some() {
			self.on_pre_stream_close(state);
		}
		state.controller.close_stream();
		self.install_source(state, Some(source));
	}

	fn close_playback_source(&self, state: &mut State) {
		if state.source.is_some() {
			self.on_pre_stream_close(state);
		}
		state.load_job = None;
		state.discard_seek_process(None);
		state.controller.close_stream();
		self.install_source(state, None);
	}

	fn install_source(&self, state: &mut State, source: Option<PlaybackSource>) {
		let same_channel = match (state.channel(), source.as_ref().and_then(PlaybackSource::as_channel)) {
			(Some(current), Some(new)) => current.id() == new.id(),
			_ => false,
		};
		if !same_channel {
			state.history_recorded = false;
		}
		state.play_ready_ticks = 0;
		state.playback_ended_handled = false;
		state.live_jump_offered = false;
		state.source.clone_from(&source);
		self.source.send_replace(source);
	}

	fn on_pre_stream_close(&self, state: &mut State) {
		let movie_id = state
			.source
			.as_ref()
			.and_then(PlaybackSource::as_movie)
			.map(|movie| movie.movie_id.clone());

		match movie_id {
			Some(movie_id) => {
				let position = state.controller.position();
				if position > 0 && !state.controller.is_playback_ended() {
					debug!(movie = %movie_id, position, "Saving resume position");
					self.repository.save_resume_position(&movie_id, position);
				}
			}
			None => self.record_history_if_watched(state),
		}
	}

	fn record_history_if_watched(&self, state: &mut State) {
		if state.history_recorded {
			return;
		}

		let ready_time = i64::try_from(state.play_ready_ticks)
			.unwrap_or(i64::MAX)
			.saturating_mul(milliseconds(self.configuration.tick_interval));
		if ready_time <= milliseconds(self.configuration.history_threshold) {
			return;
		}

		let Some(channel) = state.channel() else {
			return;
		};
		info!(channel = %channel.id(), "Recording channel history");
		self.repository.record_channel_history(channel.id());
		state.history_recorded = true;
	}

	fn jump_channel(self: &Arc<Self>, state: &mut State, direction: isize) -> Option<PlaybackSource> {
		let neighbour = state
			.channel()?
			.neighbour(direction, |channel_id| self.repository.current_program(channel_id))?;
		info!(channel = %neighbour.id(), direction, "Jumping to neighbouring channel");

		let source = PlaybackSource::from(neighbour);
		self.load(state, source.clone(), LoadOptions::default());
		Some(source)
	}

	fn target_seek(&self, state: &State) -> Position {
		let now = self.now();
		let untimed_channel = state.channel().filter(|channel| !channel.has_start_and_duration());

		match (state.seek_process, untimed_channel) {
			(Some(process), Some(_)) => Position::Absolute {
				utc: process.target(now, self.configuration.seek_velocity),
			},
			(Some(process), None) => Position::SeekAndDuration {
				seek: process.target(now, self.configuration.seek_velocity),
				duration: state.controller.duration(),
			}
			.fix(),
			(None, Some(channel)) => Position::Absolute {
				utc: now
					- state
						.controller
						.live_offset()
						.or(channel.start_live_offset())
						.unwrap_or_default(),
			},
			(None, None) => Position::SeekAndDuration {
				seek: state.controller.position(),
				duration: state.controller.duration(),
			}
			.fix(),
		}
	}

	/// Positions on channels without timeline, made relative to the program on air.
	fn user_readable_position(&self, state: &State) -> Position {
		let position = self.target_seek(state);
		match (position, state.channel().and_then(ChannelSource::live_program)) {
			(Position::Absolute { utc }, Some(program)) => Position::SeekAndDuration {
				seek: utc - program.start_time,
				duration: program.duration(),
			},
			_ => position,
		}
	}

	fn set_pause(self: &Arc<Self>, state: &mut State, pause: bool) {
		if state.pause() == pause {
			return;
		}

		if state.controller.current_error().is_some() {
			state.discard_seek_process(None);
			state.controller.set_pause(pause);
			if !pause {
				self.handle_error(state, true);
			}
			return;
		}

		if self.commit_seek_process(state, Some(pause)) {
			state.controller.set_pause(pause);
			return;
		}
		match state.channel().filter(|channel| channel.is_live()).cloned() {
			Some(channel) if !pause => {
				state.controller.set_pause(true);
				let now = self.now();
				let live_offset = state
					.controller
					.live_offset()
					.unwrap_or_else(|| milliseconds(self.configuration.default_live_offset));
				info!(channel = %channel.id(), live_offset, "Resuming live channel");
				self.load(state, channel.at_time(now - live_offset, now).into(), LoadOptions::default());
			}
			_ => state.controller.set_pause(pause),
		}
	}

	fn set_seek_direction(self: &Arc<Self>, state: &mut State, direction: SeekDirection) -> Result<(), SeekRejection> {
		if state.seek_direction() == direction {
			return Ok(());
		}
		if direction == SeekDirection::None {
			self.commit_seek_process(state, None);
			return Ok(());
		}

		let channel = state.channel();
		if direction == SeekDirection::Forward && channel.is_some_and(ChannelSource::is_live) {
			debug!("Rejected seeking forward on a live channel");
			return Err(SeekRejection::ForwardOnLive);
		}
		if direction == SeekDirection::Backward {
			let dead_zone = if channel.is_some_and(|channel| !channel.has_start_and_duration()) {
				self.configuration.untimed_seek_dead_zone
			} else {
				self.configuration.timed_seek_dead_zone
			};
			if let Position::SeekAndDuration { seek, .. } = self.user_readable_position(state) {
				if seek < milliseconds(dead_zone) {
					debug!(seek, "Rejected seeking backward near the start");
					return Err(SeekRejection::NearStart);
				}
			}
		}

		let target = self.target_seek(state);
		let pause_before_process = state.pause();
		state.seek_process = Some(SeekProcess::start(
			direction,
			target.value(),
			self.now(),
			pause_before_process,
		));
		state.controller.set_pause(true);
		Ok(())
	}

	/// Moves playback to where trick-play currently points and ends it. Playback continues paused
	/// as given by `pause`, or as it was before trick-play started. Returns whether the target is
	/// being loaded as a new source.
	fn commit_seek_process(self: &Arc<Self>, state: &mut State, pause: Option<bool>) -> bool {
		let Some(process) = state.seek_process else {
			return false;
		};
		let target = self.target_seek(state);
		state.seek_process = None;
		let pause = pause.unwrap_or(process.pause_before_process());

		match target {
			Position::Absolute { utc } => {
				let Some(channel) = state.channel().cloned() else {
					state.controller.set_pause(pause);
					return false;
				};
				let now = self.now();
				let source = if utc >= now {
					channel.live_instance()
				} else {
					let anchor = channel
						.live_program()
						.filter(|program| utc <= program.start_time)
						.map_or(utc, |program| program.start_time);
					channel.at_time(anchor, now)
				};
				self.load(state, source.into(), LoadOptions::paused_after(pause));
				true
			}
			Position::SeekAndDuration { seek, .. } => {
				state.controller.seek_to(seek);
				state.controller.set_pause(pause);
				false
			}
		}
	}

	fn tick(self: &Arc<Self>, state: &mut State) {
		if state.controller.is_play_ready() {
			state.play_ready_ticks += 1;
		} else if !state.controller.is_buffering() {
			state.play_ready_ticks = 0;
		}

		if let Some(process) = state.seek_process {
			self.advance_seek_process(state, process);
		}

		self.record_history_if_watched(state);
	}

	fn advance_seek_process(self: &Arc<Self>, state: &mut State, process: SeekProcess) {
		let now = self.now();
		let ready_and_idle = state.controller.is_play_ready() && state.load_job.is_none();

		match self.target_seek(state) {
			Position::Absolute { utc } => {
				let Some(channel) = state.channel().cloned() else {
					state.discard_seek_process(None);
					return;
				};
				let restore_pause = LoadOptions::paused_after(process.pause_before_process());
				let program_start = channel
					.live_program()
					.map(|program| program.start_time)
					.filter(|start_time| utc <= *start_time);

				if utc >= now {
					state.discard_seek_process(None);
					self.load(state, channel.live_instance().into(), restore_pause);
				} else if let Some(program_start) = program_start {
					state.discard_seek_process(None);
					self.load(state, channel.at_time(program_start, now).into(), restore_pause);
				} else if ready_and_idle {
					if let Some(process) = state.seek_process.as_mut() {
						process.advance_to(utc, now);
					}
					self.load(state, channel.at_time(utc, now).into(), LoadOptions::seek_preview());
				}
			}
			Position::SeekAndDuration { seek, duration } => {
				if seek <= 0 {
					state.discard_seek_process(Some(0));
				} else if seek >= duration {
					state.discard_seek_process(Some(duration));
					if state.channel().is_some() {
						state.live_jump_offered = true;
					}
				} else if ready_and_idle {
					if let Some(process) = state.seek_process.as_mut() {
						process.advance_to(seek, now);
					}
					state.controller.seek_to(seek);
				}
			}
		}
	}

	fn handle_error(self: &Arc<Self>, state: &mut State, immediate: bool) {
		let Some(error) = state.controller.current_error().cloned() else {
			return;
		};
		if state.pause() {
			debug!(%error, "Not recovering while paused");
			return;
		}

		let now = self.now();
		let stale_channel = state
			.channel()
			.filter(|channel| {
				channel
					.content_start_time()
					.is_some_and(|start_time| now - start_time > milliseconds(self.configuration.stale_content_age))
			})
			.map(ChannelSource::live_instance);
		if let Some(live_channel) = stale_channel {
			info!(channel = %live_channel.id(), "Content is too old, returning to live");
			self.load(state, live_channel.into(), LoadOptions::default());
			return;
		}

		match error.class() {
			ErrorClass::ImmediateRestart => {
				warn!(%error, "Restarting playback right away");
				if state.channel().is_some_and(ChannelSource::is_live) {
					state.controller.restart_stream();
				} else if let Some(source) = state.source.clone() {
					self.load(state, source, LoadOptions::default());
				}
			}
			class => {
				let delay = should_delay_retry(
					immediate,
					state.controller.last_user_audio_track_change(),
					now,
					milliseconds(self.configuration.retry_delay),
				);
				debug!(?class, delay, "Scheduling retry");

				let inner = Arc::clone(self);
				self.runtime.spawn(async move {
					if delay {
						inner
							.time_source
							.sleep(RETRY_DELAY, inner.configuration.retry_delay)
							.await;
					}
					inner.retry();
				});
			}
		}
	}

	fn retry(self: &Arc<Self>) {
		let mut state = self.state.lock();
		if state.released {
			return;
		}
		let Some(error) = state.controller.current_error().cloned() else {
			debug!("Error is gone, no retry needed");
			return;
		};
		if state.pause() {
			return;
		}

		let attempt = state.retry.record_attempt(error.clone(), self.now());
		warn!(attempt, %error, "Retrying playback");

		if error.class().requires_reinit() {
			let saved_stream = state.controller.reinit();
			self.remember_resume_position(&state, saved_stream);
		}
		match state.source.clone() {
			Some(source) => self.load(&mut state, source, LoadOptions::default()),
			None => warn!("No playback source to reload"),
		}
	}

	fn remember_resume_position(&self, state: &State, saved_stream: Option<OpenStream>) {
		let Some(movie) = state.source.as_ref().and_then(PlaybackSource::as_movie) else {
			return;
		};
		let position = saved_stream
			.and_then(|stream| stream.start_position)
			.filter(|position| *position > 0);
		if let Some(position) = position {
			self.repository.save_resume_position(&movie.movie_id, position);
		}
	}

	fn snapshot(&self, state: &State) -> PlayerSnapshot {
		let (position_ms, duration_ms) = match self.user_readable_position(state) {
			Position::SeekAndDuration { seek, duration } => (seek, duration),
			Position::Absolute { .. } => (state.controller.position(), state.controller.duration()),
		};
		let channel = state.channel();

		PlayerSnapshot {
			is_playing: state.controller.is_play_ready() && !state.pause(),
			is_buffering: state.controller.is_buffering(),
			is_play_ready: state.controller.is_play_ready(),
			position_ms,
			duration_ms,
			error: state
				.controller
				.current_error()
				.or(state.retry.error())
				.map(ToString::to_string),
			is_retrying: state.retry.is_retrying(),
			retry_attempts: state.retry.attempts(),
			retrying_since_ms: state.retry.since(),
			channel_id: channel.map(|channel| channel.id().clone()),
			channel_name: channel.map(|channel| channel.channel().name.clone()),
			live_jump_offered: state.live_jump_offered,
		}
	}

	fn release(&self, state: &mut State) {
		if state.released {
			return;
		}
		state.released = true;
		state.load_job = None;
		if state.source.is_some() {
			self.on_pre_stream_close(state);
		}
		state.seek_process = None;
		state.retry.reset();
		state.controller.destroy();
		self.install_source(state, None);
		if let Some(event_pump) = state.event_pump.take() {
			event_pump.abort();
		}
		info!("Released playback orchestrator");
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(event_pump) = self.state.get_mut().event_pump.take() {
			event_pump.abort();
		}
	}
}
