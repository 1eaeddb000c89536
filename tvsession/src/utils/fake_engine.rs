use crate::media::engine::{EngineEvent, EngineEventSender, EngineFactory, EngineState, MediaEngine};
use crate::media::error::{EngineFailure, MediaError};
use crate::media::track::{AudioTrack, TrackId};
use anyhow::anyhow;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenCall {
	pub url: String,
	pub is_vod: bool,
	pub start_position: Option<i64>,
}

/// Everything the fake engines of one factory were asked to do, plus the state they report.
#[derive(Debug)]
pub struct FakeEngineLog {
	pub created: usize,
	pub released: usize,
	pub fail_creation: bool,
	pub fail_next_open: bool,
	pub opened: Vec<OpenCall>,
	pub stops: usize,
	pub prepares: usize,
	pub seeks: Vec<i64>,
	pub default_position_seeks: usize,
	pub play_when_ready: bool,
	pub preferred_languages: Vec<String>,
	pub selected_track: Option<TrackId>,
	/// State the engine enters on `prepare`.
	pub prepared_state: EngineState,
	pub state: EngineState,
	pub position: i64,
	pub duration: i64,
	pub live_offset: Option<i64>,
	pub buffered: i64,
	events: Option<EngineEventSender>,
}

impl Default for FakeEngineLog {
	fn default() -> Self {
		Self {
			created: 0,
			released: 0,
			fail_creation: false,
			fail_next_open: false,
			opened: Vec::new(),
			stops: 0,
			prepares: 0,
			seeks: Vec::new(),
			default_position_seeks: 0,
			play_when_ready: true,
			preferred_languages: Vec::new(),
			selected_track: None,
			prepared_state: EngineState::Ready,
			state: EngineState::Idle,
			position: 0,
			duration: 0,
			live_offset: None,
			buffered: 0,
			events: None,
		}
	}
}

#[derive(Clone, Default)]
pub struct FakeEngineFactory {
	log: Arc<Mutex<FakeEngineLog>>,
}

impl FakeEngineFactory {
	pub fn log(&self) -> MutexGuard<'_, FakeEngineLog> {
		self.log.lock()
	}

	pub fn opened_urls(&self) -> Vec<String> {
		self.log().opened.iter().map(|call| call.url.clone()).collect()
	}

	/// The event sender of the most recently created engine.
	pub fn event_sender(&self) -> Option<EngineEventSender> {
		self.log().events.clone()
	}

	/// Sends an event as the most recently created engine.
	pub fn emit(&self, event: EngineEvent) {
		if let Some(events) = self.event_sender() {
			events.send(event);
		}
	}

	pub fn set_state(&self, state: EngineState) {
		self.log().state = state;
		self.emit(EngineEvent::StateChanged(state));
	}

	pub fn fail(&self, failure: EngineFailure) {
		self.emit(EngineEvent::Error(MediaError::from(failure)));
	}

	pub fn emit_tracks(&self, tracks: Vec<AudioTrack>) {
		self.emit(EngineEvent::TracksChanged(tracks));
	}
}

impl EngineFactory for FakeEngineFactory {
	fn create(&self, events: EngineEventSender) -> anyhow::Result<Box<dyn MediaEngine>> {
		let mut log = self.log();
		if log.fail_creation {
			return Err(anyhow!("No decoder available"));
		}

		log.created += 1;
		log.events = Some(events);
		Ok(Box::new(FakeEngine {
			log: self.log.clone(),
		}))
	}
}

struct FakeEngine {
	log: Arc<Mutex<FakeEngineLog>>,
}

impl MediaEngine for FakeEngine {
	fn open(&mut self, url: &str, is_vod: bool, start_position: Option<i64>) -> anyhow::Result<()> {
		let mut log = self.log.lock();
		if log.fail_next_open {
			log.fail_next_open = false;
			return Err(EngineFailure::Source(format!("Unsupported url {url}")).into());
		}

		log.opened.push(OpenCall {
			url: url.to_string(),
			is_vod,
			start_position,
		});
		log.position = start_position.unwrap_or_default();
		Ok(())
	}

	fn prepare(&mut self) {
		let mut log = self.log.lock();
		log.prepares += 1;
		log.state = log.prepared_state;
	}

	fn stop(&mut self) {
		let mut log = self.log.lock();
		log.stops += 1;
		log.state = EngineState::Idle;
	}

	fn release(&mut self) {
		self.log.lock().released += 1;
	}

	fn play_when_ready(&self) -> bool {
		self.log.lock().play_when_ready
	}

	fn set_play_when_ready(&mut self, play_when_ready: bool) {
		self.log.lock().play_when_ready = play_when_ready;
	}

	fn seek_to(&mut self, position: i64) {
		let mut log = self.log.lock();
		log.seeks.push(position);
		log.position = position;
	}

	fn seek_to_default_position(&mut self) {
		self.log.lock().default_position_seeks += 1;
	}

	fn current_position(&self) -> i64 {
		self.log.lock().position
	}

	fn duration(&self) -> i64 {
		self.log.lock().duration
	}

	fn state(&self) -> EngineState {
		self.log.lock().state
	}

	fn live_offset(&self) -> Option<i64> {
		self.log.lock().live_offset
	}

	fn total_buffered_duration(&self) -> i64 {
		self.log.lock().buffered
	}

	fn set_preferred_audio_languages(&mut self, languages: &[String]) {
		self.log.lock().preferred_languages = languages.to_vec();
	}

	fn select_audio_track(&mut self, track: Option<&TrackId>) {
		self.log.lock().selected_track = track.cloned();
	}
}
