use crate::media::error::MediaError;
use crate::media::track::{AudioTrack, TrackId};
use static_assertions::assert_obj_safe;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
	#[default]
	Idle,
	Buffering,
	Ready,
	Ended,
}

/// Asynchronous notifications a media engine reports about itself.
#[derive(Clone, Debug)]
pub enum EngineEvent {
	StateChanged(EngineState),
	Error(MediaError),
	TracksChanged(Vec<AudioTrack>),
	VideoGeometryChanged { width: u32, height: u32 },
}

#[derive(Debug)]
pub(crate) struct EngineEnvelope {
	pub generation: u64,
	pub event: EngineEvent,
}

/// Given to an engine on construction. May be used from any thread; events are queued and
/// applied to the session one at a time.
#[derive(Clone, Debug)]
pub struct EngineEventSender {
	generation: u64,
	sender: mpsc::UnboundedSender<EngineEnvelope>,
}

impl EngineEventSender {
	pub(crate) fn new(generation: u64, sender: mpsc::UnboundedSender<EngineEnvelope>) -> Self {
		Self { generation, sender }
	}

	/// Returns `false` once the session has gone away.
	pub fn send(&self, event: EngineEvent) -> bool {
		self.sender
			.send(EngineEnvelope {
				generation: self.generation,
				event,
			})
			.is_ok()
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}
}

/// The playback engine a session drives. Decoding, buffering and track selection happen behind it.
///
/// Positions and durations are in milliseconds.
pub trait MediaEngine: Send {
	/// Sets up a media source. Errors are construction errors of the source (malformed urls,
	/// unsupported schemes); failures while playing are reported as [`EngineEvent::Error`].
	fn open(&mut self, url: &str, is_vod: bool, start_position: Option<i64>) -> anyhow::Result<()>;
	fn prepare(&mut self);
	fn stop(&mut self);
	fn release(&mut self);

	fn play_when_ready(&self) -> bool;
	fn set_play_when_ready(&mut self, play_when_ready: bool);

	fn seek_to(&mut self, position: i64);
	fn seek_to_default_position(&mut self);

	fn current_position(&self) -> i64;
	fn duration(&self) -> i64;
	fn state(&self) -> EngineState;
	/// Distance to the live edge, `None` when the engine doesn't know it.
	fn live_offset(&self) -> Option<i64>;
	fn total_buffered_duration(&self) -> i64;

	fn set_preferred_audio_languages(&mut self, languages: &[String]);
	/// `None` removes any audio track override.
	fn select_audio_track(&mut self, track: Option<&TrackId>);
}

pub trait EngineFactory: Send + Sync {
	fn create(&self, events: EngineEventSender) -> anyhow::Result<Box<dyn MediaEngine>>;
}

assert_obj_safe!(MediaEngine);
assert_obj_safe!(EngineFactory);

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn event_sender_should_tag_events_with_its_generation() {
		let (sender, mut receiver) = mpsc::unbounded_channel();
		let event_sender = EngineEventSender::new(7, sender);

		assert!(event_sender.send(EngineEvent::StateChanged(EngineState::Ready)));

		let envelope = receiver.try_recv().expect("No event was queued");
		assert_eq!(7, envelope.generation);
		assert!(matches!(envelope.event, EngineEvent::StateChanged(EngineState::Ready)));
	}

	#[test]
	fn event_sender_should_report_a_closed_session() {
		let (sender, receiver) = mpsc::unbounded_channel();
		let event_sender = EngineEventSender::new(0, sender);
		drop(receiver);

		assert!(!event_sender.send(EngineEvent::StateChanged(EngineState::Idle)));
	}
}
