use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

/// Failures a media engine can attach anywhere in an error's cause chain.
#[derive(Debug, Error)]
pub enum EngineFailure {
	#[error("Playback position fell behind the live window")]
	BehindLiveWindow,
	#[error("Audio sink reported an unexpected discontinuity")]
	AudioSinkDiscontinuity,
	#[error("Failed to load media: {0}")]
	Source(String),
	#[error("Remote server failure: {0}")]
	Remote(String),
	#[error("Renderer failure: {0}")]
	Renderer(String),
	#[error("Unexpected engine failure: {0}")]
	Unexpected(String),
}

impl EngineFailure {
	fn requires_immediate_restart(&self) -> bool {
		matches!(self, Self::BehindLiveWindow | Self::AudioSinkDiscontinuity)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
	/// Restart right away, without delay or engine reinitialization.
	ImmediateRestart,
	/// Network, HTTP and IO failures. Reloading the source is enough.
	Source,
	/// Decoder and audio device failures.
	Render,
	Unclassified,
}

impl ErrorClass {
	pub fn is_source(self) -> bool {
		self == Self::Source
	}

	/// Whether the engine itself should be rebuilt before retrying. Unclassified errors count as
	/// render errors.
	pub fn requires_reinit(self) -> bool {
		matches!(self, Self::Render | Self::Unclassified)
	}
}

/// An error reported by the media engine, shared between the session state and observers.
#[derive(Clone, Debug)]
pub struct MediaError(Arc<anyhow::Error>);

impl MediaError {
	pub fn new(error: impl Into<anyhow::Error>) -> Self {
		Self(Arc::new(error.into()))
	}

	pub fn chain(&self) -> anyhow::Chain<'_> {
		self.0.chain()
	}

	pub fn class(&self) -> ErrorClass {
		classify(self)
	}
}

impl Display for MediaError {
	fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
		write!(formatter, "{:#}", self.0)
	}
}

impl From<anyhow::Error> for MediaError {
	fn from(error: anyhow::Error) -> Self {
		Self(Arc::new(error))
	}
}

impl From<EngineFailure> for MediaError {
	fn from(failure: EngineFailure) -> Self {
		Self::new(failure)
	}
}

/// Classifies an engine error. Immediate-restart failures are found anywhere in the cause chain,
/// the other classes are decided by the outermost engine failure.
pub fn classify(error: &MediaError) -> ErrorClass {
	let engine_failures = || error.chain().filter_map(|cause| cause.downcast_ref::<EngineFailure>());

	if engine_failures().any(EngineFailure::requires_immediate_restart) {
		return ErrorClass::ImmediateRestart;
	}

	match engine_failures().next() {
		Some(EngineFailure::Source(_) | EngineFailure::Remote(_)) => ErrorClass::Source,
		Some(EngineFailure::Renderer(_)) => ErrorClass::Render,
		Some(_) => ErrorClass::Unclassified,
		None if error.chain().any(|cause| cause.is::<std::io::Error>()) => ErrorClass::Source,
		None => ErrorClass::Unclassified,
	}
}
