use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// How a source gets loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOptions {
	/// Whether the stream starts paused. `None` keeps the engine's current setting.
	pub pause_after: Option<bool>,
	/// Closes the running stream and shows the new source while its url resolves.
	pub close_before_load: bool,
	pub discard_seek_process: bool,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			pause_after: Some(false),
			close_before_load: true,
			discard_seek_process: true,
		}
	}
}

impl LoadOptions {
	pub fn paused_after(pause_after: bool) -> Self {
		Self {
			pause_after: Some(pause_after),
			..Self::default()
		}
	}

	/// Loads a preview frame during trick-play while the seek process keeps running.
	pub fn seek_preview() -> Self {
		Self {
			pause_after: Some(true),
			close_before_load: false,
			discard_seek_process: false,
		}
	}
}

/// The in-flight "resolve url and start playback" task. Dropping the job cancels it.
#[derive(Debug)]
pub(crate) struct LoadJob {
	id: Uuid,
	token: CancellationToken,
}

impl LoadJob {
	pub fn new() -> Self {
		Self {
			id: Uuid::new_v4(),
			token: CancellationToken::new(),
		}
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn token(&self) -> CancellationToken {
		self.token.clone()
	}
}

impl Drop for LoadJob {
	fn drop(&mut self) {
		self.token.cancel();
	}
}
