use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekDirection {
	Backward,
	#[default]
	None,
	Forward,
}

impl SeekDirection {
	pub fn sign(self) -> i64 {
		match self {
			SeekDirection::Backward => -1,
			SeekDirection::None => 0,
			SeekDirection::Forward => 1,
		}
	}
}

impl From<i32> for SeekDirection {
	fn from(direction: i32) -> Self {
		match direction.signum() {
			-1 => SeekDirection::Backward,
			1 => SeekDirection::Forward,
			_ => SeekDirection::None,
		}
	}
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SeekRejection {
	#[error("Can't seek forward on a live channel")]
	ForwardOnLive,
	#[error("Too close to the start to seek backward")]
	NearStart,
}

/// Trick-play in progress. While it runs the engine is held paused and the target position moves
/// away from `last_point` at `velocity` milliseconds of content per millisecond held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekProcess {
	direction: SeekDirection,
	last_point: i64,
	last_point_timestamp: i64,
	pause_before_process: bool,
}

impl SeekProcess {
	pub fn start(direction: SeekDirection, last_point: i64, now: i64, pause_before_process: bool) -> Self {
		Self {
			direction,
			last_point,
			last_point_timestamp: now,
			pause_before_process,
		}
	}

	pub fn direction(&self) -> SeekDirection {
		self.direction
	}

	/// The pause state to restore once the process ends.
	pub fn pause_before_process(&self) -> bool {
		self.pause_before_process
	}

	pub fn target(&self, now: i64, velocity: i64) -> i64 {
		let held = now.saturating_sub(self.last_point_timestamp);
		self.last_point
			.saturating_add(held.saturating_mul(self.direction.sign()).saturating_mul(velocity))
	}

	/// Re-anchors the extrapolation once the engine has caught up with `point`.
	pub fn advance_to(&mut self, point: i64, now: i64) {
		self.last_point = point;
		self.last_point_timestamp = now;
	}
}
