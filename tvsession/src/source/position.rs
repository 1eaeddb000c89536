use serde::Serialize;

/// Where playback is, or should be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Position {
	/// Wall-clock time in milliseconds since the unix epoch, for streams without a fixed timeline.
	Absolute { utc: i64 },
	/// Offset into content of known length.
	SeekAndDuration { seek: i64, duration: i64 },
}

impl Position {
	/// The scalar a seek process extrapolates from.
	pub fn value(self) -> i64 {
		match self {
			Position::Absolute { utc } => utc,
			Position::SeekAndDuration { seek, .. } => seek,
		}
	}

	/// Clamps the seek into `[0, duration]`, treating a negative duration as zero.
	#[must_use]
	pub fn fix(self) -> Self {
		match self {
			Position::SeekAndDuration { seek, duration } if !(0..=duration).contains(&seek) => {
				let duration = duration.max(0);
				Position::SeekAndDuration {
					seek: seek.clamp(0, duration),
					duration,
				}
			}
			position => position,
		}
	}

	/// Fraction of the content that has been played, 0 for absolute positions.
	#[allow(clippy::cast_precision_loss)]
	pub fn progress(self) -> f64 {
		match self {
			Position::SeekAndDuration { seek, duration } if duration > 0 => seek as f64 / duration as f64,
			_ => 0.0,
		}
	}
}
