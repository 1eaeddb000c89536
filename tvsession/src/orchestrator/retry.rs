use crate::media::error::MediaError;

/// Bookkeeping of automatic recovery. Attempts are counted but never capped.
#[derive(Clone, Debug, Default)]
pub struct RetryState {
	retrying_after: Option<MediaError>,
	attempts: u64,
	since: Option<i64>,
}

impl RetryState {
	/// Returns the number of the attempt.
	pub fn record_attempt(&mut self, error: MediaError, now: i64) -> u64 {
		self.attempts += 1;
		self.since.get_or_insert(now);
		self.retrying_after = Some(error);
		self.attempts
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}

	pub fn is_retrying(&self) -> bool {
		self.retrying_after.is_some()
	}

	pub fn attempts(&self) -> u64 {
		self.attempts
	}

	/// When the first attempt of the current streak happened.
	pub fn since(&self) -> Option<i64> {
		self.since
	}

	pub fn error(&self) -> Option<&MediaError> {
		self.retrying_after.as_ref()
	}
}

/// Retries wait one delay unless asked to be immediate or the user just changed the audio track,
/// which commonly causes a short burst of errors.
pub fn should_delay_retry(immediate: bool, last_user_audio_track_change: Option<i64>, now: i64, delay: i64) -> bool {
	!immediate && last_user_audio_track_change.is_none_or(|changed_at| now - changed_at > delay * 2)
}
