use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Configuration {
	pub log_filters: String,
	/// Period of the health tick driving the orchestrator and the published snapshot.
	#[serde(with = "humantime_serde")]
	pub tick_interval: Duration,
	/// Period of the repository's memory/cache maintenance hook. Rounded to whole ticks.
	#[serde(with = "humantime_serde")]
	pub maintenance_interval: Duration,
	#[serde(with = "humantime_serde")]
	pub retry_delay: Duration,
	/// Continuous ready playback needed before a channel counts as watched.
	#[serde(with = "humantime_serde")]
	pub history_threshold: Duration,
	/// Channel content older than this is abandoned for the live edge when it fails.
	#[serde(with = "humantime_serde")]
	pub stale_content_age: Duration,
	/// Milliseconds of content traversed per millisecond a trick-play direction is held.
	pub seek_velocity: i64,
	#[serde(with = "humantime_serde")]
	pub default_live_offset: Duration,
	#[serde(with = "humantime_serde")]
	pub untimed_seek_dead_zone: Duration,
	#[serde(with = "humantime_serde")]
	pub timed_seek_dead_zone: Duration,
	pub fallback_audio_language: String,
	/// Overrides the language detected from the operating system locale.
	pub system_language: Option<String>,
}

impl Default for Configuration {
	fn default() -> Self {
		Self {
			log_filters: "info".to_string(),
			tick_interval: Duration::from_millis(300),
			maintenance_interval: Duration::from_secs(60),
			retry_delay: Duration::from_secs(2),
			history_threshold: Duration::from_secs(5),
			stale_content_age: Duration::from_secs(2 * 24 * 60 * 60),
			seek_velocity: 60,
			default_live_offset: Duration::from_secs(20),
			untimed_seek_dead_zone: Duration::from_secs(15),
			timed_seek_dead_zone: Duration::from_secs(5),
			fallback_audio_language: "en".to_string(),
			system_language: None,
		}
	}
}

impl Configuration {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Configuration, ConfigurationError> {
		let text = read_to_string(path)?;

		Ok(Configuration::try_from(text.as_str())?)
	}

	/// Number of ticks between two maintenance runs, never less than one.
	pub fn ticks_per_maintenance(&self) -> u64 {
		let tick = self.tick_interval.as_millis().max(1);
		u64::try_from(self.maintenance_interval.as_millis() / tick)
			.unwrap_or(u64::MAX)
			.max(1)
	}
}

impl TryFrom<&str> for Configuration {
	type Error = toml::de::Error;

	fn try_from(text: &str) -> Result<Self, Self::Error> {
		toml::from_str(text)
	}
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
	#[error("Failed to deserialize with error: {0}")]
	DeserializationError(#[from] toml::de::Error),
	#[error("IO operation failed: {0}")]
	IoError(#[from] std::io::Error),
}

/// Converts a configured duration to the signed millisecond scale used for media positions.
pub(crate) fn milliseconds(duration: Duration) -> i64 {
	i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn should_deserialize_configuration() {
		const TEST_FILE_PATH: &str = "test/files/test-configuration.toml";

		let Configuration {
			log_filters,
			tick_interval,
			maintenance_interval,
			retry_delay,
			history_threshold,
			stale_content_age,
			seek_velocity,
			default_live_offset,
			untimed_seek_dead_zone,
			timed_seek_dead_zone,
			fallback_audio_language,
			system_language,
		} = Configuration::from_file(TEST_FILE_PATH).unwrap();

		assert_eq!("tvsession=debug", log_filters);
		assert_eq!(Duration::from_millis(250), tick_interval);
		assert_eq!(Duration::from_secs(30), maintenance_interval);
		assert_eq!(Duration::from_secs(3), retry_delay);
		assert_eq!(Duration::from_secs(10), history_threshold);
		assert_eq!(Duration::from_secs(3 * 24 * 60 * 60), stale_content_age);
		assert_eq!(120, seek_velocity);
		assert_eq!(Duration::from_secs(25), default_live_offset);
		assert_eq!(Duration::from_secs(20), untimed_seek_dead_zone);
		assert_eq!(Duration::from_secs(4), timed_seek_dead_zone);
		assert_eq!("de", fallback_audio_language);
		assert_eq!(Some("uk".to_string()), system_language);
	}

	#[test]
	fn should_fill_missing_fields_with_defaults() {
		let configuration = Configuration::try_from(r#"retry_delay = "5s""#).unwrap();

		assert_eq!(Duration::from_secs(5), configuration.retry_delay);
		assert_eq!(Duration::from_millis(300), configuration.tick_interval);
		assert_eq!("en", configuration.fallback_audio_language);
		assert_eq!(None, configuration.system_language);
	}

	#[test]
	fn should_reject_malformed_durations() {
		let result = Configuration::try_from(r#"tick_interval = "soon""#);

		assert!(result.is_err());
	}

	#[test]
	fn should_run_maintenance_every_200_ticks_by_default() {
		assert_eq!(200, Configuration::default().ticks_per_maintenance());
	}

	#[test]
	fn should_run_maintenance_at_least_every_tick() {
		let configuration = Configuration {
			tick_interval: Duration::from_secs(10),
			maintenance_interval: Duration::from_secs(1),
			..Configuration::default()
		};

		assert_eq!(1, configuration.ticks_per_maintenance());
	}
}
