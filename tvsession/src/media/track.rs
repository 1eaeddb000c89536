use derive_more::{Display, From, Into};

/// Identifies an audio track within the currently open stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, From, Into)]
pub struct TrackId(String);

impl From<&str> for TrackId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTrack {
	pub id: TrackId,
	pub label: Option<String>,
	pub language: Option<String>,
	/// Whether the engine currently plays this track.
	pub is_selected: bool,
}

impl AudioTrack {
	pub fn display_name(&self) -> &str {
		self.label
			.as_deref()
			.or(self.language.as_deref())
			.unwrap_or(self.id.0.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoGeometry {
	pub width: u32,
	pub height: u32,
}

impl VideoGeometry {
	pub fn aspect_ratio(&self) -> Option<f64> {
		(self.height > 0).then(|| f64::from(self.width) / f64::from(self.height))
	}
}

const MAXIMUM_PREFERRED_LANGUAGES: usize = 3;

/// Preferred audio languages in order: the language of the last track the user picked, the
/// system language, then the fallback.
pub fn preferred_audio_languages(
	last_user_choice: Option<&str>,
	system_language: Option<&str>,
	fallback: &str,
) -> Vec<String> {
	let mut languages = Vec::with_capacity(MAXIMUM_PREFERRED_LANGUAGES);
	for language in [last_user_choice, system_language, Some(fallback)].into_iter().flatten() {
		let language = language.trim().to_lowercase();
		if !language.is_empty() && !languages.contains(&language) {
			languages.push(language);
		}
	}
	languages.truncate(MAXIMUM_PREFERRED_LANGUAGES);
	languages
}

/// Reduces a locale like `de-AT` or `pt_BR.UTF-8` to its language code.
pub fn language_of_locale(locale: &str) -> Option<String> {
	let language = locale.split(['-', '_', '.', '@']).next()?.trim().to_lowercase();
	(!language.is_empty() && language != "c" && language != "posix").then_some(language)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn should_order_preferred_languages_by_user_choice_first() {
		let languages = preferred_audio_languages(Some("fr"), Some("de"), "en");

		assert_eq!(vec!["fr", "de", "en"], languages);
	}

	#[test]
	fn should_remove_duplicate_preferred_languages() {
		let languages = preferred_audio_languages(Some("EN"), Some("en"), "en");

		assert_eq!(vec!["en"], languages);
	}

	#[test]
	fn should_skip_missing_preferred_languages() {
		let languages = preferred_audio_languages(None, Some("uk"), "en");

		assert_eq!(vec!["uk", "en"], languages);
	}

	#[test]
	fn should_extract_language_from_locale() {
		assert_eq!(Some("de".to_string()), language_of_locale("de-AT"));
		assert_eq!(Some("pt".to_string()), language_of_locale("pt_BR.UTF-8"));
		assert_eq!(None, language_of_locale("C"));
		assert_eq!(None, language_of_locale(""));
	}

	#[test]
	fn should_fall_back_to_track_id_for_display_name() {
		let track = AudioTrack {
			id: "audio-2".into(),
			label: None,
			language: None,
			is_selected: false,
		};

		assert_eq!("audio-2", track.display_name());
	}

	#[test]
	fn should_not_compute_aspect_ratio_without_height() {
		assert_eq!(None, VideoGeometry { width: 1920, height: 0 }.aspect_ratio());
		assert_eq!(Some(2.0), VideoGeometry { width: 1920, height: 960 }.aspect_ratio());
	}
}
