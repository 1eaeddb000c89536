use derive_more::{Display, From, Into};
use serde::Serialize;
use std::sync::Arc;
use typed_builder::TypedBuilder;

pub mod position;

#[derive(From, Into, Display, Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl From<&str> for ChannelId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

#[derive(From, Into, Display, Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl From<&str> for MovieId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

/// A channel as listed in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct ChannelRef {
	#[builder(setter(into))]
	pub id: ChannelId,
	#[builder(setter(into))]
	pub name: String,
	/// Whether past programs of the channel can be played back.
	#[builder(default)]
	pub has_archive: bool,
}

/// An entry of a channel's schedule. Times are milliseconds since the unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct Program {
	#[builder(setter(into))]
	pub title: String,
	pub start_time: i64,
	pub stop_time: i64,
}

impl Program {
	pub fn duration(&self) -> i64 {
		self.stop_time - self.start_time
	}

	pub fn is_live_at(&self, now: i64) -> bool {
		(self.start_time..self.stop_time).contains(&now)
	}

	pub fn has_ended_at(&self, now: i64) -> bool {
		self.stop_time <= now
	}
}

/// What the session plays.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackSource {
	Channel(ChannelSource),
	Movie(MovieSource),
}

impl PlaybackSource {
	pub fn as_channel(&self) -> Option<&ChannelSource> {
		match self {
			PlaybackSource::Channel(channel) => Some(channel),
			PlaybackSource::Movie(_) => None,
		}
	}

	pub fn as_movie(&self) -> Option<&MovieSource> {
		match self {
			PlaybackSource::Channel(_) => None,
			PlaybackSource::Movie(movie) => Some(movie),
		}
	}

	pub fn title(&self) -> &str {
		match self {
			PlaybackSource::Channel(channel) => &channel.channel.name,
			PlaybackSource::Movie(movie) => &movie.title,
		}
	}
}

impl From<ChannelSource> for PlaybackSource {
	fn from(channel: ChannelSource) -> Self {
		PlaybackSource::Channel(channel)
	}
}

impl From<MovieSource> for PlaybackSource {
	fn from(movie: MovieSource) -> Self {
		PlaybackSource::Movie(movie)
	}
}

/// A channel played either at the live edge, shifted back in time, or as a recording of one of
/// its past programs.
///
/// A recording has a start and a duration, so positions within it are offsets. Live and
/// time-shifted streams have no fixed timeline; positions there are wall-clock times.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelSource {
	channel: ChannelRef,
	program: Option<Program>,
	start_abs_time: Option<i64>,
	start_live_offset: Option<i64>,
	current_program: Option<Program>,
	channel_list: Arc<[ChannelRef]>,
}

impl ChannelSource {
	pub fn live(
		channel: ChannelRef,
		current_program: Option<Program>,
		channel_list: impl Into<Arc<[ChannelRef]>>,
	) -> Self {
		Self {
			channel,
			program: None,
			start_abs_time: None,
			start_live_offset: None,
			current_program,
			channel_list: channel_list.into(),
		}
	}

	/// The same channel at the live edge.
	#[must_use]
	pub fn live_instance(&self) -> Self {
		Self {
			program: None,
			start_abs_time: None,
			start_live_offset: None,
			..self.clone()
		}
	}

	/// The same channel shifted back to `start_abs_time`. Channels without archive and times that
	/// aren't in the past stay live.
	#[must_use]
	pub fn at_time(&self, start_abs_time: i64, now: i64) -> Self {
		if !self.channel.has_archive || start_abs_time <= 0 || start_abs_time >= now {
			return self.live_instance();
		}

		Self {
			program: None,
			start_abs_time: Some(start_abs_time),
			start_live_offset: Some(now - start_abs_time),
			..self.clone()
		}
	}

	/// A past program of the channel, optionally starting at `start_abs_time` within it. Programs
	/// that haven't ended yet, and channels without archive, give the live instance.
	#[must_use]
	pub fn recording(&self, program: Program, start_abs_time: Option<i64>, now: i64) -> Self {
		if !self.channel.has_archive || !program.has_ended_at(now) {
			return self.live_instance();
		}

		let start_abs_time =
			start_abs_time.filter(|time| (program.start_time..program.stop_time).contains(time) && *time < now);
		Self {
			start_live_offset: start_abs_time.map(|time| now - time),
			program: Some(program),
			start_abs_time,
			..self.clone()
		}
	}

	#[must_use]
	pub fn with_current_program(self, current_program: Option<Program>) -> Self {
		Self {
			current_program,
			..self
		}
	}

	pub fn channel(&self) -> &ChannelRef {
		&self.channel
	}

	pub fn id(&self) -> &ChannelId {
		&self.channel.id
	}

	/// The recorded program, if this is a recording.
	pub fn program(&self) -> Option<&Program> {
		self.program.as_ref()
	}

	pub fn start_abs_time(&self) -> Option<i64> {
		self.start_abs_time
	}

	/// How far behind the live edge a time-shifted instance started.
	pub fn start_live_offset(&self) -> Option<i64> {
		self.start_live_offset
	}

	pub fn channel_list(&self) -> &[ChannelRef] {
		&self.channel_list
	}

	pub fn is_live(&self) -> bool {
		self.program.is_none() && self.start_abs_time.is_none()
	}

	pub fn has_start_and_duration(&self) -> bool {
		self.program.is_some()
	}

	/// The program currently on air, unless this is a recording.
	pub fn live_program(&self) -> Option<&Program> {
		match self.program {
			Some(_) => None,
			None => self.current_program.as_ref(),
		}
	}

	pub fn program_or_live_program(&self) -> Option<&Program> {
		self.program.as_ref().or(self.current_program.as_ref())
	}

	/// When the played content started: the recording's program start, else the time-shift anchor.
	pub fn content_start_time(&self) -> Option<i64> {
		self.program
			.as_ref()
			.map(|program| program.start_time)
			.or(self.start_abs_time)
	}

	/// Where the engine starts within the stream. Only recordings have one.
	pub fn start_position(&self) -> Option<i64> {
		self.program.as_ref().map(|program| {
			self.start_abs_time
				.map_or(0, |start_abs_time| start_abs_time - program.start_time)
		})
	}

	pub fn can_pause(&self) -> bool {
		self.channel.has_archive
	}

	pub fn can_seek_forward(&self) -> bool {
		!self.is_live()
	}

	pub fn can_seek_backward(&self) -> bool {
		self.channel.has_archive
	}

	/// The live instance of the neighbouring channel in the channel list, wrapping around at both
	/// ends. `None` without a list or when the neighbour is this channel again.
	pub fn neighbour(
		&self,
		direction: isize,
		current_program: impl FnOnce(&ChannelId) -> Option<Program>,
	) -> Option<Self> {
		let length = isize::try_from(self.channel_list.len()).ok().filter(|length| *length > 0)?;
		let index = self
			.channel_list
			.iter()
			.position(|channel| channel.id == self.channel.id)
			.and_then(|index| isize::try_from(index).ok())
			.unwrap_or(-1);
		let neighbour_index = usize::try_from((index + direction).rem_euclid(length)).ok()?;
		let neighbour = self.channel_list.get(neighbour_index)?;
		if neighbour.id == self.channel.id {
			return None;
		}

		Some(Self::live(
			neighbour.clone(),
			current_program(&neighbour.id),
			self.channel_list.clone(),
		))
	}
}

/// A title with a known length.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct MovieSource {
	#[builder(setter(into))]
	pub movie_id: MovieId,
	#[builder(setter(into))]
	pub title: String,
	/// Where to start when nothing was saved for this movie.
	#[builder(default)]
	pub resume_position: i64,
}

impl MovieSource {
	/// A saved position wins over the source's own resume position; no position at all when both
	/// are zero.
	pub fn start_position(&self, saved_resume_position: Option<i64>) -> Option<i64> {
		let position = saved_resume_position
			.filter(|position| *position > 0)
			.unwrap_or(self.resume_position);
		(position > 0).then_some(position)
	}
}
