use crate::configuration::Configuration;
use crate::error::TvSessionError;
use crate::media::engine::EngineFactory;
use crate::orchestrator::PlaybackOrchestrator;
use crate::registry::snapshot::PlayerSnapshot;
use crate::repository::Repository;
use crate::source::ChannelId;
use crate::utils::time_source::{Interval, TimeSource};
use derive_more::{Display, From, Into};
use parking_lot::Mutex;
use static_assertions::{assert_impl_all, assert_obj_safe};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod snapshot;

const TICK: &str = "tick";

#[derive(From, Into, Display, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceId(String);

impl From<&str> for SurfaceId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

/// A place the video can be shown in. Only one surface holds the session at a time.
pub trait PresentationSurface: Send + Sync {
	fn id(&self) -> SurfaceId;
	fn attach(&self);
	fn detach(&self);
}

assert_obj_safe!(PresentationSurface);

/// Owns the one playback session of the process and hands it to whichever surface shows it.
///
/// Cheap to clone. The session survives attaching and detaching surfaces; it is only torn down by
/// [`SessionRegistry::release_completely`].
#[derive(Clone)]
pub struct SessionRegistry {
	inner: Arc<RegistryInner>,
}

assert_impl_all!(SessionRegistry: Send, Sync);

struct RegistryInner {
	factory: Arc<dyn EngineFactory>,
	repository: Arc<dyn Repository>,
	configuration: Configuration,
	time_source: TimeSource,
	state: Mutex<RegistryState>,
	snapshot: watch::Sender<PlayerSnapshot>,
}

#[derive(Default)]
struct RegistryState {
	orchestrator: Option<PlaybackOrchestrator>,
	surface: Option<Arc<dyn PresentationSurface>>,
	is_fullscreen: bool,
	ticking: Option<CancellationToken>,
	creation_count: u64,
}

impl SessionRegistry {
	pub fn new(
		factory: Arc<dyn EngineFactory>,
		repository: Arc<dyn Repository>,
		configuration: Configuration,
		time_source: TimeSource,
	) -> Self {
		Self {
			inner: Arc::new(RegistryInner {
				factory,
				repository,
				configuration,
				time_source,
				state: Mutex::default(),
				snapshot: watch::channel(PlayerSnapshot::default()).0,
			}),
		}
	}

	/// The shared orchestrator, created with a fresh engine if there is none or the previous one
	/// was released or lost its engine.
	pub fn get_or_create(&self) -> Result<PlaybackOrchestrator, TvSessionError> {
		let mut state = self.inner.state.lock();
		if let Some(orchestrator) = state.orchestrator.as_ref().filter(|orchestrator| orchestrator.is_initialized()) {
			return Ok(orchestrator.clone());
		}

		if let Some(previous) = state.orchestrator.take() {
			debug!("Replacing unusable playback orchestrator");
			previous.release();
		}

		let orchestrator = PlaybackOrchestrator::new(
			Arc::clone(&self.inner.factory),
			Arc::clone(&self.inner.repository),
			self.inner.configuration.clone(),
			self.inner.time_source.clone(),
		)?;
		orchestrator.initialize()?;

		state.creation_count += 1;
		info!(creation_count = state.creation_count, "Created playback orchestrator");
		state.orchestrator = Some(orchestrator.clone());
		Ok(orchestrator)
	}

	/// How many orchestrators were created over the registry's lifetime.
	pub fn creation_count(&self) -> u64 {
		self.inner.state.lock().creation_count
	}

	/// Moves the session to `surface`, detaching it from the previous one.
	pub fn attach(&self, surface: Arc<dyn PresentationSurface>) {
		let previous = {
			let mut state = self.inner.state.lock();
			if state.surface.as_ref().is_some_and(|current| current.id() == surface.id()) {
				return;
			}
			state.surface.replace(Arc::clone(&surface))
		};

		if let Some(previous) = previous {
			debug!(surface = %previous.id(), "Detaching from previous surface");
			previous.detach();
		}
		info!(surface = %surface.id(), "Attaching to surface");
		surface.attach();
	}

	/// Playback continues without a surface.
	pub fn detach(&self) {
		let surface = self.inner.state.lock().surface.take();
		if let Some(surface) = surface {
			info!(surface = %surface.id(), "Detaching from surface");
			surface.detach();
		}
	}

	pub fn attached_surface(&self) -> Option<SurfaceId> {
		self.inner.state.lock().surface.as_ref().map(|surface| surface.id())
	}

	pub fn set_fullscreen(&self, is_fullscreen: bool) {
		self.inner.state.lock().is_fullscreen = is_fullscreen;
	}

	pub fn is_fullscreen(&self) -> bool {
		self.inner.state.lock().is_fullscreen
	}

	/// Ticks the orchestrator every configured tick interval and republishes its snapshot. Does
	/// nothing while ticking is already active.
	pub fn start_ticking(&self) -> Result<(), TvSessionError> {
		let mut state = self.inner.state.lock();
		if state.ticking.is_some() {
			return Ok(());
		}

		let runtime = Handle::try_current()?;
		let period = self.inner.configuration.tick_interval;
		let interval = self.inner.time_source.interval_at(TICK, period, period);
		let token = CancellationToken::new();
		runtime.spawn(tick_loop(
			Arc::downgrade(&self.inner),
			token.clone(),
			interval,
			self.inner.configuration.ticks_per_maintenance(),
		));
		state.ticking = Some(token);
		debug!(?period, "Started ticking");
		Ok(())
	}

	pub fn stop_ticking(&self) {
		if let Some(token) = self.inner.state.lock().ticking.take() {
			token.cancel();
			debug!("Stopped ticking");
		}
	}

	pub fn is_ticking(&self) -> bool {
		self.inner.state.lock().ticking.is_some()
	}

	pub fn is_channel_playing(&self, channel_id: &ChannelId) -> bool {
		let orchestrator = self.inner.state.lock().orchestrator.clone();
		orchestrator
			.and_then(|orchestrator| orchestrator.current_source())
			.is_some_and(|source| source.as_channel().is_some_and(|channel| channel.id() == channel_id))
	}

	pub fn snapshot(&self) -> PlayerSnapshot {
		self.inner.snapshot.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
		self.inner.snapshot.subscribe()
	}

	pub fn snapshot_stream(&self) -> WatchStream<PlayerSnapshot> {
		WatchStream::new(self.subscribe())
	}

	/// Tears down the session. Meant for application shutdown only.
	pub fn release_completely(&self) {
		self.stop_ticking();
		self.detach();

		let orchestrator = {
			let mut state = self.inner.state.lock();
			state.is_fullscreen = false;
			state.orchestrator.take()
		};
		if let Some(orchestrator) = orchestrator {
			orchestrator.release();
		}
		self.inner.snapshot.send_replace(PlayerSnapshot::default());
		info!("Released playback session completely");
	}
}

impl RegistryInner {
	fn tick(&self, run_maintenance: bool) {
		let orchestrator = self.state.lock().orchestrator.clone();
		if let Some(orchestrator) = orchestrator {
			orchestrator.tick();
			self.snapshot.send_if_modified(|snapshot| {
				let current = orchestrator.snapshot();
				let modified = *snapshot != current;
				*snapshot = current;
				modified
			});
		}

		if run_maintenance {
			debug!("Running periodic maintenance");
			self.repository.periodic_maintenance();
		}
	}
}

async fn tick_loop(
	registry: Weak<RegistryInner>,
	token: CancellationToken,
	mut interval: Interval,
	ticks_per_maintenance: u64,
) {
	let mut ticks = 0_u64;
	loop {
		tokio::select! {
			() = token.cancelled() => break,
			() = interval.tick() => {}
		}

		let Some(registry) = registry.upgrade() else {
			break;
		};
		ticks += 1;
		registry.tick(ticks % ticks_per_maintenance == 0);
	}
}
