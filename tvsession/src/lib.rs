//! One shared playback session for live TV and VOD.
//!
//! A [`SessionRegistry`] owns the single [`PlaybackOrchestrator`] of the process. The orchestrator
//! turns channels and movies into streams on a [`MediaEngine`](media::engine::MediaEngine),
//! recovers from playback errors and implements virtual trick-play.

pub mod configuration;
pub mod error;
pub mod logging;
pub mod media;
pub mod orchestrator;
pub mod registry;
pub mod repository;
pub mod source;
pub mod utils;

pub use configuration::Configuration;
pub use error::TvSessionError;
pub use orchestrator::PlaybackOrchestrator;
pub use registry::SessionRegistry;
pub use registry::snapshot::PlayerSnapshot;
pub use source::PlaybackSource;
