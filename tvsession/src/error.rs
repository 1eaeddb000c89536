use crate::configuration::ConfigurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TvSessionError {
	#[error("Failed to load configuration: {0}")]
	Configuration(#[from] ConfigurationError),
	#[error("Invalid log filter: {0}")]
	LogFilter(#[from] tracing_subscriber::filter::ParseError),
	#[error("Failed to install the log subscriber: {0}")]
	Logging(String),
	#[error("A playback session needs a running tokio runtime: {0}")]
	NoRuntime(#[from] tokio::runtime::TryCurrentError),
	#[error("Failed to construct the media engine: {0}")]
	EngineConstruction(anyhow::Error),
}
