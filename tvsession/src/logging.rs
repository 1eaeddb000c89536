use crate::error::TvSessionError;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber, filtering with directives like `"info,tvsession=debug"`.
pub fn initialize_logging(filters: &str) -> Result<(), TvSessionError> {
	let filter = EnvFilter::try_new(filters)?;

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.try_init()
		.map_err(|error| TvSessionError::Logging(error.to_string()))
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn should_reject_invalid_filters() {
		let result = initialize_logging("tvsession=loudest");

		assert!(matches!(result, Err(TvSessionError::LogFilter(_))));
	}
}
