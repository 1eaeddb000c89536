#[cfg(test)]
pub mod fake_engine;
#[cfg(test)]
pub mod fake_repository;
#[cfg(test)]
pub mod fake_surface;
pub mod time_source;

/// Lets spawned tasks run until `condition` holds.
#[cfg(test)]
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
	for _ in 0..10_000 {
		if condition() {
			return;
		}
		tokio::task::yield_now().await;
	}
	panic!("Condition was not met in time");
}
