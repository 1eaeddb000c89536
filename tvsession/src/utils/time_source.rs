use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use pin_project::pin_project;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::BroadcastStream;

/// 2024-01-01T00:00:00Z, the wall-clock time a test time source starts at.
const TEST_EPOCH_MILLISECONDS: i64 = 1_704_067_200_000;

/// Source of wall-clock time, intervals and delays.
///
/// The default instance uses the system clock and tokio timers. [`TimeSource::test`] creates an
/// instance where every clock is driven by hand: named intervals and sleeps only advance through
/// [`TimeSource::advance_time`] and the wall clock only through [`TimeSource::advance_now`].
#[derive(Clone, Default)]
pub struct TimeSource {
	test_clocks: Option<Arc<TestClocks>>,
}

struct TestClocks {
	wall_clock: Mutex<DateTime<Utc>>,
	named: Mutex<BTreeMap<&'static str, Arc<NamedClock>>>,
}

impl Default for TestClocks {
	fn default() -> Self {
		Self {
			wall_clock: Mutex::new(DateTime::<Utc>::from_timestamp_millis(TEST_EPOCH_MILLISECONDS).unwrap_or_default()),
			named: Mutex::default(),
		}
	}
}

impl TestClocks {
	fn named(&self, name: &'static str) -> Arc<NamedClock> {
		Arc::clone(self.named.lock().entry(name).or_default())
	}
}

/// Time shared by every interval, timeout and sleep requested under one name.
struct NamedClock {
	advances: broadcast::Sender<Duration>,
	requested: Notify,
}

impl Default for NamedClock {
	fn default() -> Self {
		Self {
			advances: broadcast::channel(16).0,
			requested: Notify::new(),
		}
	}
}

impl NamedClock {
	/// Starts measuring elapsed time and lets a pending `wait_for_time_request` through.
	fn request(&self) -> ElapsedTime {
		let elapsed = ElapsedTime {
			elapsed: Duration::ZERO,
			advances: BroadcastStream::new(self.advances.subscribe()),
		};
		self.requested.notify_one();
		elapsed
	}
}

struct ElapsedTime {
	elapsed: Duration,
	advances: BroadcastStream<Duration>,
}

impl ElapsedTime {
	/// Applies every advance sent so far. `None` once the clock is gone.
	fn poll_elapsed(&mut self, context: &mut Context) -> Option<Duration> {
		loop {
			match self.advances.poll_next_unpin(context) {
				Poll::Ready(Some(advance)) => {
					self.elapsed += advance.expect("Test clock advanced too often without being polled.");
				}
				Poll::Ready(None) => return None,
				Poll::Pending => return Some(self.elapsed),
			}
		}
	}
}

impl TimeSource {
	pub fn test() -> Self {
		Self {
			test_clocks: Some(Arc::default()),
		}
	}

	fn test_clocks(&self) -> &TestClocks {
		self.test_clocks.as_deref().expect("Can only be called in test mode.")
	}

	pub fn now(&self) -> DateTime<Utc> {
		match &self.test_clocks {
			None => Utc::now(),
			Some(test_clocks) => *test_clocks.wall_clock.lock(),
		}
	}

	/// Milliseconds since the unix epoch.
	pub fn now_milliseconds(&self) -> i64 {
		self.now().timestamp_millis()
	}

	pub fn interval_at(&self, name: &'static str, start: Duration, period: Duration) -> Interval {
		match &self.test_clocks {
			None => {
				let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + start, period);
				interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
				Interval::Tokio(interval)
			}
			Some(test_clocks) => Interval::Test(TestInterval {
				elapsed: test_clocks.named(name).request(),
				next_deadline: start,
				period,
			}),
		}
	}

	pub fn timeout<ValueFuture: Future>(
		&self,
		name: &'static str,
		duration: Duration,
		future: ValueFuture,
	) -> Timeout<ValueFuture> {
		match &self.test_clocks {
			None => Timeout::Tokio(tokio::time::timeout(duration, future)),
			Some(test_clocks) => Timeout::Test(TestTimeout {
				future,
				elapsed: test_clocks.named(name).request(),
				deadline: duration,
			}),
		}
	}

	pub async fn sleep(&self, name: &'static str, duration: Duration) {
		match &self.test_clocks {
			None => tokio::time::sleep(duration).await,
			Some(_) => {
				let _ = self
					.timeout(name, duration, futures_util::future::pending::<()>())
					.await;
			}
		}
	}

	pub fn advance_time(&self, name: &'static str, by_duration: Duration) {
		// Nobody may be waiting on the clock yet.
		let _ = self.test_clocks().named(name).advances.send(by_duration);
	}

	pub fn set_now(&self, now: DateTime<Utc>) {
		*self.test_clocks().wall_clock.lock() = now;
	}

	pub fn advance_now(&self, by_duration: Duration) {
		let by_duration = chrono::Duration::from_std(by_duration).expect("Duration out of range.");
		*self.test_clocks().wall_clock.lock() += by_duration;
	}

	/// Resolves once an interval, timeout or sleep with the given name has been requested.
	pub async fn wait_for_time_request(&self, name: &'static str) {
		if let Some(test_clocks) = &self.test_clocks {
			let clock = test_clocks.named(name);
			clock.requested.notified().await;
		}
	}
}

pub enum Interval {
	Tokio(tokio::time::Interval),
	Test(TestInterval),
}

impl Interval {
	pub async fn tick(&mut self) {
		match self {
			Interval::Tokio(interval) => {
				interval.tick().await;
			}
			Interval::Test(interval) => {
				if interval.next().await.is_none() {
					panic!("Test clock of the interval was dropped.");
				}
			}
		}
	}
}

pub struct TestInterval {
	elapsed: ElapsedTime,
	next_deadline: Duration,
	period: Duration,
}

impl Stream for TestInterval {
	type Item = ();

	fn poll_next(mut self: Pin<&mut Self>, context: &mut Context) -> Poll<Option<Self::Item>> {
		let Some(elapsed) = self.elapsed.poll_elapsed(context) else {
			return Poll::Ready(None);
		};
		if elapsed < self.next_deadline {
			return Poll::Pending;
		}

		let period = self.period;
		self.next_deadline += period;
		Poll::Ready(Some(()))
	}
}

#[pin_project(project = ProjectedTimeout)]
pub enum Timeout<ValueFuture> {
	Tokio(#[pin] tokio::time::Timeout<ValueFuture>),
	Test(#[pin] TestTimeout<ValueFuture>),
}

impl<ValueFuture: Future> Future for Timeout<ValueFuture> {
	type Output = Result<ValueFuture::Output, ()>;

	fn poll(self: Pin<&mut Self>, context: &mut Context) -> Poll<Self::Output> {
		match self.project() {
			ProjectedTimeout::Tokio(timeout) => timeout.poll(context).map(|result| result.map_err(|_| ())),
			ProjectedTimeout::Test(timeout) => timeout.poll(context),
		}
	}
}

#[pin_project]
pub struct TestTimeout<ValueFuture> {
	#[pin]
	future: ValueFuture,
	elapsed: ElapsedTime,
	deadline: Duration,
}

impl<ValueFuture: Future> Future for TestTimeout<ValueFuture> {
	type Output = Result<ValueFuture::Output, ()>;

	fn poll(self: Pin<&mut Self>, context: &mut Context) -> Poll<Self::Output> {
		let this = self.project();
		match this.elapsed.poll_elapsed(context) {
			Some(elapsed) if elapsed < *this.deadline => this.future.poll(context).map(Ok),
			_ => Poll::Ready(Err(())),
		}
	}
}
