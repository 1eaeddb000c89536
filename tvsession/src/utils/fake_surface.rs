use crate::registry::{PresentationSurface, SurfaceId};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceCall {
	Attached,
	Detached,
}

/// Records attach and detach calls.
#[derive(Clone)]
pub struct FakeSurface {
	id: SurfaceId,
	calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl FakeSurface {
	pub fn new(id: &str) -> Self {
		Self {
			id: SurfaceId::from(id),
			calls: Arc::default(),
		}
	}

	pub fn calls(&self) -> Vec<SurfaceCall> {
		self.calls.lock().clone()
	}

	pub fn is_attached(&self) -> bool {
		self.calls.lock().last() == Some(&SurfaceCall::Attached)
	}
}

impl PresentationSurface for FakeSurface {
	fn id(&self) -> SurfaceId {
		self.id.clone()
	}

	fn attach(&self) {
		self.calls.lock().push(SurfaceCall::Attached);
	}

	fn detach(&self) {
		self.calls.lock().push(SurfaceCall::Detached);
	}
}
