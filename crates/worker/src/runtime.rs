use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::panic_message;
use crate::scheduler::{Deferred, ScheduleError, Scheduler};
use crate::spawn::runtime_handle;

/// Scheduler that runs deferred work on a tokio runtime.
///
/// Each deferral becomes a spawned task that yields once before running, so
/// the work never executes inside the caller's turn. Closing the scheduler
/// rejects new work and drops work that has not started yet.
#[derive(Debug, Clone, Default)]
pub struct RuntimeScheduler {
	handle: Option<Handle>,
	closed: CancellationToken,
}

impl RuntimeScheduler {
	/// Creates a scheduler bound to whichever runtime is current at deferral
	/// time, or the shared fallback runtime.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a scheduler pinned to one runtime.
	pub fn from_handle(handle: Handle) -> Self {
		Self {
			handle: Some(handle),
			closed: CancellationToken::new(),
		}
	}

	pub fn close(&self) {
		self.closed.cancel();
	}

	pub fn is_closed(&self) -> bool {
		self.closed.is_cancelled()
	}
}

impl Scheduler for RuntimeScheduler {
	#[allow(clippy::disallowed_methods)]
	fn defer(&self, task: Deferred) -> Result<(), ScheduleError> {
		if self.closed.is_cancelled() {
			return Err(ScheduleError::Closed);
		}

		let handle = self.handle.clone().unwrap_or_else(runtime_handle);
		let closed = self.closed.clone();
		tracing::trace!("worker.runtime.defer");
		handle.spawn(async move {
			tokio::task::yield_now().await;
			if closed.is_cancelled() {
				tracing::trace!("worker.runtime.dropped");
				return;
			}
			if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
				tracing::warn!(panic = %panic_message(&*payload), "worker.runtime.panic");
			}
		});
		Ok(())
	}
}
