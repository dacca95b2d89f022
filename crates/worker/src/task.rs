use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct TaskInner {
	token: Option<CancellationToken>,
	abort: Option<AbortHandle>,
	cancelled: AtomicBool,
}

/// Clonable handle to a cooperative task.
///
/// Tasks that carry a [`CancellationToken`] are cancelled cooperatively by
/// firing the token; tasks known only by an [`AbortHandle`] are aborted.
/// Cancelling is idempotent and never fails, whether the task is finished,
/// running, or was never polled.
#[derive(Debug, Clone)]
pub struct TaskHandle {
	inner: Arc<TaskInner>,
}

impl TaskHandle {
	fn from_parts(token: Option<CancellationToken>, abort: Option<AbortHandle>) -> Self {
		Self {
			inner: Arc::new(TaskInner {
				token,
				abort,
				cancelled: AtomicBool::new(false),
			}),
		}
	}

	/// Wraps a cancellation token owned by some cooperative task or thread.
	pub fn from_token(token: CancellationToken) -> Self {
		Self::from_parts(Some(token), None)
	}

	/// Wraps the abort handle of an already spawned tokio task.
	pub fn from_abort(abort: AbortHandle) -> Self {
		Self::from_parts(None, Some(abort))
	}

	/// Spawns a cooperative task that receives its own cancellation token.
	pub fn spawn<F, Fut>(f: F) -> Self
	where
		F: FnOnce(CancellationToken) -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let token = CancellationToken::new();
		let join = crate::spawn(f(token.clone()));
		Self::from_parts(Some(token), Some(join.abort_handle()))
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		if self.inner.cancelled.swap(true, Ordering::AcqRel) {
			return;
		}
		tracing::trace!(finished = self.is_finished(), "worker.task.cancel");
		if let Some(token) = &self.inner.token {
			token.cancel();
		} else if let Some(abort) = &self.inner.abort
			&& !abort.is_finished()
		{
			abort.abort();
		}
	}

	/// Returns true once cancellation has been requested.
	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::Acquire) || self.inner.token.as_ref().is_some_and(CancellationToken::is_cancelled)
	}

	/// Returns true when the underlying tokio task has completed.
	///
	/// Token-only handles have no task to observe and always report false.
	pub fn is_finished(&self) -> bool {
		self.inner.abort.as_ref().is_some_and(AbortHandle::is_finished)
	}

	/// Address identifying this handle and its clones.
	pub fn addr(&self) -> usize {
		Arc::as_ptr(&self.inner).addr()
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}
