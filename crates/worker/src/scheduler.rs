use std::sync::Arc;

use thiserror::Error;

/// One unit of deferred host work.
pub type Deferred = Box<dyn FnOnce() + Send + 'static>;

/// Error returned when a scheduler refuses deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
	/// The scheduler no longer accepts work.
	#[error("scheduler is closed")]
	Closed,
}

/// Host cooperative scheduler.
///
/// Implementations must not run `task` synchronously inside `defer`; it runs
/// on a later turn of the host loop.
pub trait Scheduler: Send + Sync + 'static {
	fn defer(&self, task: Deferred) -> Result<(), ScheduleError>;
}

impl<S> Scheduler for Arc<S>
where
	S: Scheduler + ?Sized,
{
	fn defer(&self, task: Deferred) -> Result<(), ScheduleError> {
		(**self).defer(task)
	}
}
