//! Host-side collaborators for tidy registries.
//!
//! Registries never run on their own; they lean on the host for two things:
//! a cooperative [`Scheduler`] that runs deferred work on a later turn, and
//! cancellable task handles. This crate provides both, backed either by a
//! manual [`TurnQueue`] or by the tokio runtime.

use std::any::Any;

mod runtime;
mod scheduler;
mod spawn;
mod task;
mod turn_queue;

pub use runtime::RuntimeScheduler;
pub use scheduler::{Deferred, ScheduleError, Scheduler};
pub use spawn::spawn;
pub use task::TaskHandle;
pub use turn_queue::TurnQueue;

/// Extracts a readable message from a caught panic payload.
///
/// Pass the payload itself (`&*boxed`), not the box, or the downcast sees the
/// box type instead of the message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
