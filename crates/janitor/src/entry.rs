//! Tracked entries and the per-kind release dispatch.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tidy_worker::{TaskHandle, panic_message};

use crate::config::UnreleasedPolicy;
use crate::error::{JanitorError, Result};
use crate::janitor::Janitor;
use crate::link::Link;
use crate::resource::{Callback, Dispose, Subscription, TweenHandle};

/// Identity of a tracked resource.
///
/// Derived from the address of the resource's shared payload, so every clone
/// of a handle maps to the same key. Bound callbacks carry the key of the
/// callback they wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey(usize);

impl EntryKey {
	pub(crate) fn of<T: ?Sized>(arc: &Arc<T>) -> Self {
		Self(Arc::as_ptr(arc).cast::<()>().addr())
	}

	pub(crate) const fn from_addr(addr: usize) -> Self {
		Self(addr)
	}
}

/// Kind of a tracked entry, selecting its release procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResourceKind {
	/// Nested janitor, released by destroying it.
	Janitor,
	/// Zero-argument callback, released by calling it.
	Callback,
	/// Callback with captured arguments, released by calling it once.
	BoundCallback,
	/// Generic disposable object, released through its first capability.
	Dispose,
	/// Cooperative task, released by cancelling it.
	Task,
	/// Event subscription, released by unsubscribing.
	Subscription,
	/// Animation or timer, released by pausing then destroying.
	Tween,
	/// Value with no release procedure.
	Opaque,
	/// Re-insertion task of a repeatable link.
	Persister,
}

impl ResourceKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Janitor => "janitor",
			Self::Callback => "callback",
			Self::BoundCallback => "bound_callback",
			Self::Dispose => "dispose",
			Self::Task => "task",
			Self::Subscription => "subscription",
			Self::Tween => "tween",
			Self::Opaque => "opaque",
			Self::Persister => "persister",
		}
	}

	/// Callback kinds may not be added while a release pass is running.
	pub const fn is_callback(self) -> bool {
		matches!(self, Self::Callback | Self::BoundCallback)
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Read-only view of one tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
	pub kind: ResourceKind,
	pub key: EntryKey,
}

enum Slot {
	Janitor(Janitor),
	Callback(Callback),
	Bound(Box<dyn FnOnce() + Send>),
	Dispose(Arc<dyn Dispose>),
	Task(TaskHandle),
	Subscription(Subscription),
	Tween(TweenHandle),
	Opaque(#[allow(dead_code, reason = "held only to keep the value alive until release")] Arc<dyn Any + Send + Sync>),
	Persister(Arc<Link>),
}

/// One tracked resource.
///
/// Entries come out of [`Janitor::remove`] and friends when the caller takes
/// a resource back; [`Self::release`] runs its release procedure by hand.
pub struct Entry {
	key: EntryKey,
	slot: Slot,
}

impl fmt::Debug for Entry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entry").field("kind", &self.kind()).field("key", &self.key).finish()
	}
}

impl Entry {
	/// Wraps a value that has no release procedure. It is kept alive until
	/// released, then dropped under the janitor's [`UnreleasedPolicy`].
	pub fn opaque(value: Arc<dyn Any + Send + Sync>) -> Self {
		Self {
			key: EntryKey::of(&value),
			slot: Slot::Opaque(value),
		}
	}

	pub(crate) fn janitor(janitor: Janitor) -> Self {
		Self {
			key: janitor.entry_key(),
			slot: Slot::Janitor(janitor),
		}
	}

	pub(crate) fn callback(callback: Callback) -> Self {
		Self {
			key: callback.entry_key(),
			slot: Slot::Callback(callback),
		}
	}

	/// Wraps `callback` and its arguments in a thunk that owns the arguments.
	pub(crate) fn bound<A>(callback: &Callback<A>, args: A) -> Self
	where
		A: Send + 'static,
	{
		let callback = callback.clone();
		Self {
			key: callback.entry_key(),
			slot: Slot::Bound(Box::new(move || callback.call(args))),
		}
	}

	pub(crate) fn dispose(object: Arc<dyn Dispose>) -> Self {
		Self {
			key: EntryKey::of(&object),
			slot: Slot::Dispose(object),
		}
	}

	pub(crate) fn task(task: TaskHandle) -> Self {
		Self {
			key: EntryKey::from_addr(task.addr()),
			slot: Slot::Task(task),
		}
	}

	pub(crate) fn subscription(subscription: Subscription) -> Self {
		Self {
			key: crate::Tracked::key(&subscription),
			slot: Slot::Subscription(subscription),
		}
	}

	pub(crate) fn tween(tween: TweenHandle) -> Self {
		Self {
			key: crate::Tracked::key(&tween),
			slot: Slot::Tween(tween),
		}
	}

	pub(crate) fn persister(link: Arc<Link>) -> Self {
		Self {
			key: EntryKey::of(&link),
			slot: Slot::Persister(link),
		}
	}

	pub fn key(&self) -> EntryKey {
		self.key
	}

	pub fn kind(&self) -> ResourceKind {
		match &self.slot {
			Slot::Janitor(_) => ResourceKind::Janitor,
			Slot::Callback(_) => ResourceKind::Callback,
			Slot::Bound(_) => ResourceKind::BoundCallback,
			Slot::Dispose(_) => ResourceKind::Dispose,
			Slot::Task(_) => ResourceKind::Task,
			Slot::Subscription(_) => ResourceKind::Subscription,
			Slot::Tween(_) => ResourceKind::Tween,
			Slot::Opaque(_) => ResourceKind::Opaque,
			Slot::Persister(_) => ResourceKind::Persister,
		}
	}

	pub fn info(&self) -> EntryInfo {
		EntryInfo {
			kind: self.kind(),
			key: self.key,
		}
	}

	/// Returns true when this entry tracks a nested janitor.
	pub fn is_janitor(&self) -> bool {
		matches!(self.slot, Slot::Janitor(_))
	}

	/// Runs the release procedure for this entry's kind.
	///
	/// Errors and panics raised by the resource are caught and returned as
	/// [`JanitorError::ReleaseFailed`].
	pub fn release(self, policy: UnreleasedPolicy) -> Result<()> {
		let kind = self.kind();
		tracing::trace!(kind = kind.as_str(), "janitor.release");
		match catch_unwind(AssertUnwindSafe(move || self.slot.release(kind, policy))) {
			Ok(Ok(())) => Ok(()),
			Ok(Err(err)) => Err(JanitorError::ReleaseFailed {
				kind,
				message: format!("{err:#}"),
			}),
			Err(payload) => Err(JanitorError::ReleaseFailed {
				kind,
				message: panic_message(&*payload),
			}),
		}
	}
}

impl Slot {
	fn release(self, kind: ResourceKind, policy: UnreleasedPolicy) -> anyhow::Result<()> {
		match self {
			Self::Janitor(janitor) => janitor.destroy()?,
			Self::Callback(callback) => callback.call(()),
			Self::Bound(thunk) => thunk(),
			Self::Dispose(object) => {
				if let Some(result) = object.dispose() {
					return result;
				}
				if let Some(result) = object.destroy() {
					return result;
				}
				report_unreleased(kind, policy);
			}
			Self::Task(task) => task.cancel(),
			Self::Subscription(subscription) => subscription.unsubscribe(),
			Self::Tween(tween) => return tween.release(),
			Self::Opaque(_) => report_unreleased(kind, policy),
			Self::Persister(link) => link.schedule(0),
		}
		Ok(())
	}
}

fn report_unreleased(kind: ResourceKind, policy: UnreleasedPolicy) {
	match policy {
		UnreleasedPolicy::Ignore => tracing::trace!(kind = kind.as_str(), "janitor.release.skipped"),
		UnreleasedPolicy::Warn => tracing::warn!(kind = kind.as_str(), "janitor.release.unreleased"),
	}
}
