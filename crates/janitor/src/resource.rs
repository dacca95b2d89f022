//! Capabilities external resources expose to the janitor, and the handles
//! that carry them.

use std::fmt;
use std::sync::Arc;

use tidy_worker::TaskHandle;

use crate::entry::{Entry, EntryKey};

/// Generic disposable object.
///
/// Release probes [`Self::dispose`] first and falls back to [`Self::destroy`];
/// the first capability that returns `Some` is the one that ran. Objects that
/// expose neither are handled by the janitor's
/// [`UnreleasedPolicy`](crate::UnreleasedPolicy).
pub trait Dispose: Send + Sync + 'static {
	/// Primary disposal capability. `None` means the object does not have one.
	fn dispose(&self) -> Option<anyhow::Result<()>> {
		None
	}

	/// Secondary disposal capability, probed when [`Self::dispose`] is absent.
	fn destroy(&self) -> Option<anyhow::Result<()>> {
		None
	}
}

/// Event subscription that can be disconnected.
pub trait Unsubscribe: Send + Sync + 'static {
	fn unsubscribe(&self);
}

/// Animation or timer handle.
///
/// Released by pausing first, so readers of the current value keep seeing a
/// valid one, and destroying afterwards.
pub trait Tween: Send + Sync + 'static {
	fn pause(&self);

	fn destroy(&self) -> anyhow::Result<()>;
}

/// Handle with an identity the janitor can look entries up by.
///
/// Used by [`Janitor::remove`](crate::Janitor::remove) and
/// [`Janitor::contains`](crate::Janitor::contains). Bound callbacks are keyed by
/// the callback, whatever their argument type.
pub trait Tracked {
	fn key(&self) -> EntryKey;
}

/// Anything that can be registered with [`Janitor::add`](crate::Janitor::add).
///
/// `add` stores the entry built by [`Self::to_entry`] and hands the original
/// value back, so handles must be cheap clones sharing one identity.
pub trait Resource: Tracked {
	/// Builds the entry tracked for this resource.
	fn to_entry(&self) -> Entry;
}

/// Shared callback, optionally taking bound arguments.
///
/// Clones share one identity. `Callback<()>` is registered directly;
/// callbacks with arguments go through
/// [`Janitor::add_bound`](crate::Janitor::add_bound).
pub struct Callback<A = ()> {
	f: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A> Clone for Callback<A> {
	fn clone(&self) -> Self {
		Self { f: Arc::clone(&self.f) }
	}
}

impl<A> fmt::Debug for Callback<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Callback").field(&self.entry_key()).finish()
	}
}

impl Callback {
	/// Creates a zero-argument callback.
	pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
		Self {
			f: Arc::new(move |()| f()),
		}
	}
}

impl<A> Callback<A> {
	/// Creates a callback that takes its arguments at call time.
	pub fn with_args(f: impl Fn(A) + Send + Sync + 'static) -> Self {
		Self { f: Arc::new(f) }
	}

	pub fn call(&self, args: A) {
		(self.f)(args);
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.f, &other.f)
	}

	pub(crate) fn entry_key(&self) -> EntryKey {
		EntryKey::of(&self.f)
	}
}

impl<A> Tracked for Callback<A> {
	fn key(&self) -> EntryKey {
		self.entry_key()
	}
}

impl Resource for Callback {
	fn to_entry(&self) -> Entry {
		Entry::callback(self.clone())
	}
}

impl<T> Tracked for Arc<T>
where
	T: Dispose,
{
	fn key(&self) -> EntryKey {
		EntryKey::of(self)
	}
}

impl<T> Resource for Arc<T>
where
	T: Dispose,
{
	fn to_entry(&self) -> Entry {
		let object: Arc<dyn Dispose> = Arc::clone(self) as Arc<dyn Dispose>;
		Entry::dispose(object)
	}
}

impl Tracked for TaskHandle {
	fn key(&self) -> EntryKey {
		EntryKey::from_addr(self.addr())
	}
}

impl Resource for TaskHandle {
	fn to_entry(&self) -> Entry {
		Entry::task(self.clone())
	}
}

/// Shared handle to an [`Unsubscribe`] capability.
#[derive(Clone)]
pub struct Subscription {
	inner: Arc<dyn Unsubscribe>,
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Subscription").field(&self.key()).finish()
	}
}

impl Subscription {
	pub fn new(subscription: impl Unsubscribe) -> Self {
		Self {
			inner: Arc::new(subscription),
		}
	}

	pub fn unsubscribe(&self) {
		self.inner.unsubscribe();
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Tracked for Subscription {
	fn key(&self) -> EntryKey {
		EntryKey::of(&self.inner)
	}
}

impl Resource for Subscription {
	fn to_entry(&self) -> Entry {
		Entry::subscription(self.clone())
	}
}

/// Shared handle to a [`Tween`].
#[derive(Clone)]
pub struct TweenHandle {
	inner: Arc<dyn Tween>,
}

impl fmt::Debug for TweenHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("TweenHandle").field(&self.key()).finish()
	}
}

impl TweenHandle {
	pub fn new(tween: impl Tween) -> Self {
		Self { inner: Arc::new(tween) }
	}

	/// Pauses, then destroys the tween.
	pub fn release(&self) -> anyhow::Result<()> {
		self.inner.pause();
		self.inner.destroy()
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Tracked for TweenHandle {
	fn key(&self) -> EntryKey {
		EntryKey::of(&self.inner)
	}
}

impl Resource for TweenHandle {
	fn to_entry(&self) -> Entry {
		Entry::tween(self.clone())
	}
}
