use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::JanitorConfig;
use crate::entry::{Entry, EntryInfo, EntryKey};
use crate::error::{JanitorError, Result};
use crate::resource::{Callback, Resource, Tracked};

pub(crate) struct JanitorInner {
	entries: Mutex<VecDeque<Entry>>,
	releasing: AtomicBool,
	pub(crate) config: JanitorConfig,
}

/// Resource-cleanup registry.
///
/// A cheap clonable handle: clones share the same entries and the same
/// reentrancy guard. Entries are released in insertion order by
/// [`Self::destroy`], after which the janitor is empty and reusable.
///
/// The entry list is never locked while a release procedure runs, so
/// resources may freely call back into the janitor during a pass. Only
/// [`Self::destroy`] and adding callbacks are rejected while releasing.
#[derive(Clone)]
pub struct Janitor {
	pub(crate) inner: Arc<JanitorInner>,
}

impl Default for Janitor {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Janitor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Janitor")
			.field("entries", &self.len())
			.field("releasing", &self.is_releasing())
			.field("config", &self.inner.config)
			.finish()
	}
}

/// Clears the releasing flag when a pass ends, including by unwinding.
struct ReleasingGuard<'a>(&'a AtomicBool);

impl Drop for ReleasingGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

impl Janitor {
	/// Creates an empty janitor with the default configuration.
	pub fn new() -> Self {
		Self::with_config(JanitorConfig::default())
	}

	/// Creates an empty janitor.
	pub fn with_config(config: JanitorConfig) -> Self {
		Self {
			inner: Arc::new(JanitorInner {
				entries: Mutex::new(VecDeque::new()),
				releasing: AtomicBool::new(false),
				config,
			}),
		}
	}

	/// Creates a janitor pre-seeded with `entries`, in order.
	pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
		Self::with_config_and_entries(JanitorConfig::default(), entries)
	}

	/// Creates a janitor with `config`, pre-seeded with `entries` in order.
	pub fn with_config_and_entries(config: JanitorConfig, entries: impl IntoIterator<Item = Entry>) -> Self {
		let janitor = Self::with_config(config);
		janitor.inner.entries.lock().extend(entries);
		janitor
	}

	pub(crate) fn from_inner(inner: Arc<JanitorInner>) -> Self {
		Self { inner }
	}

	pub fn config(&self) -> &JanitorConfig {
		&self.inner.config
	}

	/// Tracks `resource` and returns it unchanged.
	///
	/// # Errors
	///
	/// Returns [`JanitorError::Reentrant`] when `resource` is a callback and a
	/// release pass is running.
	pub fn add<R: Resource>(&self, resource: R) -> Result<R> {
		self.push(resource.to_entry(), "add")?;
		Ok(resource)
	}

	/// Tracks `callback` together with the arguments it will be called with,
	/// and returns the callback unchanged.
	///
	/// # Errors
	///
	/// Returns [`JanitorError::Reentrant`] when a release pass is running.
	pub fn add_bound<A>(&self, callback: Callback<A>, args: A) -> Result<Callback<A>>
	where
		A: Send + 'static,
	{
		self.push(Entry::bound(&callback, args), "add_bound")?;
		Ok(callback)
	}

	fn push(&self, entry: Entry, operation: &'static str) -> Result<()> {
		let mut entries = self.inner.entries.lock();
		if entry.kind().is_callback() && self.is_releasing() {
			return Err(JanitorError::Reentrant { operation });
		}
		tracing::trace!(kind = entry.kind().as_str(), len = entries.len() + 1, "janitor.add");
		entries.push_back(entry);
		Ok(())
	}

	/// Appends entries without the callback guard. Used for internal entries.
	pub(crate) fn append(&self, new: impl IntoIterator<Item = Entry>) {
		self.inner.entries.lock().extend(new);
	}

	/// Removes the first entry tracking `resource` without releasing it.
	///
	/// The caller becomes responsible for the returned entry.
	pub fn remove<R: Tracked + ?Sized>(&self, resource: &R) -> Option<Entry> {
		let key = resource.key();
		let mut entries = self.inner.entries.lock();
		let index = entries.iter().position(|entry| entry.key() == key)?;
		entries.remove(index)
	}

	/// Removes every entry tracking `resource` without releasing them, in one
	/// forward pass. Returned entries keep their relative order.
	pub fn remove_all<R: Tracked + ?Sized>(&self, resource: &R) -> Vec<Entry> {
		let key = resource.key();
		let mut entries = self.inner.entries.lock();
		let mut removed = Vec::new();
		let mut index = 0;
		while let Some(offset) = entries.range(index..).position(|entry| entry.key() == key) {
			index += offset;
			if let Some(entry) = entries.remove(index) {
				removed.push(entry);
			}
		}
		removed
	}

	/// Forgets every entry without releasing any of them.
	pub fn clear(&self) {
		let dropped = std::mem::take(&mut *self.inner.entries.lock());
		tracing::debug!(dropped = dropped.len(), "janitor.clear");
	}

	/// Releases every tracked entry in insertion order.
	///
	/// Entries added while the pass runs (non-callback kinds only) are
	/// released in the same pass. A failing resource is logged and the pass
	/// moves on; the janitor is empty when this returns.
	///
	/// # Errors
	///
	/// Returns [`JanitorError::Reentrant`] without touching any entry when a
	/// pass is already running on this janitor.
	pub fn destroy(&self) -> Result<()> {
		if self
			.inner
			.releasing
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			tracing::debug!("janitor.destroy.reentrant");
			return Err(JanitorError::Reentrant { operation: "destroy" });
		}
		let _guard = ReleasingGuard(&self.inner.releasing);

		let policy = self.inner.config.unreleased;
		let mut dispatched = 0usize;
		let mut failed = 0usize;
		loop {
			let next = self.inner.entries.lock().pop_front();
			let Some(entry) = next else {
				break;
			};
			dispatched = dispatched.wrapping_add(1);
			if let Err(err) = entry.release(policy) {
				failed = failed.wrapping_add(1);
				tracing::warn!(error = %err, "janitor.release.failed");
			}
		}

		tracing::debug!(dispatched, failed, "janitor.destroy.done");
		Ok(())
	}

	/// Alias of [`Self::destroy`].
	pub fn destruct(&self) -> Result<()> {
		self.destroy()
	}

	pub fn len(&self) -> usize {
		self.inner.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.entries.lock().is_empty()
	}

	/// Returns true while a release pass is running.
	pub fn is_releasing(&self) -> bool {
		self.inner.releasing.load(Ordering::Acquire)
	}

	/// Returns true when `resource` is tracked at least once.
	pub fn contains<R: Tracked + ?Sized>(&self, resource: &R) -> bool {
		let key = resource.key();
		self.inner.entries.lock().iter().any(|entry| entry.key() == key)
	}

	/// Iterates over a snapshot of the tracked entries in insertion order.
	pub fn entries(&self) -> impl Iterator<Item = EntryInfo> + use<> {
		let snapshot: Vec<EntryInfo> = self.inner.entries.lock().iter().map(Entry::info).collect();
		snapshot.into_iter()
	}

	/// Returns true when `value` is a janitor handle.
	pub fn is_janitor(value: &dyn Any) -> bool {
		value.is::<Janitor>()
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	pub(crate) fn entry_key(&self) -> EntryKey {
		EntryKey::of(&self.inner)
	}

	pub(crate) fn downgrade(&self) -> Weak<JanitorInner> {
		Arc::downgrade(&self.inner)
	}

	/// Appends `new` unless a pass is running.
	pub(crate) fn try_append(&self, new: impl IntoIterator<Item = Entry>) -> bool {
		let mut entries = self.inner.entries.lock();
		if self.is_releasing() {
			return false;
		}
		entries.extend(new);
		true
	}
}

impl Tracked for Janitor {
	fn key(&self) -> EntryKey {
		self.entry_key()
	}
}

impl Resource for Janitor {
	fn to_entry(&self) -> Entry {
		Entry::janitor(self.clone())
	}
}
