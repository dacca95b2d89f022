use std::fmt;
use std::sync::Arc;

use tidy_worker::{RuntimeScheduler, Scheduler};

/// Attempts a repeatable link makes to re-insert itself before giving up.
pub const DEFAULT_LINK_ATTEMPTS: u32 = 3;

/// What to do with entries that have no release procedure.
///
/// Applies to opaque entries and to [`Dispose`](crate::Dispose) objects that
/// expose neither disposal capability. Either way the reference is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreleasedPolicy {
	/// Drop the reference silently.
	#[default]
	Ignore,
	/// Log a warning naming the entry kind.
	Warn,
}

/// Janitor configuration, inherited by children created through
/// [`Janitor::extend`](crate::Janitor::extend).
#[derive(Clone)]
pub struct JanitorConfig {
	pub(crate) unreleased: UnreleasedPolicy,
	pub(crate) link_attempts: u32,
	pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl Default for JanitorConfig {
	fn default() -> Self {
		Self {
			unreleased: UnreleasedPolicy::default(),
			link_attempts: DEFAULT_LINK_ATTEMPTS,
			scheduler: Arc::new(RuntimeScheduler::new()),
		}
	}
}

impl fmt::Debug for JanitorConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("JanitorConfig")
			.field("unreleased", &self.unreleased)
			.field("link_attempts", &self.link_attempts)
			.finish_non_exhaustive()
	}
}

impl JanitorConfig {
	/// Sets the policy for entries without a release procedure.
	#[must_use]
	pub fn unreleased(mut self, policy: UnreleasedPolicy) -> Self {
		self.unreleased = policy;
		self
	}

	/// Sets how many times a repeatable link tries to re-insert itself.
	///
	/// # Panics
	///
	/// Panics if `attempts` is zero.
	#[must_use]
	pub fn link_attempts(mut self, attempts: u32) -> Self {
		assert!(attempts > 0, "link attempts must be > 0");
		self.link_attempts = attempts;
		self
	}

	/// Sets the host scheduler repeatable links defer their re-insertion onto.
	#[must_use]
	pub fn scheduler(mut self, scheduler: impl Scheduler) -> Self {
		self.scheduler = Arc::new(scheduler);
		self
	}

	pub fn unreleased_policy(&self) -> UnreleasedPolicy {
		self.unreleased
	}

	pub fn max_link_attempts(&self) -> u32 {
		self.link_attempts
	}
}
