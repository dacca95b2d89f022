//! Parent/child linkage created by [`Janitor::extend`].
//!
//! A repeatable link keeps two entries in the parent: the child itself and a
//! persister. A release pass consumes both; the persister then defers a
//! re-insertion of the pair onto the host scheduler, because the parent still
//! refuses new entries of that kind while the pass is running. Failed
//! deferrals and failed re-insertions are retried up to the configured bound,
//! after which the link is dropped.

use std::sync::{Arc, Weak};

use tidy_worker::Scheduler;

use crate::entry::Entry;
use crate::error::JanitorError;
use crate::janitor::{Janitor, JanitorInner};

pub(crate) struct Link {
	parent: Weak<JanitorInner>,
	child: Janitor,
	scheduler: Arc<dyn Scheduler>,
	max_attempts: u32,
}

impl Janitor {
	/// Creates a child janitor released whenever this one is.
	///
	/// With `once` the child is an ordinary entry, consumed by the next pass.
	/// Otherwise the link is re-established after every pass, on a later turn
	/// of the configured [`Scheduler`]. The child inherits this janitor's
	/// configuration and remains independently usable.
	pub fn extend(&self, once: bool) -> Janitor {
		let child = Janitor::with_config(self.inner.config.clone());
		if once {
			self.append([Entry::janitor(child.clone())]);
		} else {
			let link = Arc::new(Link {
				parent: self.downgrade(),
				child: child.clone(),
				scheduler: Arc::clone(&self.inner.config.scheduler),
				max_attempts: self.inner.config.link_attempts,
			});
			self.append(link.entries());
		}
		tracing::trace!(once, "janitor.extend");
		child
	}
}

impl Link {
	fn entries(self: &Arc<Self>) -> [Entry; 2] {
		[Entry::janitor(self.child.clone()), Entry::persister(Arc::clone(self))]
	}

	/// Defers re-insertion, retrying rejected deferrals in place.
	pub(crate) fn schedule(self: Arc<Self>, mut attempt: u32) {
		while attempt < self.max_attempts {
			let link = Arc::clone(&self);
			let this_attempt = attempt;
			match self.scheduler.defer(Box::new(move || link.reinsert(this_attempt))) {
				Ok(()) => return,
				Err(err) => {
					tracing::debug!(attempt, error = %err, "janitor.link.defer_rejected");
					attempt = attempt.wrapping_add(1);
				}
			}
		}
		self.give_up(attempt);
	}

	fn reinsert(self: Arc<Self>, attempt: u32) {
		let reason = match self.parent.upgrade() {
			None => "parent dropped",
			Some(inner) => {
				if Janitor::from_inner(inner).try_append(self.entries()) {
					tracing::trace!(attempt, "janitor.link.reinserted");
					return;
				}
				"parent releasing"
			}
		};

		tracing::debug!(attempt, reason, "janitor.link.retry");
		self.schedule(attempt.wrapping_add(1));
	}

	fn give_up(&self, attempts: u32) {
		let err = JanitorError::LinkRetryExhausted { attempts };
		tracing::warn!(error = %err, "janitor.link.exhausted");
	}
}
