//! Parent/child linkage through `Janitor::extend`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tidy_janitor::{Callback, Deferred, Janitor, JanitorConfig, ResourceKind, ScheduleError, Scheduler, TurnQueue};

fn counter() -> (Arc<AtomicUsize>, Callback) {
	let count = Arc::new(AtomicUsize::new(0));
	let inner = Arc::clone(&count);
	let callback = Callback::new(move || {
		inner.fetch_add(1, Ordering::SeqCst);
	});
	(count, callback)
}

fn janitor_on(queue: &TurnQueue) -> Janitor {
	Janitor::with_config(JanitorConfig::default().scheduler(queue.clone()))
}

/// Rejects the first `rejections` deferrals, then forwards to a turn queue.
struct FlakyScheduler {
	rejections: AtomicUsize,
	queue: TurnQueue,
}

impl Scheduler for FlakyScheduler {
	fn defer(&self, task: Deferred) -> Result<(), ScheduleError> {
		let rejected = self
			.rejections
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok();
		if rejected { Err(ScheduleError::Closed) } else { self.queue.defer(task) }
	}
}

/// Runs deferred work on the spot, counting how often it was asked to.
#[derive(Default)]
struct InlineScheduler {
	calls: Arc<AtomicUsize>,
}

impl Scheduler for InlineScheduler {
	fn defer(&self, task: Deferred) -> Result<(), ScheduleError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		task();
		Ok(())
	}
}

#[test]
fn repeatable_link_survives_multiple_passes() {
	let queue = TurnQueue::new();
	let parent = janitor_on(&queue);
	let child = parent.extend(false);
	let kinds: Vec<_> = parent.entries().map(|info| info.kind).collect();
	assert_eq!(kinds, [ResourceKind::Janitor, ResourceKind::Persister]);

	let (count, callback) = counter();
	for pass in 1..=3 {
		child.add(callback.clone()).unwrap();
		parent.destroy().unwrap();
		assert_eq!(count.load(Ordering::SeqCst), pass);
		assert!(parent.is_empty());
		assert!(child.is_empty());

		assert_eq!(queue.run_turn(), 1);
		assert_eq!(parent.len(), 2, "link re-established after pass {pass}");
	}
}

#[test]
fn once_link_is_consumed_by_first_pass() {
	let queue = TurnQueue::new();
	let parent = janitor_on(&queue);
	let child = parent.extend(true);
	assert_eq!(parent.entries().map(|info| info.kind).collect::<Vec<_>>(), [ResourceKind::Janitor]);

	let (count, callback) = counter();
	child.add(callback.clone()).unwrap();
	parent.destroy().unwrap();
	assert_eq!(count.load(Ordering::SeqCst), 1);

	assert_eq!(queue.run_until_idle(8), 0);
	child.add(callback).unwrap();
	parent.destroy().unwrap();
	assert_eq!(count.load(Ordering::SeqCst), 1, "child no longer linked");
	assert_eq!(child.len(), 1);
}

#[test]
fn child_inherits_parent_config() {
	let queue = TurnQueue::new();
	let parent = Janitor::with_config(JanitorConfig::default().scheduler(queue).link_attempts(5));
	let child = parent.extend(false);
	assert_eq!(child.config().max_link_attempts(), 5);
	assert!(!child.ptr_eq(&parent));
}

#[test]
fn child_can_be_destroyed_on_its_own() {
	let queue = TurnQueue::new();
	let parent = janitor_on(&queue);
	let child = parent.extend(false);
	let (count, callback) = counter();

	child.add(callback.clone()).unwrap();
	child.destroy().unwrap();
	assert_eq!(count.load(Ordering::SeqCst), 1);
	assert_eq!(parent.len(), 2);

	child.add(callback).unwrap();
	parent.destroy().unwrap();
	assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn dropped_parent_exhausts_link_retries() {
	let queue = TurnQueue::new();
	let parent = janitor_on(&queue);
	let child = parent.extend(false);

	parent.destroy().unwrap();
	drop(parent);

	assert_eq!(queue.run_until_idle(16), 3, "one re-insertion attempt per turn");
	assert_eq!(queue.pending(), 0);
	assert!(child.is_empty());
}

#[test]
fn closed_scheduler_exhausts_without_queueing() {
	let queue = TurnQueue::new();
	let parent = janitor_on(&queue);
	parent.extend(false);

	queue.close();
	parent.destroy().unwrap();
	queue.reopen();

	assert_eq!(queue.run_until_idle(16), 0);
	assert!(parent.is_empty(), "link dropped after rejected deferrals");
}

#[test]
fn transient_rejection_is_retried() {
	let queue = TurnQueue::new();
	let scheduler = FlakyScheduler {
		rejections: AtomicUsize::new(2),
		queue: queue.clone(),
	};
	let parent = Janitor::with_config(JanitorConfig::default().scheduler(scheduler));
	parent.extend(false);

	parent.destroy().unwrap();
	assert_eq!(queue.run_turn(), 1);
	assert_eq!(parent.len(), 2);
}

#[test]
fn rejections_beyond_bound_drop_the_link() {
	let queue = TurnQueue::new();
	let scheduler = FlakyScheduler {
		rejections: AtomicUsize::new(3),
		queue: queue.clone(),
	};
	let parent = Janitor::with_config(JanitorConfig::default().scheduler(scheduler));
	parent.extend(false);

	parent.destroy().unwrap();
	assert_eq!(queue.pending(), 0);
	assert!(parent.is_empty());
}

#[test]
fn reinsertion_into_releasing_parent_is_retried_then_dropped() {
	let scheduler = InlineScheduler::default();
	let calls = Arc::clone(&scheduler.calls);
	let parent = Janitor::with_config(JanitorConfig::default().scheduler(scheduler));
	let child = parent.extend(false);
	let (count, callback) = counter();
	child.add(callback).unwrap();

	parent.destroy().unwrap();
	assert_eq!(count.load(Ordering::SeqCst), 1);
	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert!(parent.is_empty());
}

#[tokio::test]
async fn runtime_scheduler_relinks_on_later_turn() {
	let parent = Janitor::new();
	let child = parent.extend(false);
	let (count, callback) = counter();
	child.add(callback.clone()).unwrap();

	parent.destroy().unwrap();
	assert_eq!(count.load(Ordering::SeqCst), 1);

	for _ in 0..100 {
		if parent.len() == 2 {
			break;
		}
		tokio::time::sleep(Duration::from_millis(2)).await;
	}
	assert_eq!(parent.len(), 2);

	child.add(callback).unwrap();
	parent.destroy().unwrap();
	assert_eq!(count.load(Ordering::SeqCst), 2);
}
