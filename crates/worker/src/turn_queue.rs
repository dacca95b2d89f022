use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::panic_message;
use crate::scheduler::{Deferred, ScheduleError, Scheduler};

#[derive(Default)]
struct TurnState {
	queue: VecDeque<Deferred>,
	closed: bool,
	turn: u64,
}

/// Manually driven cooperative event loop.
///
/// Work deferred onto the queue runs when the host calls [`Self::run_turn`].
/// Each turn runs exactly the work that was queued before it started; work
/// deferred while a turn is running waits for the next one.
#[derive(Clone, Default)]
pub struct TurnQueue {
	state: Arc<Mutex<TurnState>>,
}

impl fmt::Debug for TurnQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("TurnQueue")
			.field("pending", &state.queue.len())
			.field("closed", &state.closed)
			.field("turn", &state.turn)
			.finish()
	}
}

impl TurnQueue {
	/// Creates an open, empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of tasks waiting for the next turn.
	pub fn pending(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Number of turns run so far.
	pub fn turn(&self) -> u64 {
		self.state.lock().turn
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	/// Rejects further deferrals. Already queued work still runs.
	pub fn close(&self) {
		self.state.lock().closed = true;
	}

	/// Accepts deferrals again after [`Self::close`].
	pub fn reopen(&self) {
		self.state.lock().closed = false;
	}

	/// Runs one turn and returns the number of tasks executed.
	///
	/// A panicking task is logged and does not stop the rest of the turn.
	pub fn run_turn(&self) -> usize {
		let (turn, batch) = {
			let mut state = self.state.lock();
			state.turn = state.turn.wrapping_add(1);
			(state.turn, std::mem::take(&mut state.queue))
		};

		let ran = batch.len();
		for task in batch {
			if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
				tracing::warn!(turn, panic = %panic_message(&*payload), "worker.turn.panic");
			}
		}
		tracing::trace!(turn, ran, "worker.turn");
		ran
	}

	/// Runs turns until one executes nothing or `max_turns` is reached.
	///
	/// Returns the total number of tasks executed.
	pub fn run_until_idle(&self, max_turns: usize) -> usize {
		let mut total = 0usize;
		for _ in 0..max_turns {
			let ran = self.run_turn();
			if ran == 0 {
				break;
			}
			total = total.wrapping_add(ran);
		}
		total
	}
}

impl Scheduler for TurnQueue {
	fn defer(&self, task: Deferred) -> Result<(), ScheduleError> {
		let mut state = self.state.lock();
		if state.closed {
			return Err(ScheduleError::Closed);
		}
		state.queue.push_back(task);
		tracing::trace!(pending = state.queue.len(), "worker.turn.defer");
		Ok(())
	}
}
