//! Reentrancy-safe notification queue.
//!
//! Notifications raised while another is being delivered, typically by a
//! handler that edits the buffer, are queued behind it instead of running
//! nested. When the queue drains, the post-changed callback runs once if any
//! drained notification asked for it.

use std::collections::VecDeque;

use parking_lot::Mutex;

pub(crate) type Notification = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
	pending: VecDeque<Notification>,
	draining: bool,
	post_pending: bool,
}

enum Step {
	Run(Notification),
	Post,
	Done,
}

#[derive(Default)]
pub(crate) struct DispatchQueue {
	state: Mutex<QueueState>,
}

impl DispatchQueue {
	/// Queues `notification` and, unless a drain is already running up the
	/// stack or on another thread, drains the queue on the calling thread.
	///
	/// `post` runs after the queue empties whenever at least one notification
	/// since the last post was raised with `wants_post`. Notifications raised by
	/// `post` itself start another round.
	pub(crate) fn raise(&self, notification: Notification, wants_post: bool, post: impl Fn()) {
		{
			let mut state = self.state.lock();
			state.pending.push_back(notification);
			state.post_pending |= wants_post;
			if state.draining {
				return;
			}
			state.draining = true;
		}
		loop {
			let step = {
				let mut state = self.state.lock();
				if let Some(next) = state.pending.pop_front() {
					Step::Run(next)
				} else if std::mem::take(&mut state.post_pending) {
					Step::Post
				} else {
					state.draining = false;
					Step::Done
				}
			};
			match step {
				Step::Run(notification) => notification(),
				Step::Post => post(),
				Step::Done => return,
			}
		}
	}

	#[cfg(test)]
	fn is_draining(&self) -> bool {
		self.state.lock().draining
	}
}
