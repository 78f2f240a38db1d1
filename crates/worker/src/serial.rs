//! Serialized background job queue.
//!
//! A [`SerialQueue`] owns one named worker thread. Jobs run on that thread one
//! at a time, in the order they were enqueued, so no two jobs of the same
//! queue ever overlap. A panicking job is logged and the queue keeps going.

#[cfg(test)]
mod tests;

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::ThreadId;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::{TaskClass, panic_message, spawn_named_thread};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
	Run(Job),
	Flush(oneshot::Sender<()>),
}

/// Enqueue error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
	/// The queue was shut down.
	Closed,
}

/// Counters shared between a queue handle and its worker.
#[derive(Debug, Default)]
struct Counters {
	enqueued: AtomicU64,
	completed: AtomicU64,
	panicked: AtomicU64,
}

/// A single-worker FIFO job queue.
pub struct SerialQueue {
	name: Arc<str>,
	worker: ThreadId,
	sender: Mutex<Option<mpsc::UnboundedSender<Message>>>,
	counters: Arc<Counters>,
}

impl SerialQueue {
	/// Spawns the worker thread, named `name`.
	pub fn spawn(class: TaskClass, name: impl Into<String>) -> io::Result<Self> {
		let name: String = name.into();
		let (sender, receiver) = mpsc::unbounded_channel();
		let counters = Arc::new(Counters::default());
		let label: Arc<str> = Arc::from(name.as_str());
		let handle = spawn_named_thread(class, name, {
			let counters = Arc::clone(&counters);
			let label = Arc::clone(&label);
			move || run_worker(&label, receiver, &counters)
		})?;
		Ok(Self {
			name: label,
			worker: handle.thread().id(),
			sender: Mutex::new(Some(sender)),
			counters,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Queues `job` behind every job enqueued before it.
	pub fn enqueue(&self, job: impl FnOnce() + Send + 'static) -> Result<(), EnqueueError> {
		let sender = self.sender.lock();
		let sender = sender.as_ref().ok_or(EnqueueError::Closed)?;
		sender.send(Message::Run(Box::new(job))).map_err(|_| EnqueueError::Closed)?;
		let seq = self.counters.enqueued.fetch_add(1, Ordering::Relaxed) + 1;
		tracing::trace!(queue = %self.name, seq, "serial_queue.enqueue");
		Ok(())
	}

	/// Blocks until every job enqueued before this call has finished.
	///
	/// Returns immediately when called from the worker thread itself or after
	/// shutdown.
	pub fn flush(&self) {
		if self.is_worker_thread() {
			return;
		}
		let (done, wait) = oneshot::channel();
		{
			let sender = self.sender.lock();
			let Some(sender) = sender.as_ref() else { return };
			if sender.send(Message::Flush(done)).is_err() {
				return;
			}
		}
		// An error only means the worker is gone, which also means it is idle.
		let _ = wait.blocking_recv();
	}

	/// Stops accepting jobs. Jobs already queued still run; the worker thread
	/// exits once they are done. Does not wait for it.
	pub fn shutdown(&self) {
		if self.sender.lock().take().is_some() {
			tracing::debug!(queue = %self.name, enqueued = self.enqueued(), "serial_queue.shutdown");
		}
	}

	pub fn is_closed(&self) -> bool {
		self.sender.lock().is_none()
	}

	/// Returns true when called from the queue's worker thread.
	pub fn is_worker_thread(&self) -> bool {
		std::thread::current().id() == self.worker
	}

	/// Number of jobs accepted so far.
	pub fn enqueued(&self) -> u64 {
		self.counters.enqueued.load(Ordering::Relaxed)
	}

	/// Number of jobs that ran to completion or panicked.
	pub fn completed(&self) -> u64 {
		self.counters.completed.load(Ordering::Acquire)
	}

	/// Number of jobs that panicked.
	pub fn panicked(&self) -> u64 {
		self.counters.panicked.load(Ordering::Relaxed)
	}
}

impl Drop for SerialQueue {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl std::fmt::Debug for SerialQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SerialQueue")
			.field("name", &self.name)
			.field("closed", &self.is_closed())
			.field("enqueued", &self.enqueued())
			.field("completed", &self.completed())
			.finish()
	}
}

fn run_worker(name: &str, mut receiver: mpsc::UnboundedReceiver<Message>, counters: &Counters) {
	tracing::trace!(queue = name, "serial_queue.start");
	while let Some(message) = receiver.blocking_recv() {
		match message {
			Message::Run(job) => {
				if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
					counters.panicked.fetch_add(1, Ordering::Relaxed);
					tracing::error!(queue = name, panic = %panic_message(&*payload), "serial_queue.job_panicked");
				}
				counters.completed.fetch_add(1, Ordering::Release);
			}
			Message::Flush(done) => {
				let _ = done.send(());
			}
		}
	}
	tracing::trace!(queue = name, "serial_queue.stop");
}

