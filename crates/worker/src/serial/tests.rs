use std::sync::mpsc::channel;
use std::time::Duration;

use super::*;

fn queue(name: &str) -> Arc<SerialQueue> {
	Arc::new(SerialQueue::spawn(TaskClass::Background, name).unwrap())
}

#[test]
fn jobs_run_in_order_on_worker_thread() {
	let queue = queue("serial-order");
	let seen = Arc::new(Mutex::new(Vec::new()));
	for i in 0..100 {
		let seen = Arc::clone(&seen);
		queue
			.enqueue(move || {
				let name = std::thread::current().name().map(str::to_string);
				seen.lock().push((i, name));
			})
			.unwrap();
	}
	queue.flush();
	let seen = seen.lock();
	assert_eq!(seen.len(), 100);
	for (expected, (i, name)) in seen.iter().enumerate() {
		assert_eq!(*i, expected);
		assert_eq!(name.as_deref(), Some("serial-order"));
	}
	assert_eq!(queue.completed(), 100);
}

#[test]
fn jobs_never_overlap() {
	let queue = queue("serial-overlap");
	let active = Arc::new(AtomicU64::new(0));
	let max = Arc::new(AtomicU64::new(0));
	for _ in 0..20 {
		let active = Arc::clone(&active);
		let max = Arc::clone(&max);
		queue
			.enqueue(move || {
				let now = active.fetch_add(1, Ordering::SeqCst) + 1;
				max.fetch_max(now, Ordering::SeqCst);
				std::thread::sleep(Duration::from_millis(1));
				active.fetch_sub(1, Ordering::SeqCst);
			})
			.unwrap();
	}
	queue.flush();
	assert_eq!(max.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_job_does_not_stop_queue() {
	let queue = queue("serial-panic");
	let (tx, rx) = channel();
	queue.enqueue(|| panic!("job failure")).unwrap();
	queue.enqueue(move || tx.send("after").unwrap()).unwrap();
	assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("after"));
	queue.flush();
	assert_eq!(queue.panicked(), 1);
	assert_eq!(queue.completed(), 2);
}

#[test]
fn flush_from_worker_returns_immediately() {
	let queue = queue("serial-reentrant");
	let (tx, rx) = channel();
	let inner = Arc::clone(&queue);
	queue
		.enqueue(move || {
			assert!(inner.is_worker_thread());
			inner.flush();
			tx.send(()).unwrap();
		})
		.unwrap();
	assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(()));
	assert!(!queue.is_worker_thread());
}

#[test]
fn shutdown_rejects_new_jobs_and_drains_old_ones() {
	let queue = queue("serial-shutdown");
	let (tx, rx) = channel();
	queue
		.enqueue(move || {
			std::thread::sleep(Duration::from_millis(10));
			tx.send(()).unwrap();
		})
		.unwrap();
	queue.shutdown();
	assert!(queue.is_closed());
	assert_eq!(queue.enqueue(|| {}), Err(EnqueueError::Closed));
	assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(()));
	queue.flush();
}
