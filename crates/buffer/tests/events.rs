//! Notification order, reentrancy and background delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use weft_buffer::{BufferConfig, ChangedPriority, EdgeInsertionMode, TextBuffer};
use weft_text::{ContentType, Span, SpanTrackingMode};

type Log = Arc<Mutex<Vec<String>>>;

fn inline_buffer(text: &str) -> TextBuffer {
	let mut config = BufferConfig::default();
	config.background.enabled = false;
	TextBuffer::with_config(text, ContentType::text(), config).unwrap()
}

fn background_buffer(text: &str, thread_name: &str) -> TextBuffer {
	let mut config = BufferConfig::default();
	config.background.thread_name = thread_name.to_string();
	TextBuffer::with_config(text, ContentType::text(), config).unwrap()
}

fn subscribe_all(buffer: &TextBuffer, log: &Log) {
	let subs = buffer.subscriptions();
	subs.on_changing({
		let log = Arc::clone(log);
		move |args| log.lock().push(format!("changing@{}", args.before().version_number()))
	});
	for (priority, name) in [
		(ChangedPriority::Low, "low"),
		(ChangedPriority::Medium, "medium"),
		(ChangedPriority::High, "high"),
	] {
		subs.on_changed(priority, {
			let log = Arc::clone(log);
			move |args| {
				log.lock()
					.push(format!("{name} {}->{}", args.before().version_number(), args.after().version_number()))
			}
		});
	}
	subs.on_changed_background({
		let log = Arc::clone(log);
		move |args| {
			log.lock()
				.push(format!("background {}->{}", args.before().version_number(), args.after().version_number()))
		}
	});
	subs.on_post_changed({
		let log = Arc::clone(log);
		move |snapshot| log.lock().push(format!("post v{}", snapshot.version_number()))
	});
}

#[test]
fn tiers_run_in_priority_order() {
	let buffer = inline_buffer("abc");
	let log: Log = Arc::default();
	subscribe_all(&buffer, &log);

	buffer.insert(0, "x").unwrap();
	assert_eq!(
		*log.lock(),
		vec!["changing@0", "high 0->1", "background 0->1", "medium 0->1", "low 0->1", "post v1"]
	);
}

#[test]
fn edits_made_by_handlers_notify_after_the_current_edit() {
	let buffer = inline_buffer("abc");
	let log: Log = Arc::default();
	subscribe_all(&buffer, &log);
	buffer.subscriptions().on_changed(ChangedPriority::High, {
		let weak = buffer.downgrade();
		move |args| {
			if args.after().version_number() == 1
				&& let Some(buffer) = weak.upgrade()
			{
				let after = buffer.insert(args.after().len(), "!").unwrap();
				assert_eq!(after.version_number(), 2);
			}
		}
	});

	buffer.insert(0, "x").unwrap();
	assert_eq!(buffer.current_snapshot().text(), "xabc!");
	assert_eq!(
		*log.lock(),
		vec![
			"changing@0",
			"high 0->1",
			"changing@1",
			"background 0->1",
			"medium 0->1",
			"low 0->1",
			"high 1->2",
			"background 1->2",
			"medium 1->2",
			"low 1->2",
			"post v2",
		]
	);
}

#[test]
fn background_delivery_is_ordered_and_serialized() {
	let buffer = background_buffer("", "weft-test-events");
	let seen = Arc::new(Mutex::new(Vec::new()));
	let in_flight = Arc::new(AtomicBool::new(false));
	let editing_thread = std::thread::current().id();
	buffer.subscriptions().on_changed_background({
		let seen = Arc::clone(&seen);
		let in_flight = Arc::clone(&in_flight);
		move |args| {
			assert!(!in_flight.swap(true, Ordering::SeqCst), "background handlers overlapped");
			std::thread::sleep(Duration::from_millis(1));
			let thread = std::thread::current();
			assert_ne!(thread.id(), editing_thread);
			seen.lock()
				.push((args.after().version_number(), thread.name().map(str::to_string)));
			in_flight.store(false, Ordering::SeqCst);
		}
	});

	for _ in 0..20 {
		buffer.insert(0, "x").unwrap();
	}
	buffer.flush_background();

	let seen = seen.lock();
	let versions: Vec<u64> = seen.iter().map(|(v, _)| *v).collect();
	assert_eq!(versions, (1..=20).collect::<Vec<u64>>());
	assert!(seen.iter().all(|(_, name)| name.as_deref() == Some("weft-test-events")));
}

#[test]
fn background_panics_do_not_stop_delivery() {
	let buffer = background_buffer("", "weft-test-panics");
	let delivered = Arc::new(Mutex::new(Vec::new()));
	buffer.subscriptions().on_changed_background(|args| {
		if args.after().version_number() == 1 {
			panic!("first background delivery failed");
		}
	});
	buffer.subscriptions().on_changed_background({
		let delivered = Arc::clone(&delivered);
		move |args| delivered.lock().push(args.after().version_number())
	});
	buffer.insert(0, "a").unwrap();
	buffer.insert(0, "b").unwrap();
	buffer.flush_background();
	assert_eq!(*delivered.lock(), vec![1, 2]);
}

#[test]
fn disposing_still_delivers_queued_notifications() {
	let buffer = background_buffer("", "weft-test-dispose");
	let (sender, receiver) = mpsc::channel();
	buffer.subscriptions().on_changed_background(move |args| {
		let _ = sender.send(args.after().version_number());
	});
	buffer.insert(0, "a").unwrap();
	buffer.dispose();
	assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(1));
	assert!(buffer.insert(0, "b").is_err());
}

#[test]
fn read_only_changes_notify_immediately_without_post() {
	let buffer = inline_buffer("0123456789");
	let log: Log = Arc::default();
	subscribe_all(&buffer, &log);
	buffer.subscriptions().on_read_only_regions_changed({
		let log = Arc::clone(&log);
		move |args| {
			let spans: Vec<String> = args.affected().iter().map(|s| s.to_string()).collect();
			log.lock().push(format!("regions v{} {}", args.snapshot().version_number(), spans.join(",")));
		}
	});

	let mut edit = buffer.create_read_only_region_edit().unwrap();
	edit.create_read_only_region_with(Span::new(1, 2), SpanTrackingMode::EdgeExclusive, EdgeInsertionMode::Deny)
		.unwrap();
	edit.create_read_only_region(Span::new(6, 2)).unwrap();
	edit.apply().unwrap();

	// An empty region edit publishes nothing.
	buffer.create_read_only_region_edit().unwrap().apply().unwrap();

	assert_eq!(*log.lock(), vec![format!("regions v0 {},{}", Span::new(1, 2), Span::new(6, 2))]);
}

#[test]
fn content_type_changes_are_queued_behind_text_changes() {
	let buffer = inline_buffer("abc");
	let log: Log = Arc::default();
	subscribe_all(&buffer, &log);
	buffer.subscriptions().on_content_type_changed({
		let log = Arc::clone(&log);
		move |args| log.lock().push(format!("content type v{}", args.after().version_number()))
	});
	buffer.subscriptions().on_changed(ChangedPriority::Low, {
		let weak = buffer.downgrade();
		move |args| {
			if args.after().version_number() == 1
				&& let Some(buffer) = weak.upgrade()
			{
				buffer.change_content_type(ContentType::new("rust"), None).unwrap();
			}
		}
	});

	buffer.insert(0, "x").unwrap();
	assert_eq!(
		*log.lock(),
		vec![
			"changing@0",
			"high 0->1",
			"background 0->1",
			"medium 0->1",
			"low 0->1",
			"content type v2",
			"post v2",
		]
	);
}
