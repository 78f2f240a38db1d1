use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use weft_text::TextError;

use super::*;
use crate::edit::EditState;

fn buffer(text: &str) -> TextBuffer {
	let mut config = BufferConfig::default();
	config.background.enabled = false;
	TextBuffer::with_config(text, ContentType::text(), config).unwrap()
}

#[derive(Default)]
struct CountingSink {
	reports: Mutex<Vec<(&'static str, String)>>,
}

impl ErrorSink for CountingSink {
	fn report(&self, source: &'static str, message: &str) {
		self.reports.lock().push((source, message.to_string()));
	}
}

#[test]
fn one_edit_at_a_time() {
	let buffer = buffer("abc");
	let mut first = buffer.edit().unwrap();
	assert!(buffer.edit_in_progress());
	assert_eq!(buffer.edit().err(), Some(EditError::EditInProgress));
	assert_eq!(buffer.create_read_only_region_edit().err(), Some(EditError::EditInProgress));
	assert_eq!(
		buffer.change_content_type(ContentType::new("rust"), None).err(),
		Some(EditError::EditInProgress)
	);

	first.insert(3, "d").unwrap();
	first.apply().unwrap();
	assert!(!buffer.edit_in_progress());
	assert_eq!(buffer.current_snapshot().text(), "abcd");
}

#[test]
fn dropping_an_open_edit_cancels_it() {
	let buffer = buffer("abc");
	{
		let mut edit = buffer.edit().unwrap();
		edit.insert(0, "x").unwrap();
	}
	assert!(!buffer.edit_in_progress());
	assert_eq!(buffer.current_snapshot().text(), "abc");
	assert_eq!(buffer.current_snapshot().version_number(), 0);
}

#[test]
fn closed_transactions_reject_everything() {
	let buffer = buffer("abc");
	let mut edit = buffer.edit().unwrap();
	assert_eq!(edit.state(), EditState::Created);
	edit.delete(Span::new(0, 1)).unwrap();
	assert_eq!(edit.state(), EditState::Active);
	edit.apply().unwrap();
	assert_eq!(edit.state(), EditState::Applied);

	let closed = Some(EditError::TransactionClosed {
		state: EditState::Applied,
	});
	assert_eq!(edit.apply().err(), closed);
	assert_eq!(edit.insert(0, "x").err(), closed);
	assert_eq!(edit.cancel().err(), closed);

	let mut edit = buffer.edit().unwrap();
	edit.cancel().unwrap();
	assert!(edit.is_canceled());
	assert_eq!(
		edit.replace(Span::new(0, 1), "x").err(),
		Some(EditError::TransactionClosed {
			state: EditState::Canceled,
		})
	);
	assert!(!buffer.edit_in_progress());
}

#[test]
fn out_of_range_operations_fail_without_closing() {
	let buffer = buffer("abc");
	let mut edit = buffer.edit().unwrap();
	assert_eq!(
		edit.insert(4, "x").err(),
		Some(EditError::Text(TextError::PositionOutOfRange { position: 4, length: 3 }))
	);
	assert!(matches!(
		edit.delete(Span::new(2, 2)),
		Err(EditError::Text(TextError::SpanOutOfRange { .. }))
	));
	assert!(edit.insert(3, "!").unwrap());
	assert_eq!(edit.apply().unwrap().text(), "abc!");
}

#[test]
fn no_op_edits_publish_nothing() {
	let buffer = buffer("abc");
	let changed = Arc::new(AtomicUsize::new(0));
	buffer.subscriptions().on_changed(ChangedPriority::High, {
		let changed = Arc::clone(&changed);
		move |_| {
			changed.fetch_add(1, Ordering::Relaxed);
		}
	});

	let before = buffer.current_snapshot();
	let mut edit = buffer.edit().unwrap();
	assert!(edit.insert(1, "").unwrap());
	assert!(edit.delete(Span::empty(2)).unwrap());
	assert!(edit.replace(Span::empty(0), "").unwrap());
	assert!(!edit.has_effective_changes());
	let after = edit.apply().unwrap();

	assert!(after.ptr_eq(&before));
	assert!(buffer.current_snapshot().ptr_eq(&before));
	assert_eq!(changed.load(Ordering::Relaxed), 0);
}

#[test]
fn minimal_change_drops_identity_replacements() {
	let buffer = buffer("hello world");
	let before = buffer.current_snapshot();
	let mut edit = buffer.create_edit(EditOptions::MINIMAL_CHANGE, None, None).unwrap();
	assert!(edit.replace(Span::new(0, 5), "hello").unwrap());
	assert!(edit.has_effective_changes());
	assert!(edit.apply().unwrap().ptr_eq(&before));
	assert_eq!(buffer.current_snapshot().version_number(), 0);

	// Without the option the same replacement is published.
	let after = buffer.replace(Span::new(0, 5), "hello").unwrap();
	assert_eq!(after.version_number(), 1);
	assert_eq!(after.text(), "hello world");
}

#[test]
fn changed_args_describe_the_edit() {
	let buffer = buffer("hello world");
	let seen = Arc::new(Mutex::new(Vec::new()));
	buffer.subscriptions().on_changed(ChangedPriority::Medium, {
		let seen = Arc::clone(&seen);
		move |args| {
			let change = &args.changes()[0];
			seen.lock().push((
				args.before().version_number(),
				args.after().version_number(),
				change.old_span(),
				change.new_text().to_string(),
				args.options(),
				args.tag().and_then(|t| t.downcast_ref::<&'static str>()).copied(),
			));
		}
	});

	let tag: EditTag = Arc::new("typing");
	let mut edit = buffer.create_edit(EditOptions::MINIMAL_CHANGE, None, Some(tag)).unwrap();
	edit.replace(Span::new(0, 5), "help!").unwrap();
	edit.apply().unwrap();

	assert_eq!(
		*seen.lock(),
		vec![(0, 1, Span::new(3, 2), "p!".to_string(), EditOptions::MINIMAL_CHANGE, Some("typing"))]
	);
}

#[test]
fn reiterated_version_is_recorded() {
	let buffer = buffer("abc");
	buffer.insert(3, "d").unwrap();
	let mut undo = buffer.create_edit(EditOptions::NONE, Some(0), None).unwrap();
	undo.delete(Span::new(3, 1)).unwrap();
	let after = undo.apply().unwrap();
	assert_eq!(after.version_number(), 2);
	assert_eq!(after.version().reiterated_version_number(), 0);
}

#[test]
fn content_type_change_is_a_versioned_no_text_edit() {
	let buffer = buffer("let x = 1;");
	let events = Arc::new(Mutex::new(Vec::new()));
	buffer.subscriptions().on_content_type_changed({
		let events = Arc::clone(&events);
		move |args| {
			events
				.lock()
				.push(format!("{}->{}", args.before_content_type(), args.after_content_type()));
		}
	});
	buffer.subscriptions().on_post_changed({
		let events = Arc::clone(&events);
		move |snapshot| events.lock().push(format!("post v{}", snapshot.version_number()))
	});

	let before = buffer.current_snapshot();
	let after = buffer.change_content_type(ContentType::new("rust"), None).unwrap();
	assert_eq!(after.version_number(), 1);
	assert_eq!(after.text(), before.text());
	assert_eq!(before.version().changes().map(|c| c.len()), Some(0));
	assert_eq!(buffer.content_type().name(), "rust");

	let same = buffer.change_content_type(ContentType::new("rust"), None).unwrap();
	assert!(same.ptr_eq(&after));
	assert_eq!(*events.lock(), vec!["text->rust".to_string(), "post v1".to_string()]);
}

#[test]
fn canceling_in_changing_keeps_the_snapshot() {
	let buffer = buffer("abc");
	buffer.subscriptions().on_changing(|args| {
		if args.before().len() < 5 {
			args.cancel();
		}
	});
	let before = buffer.current_snapshot();
	let mut edit = buffer.edit().unwrap();
	edit.insert(0, "x").unwrap();
	let result = edit.apply().unwrap();
	assert!(result.ptr_eq(&before));
	assert!(edit.is_canceled());
	assert!(buffer.current_snapshot().ptr_eq(&before));
	assert!(!buffer.edit_in_progress());
}

#[test]
fn cancel_wins_over_a_panicking_handler() {
	let buffer = buffer("abc");
	let sink = Arc::new(CountingSink::default());
	buffer.set_error_sink(sink.clone());
	buffer.subscriptions().on_changing(|args| {
		args.cancel();
		panic!("changing handler failed");
	});
	let before = buffer.current_snapshot();
	assert!(buffer.insert(0, "x").unwrap().ptr_eq(&before));
	assert_eq!(*sink.reports.lock(), vec![("changing", "changing handler failed".to_string())]);
}

#[test]
fn panicking_subscribers_are_reported_and_skipped() {
	let buffer = buffer("abc");
	let sink = Arc::new(CountingSink::default());
	buffer.set_error_sink(sink.clone());
	let after_panic = Arc::new(AtomicUsize::new(0));
	buffer.subscriptions().on_changed(ChangedPriority::High, |_| panic!("high failed"));
	buffer.subscriptions().on_changed(ChangedPriority::High, {
		let after_panic = Arc::clone(&after_panic);
		move |_| {
			after_panic.fetch_add(1, Ordering::Relaxed);
		}
	});
	buffer.subscriptions().on_post_changed(|_| panic!("post failed"));

	let after = buffer.insert(3, "d").unwrap();
	assert_eq!(after.text(), "abcd");
	assert!(buffer.current_snapshot().ptr_eq(&after));
	assert_eq!(after_panic.load(Ordering::Relaxed), 1);
	assert_eq!(
		*sink.reports.lock(),
		vec![
			("changed_high", "high failed".to_string()),
			("post_changed", "post failed".to_string()),
		]
	);
}

#[test]
fn edits_from_changing_handlers_are_rejected() {
	let buffer = buffer("abc");
	let nested = Arc::new(Mutex::new(None));
	buffer.subscriptions().on_changing({
		let weak = buffer.downgrade();
		let nested = Arc::clone(&nested);
		move |_| {
			if let Some(buffer) = weak.upgrade() {
				*nested.lock() = Some(buffer.edit().err());
			}
		}
	});
	buffer.insert(0, "x").unwrap();
	assert_eq!(*nested.lock(), Some(Some(EditError::EditInProgress)));
}

#[test]
fn unsubscribe_removes_the_handler() {
	let buffer = buffer("abc");
	let calls = Arc::new(AtomicUsize::new(0));
	let id = buffer.subscriptions().on_changed(ChangedPriority::Low, {
		let calls = Arc::clone(&calls);
		move |_| {
			calls.fetch_add(1, Ordering::Relaxed);
		}
	});
	buffer.insert(0, "x").unwrap();
	assert!(buffer.subscriptions().unsubscribe(id));
	assert!(!buffer.subscriptions().unsubscribe(id));
	buffer.insert(0, "x").unwrap();
	assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn disposed_buffers_reject_edits() {
	let buffer = buffer("abc");
	buffer.dispose();
	assert!(buffer.is_disposed());
	assert_eq!(buffer.edit().err(), Some(EditError::Disposed));
	assert_eq!(buffer.current_snapshot().text(), "abc");
}

#[test]
fn properties_are_per_buffer() {
	struct Indentation(usize);
	let a = buffer("");
	let b = buffer("");
	a.properties().get_or_create_singleton(|| Indentation(4));
	assert_eq!(a.properties().get::<Indentation>().map(|i| i.0), Some(4));
	assert!(b.properties().get::<Indentation>().is_none());
}

#[test]
fn config_is_validated_at_construction() {
	let mut config = BufferConfig::default();
	config.rope.leaf_max_chars = 0;
	assert!(matches!(
		TextBuffer::with_config("", ContentType::text(), config),
		Err(ConfigError::Invalid(_))
	));
}
