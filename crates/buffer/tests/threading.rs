//! Thread affinity and concurrent readers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use pretty_assertions::assert_eq;
use weft_buffer::{BufferConfig, EditError, TextBuffer};
use weft_text::{ContentType, Span};

fn buffer(text: &str) -> TextBuffer {
	let mut config = BufferConfig::default();
	config.background.enabled = false;
	TextBuffer::with_config(text, ContentType::text(), config).unwrap()
}

#[test]
fn owned_buffers_reject_other_threads() {
	let buffer = buffer("abc");
	buffer.take_thread_ownership().unwrap();
	assert!(buffer.check_edit_access());
	buffer.take_thread_ownership().unwrap();

	let other = buffer.clone();
	let (access, edit, ownership, text) = thread::spawn(move || {
		(
			other.check_edit_access(),
			other.edit().err(),
			other.take_thread_ownership().err(),
			other.current_snapshot().text(),
		)
	})
	.join()
	.unwrap();
	assert!(!access);
	assert_eq!(edit, Some(EditError::WrongThread));
	assert_eq!(ownership, Some(EditError::WrongThread));
	assert_eq!(text, "abc");

	assert_eq!(buffer.insert(3, "d").unwrap().text(), "abcd");
}

#[test]
fn transactions_moved_to_another_thread_are_rejected() {
	let buffer = buffer("abc");
	buffer.take_thread_ownership().unwrap();
	let mut edit = buffer.edit().unwrap();
	edit.insert(0, "x").unwrap();

	let (insert, apply) = thread::spawn(move || {
		let insert = edit.insert(0, "y").err();
		let apply = edit.apply().err();
		(insert, apply)
	})
	.join()
	.unwrap();
	assert_eq!(insert, Some(EditError::WrongThread));
	assert_eq!(apply, Some(EditError::WrongThread));

	// Dropping the transaction on the other thread released the gate.
	assert!(!buffer.edit_in_progress());
	assert_eq!(buffer.current_snapshot().text(), "abc");
}

#[test]
fn unowned_buffers_take_edits_from_any_thread_one_at_a_time() {
	let buffer = buffer("");
	let writers: Vec<_> = (0..4)
		.map(|_| {
			let buffer = buffer.clone();
			thread::spawn(move || {
				let mut done = 0;
				while done < 25 {
					match buffer.insert(0, "x") {
						Ok(_) => done += 1,
						Err(EditError::EditInProgress) => thread::yield_now(),
						Err(err) => panic!("unexpected edit error: {err}"),
					}
				}
			})
		})
		.collect();
	for writer in writers {
		writer.join().unwrap();
	}
	let snapshot = buffer.current_snapshot();
	assert_eq!(snapshot.len(), 100);
	assert_eq!(snapshot.version_number(), 100);
}

#[test]
fn readers_see_consistent_snapshots_while_the_writer_edits() {
	let buffer = buffer("");
	let stop = Arc::new(AtomicBool::new(false));
	let readers: Vec<_> = (0..3)
		.map(|_| {
			let buffer = buffer.clone();
			let stop = Arc::clone(&stop);
			thread::spawn(move || {
				let mut checked = 0usize;
				loop {
					let done = stop.load(Ordering::Relaxed);
					let snapshot = buffer.current_snapshot();
					let text = snapshot.text();
					assert_eq!(text.chars().count() as u64, snapshot.version_number() * 2);
					assert_eq!(snapshot.line_count() as u64, snapshot.version_number() + 1);
					if let Ok(line) = snapshot.line_from_line_number(0) {
						assert!(line.len() <= 1);
					}
					checked += 1;
					if done {
						return checked;
					}
				}
			})
		})
		.collect();

	buffer.take_thread_ownership().unwrap();
	for _ in 0..200 {
		let len = buffer.current_snapshot().len();
		buffer.insert(len, "a\n").unwrap();
	}
	stop.store(true, Ordering::Relaxed);
	for reader in readers {
		assert!(reader.join().unwrap() > 0);
	}

	let snapshot = buffer.current_snapshot();
	assert_eq!(snapshot.line_count(), 201);
	assert_eq!(snapshot.get_text(Span::new(0, 4)).unwrap(), "a\na\n");
}
