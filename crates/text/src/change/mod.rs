//! Text changes and their normalized collections.
//!
//! A [`NormalizedChangeCollection`] is what a version transition carries:
//! changes sorted by position, none overlapping or touching another, each
//! recording both its old and its new coordinates. Tracking relies on that
//! ordering to binary search changes by old or new position.


use std::ops::Deref;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{Result, TextError};
use crate::line_break::{LineBreakBoundaryConditions, compute_line_count_delta};
use crate::rope::StringRebuilder;
use crate::span::Span;

/// One contiguous replacement between two versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
	old_position: usize,
	new_position: usize,
	old_text: String,
	new_text: String,
	old_len: usize,
	new_len: usize,
	line_count_delta: isize,
	opaque: bool,
}

impl TextChange {
	/// Position of the change in the version before the edit.
	#[inline]
	pub fn old_position(&self) -> usize {
		self.old_position
	}

	/// Position of the change in the version after the edit.
	#[inline]
	pub fn new_position(&self) -> usize {
		self.new_position
	}

	#[inline]
	pub fn old_end(&self) -> usize {
		self.old_position + self.old_len
	}

	#[inline]
	pub fn new_end(&self) -> usize {
		self.new_position + self.new_len
	}

	#[inline]
	pub fn old_span(&self) -> Span {
		Span::new(self.old_position, self.old_len)
	}

	#[inline]
	pub fn new_span(&self) -> Span {
		Span::new(self.new_position, self.new_len)
	}

	#[inline]
	pub fn old_len(&self) -> usize {
		self.old_len
	}

	#[inline]
	pub fn new_len(&self) -> usize {
		self.new_len
	}

	pub fn old_text(&self) -> &str {
		&self.old_text
	}

	pub fn new_text(&self) -> &str {
		&self.new_text
	}

	/// Length difference introduced by this change.
	#[inline]
	pub fn delta(&self) -> isize {
		self.new_len as isize - self.old_len as isize
	}

	/// Net number of lines added (or removed, when negative).
	#[inline]
	pub fn line_count_delta(&self) -> isize {
		self.line_count_delta
	}

	/// Opaque changes keep interior positions at their relative offset when tracked.
	#[inline]
	pub fn is_opaque(&self) -> bool {
		self.opaque
	}
}

/// A replacement requested by an edit, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
	pub span: Span,
	pub text: String,
	pub opaque: bool,
}

impl PendingChange {
	pub fn new(span: Span, text: impl Into<String>) -> Self {
		Self {
			span,
			text: text.into(),
			opaque: false,
		}
	}

	/// An opaque replacement; see [`TextChange::is_opaque`].
	pub fn opaque(span: Span, text: impl Into<String>) -> Self {
		Self {
			span,
			text: text.into(),
			opaque: true,
		}
	}

	fn is_noop(&self) -> bool {
		self.span.is_empty() && self.text.is_empty()
	}
}

bitflags! {
	/// Options applied when an edit's changes are normalized.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct EditOptions: u8 {
		/// Trim the text each change has in common at its start and end, and
		/// drop changes that turn out to replace text with itself.
		const MINIMAL_CHANGE = 1 << 0;
	}
}

impl EditOptions {
	pub const NONE: EditOptions = EditOptions::empty();
}

/// Sorted, non-overlapping changes describing one version transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedChangeCollection {
	changes: Arc<[TextChange]>,
}

impl Default for NormalizedChangeCollection {
	fn default() -> Self {
		Self::empty()
	}
}

impl NormalizedChangeCollection {
	/// A collection with no changes, used for metadata-only versions.
	pub fn empty() -> Self {
		Self { changes: Arc::from([]) }
	}

	/// Normalizes `pending` against the text it applies to.
	///
	/// Changes are stably sorted by start, and any two whose old spans overlap or
	/// touch are merged into one covering both, with their texts concatenated in
	/// sorted order. A merged change is never opaque.
	pub fn normalize(source: &StringRebuilder, pending: Vec<PendingChange>, options: EditOptions) -> Result<Self> {
		if let Some(p) = pending.iter().find(|p| p.span.end() > source.len()) {
			return Err(TextError::SpanOutOfRange {
				span: p.span,
				length: source.len(),
			});
		}
		let mut pending: Vec<PendingChange> = pending.into_iter().filter(|p| !p.is_noop()).collect();
		pending.sort_by_key(|p| p.span.start());

		let mut merged: Vec<PendingChange> = Vec::with_capacity(pending.len());
		for next in pending {
			match merged.last_mut() {
				Some(last) if next.span.start() <= last.span.end() => {
					last.span = last.span.union(next.span);
					last.text.push_str(&next.text);
					last.opaque = false;
				}
				_ => merged.push(next),
			}
		}

		let mut changes = Vec::with_capacity(merged.len());
		let mut delta: isize = 0;
		for p in merged {
			let mut old_position = p.span.start();
			let mut old_text = source.get_text(p.span)?;
			let mut new_text = p.text;
			if options.contains(EditOptions::MINIMAL_CHANGE) {
				let trimmed = trim_common(&old_text, &new_text);
				if trimmed.old.is_empty() && trimmed.new.is_empty() {
					continue;
				}
				old_position += trimmed.prefix;
				old_text = trimmed.old;
				new_text = trimmed.new;
			}

			let old_len = old_text.chars().count();
			let new_len = new_text.chars().count();
			let conditions = boundary_conditions(source, old_position, old_position + old_len)?;
			let change = TextChange {
				old_position,
				new_position: (old_position as isize + delta) as usize,
				line_count_delta: compute_line_count_delta(conditions, &old_text, &new_text),
				opaque: p.opaque && old_len > 0 && new_len > 0,
				old_text,
				new_text,
				old_len,
				new_len,
			};
			delta += change.delta();
			changes.push(change);
		}

		Ok(Self {
			changes: changes.into(),
		})
	}

	/// Applies the changes to `source`, right to left.
	pub fn apply_to(&self, source: &StringRebuilder) -> Result<StringRebuilder> {
		let mut content = source.clone();
		for change in self.changes.iter().rev() {
			content = content.replace(change.old_span(), change.new_text())?;
		}
		Ok(content)
	}

	/// Returns the changes as requests that normalize back to this collection.
	pub fn to_pending(&self) -> Vec<PendingChange> {
		self.changes
			.iter()
			.map(|c| PendingChange {
				span: c.old_span(),
				text: c.new_text.clone(),
				opaque: c.opaque,
			})
			.collect()
	}

	/// Sum of all length deltas.
	pub fn delta(&self) -> isize {
		self.changes.iter().map(TextChange::delta).sum()
	}

	/// Sum of all line count deltas.
	pub fn line_count_delta(&self) -> isize {
		self.changes.iter().map(TextChange::line_count_delta).sum()
	}

	/// Returns true if any change adds or removes a line.
	pub fn includes_line_changes(&self) -> bool {
		self.changes.iter().any(|c| c.line_count_delta != 0)
	}

	/// Index of the first change whose old span ends after `position`, or
	/// that inserts exactly at it.
	pub(crate) fn partition_by_old_end(&self, position: usize) -> usize {
		self.changes
			.partition_point(|c| c.old_end() < position || (c.old_end() == position && c.old_len() > 0))
	}

	/// Index of the first change whose new span ends after `position`, or
	/// that deletes exactly at it.
	pub(crate) fn partition_by_new_end(&self, position: usize) -> usize {
		self.changes
			.partition_point(|c| c.new_end() < position || (c.new_end() == position && c.new_len() > 0))
	}
}

impl Deref for NormalizedChangeCollection {
	type Target = [TextChange];

	fn deref(&self) -> &[TextChange] {
		&self.changes
	}
}

impl<'a> IntoIterator for &'a NormalizedChangeCollection {
	type Item = &'a TextChange;
	type IntoIter = std::slice::Iter<'a, TextChange>;

	fn into_iter(self) -> Self::IntoIter {
		self.changes.iter()
	}
}

fn boundary_conditions(source: &StringRebuilder, start: usize, end: usize) -> Result<LineBreakBoundaryConditions> {
	let mut conditions = LineBreakBoundaryConditions::empty();
	if start > 0 && source.char_at(start - 1)? == '\r' {
		conditions |= LineBreakBoundaryConditions::PRECEDING_RETURN;
	}
	if end < source.len() && source.char_at(end)? == '\n' {
		conditions |= LineBreakBoundaryConditions::SUCCEEDING_NEWLINE;
	}
	Ok(conditions)
}

struct Trimmed {
	prefix: usize,
	old: String,
	new: String,
}

/// Strips the characters `old` and `new` share at both ends.
fn trim_common(old: &str, new: &str) -> Trimmed {
	let old_chars: Vec<char> = old.chars().collect();
	let new_chars: Vec<char> = new.chars().collect();
	let prefix = old_chars.iter().zip(&new_chars).take_while(|(a, b)| a == b).count();
	let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
	let suffix = old_chars
		.iter()
		.rev()
		.zip(new_chars.iter().rev())
		.take(max_suffix)
		.take_while(|(a, b)| a == b)
		.count();
	Trimmed {
		prefix,
		old: old_chars[prefix..old_chars.len() - suffix].iter().collect(),
		new: new_chars[prefix..new_chars.len() - suffix].iter().collect(),
	}
}
