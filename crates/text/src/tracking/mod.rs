//! Mapping positions and spans between versions of a buffer.
//!
//! The functions here are pure: they walk the version chain between two
//! versions and replay the recorded changes, forward or in reverse. A
//! position at or past the end of a change shifts by the change's length
//! delta. A position at the start or strictly inside a change, or exactly at
//! an insertion, is decided by the change itself:
//!
//! * opaque changes keep the position at the same offset into the new text,
//!   clamped to its length, and nudge it off the middle of a `\r\n` pair the
//!   edit created;
//! * other changes move [`PointTrackingMode::Positive`] positions to the end of
//!   the replacement and [`PointTrackingMode::Negative`] positions to its start.
//!
//! [`TrackingPoint`] and [`TrackingSpan`] wrap these functions in handles that
//! remember where they were created.

mod history;
mod point;
mod span;

pub use point::TrackingPoint;
pub use span::{TrackingBehavior, TrackingSpan};

use crate::change::{NormalizedChangeCollection, TextChange};
use crate::error::{Result, TextError};
use crate::span::Span;
use crate::version::TextVersion;

/// Edge behavior of a tracked position when text is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointTrackingMode {
	/// The position moves to the end of text inserted at it.
	Positive,
	/// The position stays in front of text inserted at it.
	Negative,
}

/// Edge behavior of a tracked span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanTrackingMode {
	/// Insertions at either edge stay outside the span.
	EdgeExclusive,
	/// Insertions at either edge become part of the span.
	EdgeInclusive,
	/// Both edges track positively.
	EdgePositive,
	/// Both edges track negatively.
	EdgeNegative,
	/// Tracking is delegated to a user supplied [`TrackingBehavior`].
	Custom,
}

impl SpanTrackingMode {
	/// Point modes used for the start and the end of the span.
	pub fn edge_modes(self) -> Result<(PointTrackingMode, PointTrackingMode)> {
		use PointTrackingMode::{Negative, Positive};
		match self {
			SpanTrackingMode::EdgeExclusive => Ok((Positive, Negative)),
			SpanTrackingMode::EdgeInclusive => Ok((Negative, Positive)),
			SpanTrackingMode::EdgePositive => Ok((Positive, Positive)),
			SpanTrackingMode::EdgeNegative => Ok((Negative, Negative)),
			SpanTrackingMode::Custom => Err(TextError::CustomTrackingMode),
		}
	}
}

/// How a tracking handle treats round trips between versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackingFidelity {
	/// Every lookup tracks from the version the handle was created on.
	#[default]
	Forward,
	/// Lookups remember their results, so tracking back to a version visited
	/// before returns the exact position seen there.
	Backward,
	/// As `Backward`, and a version marked as reiterating a remembered version
	/// resolves to the position remembered for it.
	UndoRedo,
}

/// Maps `position` from `current` to the newer (or same) version `target`.
pub fn track_position_forward_in_time(
	mode: PointTrackingMode,
	position: usize,
	current: &TextVersion,
	target: &TextVersion,
) -> Result<usize> {
	check_position(position, current)?;
	let mut position = position;
	for version in current.path_to(target)? {
		if let Some(changes) = version.changes() {
			position = map_forward(changes, position, mode);
		}
	}
	Ok(position)
}

/// Maps `position` from `current` back to the older (or same) version `target`.
pub fn track_position_backward_in_time(
	mode: PointTrackingMode,
	position: usize,
	current: &TextVersion,
	target: &TextVersion,
) -> Result<usize> {
	check_position(position, current)?;
	let mut position = position;
	for version in target.path_to(current)?.iter().rev() {
		if let Some(changes) = version.changes() {
			position = map_backward(changes, position, mode);
		}
	}
	Ok(position)
}

/// Maps `position` from `current` to `target` in whichever direction applies.
pub fn track_position(mode: PointTrackingMode, position: usize, current: &TextVersion, target: &TextVersion) -> Result<usize> {
	if target.version_number() >= current.version_number() {
		track_position_forward_in_time(mode, position, current, target)
	} else {
		track_position_backward_in_time(mode, position, current, target)
	}
}

/// Maps `span` forward; the end never lands before the start.
pub fn track_span_forward_in_time(mode: SpanTrackingMode, span: Span, current: &TextVersion, target: &TextVersion) -> Result<Span> {
	let (start_mode, end_mode) = mode.edge_modes()?;
	check_span(span, current)?;
	let start = track_position_forward_in_time(start_mode, span.start(), current, target)?;
	let end = track_position_forward_in_time(end_mode, span.end(), current, target)?;
	Ok(Span::new(start, end.max(start) - start))
}

/// Maps `span` backward; the end never lands before the start.
pub fn track_span_backward_in_time(mode: SpanTrackingMode, span: Span, current: &TextVersion, target: &TextVersion) -> Result<Span> {
	let (start_mode, end_mode) = mode.edge_modes()?;
	check_span(span, current)?;
	let start = track_position_backward_in_time(start_mode, span.start(), current, target)?;
	let end = track_position_backward_in_time(end_mode, span.end(), current, target)?;
	Ok(Span::new(start, end.max(start) - start))
}

/// Maps `span` from `current` to `target` in whichever direction applies.
pub fn track_span(mode: SpanTrackingMode, span: Span, current: &TextVersion, target: &TextVersion) -> Result<Span> {
	if target.version_number() >= current.version_number() {
		track_span_forward_in_time(mode, span, current, target)
	} else {
		track_span_backward_in_time(mode, span, current, target)
	}
}

fn check_position(position: usize, version: &TextVersion) -> Result<()> {
	if position > version.length() {
		return Err(TextError::PositionOutOfRange {
			position,
			length: version.length(),
		});
	}
	Ok(())
}

fn check_span(span: Span, version: &TextVersion) -> Result<()> {
	if span.end() > version.length() {
		return Err(TextError::SpanOutOfRange {
			span,
			length: version.length(),
		});
	}
	Ok(())
}

/// One side of a change, so forward and backward mapping share their logic.
struct Side<'a> {
	position: usize,
	len: usize,
	text: &'a str,
}

impl Side<'_> {
	fn end(&self) -> usize {
		self.position + self.len
	}

	fn old(change: &TextChange) -> Side<'_> {
		Side {
			position: change.old_position(),
			len: change.old_len(),
			text: change.old_text(),
		}
	}

	fn new(change: &TextChange) -> Side<'_> {
		Side {
			position: change.new_position(),
			len: change.new_len(),
			text: change.new_text(),
		}
	}
}

fn map_forward(changes: &NormalizedChangeCollection, position: usize, mode: PointTrackingMode) -> usize {
	let index = changes.partition_by_old_end(position);
	if let Some(change) = changes.get(index).filter(|c| c.old_position() <= position) {
		return map_within(&Side::old(change), &Side::new(change), change.is_opaque(), position, mode);
	}
	match index.checked_sub(1).map(|i| &changes[i]) {
		Some(prev) => shift(position, prev.old_end(), prev.new_end()),
		None => position,
	}
}

fn map_backward(changes: &NormalizedChangeCollection, position: usize, mode: PointTrackingMode) -> usize {
	let index = changes.partition_by_new_end(position);
	if let Some(change) = changes.get(index).filter(|c| c.new_position() <= position) {
		return map_within(&Side::new(change), &Side::old(change), change.is_opaque(), position, mode);
	}
	match index.checked_sub(1).map(|i| &changes[i]) {
		Some(prev) => shift(position, prev.new_end(), prev.old_end()),
		None => position,
	}
}

/// Moves a position past a change by the distance between the change's ends.
#[inline]
fn shift(position: usize, from_end: usize, to_end: usize) -> usize {
	position - from_end + to_end
}

fn map_within(from: &Side<'_>, to: &Side<'_>, opaque: bool, position: usize, mode: PointTrackingMode) -> usize {
	if opaque && from.len > 0 && to.len > 0 {
		let offset = position - from.position;
		let mut mapped = offset.min(to.len);
		if splits_crlf(to.text, mapped) && !splits_crlf(from.text, offset) {
			match mode {
				PointTrackingMode::Positive => mapped += 1,
				PointTrackingMode::Negative => mapped -= 1,
			}
		}
		return to.position + mapped;
	}
	match mode {
		PointTrackingMode::Positive => to.end(),
		PointTrackingMode::Negative => to.position,
	}
}

/// Returns true if `offset` sits between the `\r` and `\n` of a pair in `text`.
fn splits_crlf(text: &str, offset: usize) -> bool {
	if offset == 0 {
		return false;
	}
	let mut chars = text.chars().skip(offset - 1);
	chars.next() == Some('\r') && chars.next() == Some('\n')
}
