use std::fmt;

use super::TextSnapshot;
use crate::error::{Result, TextError};
use crate::rope::LineExtent;
use crate::span::Span;
use crate::tracking::{PointTrackingMode, SpanTrackingMode, track_position, track_span};

/// A position bound to the snapshot it is valid in.
#[derive(Clone, PartialEq, Eq)]
pub struct SnapshotPoint {
	snapshot: TextSnapshot,
	position: usize,
}

impl SnapshotPoint {
	pub fn new(snapshot: &TextSnapshot, position: usize) -> Result<Self> {
		if position > snapshot.len() {
			return Err(TextError::PositionOutOfRange {
				position,
				length: snapshot.len(),
			});
		}
		Ok(Self {
			snapshot: snapshot.clone(),
			position,
		})
	}

	#[inline]
	pub fn position(&self) -> usize {
		self.position
	}

	pub fn snapshot(&self) -> &TextSnapshot {
		&self.snapshot
	}

	/// The character at the point; fails at the end of the text.
	pub fn char(&self) -> Result<char> {
		self.snapshot.char_at(self.position)
	}

	pub fn containing_line(&self) -> Result<SnapshotLine> {
		self.snapshot.line_from_position(self.position)
	}

	/// Maps the point into another snapshot of the same buffer.
	pub fn translate_to(&self, target: &TextSnapshot, mode: PointTrackingMode) -> Result<SnapshotPoint> {
		let position = track_position(mode, self.position, self.snapshot.version(), target.version())?;
		SnapshotPoint::new(target, position)
	}
}

impl fmt::Debug for SnapshotPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SnapshotPoint(v{}:{})", self.snapshot.version_number(), self.position)
	}
}

/// A span bound to the snapshot it is valid in.
#[derive(Clone, PartialEq, Eq)]
pub struct SnapshotSpan {
	snapshot: TextSnapshot,
	span: Span,
}

impl SnapshotSpan {
	pub fn new(snapshot: &TextSnapshot, span: Span) -> Result<Self> {
		if span.end() > snapshot.len() {
			return Err(TextError::SpanOutOfRange {
				span,
				length: snapshot.len(),
			});
		}
		Ok(Self {
			snapshot: snapshot.clone(),
			span,
		})
	}

	/// A span covering the whole snapshot.
	pub fn full(snapshot: &TextSnapshot) -> Self {
		Self {
			snapshot: snapshot.clone(),
			span: Span::new(0, snapshot.len()),
		}
	}

	pub fn from_points(start: &SnapshotPoint, end: &SnapshotPoint) -> Result<Self> {
		if !start.snapshot.ptr_eq(&end.snapshot) {
			return Err(TextError::VersionMismatch);
		}
		SnapshotSpan::new(&start.snapshot, Span::from_bounds(start.position, end.position)?)
	}

	#[inline]
	pub fn span(&self) -> Span {
		self.span
	}

	pub fn snapshot(&self) -> &TextSnapshot {
		&self.snapshot
	}

	pub fn start(&self) -> SnapshotPoint {
		SnapshotPoint {
			snapshot: self.snapshot.clone(),
			position: self.span.start(),
		}
	}

	pub fn end(&self) -> SnapshotPoint {
		SnapshotPoint {
			snapshot: self.snapshot.clone(),
			position: self.span.end(),
		}
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.span.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.span.is_empty()
	}

	pub fn text(&self) -> Result<String> {
		self.snapshot.get_text(self.span)
	}

	/// Shared part of two spans over the same snapshot.
	pub fn overlap(&self, other: &SnapshotSpan) -> Result<Option<SnapshotSpan>> {
		if !self.snapshot.ptr_eq(&other.snapshot) {
			return Err(TextError::VersionMismatch);
		}
		Ok(self.span.overlap(other.span).map(|span| SnapshotSpan {
			snapshot: self.snapshot.clone(),
			span,
		}))
	}

	/// Maps the span into another snapshot of the same buffer.
	pub fn translate_to(&self, target: &TextSnapshot, mode: SpanTrackingMode) -> Result<SnapshotSpan> {
		let span = track_span(mode, self.span, self.snapshot.version(), target.version())?;
		SnapshotSpan::new(target, span)
	}
}

impl fmt::Debug for SnapshotSpan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SnapshotSpan(v{}:{})", self.snapshot.version_number(), self.span)
	}
}

/// One line of a snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct SnapshotLine {
	snapshot: TextSnapshot,
	extent: LineExtent,
}

impl SnapshotLine {
	pub(crate) fn new(snapshot: TextSnapshot, extent: LineExtent) -> Self {
		Self { snapshot, extent }
	}

	#[inline]
	pub fn line_number(&self) -> usize {
		self.extent.line_number
	}

	pub fn snapshot(&self) -> &TextSnapshot {
		&self.snapshot
	}

	/// First position of the line.
	pub fn start(&self) -> usize {
		self.extent.span.start()
	}

	/// Position just before the line terminator.
	pub fn end(&self) -> usize {
		self.extent.span.end()
	}

	/// Position just after the line terminator.
	pub fn end_including_line_break(&self) -> usize {
		self.extent.span.end() + self.extent.line_break_len
	}

	/// Length of the terminator, 0 on the last line.
	pub fn line_break_length(&self) -> usize {
		self.extent.line_break_len
	}

	pub fn len(&self) -> usize {
		self.extent.span.len()
	}

	pub fn is_empty(&self) -> bool {
		self.extent.span.is_empty()
	}

	/// The line content without its terminator.
	pub fn extent(&self) -> SnapshotSpan {
		SnapshotSpan {
			snapshot: self.snapshot.clone(),
			span: self.extent.span,
		}
	}

	pub fn extent_including_line_break(&self) -> SnapshotSpan {
		SnapshotSpan {
			snapshot: self.snapshot.clone(),
			span: Span::new(self.start(), self.extent.span.len() + self.extent.line_break_len),
		}
	}

	pub fn text(&self) -> Result<String> {
		self.snapshot.get_text(self.extent.span)
	}

	pub fn text_including_line_break(&self) -> Result<String> {
		self.snapshot.get_text(self.extent_including_line_break().span)
	}
}

impl fmt::Debug for SnapshotLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"SnapshotLine(v{}:{} {} +{})",
			self.snapshot.version_number(),
			self.extent.line_number,
			self.extent.span,
			self.extent.line_break_len
		)
	}
}
