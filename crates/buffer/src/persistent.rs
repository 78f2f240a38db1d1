//! Spans that outlive the document they were created in.
//!
//! While the document is open a [`PersistentSpan`] is a tracking span and is
//! exact. When the document closes it is reduced to line and column
//! coordinates; reopening rebuilds a tracking span from them, clamped to the
//! reopened text. Coordinates survive a close/reopen cycle only as well as the
//! file's lines do.

use weft_text::{Span, SpanTrackingMode, TextError, TextSnapshot, TrackingSpan};

/// Line/column coordinates of a span; columns are characters from the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineColumnSpan {
	pub start_line: usize,
	pub start_index: usize,
	pub end_line: usize,
	pub end_index: usize,
}

impl LineColumnSpan {
	/// Coordinates of `span` in `snapshot`.
	pub fn from_span(snapshot: &TextSnapshot, span: Span) -> Result<Self, TextError> {
		let start = snapshot.line_from_position(span.start())?;
		let end = snapshot.line_from_position(span.end())?;
		Ok(Self {
			start_line: start.line_number(),
			start_index: span.start() - start.start(),
			end_line: end.line_number(),
			end_index: span.end() - end.start(),
		})
	}

	/// The span these coordinates name in `snapshot`.
	///
	/// Lines past the end clamp to the last line and columns past a line's
	/// end clamp to that end. An end that lands before the start collapses
	/// onto it.
	pub fn to_span(&self, snapshot: &TextSnapshot) -> Result<Span, TextError> {
		let start = clamped_position(snapshot, self.start_line, self.start_index)?;
		let end = clamped_position(snapshot, self.end_line, self.end_index)?;
		Span::from_bounds(start, end.max(start))
	}
}

fn clamped_position(snapshot: &TextSnapshot, line: usize, index: usize) -> Result<usize, TextError> {
	let line = snapshot.line_from_line_number(line.min(snapshot.line_count() - 1))?;
	Ok(line.start() + index.min(line.len()))
}

#[derive(Debug)]
enum Anchor {
	Open(TrackingSpan),
	Closed(LineColumnSpan),
}

/// A span that follows edits while its document is open and falls back to
/// line/column coordinates while it is closed.
#[derive(Debug)]
pub struct PersistentSpan {
	mode: SpanTrackingMode,
	anchor: Anchor,
}

impl PersistentSpan {
	/// Tracks `span` of an open document.
	pub fn new(snapshot: &TextSnapshot, span: Span, mode: SpanTrackingMode) -> Result<Self, TextError> {
		Ok(Self {
			mode,
			anchor: Anchor::Open(snapshot.create_tracking_span(span, mode)?),
		})
	}

	/// A span of a document that is not open yet.
	pub fn from_line_column(coordinates: LineColumnSpan, mode: SpanTrackingMode) -> Result<Self, TextError> {
		// Checked here so reopening cannot fail on the mode.
		mode.edge_modes()?;
		Ok(Self {
			mode,
			anchor: Anchor::Closed(coordinates),
		})
	}

	pub fn mode(&self) -> SpanTrackingMode {
		self.mode
	}

	pub fn is_document_open(&self) -> bool {
		matches!(self.anchor, Anchor::Open(_))
	}

	/// The tracked span in `snapshot`, or `None` while the document is closed.
	pub fn span_in(&self, snapshot: &TextSnapshot) -> Result<Option<Span>, TextError> {
		match &self.anchor {
			Anchor::Open(tracking) => Ok(Some(tracking.get_span(snapshot)?.span())),
			Anchor::Closed(_) => Ok(None),
		}
	}

	/// The stored coordinates while the document is closed.
	pub fn line_column(&self) -> Option<LineColumnSpan> {
		match self.anchor {
			Anchor::Open(_) => None,
			Anchor::Closed(coordinates) => Some(coordinates),
		}
	}

	/// Records where the span sits in `snapshot`, the document's final
	/// snapshot, and stops tracking.
	pub fn document_closed(&mut self, snapshot: &TextSnapshot) -> Result<LineColumnSpan, TextError> {
		let coordinates = match &self.anchor {
			Anchor::Closed(coordinates) => return Ok(*coordinates),
			Anchor::Open(tracking) => LineColumnSpan::from_span(snapshot, tracking.get_span(snapshot)?.span())?,
		};
		self.anchor = Anchor::Closed(coordinates);
		Ok(coordinates)
	}

	/// Resumes tracking in `snapshot`, the first snapshot of the reopened document.
	pub fn document_reopened(&mut self, snapshot: &TextSnapshot) -> Result<Span, TextError> {
		let span = match &self.anchor {
			Anchor::Open(tracking) => return Ok(tracking.get_span(snapshot)?.span()),
			Anchor::Closed(coordinates) => coordinates.to_span(snapshot)?,
		};
		self.anchor = Anchor::Open(snapshot.create_tracking_span(span, self.mode)?);
		Ok(span)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::TextBuffer;

	#[test]
	fn tracks_while_open_and_survives_reopen() {
		let buffer = TextBuffer::new("fn main() {\n    body();\n}\n").unwrap();
		let s0 = buffer.current_snapshot();
		let mut span = PersistentSpan::new(&s0, Span::new(16, 4), SpanTrackingMode::EdgeExclusive).unwrap();
		assert_eq!(s0.get_text(Span::new(16, 4)).unwrap(), "body");

		let s1 = buffer.insert(0, "// hi\n").unwrap();
		assert_eq!(span.span_in(&s1).unwrap(), Some(Span::new(22, 4)));

		let coordinates = span.document_closed(&s1).unwrap();
		assert_eq!(
			coordinates,
			LineColumnSpan {
				start_line: 2,
				start_index: 4,
				end_line: 2,
				end_index: 8,
			}
		);
		assert!(!span.is_document_open());
		assert_eq!(span.span_in(&s1).unwrap(), None);
		assert_eq!(span.line_column(), Some(coordinates));

		let reopened = TextBuffer::new("// hi\nfn main() {\n    body();\n}\n").unwrap();
		let r0 = reopened.current_snapshot();
		let restored = span.document_reopened(&r0).unwrap();
		assert_eq!(r0.get_text(restored).unwrap(), "body");

		let r1 = reopened.insert(0, "\n").unwrap();
		assert_eq!(span.span_in(&r1).unwrap(), Some(Span::new(23, 4)));
	}

	#[test]
	fn reopening_clamps_to_shorter_text() {
		let coordinates = LineColumnSpan {
			start_line: 1,
			start_index: 10,
			end_line: 7,
			end_index: 3,
		};
		let mut span = PersistentSpan::from_line_column(coordinates, SpanTrackingMode::EdgeInclusive).unwrap();
		let buffer = TextBuffer::new("abc\nde\nfgh").unwrap();
		let snapshot = buffer.current_snapshot();
		// Line 1 is "de", so column 10 clamps to 6; line 7 clamps to line 2, column 3.
		assert_eq!(span.document_reopened(&snapshot).unwrap(), Span::from_bounds(6, 10).unwrap());
		assert!(span.is_document_open());
	}

	#[test]
	fn collapsed_end_lands_on_start() {
		let coordinates = LineColumnSpan {
			start_line: 1,
			start_index: 2,
			end_line: 0,
			end_index: 1,
		};
		let snapshot = TextBuffer::new("abc\ndef").unwrap().current_snapshot();
		assert_eq!(coordinates.to_span(&snapshot).unwrap(), Span::empty(6));
	}

	#[test]
	fn custom_mode_is_rejected_up_front() {
		let coordinates = LineColumnSpan {
			start_line: 0,
			start_index: 0,
			end_line: 0,
			end_index: 0,
		};
		assert_eq!(
			PersistentSpan::from_line_column(coordinates, SpanTrackingMode::Custom).err(),
			Some(TextError::CustomTrackingMode)
		);
	}
}
