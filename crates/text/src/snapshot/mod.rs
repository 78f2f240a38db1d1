//! Immutable views of one buffer version.
//!
//! A [`TextSnapshot`] pairs a [`TextVersion`] with the rope holding that
//! version's text. Snapshots never change after creation; they are the only
//! thing callers should hold on to for reads, from any thread.

mod content_type;
mod types;

use std::fmt;
use std::io;
use std::sync::Arc;

pub use content_type::ContentType;
pub use types::{SnapshotLine, SnapshotPoint, SnapshotSpan};

use crate::error::Result;
use crate::image::CachingTextImage;
use crate::rope::StringRebuilder;
use crate::span::Span;
use crate::tracking::{PointTrackingMode, SpanTrackingMode, TrackingBehavior, TrackingFidelity, TrackingPoint, TrackingSpan};
use crate::version::{BufferId, TextVersion};

struct SnapshotInner {
	version: TextVersion,
	image: CachingTextImage,
	content_type: ContentType,
}

/// The text of a buffer at one version.
#[derive(Clone)]
pub struct TextSnapshot {
	inner: Arc<SnapshotInner>,
}

impl TextSnapshot {
	pub fn new(version: TextVersion, content: StringRebuilder, content_type: ContentType) -> Self {
		debug_assert_eq!(version.length(), content.len());
		Self {
			inner: Arc::new(SnapshotInner {
				version,
				image: CachingTextImage::new(content),
				content_type,
			}),
		}
	}

	#[inline]
	pub fn version(&self) -> &TextVersion {
		&self.inner.version
	}

	#[inline]
	pub fn version_number(&self) -> u64 {
		self.inner.version.version_number()
	}

	#[inline]
	pub fn buffer_id(&self) -> BufferId {
		self.inner.version.buffer_id()
	}

	pub fn content_type(&self) -> &ContentType {
		&self.inner.content_type
	}

	/// The rope backing this snapshot.
	pub fn content(&self) -> &StringRebuilder {
		self.inner.image.content()
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.inner.image.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.inner.image.is_empty()
	}

	#[inline]
	pub fn line_count(&self) -> usize {
		self.content().line_count()
	}

	/// The whole text.
	pub fn text(&self) -> String {
		self.content().to_string()
	}

	/// The text covered by `span`.
	pub fn get_text(&self, span: Span) -> Result<String> {
		self.inner.image.get_text(span)
	}

	pub fn char_at(&self, position: usize) -> Result<char> {
		self.inner.image.char_at(position)
	}

	/// Characters from `position` to the end of the text.
	pub fn chars_from(&self, position: usize) -> Result<impl Iterator<Item = char> + '_> {
		self.content().chars(Span::from_bounds(position, self.len())?)
	}

	pub fn line_from_line_number(&self, line_number: usize) -> Result<SnapshotLine> {
		let extent = self.content().line_from_line_number(line_number)?;
		Ok(SnapshotLine::new(self.clone(), extent))
	}

	pub fn line_from_position(&self, position: usize) -> Result<SnapshotLine> {
		let extent = self.content().line_from_position(position)?;
		Ok(SnapshotLine::new(self.clone(), extent))
	}

	pub fn line_number_from_position(&self, position: usize) -> Result<usize> {
		self.content().line_number_from_position(position)
	}

	/// Iterates over every line, first to last.
	pub fn lines(&self) -> impl Iterator<Item = SnapshotLine> + '_ {
		(0..self.line_count()).filter_map(|n| self.line_from_line_number(n).ok())
	}

	/// Streams the whole text into `writer`.
	pub fn write_to(&self, writer: &mut impl io::Write) -> io::Result<()> {
		self.write_span_to(Span::new(0, self.len()), writer)
	}

	/// Streams the text covered by `span` into `writer`.
	pub fn write_span_to(&self, span: Span, writer: &mut impl io::Write) -> io::Result<()> {
		let chunks = self
			.content()
			.chunks(span)
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
		for chunk in chunks {
			writer.write_all(chunk.as_bytes())?;
		}
		Ok(())
	}

	pub fn create_tracking_point(&self, position: usize, mode: PointTrackingMode) -> Result<TrackingPoint> {
		self.create_tracking_point_with_fidelity(position, mode, TrackingFidelity::Forward)
	}

	pub fn create_tracking_point_with_fidelity(
		&self,
		position: usize,
		mode: PointTrackingMode,
		fidelity: TrackingFidelity,
	) -> Result<TrackingPoint> {
		TrackingPoint::new(self.version(), position, mode, fidelity)
	}

	pub fn create_tracking_span(&self, span: Span, mode: SpanTrackingMode) -> Result<TrackingSpan> {
		self.create_tracking_span_with_fidelity(span, mode, TrackingFidelity::Forward)
	}

	pub fn create_tracking_span_with_fidelity(&self, span: Span, mode: SpanTrackingMode, fidelity: TrackingFidelity) -> Result<TrackingSpan> {
		TrackingSpan::new(self.version(), span, mode, fidelity)
	}

	/// Creates a span tracked by a custom behavior.
	pub fn create_custom_tracking_span(&self, span: Span, behavior: TrackingBehavior) -> Result<TrackingSpan> {
		TrackingSpan::custom(self.version(), span, behavior, TrackingFidelity::Forward)
	}

	/// Returns true if both handles refer to the same snapshot.
	pub fn ptr_eq(&self, other: &TextSnapshot) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl PartialEq for TextSnapshot {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for TextSnapshot {}

impl fmt::Display for TextSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self.content(), f)
	}
}

impl fmt::Debug for TextSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TextSnapshot")
			.field("buffer", &self.buffer_id())
			.field("version", &self.version_number())
			.field("len", &self.len())
			.field("content_type", &self.inner.content_type.name())
			.finish()
	}
}
