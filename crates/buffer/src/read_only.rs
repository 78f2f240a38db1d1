//! Read-only regions and the immutable collection edits are checked against.
//!
//! A region covers a tracked span. Edits that touch any character inside it
//! are rejected. Insertions exactly at its edges are rejected only when its
//! [`EdgeInsertionMode`] is `Deny`. A dynamic region asks its query callback
//! whether it currently applies.


use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use weft_text::{NormalizedSpanCollection, Span, TextError, TextSnapshot, TrackingSpan};

/// Whether text may be inserted exactly at a region's edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeInsertionMode {
	#[default]
	Allow,
	Deny,
}

/// Decides whether a dynamic region is in force. Receives `is_edit`, false
/// for plain queries such as [`ReadOnlySpanCollection::extents`].
pub type ReadOnlyQuery = Arc<dyn Fn(bool) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

impl RegionId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

struct RegionInner {
	id: RegionId,
	span: TrackingSpan,
	edge_insertion: EdgeInsertionMode,
	query: Option<ReadOnlyQuery>,
}

/// A tracked span of a buffer that rejects edits.
#[derive(Clone)]
pub struct ReadOnlyRegion {
	inner: Arc<RegionInner>,
}

impl ReadOnlyRegion {
	pub(crate) fn new(span: TrackingSpan, edge_insertion: EdgeInsertionMode, query: Option<ReadOnlyQuery>) -> Self {
		Self {
			inner: Arc::new(RegionInner {
				id: RegionId::next(),
				span,
				edge_insertion,
				query,
			}),
		}
	}

	pub fn id(&self) -> RegionId {
		self.inner.id
	}

	pub fn span(&self) -> &TrackingSpan {
		&self.inner.span
	}

	pub fn edge_insertion_mode(&self) -> EdgeInsertionMode {
		self.inner.edge_insertion
	}

	pub fn is_dynamic(&self) -> bool {
		self.inner.query.is_some()
	}

	fn in_force(&self, is_edit: bool) -> bool {
		self.inner.query.as_ref().is_none_or(|query| query(is_edit))
	}

	/// Would inserting at `position` touch this region, given its extent `region`?
	fn covers_position(&self, region: Span, position: usize) -> bool {
		let interior = region.start() < position && position < region.end();
		let edge = position == region.start() || position == region.end();
		interior || (edge && self.inner.edge_insertion == EdgeInsertionMode::Deny)
	}

	/// Would replacing the non-empty `span` touch this region, given its extent `region`?
	fn covers_span(&self, region: Span, span: Span) -> bool {
		if region.is_empty() {
			return self.inner.edge_insertion == EdgeInsertionMode::Deny && span.start() < region.start() && region.start() < span.end();
		}
		span.overlaps_with(region)
	}
}

impl PartialEq for ReadOnlyRegion {
	fn eq(&self, other: &Self) -> bool {
		self.inner.id == other.inner.id
	}
}

impl Eq for ReadOnlyRegion {}

impl fmt::Debug for ReadOnlyRegion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReadOnlyRegion")
			.field("id", &self.inner.id)
			.field("span", &self.inner.span)
			.field("edge_insertion", &self.inner.edge_insertion)
			.field("dynamic", &self.is_dynamic())
			.finish()
	}
}

/// An immutable set of read-only regions.
///
/// Buffers publish a new collection whenever a read-only region edit is
/// applied, so a collection can be queried from any thread while the buffer
/// changes.
#[derive(Clone, Default)]
pub struct ReadOnlySpanCollection {
	regions: Arc<[ReadOnlyRegion]>,
}

impl ReadOnlySpanCollection {
	pub(crate) fn from_regions(regions: Vec<ReadOnlyRegion>) -> Self {
		Self { regions: regions.into() }
	}

	pub fn len(&self) -> usize {
		self.regions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.regions.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, ReadOnlyRegion> {
		self.regions.iter()
	}

	pub fn contains(&self, region: &ReadOnlyRegion) -> bool {
		self.regions.iter().any(|r| r == region)
	}

	/// Returns true if inserting at `position` in `snapshot` is blocked.
	pub fn is_read_only_position(&self, snapshot: &TextSnapshot, position: usize, is_edit: bool) -> Result<bool, TextError> {
		if position > snapshot.len() {
			return Err(TextError::PositionOutOfRange {
				position,
				length: snapshot.len(),
			});
		}
		for region in self.regions.iter() {
			let extent = region.span().span_in(snapshot.version())?;
			if region.covers_position(extent, position) && region.in_force(is_edit) {
				return Ok(true);
			}
		}
		Ok(false)
	}

	/// Returns true if replacing `span` in `snapshot` is blocked. An empty span
	/// is checked as an insertion at its start.
	pub fn is_read_only(&self, snapshot: &TextSnapshot, span: Span, is_edit: bool) -> Result<bool, TextError> {
		if span.is_empty() {
			return self.is_read_only_position(snapshot, span.start(), is_edit);
		}
		if span.end() > snapshot.len() {
			return Err(TextError::SpanOutOfRange {
				span,
				length: snapshot.len(),
			});
		}
		for region in self.regions.iter() {
			let extent = region.span().span_in(snapshot.version())?;
			if region.covers_span(extent, span) && region.in_force(is_edit) {
				return Ok(true);
			}
		}
		Ok(false)
	}

	/// The parts of `span` covered by regions currently in force.
	///
	/// Empty regions lying within `span` show up as empty spans.
	pub fn extents(&self, snapshot: &TextSnapshot, span: Span) -> Result<NormalizedSpanCollection, TextError> {
		if span.end() > snapshot.len() {
			return Err(TextError::SpanOutOfRange {
				span,
				length: snapshot.len(),
			});
		}
		let mut covered = Vec::new();
		for region in self.regions.iter() {
			let extent = region.span().span_in(snapshot.version())?;
			let part = if extent.is_empty() {
				(span.start() <= extent.start() && extent.start() <= span.end()).then_some(extent)
			} else {
				extent.overlap(span)
			};
			if let Some(part) = part
				&& region.in_force(false)
			{
				covered.push(part);
			}
		}
		Ok(NormalizedSpanCollection::new(covered))
	}
}

impl<'a> IntoIterator for &'a ReadOnlySpanCollection {
	type Item = &'a ReadOnlyRegion;
	type IntoIter = std::slice::Iter<'a, ReadOnlyRegion>;

	fn into_iter(self) -> Self::IntoIter {
		self.regions.iter()
	}
}

impl fmt::Debug for ReadOnlySpanCollection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.regions.iter()).finish()
	}
}
