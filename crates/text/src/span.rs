//! Half-open character spans and normalized span sets.

use std::fmt;
use std::ops::Range;

use crate::error::{Result, TextError};

/// A half-open interval `[start, start + length)` measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
	start: usize,
	length: usize,
}

impl Span {
	/// Creates a span from a start position and a length.
	#[inline]
	pub const fn new(start: usize, length: usize) -> Self {
		Self { start, length }
	}

	/// Creates an empty span at `position`.
	#[inline]
	pub const fn empty(position: usize) -> Self {
		Self::new(position, 0)
	}

	/// Creates a span from its bounds, failing when `start > end`.
	pub fn from_bounds(start: usize, end: usize) -> Result<Self> {
		if start > end {
			return Err(TextError::InvalidSpan { start, end });
		}
		Ok(Self::new(start, end - start))
	}

	#[inline]
	pub const fn start(&self) -> usize {
		self.start
	}

	#[inline]
	pub const fn len(&self) -> usize {
		self.length
	}

	/// Returns the exclusive end of the span.
	#[inline]
	pub const fn end(&self) -> usize {
		self.start + self.length
	}

	#[inline]
	pub const fn is_empty(&self) -> bool {
		self.length == 0
	}

	/// Returns the span as a `Range<usize>`.
	#[inline]
	pub const fn range(&self) -> Range<usize> {
		self.start..self.end()
	}

	/// Returns true if `position` lies in `[start, end)`.
	#[inline]
	pub const fn contains(&self, position: usize) -> bool {
		position >= self.start && position < self.end()
	}

	/// Returns true if `other` lies entirely inside this span.
	#[inline]
	pub const fn contains_span(&self, other: Span) -> bool {
		other.start >= self.start && other.end() <= self.end()
	}

	/// Returns true if the two spans share at least one character.
	#[inline]
	pub fn overlaps_with(&self, other: Span) -> bool {
		self.start.max(other.start) < self.end().min(other.end())
	}

	/// Returns the non-empty shared part of two spans.
	pub fn overlap(&self, other: Span) -> Option<Span> {
		let start = self.start.max(other.start);
		let end = self.end().min(other.end());
		(start < end).then(|| Span::new(start, end - start))
	}

	/// Returns true if the spans overlap or touch.
	#[inline]
	pub fn intersects_with(&self, other: Span) -> bool {
		self.start.max(other.start) <= self.end().min(other.end())
	}

	/// Returns the shared part of two spans, which is empty when they only touch.
	pub fn intersection(&self, other: Span) -> Option<Span> {
		let start = self.start.max(other.start);
		let end = self.end().min(other.end());
		(start <= end).then(|| Span::new(start, end - start))
	}

	/// Returns the smallest span covering both spans.
	pub fn union(&self, other: Span) -> Span {
		let start = self.start.min(other.start);
		let end = self.end().max(other.end());
		Span::new(start, end - start)
	}
}

impl fmt::Display for Span {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}..{})", self.start, self.end())
	}
}

impl From<Span> for Range<usize> {
	fn from(span: Span) -> Self {
		span.range()
	}
}

impl TryFrom<Range<usize>> for Span {
	type Error = TextError;

	fn try_from(range: Range<usize>) -> Result<Self> {
		Span::from_bounds(range.start, range.end)
	}
}

/// Spans sorted by start with overlapping and abutting spans merged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedSpanCollection {
	spans: Vec<Span>,
}

impl NormalizedSpanCollection {
	/// Builds a normalized collection from arbitrary spans.
	pub fn new(spans: impl IntoIterator<Item = Span>) -> Self {
		let mut spans: Vec<Span> = spans.into_iter().collect();
		spans.sort_by_key(|s| (s.start(), s.end()));

		let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
		for span in spans {
			match merged.last_mut() {
				Some(last) if span.start() <= last.end() => *last = last.union(span),
				_ => merged.push(span),
			}
		}
		Self { spans: merged }
	}

	pub fn is_empty(&self) -> bool {
		self.spans.is_empty()
	}

	pub fn len(&self) -> usize {
		self.spans.len()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Span> {
		self.spans.iter()
	}

	pub fn as_slice(&self) -> &[Span] {
		&self.spans
	}

	/// Returns true if any member overlaps `span`.
	pub fn overlaps_with(&self, span: Span) -> bool {
		self.spans.iter().any(|s| s.overlaps_with(span))
	}

	/// Returns true if any member overlaps or touches `span`.
	pub fn intersects_with(&self, span: Span) -> bool {
		self.spans.iter().any(|s| s.intersects_with(span))
	}

	/// Union of two collections.
	pub fn union(&self, other: &NormalizedSpanCollection) -> NormalizedSpanCollection {
		Self::new(self.spans.iter().chain(other.spans.iter()).copied())
	}

	/// Non-empty overlaps between members of the two collections.
	pub fn overlap(&self, other: &NormalizedSpanCollection) -> NormalizedSpanCollection {
		let mut out = Vec::new();
		let (mut i, mut j) = (0, 0);
		while i < self.spans.len() && j < other.spans.len() {
			let (a, b) = (self.spans[i], other.spans[j]);
			if let Some(o) = a.overlap(b) {
				out.push(o);
			}
			if a.end() < b.end() {
				i += 1;
			} else {
				j += 1;
			}
		}
		Self::new(out)
	}

	/// Intersections between members, including the empty ones where spans touch.
	pub fn intersection(&self, other: &NormalizedSpanCollection) -> NormalizedSpanCollection {
		let out = self
			.spans
			.iter()
			.flat_map(|a| other.spans.iter().filter_map(move |b| a.intersection(*b)));
		Self::new(out)
	}

	/// Parts of `self` not covered by `other`.
	pub fn difference(&self, other: &NormalizedSpanCollection) -> NormalizedSpanCollection {
		let mut out = Vec::new();
		for span in &self.spans {
			let mut cursor = span.start();
			for cut in other.spans.iter().filter(|c| c.overlaps_with(*span)) {
				if cut.start() > cursor {
					out.push(Span::new(cursor, cut.start() - cursor));
				}
				cursor = cursor.max(cut.end());
			}
			if cursor < span.end() {
				out.push(Span::new(cursor, span.end() - cursor));
			}
		}
		Self::new(out)
	}
}

impl<'a> IntoIterator for &'a NormalizedSpanCollection {
	type Item = &'a Span;
	type IntoIter = std::slice::Iter<'a, Span>;

	fn into_iter(self) -> Self::IntoIter {
		self.spans.iter()
	}
}

impl FromIterator<Span> for NormalizedSpanCollection {
	fn from_iter<T: IntoIterator<Item = Span>>(iter: T) -> Self {
		Self::new(iter)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn overlap_requires_shared_character() {
		let a = Span::new(2, 3);
		assert_eq!(a.overlap(Span::new(4, 4)), Some(Span::new(4, 1)));
		assert_eq!(a.overlap(Span::new(5, 2)), None);
		assert!(!a.overlaps_with(Span::empty(3)));
	}

	#[test]
	fn intersection_allows_touching() {
		let a = Span::new(2, 3);
		assert_eq!(a.intersection(Span::new(5, 2)), Some(Span::empty(5)));
		assert_eq!(a.intersection(Span::new(6, 2)), None);
		assert!(a.intersects_with(Span::empty(2)));
	}

	#[test]
	fn contains_is_half_open() {
		let a = Span::new(2, 3);
		assert!(a.contains(2));
		assert!(a.contains(4));
		assert!(!a.contains(5));
		assert!(a.contains_span(Span::new(3, 2)));
		assert!(!a.contains_span(Span::new(3, 3)));
	}

	#[test]
	fn union_covers_gap() {
		assert_eq!(Span::new(0, 2).union(Span::new(5, 1)), Span::new(0, 6));
	}

	#[test]
	fn from_bounds_rejects_inverted() {
		assert_eq!(Span::from_bounds(4, 2), Err(TextError::InvalidSpan { start: 4, end: 2 }));
		assert_eq!(Span::try_from(1..4), Ok(Span::new(1, 3)));
	}

	#[test]
	fn normalized_merges_abutting_and_overlapping() {
		let set = NormalizedSpanCollection::new([Span::new(5, 2), Span::new(0, 2), Span::new(2, 1), Span::new(6, 4)]);
		assert_eq!(set.as_slice(), &[Span::new(0, 3), Span::new(5, 5)]);
	}

	#[test]
	fn normalized_set_algebra() {
		let a = NormalizedSpanCollection::new([Span::new(0, 4), Span::new(8, 4)]);
		let b = NormalizedSpanCollection::new([Span::new(2, 8)]);
		assert_eq!(a.overlap(&b).as_slice(), &[Span::new(2, 2), Span::new(8, 2)]);
		assert_eq!(a.difference(&b).as_slice(), &[Span::new(0, 2), Span::new(10, 2)]);
		assert_eq!(a.union(&b).as_slice(), &[Span::new(0, 12)]);
	}
}
