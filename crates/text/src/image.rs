//! Leaf-caching reader over a rope.
//!
//! Sequential scans (`char_at(i)`, `char_at(i + 1)`, ...) hit the same leaf
//! many times in a row. [`CachingTextImage`] remembers the last leaf it
//! resolved and serves reads inside it without descending the tree again.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, TextError};
use crate::rope::{Node, StringRebuilder};
use crate::span::Span;

#[derive(Clone)]
struct CachedLeaf {
	start: usize,
	node: Arc<Node>,
}

impl CachedLeaf {
	fn end(&self) -> usize {
		self.start + self.node.len()
	}

	fn covers(&self, span: Span) -> bool {
		span.start() >= self.start && span.end() <= self.end() && span.start() < self.end()
	}
}

/// A rope plus a one-entry cache of the most recently visited leaf.
pub struct CachingTextImage {
	content: StringRebuilder,
	cache: Mutex<Option<CachedLeaf>>,
}

impl CachingTextImage {
	pub fn new(content: StringRebuilder) -> Self {
		Self {
			content,
			cache: Mutex::new(None),
		}
	}

	/// The underlying rope.
	#[inline]
	pub fn content(&self) -> &StringRebuilder {
		&self.content
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.content.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.content.is_empty()
	}

	fn cached_leaf(&self, position: usize) -> CachedLeaf {
		let mut cache = self.cache.lock();
		if let Some(leaf) = cache.as_ref().filter(|l| l.covers(Span::empty(position))) {
			return leaf.clone();
		}
		let (start, node) = self.content.leaf_at(position);
		let leaf = CachedLeaf { start, node };
		*cache = Some(leaf.clone());
		leaf
	}

	/// Returns the character at `position`.
	pub fn char_at(&self, position: usize) -> Result<char> {
		if position >= self.len() {
			return Err(TextError::PositionOutOfRange {
				position,
				length: self.len(),
			});
		}
		let leaf = self.cached_leaf(position);
		let Node::Leaf(l) = &*leaf.node else { unreachable!("leaf_at returns a leaf") };
		l.char_at(position - leaf.start).ok_or(TextError::PositionOutOfRange {
			position,
			length: self.len(),
		})
	}

	/// Returns the text covered by `span`.
	///
	/// Spans that fit in the cached leaf are copied straight out of it.
	pub fn get_text(&self, span: Span) -> Result<String> {
		if span.is_empty() || span.end() > self.len() {
			return self.content.get_text(span);
		}
		let leaf = self.cached_leaf(span.start());
		if leaf.covers(span) {
			let Node::Leaf(l) = &*leaf.node else { unreachable!("leaf_at returns a leaf") };
			return Ok(l.slice(span.start() - leaf.start, span.end() - leaf.start).to_string());
		}
		self.content.get_text(span)
	}

	/// Drops the cached leaf.
	pub fn invalidate(&self) {
		*self.cache.lock() = None;
	}
}

impl std::fmt::Debug for CachingTextImage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CachingTextImage").field("content", &self.content).finish()
	}
}
