//! Persistent rope holding the content of a text snapshot.
//!
//! [`StringRebuilder`] is immutable: [`StringRebuilder::replace`] returns a new
//! rope that shares every untouched subtree with the original, so any number
//! of snapshots can hold their own version of the text cheaply.
//!
//! # Invariants
//!
//! * Concatenating the leaves in order yields the full text.
//! * Every branch caches the sum of its children's lengths and line terminator
//!   counts, which makes offset and line lookups logarithmic.
//! * A `\r\n` pair is never split across two leaves, so per-leaf terminator
//!   counts add up to the terminator count of the whole text.

mod node;

use std::fmt;
use std::sync::Arc;

pub(crate) use node::Node;

use crate::error::{Result, TextError};
use crate::span::Span;

/// Sizing knobs for rope leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RopeConfig {
	/// Largest leaf built from inserted text, in characters.
	pub leaf_max_chars: usize,
	/// Leaves at or below this length are merged with text inserted next to them.
	pub consolidate_max_chars: usize,
}

impl Default for RopeConfig {
	fn default() -> Self {
		Self {
			leaf_max_chars: 1024,
			consolidate_max_chars: 256,
		}
	}
}

/// Extent of one line inside a rope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineExtent {
	/// Zero-based line number.
	pub line_number: usize,
	/// Line content, excluding the terminator.
	pub span: Span,
	/// Length of the terminator ending the line (0 on the last line).
	pub line_break_len: usize,
}

/// An immutable, structurally shared rope of characters.
#[derive(Clone)]
pub struct StringRebuilder {
	root: Arc<Node>,
	config: RopeConfig,
}

impl StringRebuilder {
	/// Creates an empty rope.
	pub fn new(config: RopeConfig) -> Self {
		Self {
			root: Node::empty(),
			config,
		}
	}

	/// Creates a rope holding `text`.
	pub fn from_text(text: &str, config: RopeConfig) -> Self {
		Self {
			root: node::build(text, config.leaf_max_chars),
			config,
		}
	}

	/// Length in characters.
	#[inline]
	pub fn len(&self) -> usize {
		self.root.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.root.is_empty()
	}

	/// Number of line terminators.
	#[inline]
	pub fn line_break_count(&self) -> usize {
		self.root.break_count()
	}

	/// Number of lines, which is always one more than the terminator count.
	#[inline]
	pub fn line_count(&self) -> usize {
		self.root.break_count() + 1
	}

	/// Depth of the underlying tree.
	pub fn depth(&self) -> u32 {
		self.root.depth()
	}

	pub fn config(&self) -> RopeConfig {
		self.config
	}

	/// Returns true when both ropes share the same root node.
	pub fn ptr_eq(&self, other: &StringRebuilder) -> bool {
		Arc::ptr_eq(&self.root, &other.root)
	}

	fn check_span(&self, span: Span) -> Result<()> {
		if span.end() > self.len() {
			return Err(TextError::SpanOutOfRange { span, length: self.len() });
		}
		Ok(())
	}

	fn check_position(&self, position: usize) -> Result<()> {
		if position > self.len() {
			return Err(TextError::PositionOutOfRange {
				position,
				length: self.len(),
			});
		}
		Ok(())
	}

	/// Returns the text covered by `span`.
	pub fn get_text(&self, span: Span) -> Result<String> {
		self.check_span(span)?;
		let mut out = String::with_capacity(span.len());
		for chunk in self.chunks_unchecked(span) {
			out.push_str(chunk);
		}
		Ok(out)
	}

	/// Returns the character at `position`.
	pub fn char_at(&self, position: usize) -> Result<char> {
		if position >= self.len() {
			return Err(TextError::PositionOutOfRange {
				position,
				length: self.len(),
			});
		}
		let (start, leaf) = self.leaf_at(position);
		let Node::Leaf(leaf) = &*leaf else { unreachable!("leaf_at returns a leaf") };
		leaf.char_at(position - start).ok_or(TextError::PositionOutOfRange {
			position,
			length: self.len(),
		})
	}

	/// Iterates over the leaf slices covering `span`.
	pub fn chunks(&self, span: Span) -> Result<Chunks<'_>> {
		self.check_span(span)?;
		Ok(self.chunks_unchecked(span))
	}

	fn chunks_unchecked(&self, span: Span) -> Chunks<'_> {
		Chunks {
			stack: vec![(&*self.root, 0)],
			start: span.start(),
			end: span.end(),
		}
	}

	/// Iterates over the characters covered by `span`.
	pub fn chars(&self, span: Span) -> Result<impl Iterator<Item = char> + '_> {
		Ok(self.chunks(span)?.flat_map(str::chars))
	}

	/// Returns a rope holding only the text covered by `span`.
	pub fn substring(&self, span: Span) -> Result<StringRebuilder> {
		self.check_span(span)?;
		let (_, rest) = node::split(&self.root, span.start());
		let (middle, _) = node::split(&rest, span.len());
		Ok(Self {
			root: middle,
			config: self.config,
		})
	}

	/// Splits the rope into `[0, position)` and `[position, len)`.
	pub fn split(&self, position: usize) -> Result<(StringRebuilder, StringRebuilder)> {
		self.check_position(position)?;
		let (left, right) = node::split(&self.root, position);
		Ok((
			Self {
				root: left,
				config: self.config,
			},
			Self {
				root: right,
				config: self.config,
			},
		))
	}

	/// Returns a new rope with `span` replaced by `text`.
	///
	/// `self` is left untouched and keeps sharing its nodes with the result.
	pub fn replace(&self, span: Span, text: &str) -> Result<StringRebuilder> {
		self.check_span(span)?;
		if span.is_empty() && text.is_empty() {
			return Ok(self.clone());
		}

		let (mut left, rest) = node::split(&self.root, span.start());
		let (_, mut right) = node::split(&rest, span.len());

		// Fold short neighbouring leaves into the new text so repeated small
		// edits do not fragment the tree.
		let mut middle = String::with_capacity(text.len());
		let tail_len = left.last_leaf_len();
		if !left.is_empty() && tail_len <= self.config.consolidate_max_chars {
			let (head, tail) = node::split(&left, left.len() - tail_len);
			push_node_text(&tail, &mut middle);
			left = head;
		}
		middle.push_str(text);
		let head_len = right.first_leaf_len();
		if !right.is_empty() && head_len <= self.config.consolidate_max_chars {
			let (head, tail) = node::split(&right, head_len);
			push_node_text(&head, &mut middle);
			right = tail;
		}

		let middle = node::build(&middle, self.config.leaf_max_chars);
		let root = concat(concat(left, middle), right);
		tracing::trace!(len = root.len(), depth = root.depth(), "rope.replace");
		Ok(Self { root, config: self.config })
	}

	/// Returns a new rope with `text` inserted at `position`.
	pub fn insert(&self, position: usize, text: &str) -> Result<StringRebuilder> {
		self.check_position(position)?;
		self.replace(Span::empty(position), text)
	}

	/// Returns a new rope with `span` removed.
	pub fn delete(&self, span: Span) -> Result<StringRebuilder> {
		self.replace(span, "")
	}

	/// Locates line `line_number` by descending through cached terminator counts.
	pub fn line_from_line_number(&self, line_number: usize) -> Result<LineExtent> {
		let breaks = self.line_break_count();
		if line_number > breaks {
			return Err(TextError::LineNumberOutOfRange {
				line: line_number,
				line_count: breaks + 1,
			});
		}
		let start = if line_number == 0 {
			0
		} else {
			let (s, l) = self.nth_break(line_number - 1);
			s + l
		};
		let (end, line_break_len) = if line_number < breaks { self.nth_break(line_number) } else { (self.len(), 0) };
		Ok(LineExtent {
			line_number,
			span: Span::new(start, end - start),
			line_break_len,
		})
	}

	/// Returns the number of the line containing `position`.
	///
	/// A position between the `\r` and `\n` of a pair belongs to the line the
	/// pair terminates.
	pub fn line_number_from_position(&self, position: usize) -> Result<usize> {
		self.check_position(position)?;
		let mut node = &*self.root;
		let mut position = position;
		let mut lines = 0;
		loop {
			match node {
				Node::Branch(b) => {
					if position < b.left.len() {
						node = &b.left;
					} else {
						lines += b.left.break_count();
						position -= b.left.len();
						node = &b.right;
					}
				}
				Node::Leaf(leaf) => {
					lines += leaf.breaks().iter().take_while(|br| br.end() <= position).count();
					return Ok(lines);
				}
			}
		}
	}

	/// Returns the line containing `position`.
	pub fn line_from_position(&self, position: usize) -> Result<LineExtent> {
		let line = self.line_number_from_position(position)?;
		self.line_from_line_number(line)
	}

	/// Start and length of the `index`th terminator.
	fn nth_break(&self, index: usize) -> (usize, usize) {
		let mut node = &*self.root;
		let mut index = index;
		let mut offset = 0;
		loop {
			match node {
				Node::Branch(b) => {
					let left_breaks = b.left.break_count();
					if index < left_breaks {
						node = &b.left;
					} else {
						index -= left_breaks;
						offset += b.left.len();
						node = &b.right;
					}
				}
				Node::Leaf(leaf) => {
					let br = leaf.breaks()[index];
					return (offset + br.start, br.len);
				}
			}
		}
	}

	/// Returns the leaf containing `position` and the offset it starts at.
	///
	/// `position` must be below the rope length.
	pub(crate) fn leaf_at(&self, position: usize) -> (usize, Arc<Node>) {
		let mut node = &self.root;
		let mut offset = 0;
		loop {
			match &**node {
				Node::Branch(b) => {
					if position - offset < b.left.len() {
						node = &b.left;
					} else {
						offset += b.left.len();
						node = &b.right;
					}
				}
				Node::Leaf(_) => return (offset, node.clone()),
			}
		}
	}
}

/// Concatenates two subtrees, moving a leading `\n` of `right` onto `left`
/// when `left` ends in `\r` so the pair stays in one leaf.
fn concat(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
	if left.last_char() == Some('\r') && right.first_char() == Some('\n') {
		let (_, rest) = node::split(&right, 1);
		let left = node::append_to_last_leaf(&left, "\n");
		return node::join(left, rest);
	}
	node::join(left, right)
}

fn push_node_text(node: &Node, out: &mut String) {
	match node {
		Node::Leaf(leaf) => out.push_str(leaf.as_str()),
		Node::Branch(b) => {
			push_node_text(&b.left, out);
			push_node_text(&b.right, out);
		}
	}
}

impl fmt::Display for StringRebuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for chunk in self.chunks_unchecked(Span::new(0, self.len())) {
			f.write_str(chunk)?;
		}
		Ok(())
	}
}

impl fmt::Debug for StringRebuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StringRebuilder")
			.field("len", &self.len())
			.field("lines", &self.line_count())
			.field("depth", &self.depth())
			.finish()
	}
}

/// Iterator over the leaf slices covering a span.
pub struct Chunks<'a> {
	stack: Vec<(&'a Node, usize)>,
	start: usize,
	end: usize,
}

impl<'a> Iterator for Chunks<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<&'a str> {
		while let Some((node, offset)) = self.stack.pop() {
			let node_end = offset + node.len();
			if node_end <= self.start || offset >= self.end {
				continue;
			}
			match node {
				Node::Branch(b) => {
					self.stack.push((&b.right, offset + b.left.len()));
					self.stack.push((&b.left, offset));
				}
				Node::Leaf(leaf) => {
					let from = self.start.max(offset) - offset;
					let to = self.end.min(node_end) - offset;
					return Some(leaf.slice(from, to));
				}
			}
		}
		None
	}
}
