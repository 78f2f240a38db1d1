//! Tree nodes of the persistent rope.
//!
//! Branches are AVL-balanced: the depths of a branch's children never differ
//! by more than one. Nodes are immutable once built and shared through `Arc`.

use std::sync::Arc;

use crate::line_break::{LineBreak, scan_line_breaks};

/// A chunk of text with its precomputed line terminators.
#[derive(Debug)]
pub(crate) struct Leaf {
	text: Box<str>,
	len: usize,
	ascii: bool,
	breaks: Box<[LineBreak]>,
}

impl Leaf {
	pub(crate) fn new(text: &str) -> Self {
		Self {
			len: text.chars().count(),
			ascii: text.is_ascii(),
			breaks: scan_line_breaks(text).into_boxed_slice(),
			text: text.into(),
		}
	}

	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub(crate) fn breaks(&self) -> &[LineBreak] {
		&self.breaks
	}

	#[inline]
	pub(crate) fn as_str(&self) -> &str {
		&self.text
	}

	/// Byte offset of the character at `offset` (or the end of the text).
	fn byte_offset(&self, offset: usize) -> usize {
		if self.ascii {
			return offset;
		}
		self.text.char_indices().nth(offset).map_or(self.text.len(), |(b, _)| b)
	}

	/// Slice of the leaf text between two character offsets.
	pub(crate) fn slice(&self, start: usize, end: usize) -> &str {
		debug_assert!(start <= end && end <= self.len);
		&self.text[self.byte_offset(start)..self.byte_offset(end)]
	}

	pub(crate) fn char_at(&self, offset: usize) -> Option<char> {
		if self.ascii {
			return self.text.as_bytes().get(offset).map(|b| *b as char);
		}
		self.text.chars().nth(offset)
	}

	pub(crate) fn first_char(&self) -> Option<char> {
		self.text.chars().next()
	}

	pub(crate) fn last_char(&self) -> Option<char> {
		self.text.chars().next_back()
	}
}

/// An inner node joining two non-empty subtrees.
#[derive(Debug)]
pub(crate) struct Branch {
	pub(crate) left: Arc<Node>,
	pub(crate) right: Arc<Node>,
	len: usize,
	breaks: usize,
	depth: u32,
}

#[derive(Debug)]
pub(crate) enum Node {
	Leaf(Leaf),
	Branch(Branch),
}

impl Node {
	pub(crate) fn empty() -> Arc<Node> {
		Arc::new(Node::Leaf(Leaf::new("")))
	}

	pub(crate) fn leaf(text: &str) -> Arc<Node> {
		Arc::new(Node::Leaf(Leaf::new(text)))
	}

	/// Builds a branch without checking balance; callers guarantee it.
	pub(crate) fn branch(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
		debug_assert!(left.depth().abs_diff(right.depth()) <= 1);
		Arc::new(Node::Branch(Branch {
			len: left.len() + right.len(),
			breaks: left.break_count() + right.break_count(),
			depth: left.depth().max(right.depth()) + 1,
			left,
			right,
		}))
	}

	#[inline]
	pub(crate) fn len(&self) -> usize {
		match self {
			Node::Leaf(leaf) => leaf.len,
			Node::Branch(branch) => branch.len,
		}
	}

	#[inline]
	pub(crate) fn is_empty(&self) -> bool {
		self.len() == 0
	}

	#[inline]
	pub(crate) fn break_count(&self) -> usize {
		match self {
			Node::Leaf(leaf) => leaf.breaks.len(),
			Node::Branch(branch) => branch.breaks,
		}
	}

	#[inline]
	pub(crate) fn depth(&self) -> u32 {
		match self {
			Node::Leaf(_) => 0,
			Node::Branch(branch) => branch.depth,
		}
	}

	pub(crate) fn first_char(&self) -> Option<char> {
		let mut node = self;
		loop {
			match node {
				Node::Leaf(leaf) => return leaf.first_char(),
				Node::Branch(branch) => node = &branch.left,
			}
		}
	}

	pub(crate) fn last_char(&self) -> Option<char> {
		let mut node = self;
		loop {
			match node {
				Node::Leaf(leaf) => return leaf.last_char(),
				Node::Branch(branch) => node = &branch.right,
			}
		}
	}

	/// Length of the right-most leaf.
	pub(crate) fn last_leaf_len(&self) -> usize {
		let mut node = self;
		loop {
			match node {
				Node::Leaf(leaf) => return leaf.len,
				Node::Branch(branch) => node = &branch.right,
			}
		}
	}

	/// Length of the left-most leaf.
	pub(crate) fn first_leaf_len(&self) -> usize {
		let mut node = self;
		loop {
			match node {
				Node::Leaf(leaf) => return leaf.len,
				Node::Branch(branch) => node = &branch.left,
			}
		}
	}
}

/// Concatenates two balanced trees into one balanced tree.
pub(crate) fn join(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
	if left.is_empty() {
		return right;
	}
	if right.is_empty() {
		return left;
	}
	let (dl, dr) = (left.depth(), right.depth());
	if dl > dr + 1 {
		let Node::Branch(b) = &*left else { unreachable!("deeper node is a branch") };
		let joined = join(b.right.clone(), right);
		rebalance(b.left.clone(), joined)
	} else if dr > dl + 1 {
		let Node::Branch(b) = &*right else { unreachable!("deeper node is a branch") };
		let joined = join(left, b.left.clone());
		rebalance(joined, b.right.clone())
	} else {
		Node::branch(left, right)
	}
}

/// Builds a branch from two subtrees whose depths differ by at most two.
fn rebalance(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
	let (dl, dr) = (left.depth(), right.depth());
	if dl > dr + 1 {
		let Node::Branch(l) = &*left else { unreachable!("deeper node is a branch") };
		if l.left.depth() >= l.right.depth() {
			Node::branch(l.left.clone(), Node::branch(l.right.clone(), right))
		} else {
			let Node::Branch(lr) = &*l.right else { unreachable!("deeper node is a branch") };
			Node::branch(Node::branch(l.left.clone(), lr.left.clone()), Node::branch(lr.right.clone(), right))
		}
	} else if dr > dl + 1 {
		let Node::Branch(r) = &*right else { unreachable!("deeper node is a branch") };
		if r.right.depth() >= r.left.depth() {
			Node::branch(Node::branch(left, r.left.clone()), r.right.clone())
		} else {
			let Node::Branch(rl) = &*r.left else { unreachable!("deeper node is a branch") };
			Node::branch(Node::branch(left, rl.left.clone()), Node::branch(rl.right.clone(), r.right.clone()))
		}
	} else {
		Node::branch(left, right)
	}
}

/// Splits a tree at character `position` into `[0, position)` and `[position, len)`.
pub(crate) fn split(node: &Arc<Node>, position: usize) -> (Arc<Node>, Arc<Node>) {
	if position == 0 {
		return (Node::empty(), node.clone());
	}
	if position >= node.len() {
		return (node.clone(), Node::empty());
	}
	match &**node {
		Node::Leaf(leaf) => (Node::leaf(leaf.slice(0, position)), Node::leaf(leaf.slice(position, leaf.len))),
		Node::Branch(b) => {
			let left_len = b.left.len();
			if position < left_len {
				let (ll, lr) = split(&b.left, position);
				(ll, join(lr, b.right.clone()))
			} else if position == left_len {
				(b.left.clone(), b.right.clone())
			} else {
				let (rl, rr) = split(&b.right, position - left_len);
				(join(b.left.clone(), rl), rr)
			}
		}
	}
}

/// Rebuilds the right spine with `suffix` appended to the last leaf.
pub(crate) fn append_to_last_leaf(node: &Arc<Node>, suffix: &str) -> Arc<Node> {
	match &**node {
		Node::Leaf(leaf) => {
			let mut text = String::with_capacity(leaf.text.len() + suffix.len());
			text.push_str(&leaf.text);
			text.push_str(suffix);
			Node::leaf(&text)
		}
		Node::Branch(b) => Node::branch(b.left.clone(), append_to_last_leaf(&b.right, suffix)),
	}
}

/// Builds a perfectly balanced tree over `text`, cutting leaves of at most
/// `leaf_max` characters and never between `\r` and `\n`.
pub(crate) fn build(text: &str, leaf_max: usize) -> Arc<Node> {
	let leaves = chunk(text, leaf_max);
	build_from_leaves(&leaves)
}

fn chunk(text: &str, leaf_max: usize) -> Vec<Arc<Node>> {
	let leaf_max = leaf_max.max(2);
	let mut leaves = Vec::new();
	let mut start_byte = 0;
	let mut count = 0;
	let mut chars = text.char_indices().peekable();
	while let Some((byte, c)) = chars.next() {
		count += 1;
		let at_limit = count >= leaf_max;
		let splits_crlf = c == '\r' && matches!(chars.peek(), Some((_, '\n')));
		if at_limit && !splits_crlf {
			let end = byte + c.len_utf8();
			leaves.push(Node::leaf(&text[start_byte..end]));
			start_byte = end;
			count = 0;
		}
	}
	if start_byte < text.len() || leaves.is_empty() {
		leaves.push(Node::leaf(&text[start_byte..]));
	}
	leaves
}

fn build_from_leaves(leaves: &[Arc<Node>]) -> Arc<Node> {
	match leaves {
		[] => Node::empty(),
		[leaf] => leaf.clone(),
		_ => {
			let mid = leaves.len() / 2;
			Node::branch(build_from_leaves(&leaves[..mid]), build_from_leaves(&leaves[mid..]))
		}
	}
}
