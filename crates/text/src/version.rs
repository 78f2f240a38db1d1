//! The forward-only version chain.
//!
//! Every buffer state is a [`TextVersion`]. A version learns its successor,
//! and the changes leading to it, exactly once; after that it never changes.
//! Versions are reference counted, so anything still holding an old version
//! keeps the chain from that version onward alive and can track positions
//! forward through it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::change::NormalizedChangeCollection;
use crate::error::{Result, TextError};

/// Identity of the buffer a version chain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
	/// Allocates a fresh, process-unique id.
	pub fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for BufferId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "buffer#{}", self.0)
	}
}

struct Successor {
	changes: NormalizedChangeCollection,
	next: TextVersion,
}

struct VersionNode {
	buffer: BufferId,
	number: u64,
	reiterated: u64,
	length: usize,
	successor: OnceLock<Successor>,
}

impl Drop for VersionNode {
	fn drop(&mut self) {
		// Unlink the tail one node at a time; recursive drops of a long chain
		// would exhaust the stack.
		let mut next = self.successor.take().map(|s| s.next.0);
		while let Some(node) = next {
			next = match Arc::try_unwrap(node) {
				Ok(mut node) => node.successor.take().map(|s| s.next.0),
				Err(_) => None,
			};
		}
	}
}

/// One immutable state in a buffer's history.
#[derive(Clone)]
pub struct TextVersion(Arc<VersionNode>);

impl TextVersion {
	/// Creates version 0 of a new chain.
	pub fn initial(buffer: BufferId, length: usize) -> Self {
		Self(Arc::new(VersionNode {
			buffer,
			number: 0,
			reiterated: 0,
			length,
			successor: OnceLock::new(),
		}))
	}

	#[inline]
	pub fn buffer_id(&self) -> BufferId {
		self.0.buffer
	}

	#[inline]
	pub fn version_number(&self) -> u64 {
		self.0.number
	}

	/// The earliest version this one is known to be equivalent to.
	///
	/// Equal to [`version_number`](Self::version_number) unless an undo or redo
	/// declared otherwise.
	#[inline]
	pub fn reiterated_version_number(&self) -> u64 {
		self.0.reiterated
	}

	/// Length of the text in this version.
	#[inline]
	pub fn length(&self) -> usize {
		self.0.length
	}

	/// Changes leading to the next version, once it exists.
	pub fn changes(&self) -> Option<&NormalizedChangeCollection> {
		self.0.successor.get().map(|s| &s.changes)
	}

	/// The next version, once it exists.
	pub fn next(&self) -> Option<&TextVersion> {
		self.0.successor.get().map(|s| &s.next)
	}

	/// Appends the successor of this version.
	///
	/// Fails with [`TextError::VersionAlreadyAdvanced`] when this version already
	/// has a successor, which is what keeps a buffer to a single edit at a time.
	pub fn create_next(&self, changes: NormalizedChangeCollection, reiterated: Option<u64>) -> Result<TextVersion> {
		if self.0.successor.get().is_some() {
			return Err(TextError::VersionAlreadyAdvanced(self.0.number));
		}
		let number = self.0.number + 1;
		let length = (self.0.length as isize + changes.delta()) as usize;
		let next = TextVersion(Arc::new(VersionNode {
			buffer: self.0.buffer,
			number,
			reiterated: reiterated.unwrap_or(number),
			length,
			successor: OnceLock::new(),
		}));
		let change_count = changes.len();
		self.0
			.successor
			.set(Successor {
				changes,
				next: next.clone(),
			})
			.map_err(|_| TextError::VersionAlreadyAdvanced(self.0.number))?;
		tracing::trace!(buffer = self.0.buffer.get(), version = number, changes = change_count, length, "version.next");
		Ok(next)
	}

	/// Returns true if both handles name the same version node.
	pub fn ptr_eq(&self, other: &TextVersion) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	/// Fails with [`TextError::VersionMismatch`] unless both versions share a chain.
	pub fn check_same_buffer(&self, other: &TextVersion) -> Result<()> {
		if self.0.buffer != other.0.buffer {
			return Err(TextError::VersionMismatch);
		}
		Ok(())
	}

	/// Collects the versions from `self` up to, but excluding, `target`.
	///
	/// `target` must be reachable by following successors from `self`.
	pub(crate) fn path_to(&self, target: &TextVersion) -> Result<Vec<TextVersion>> {
		self.check_same_buffer(target)?;
		let unreachable = || TextError::UnreachableVersion {
			current: self.version_number(),
			target: target.version_number(),
		};
		if target.version_number() < self.version_number() {
			return Err(unreachable());
		}
		let mut path = Vec::with_capacity((target.version_number() - self.version_number()) as usize);
		let mut version = self.clone();
		while version.version_number() < target.version_number() {
			let next = version.next().cloned().ok_or_else(unreachable)?;
			path.push(version);
			version = next;
		}
		Ok(path)
	}
}

impl PartialEq for TextVersion {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for TextVersion {}

impl fmt::Debug for TextVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TextVersion")
			.field("buffer", &self.0.buffer)
			.field("number", &self.0.number)
			.field("reiterated", &self.0.reiterated)
			.field("length", &self.0.length)
			.finish()
	}
}
