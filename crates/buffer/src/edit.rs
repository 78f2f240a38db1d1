//! Edit transactions.
//!
//! A buffer has at most one open transaction. Text edits collect
//! insertions, deletions and replacements against the snapshot they were
//! created on and publish them as one new version on [`TextEdit::apply`].
//! Read-only region edits add and remove regions without touching the text.

use std::fmt;

use weft_text::{EditOptions, PendingChange, Span, SpanTrackingMode, TextError, TextSnapshot};

use crate::buffer::TextBuffer;
use crate::error::{EditError, Result};
use crate::events::EditTag;
use crate::read_only::{EdgeInsertionMode, ReadOnlyQuery, ReadOnlyRegion, ReadOnlySpanCollection};

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditState {
	/// Open, nothing requested yet.
	Created,
	/// Open, at least one operation requested.
	Active,
	/// Closed by `apply`.
	Applied,
	/// Closed by `cancel`, by a changing handler, or by dropping the transaction.
	Canceled,
}

impl EditState {
	pub fn is_open(self) -> bool {
		matches!(self, EditState::Created | EditState::Active)
	}
}

impl fmt::Display for EditState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EditState::Created => "created",
			EditState::Active => "active",
			EditState::Applied => "applied",
			EditState::Canceled => "canceled",
		})
	}
}

/// What applying a text edit did.
pub(crate) enum ApplyOutcome {
	Published(TextSnapshot),
	Unchanged,
	Canceled,
}

/// A text edit transaction.
///
/// Positions always refer to [`TextEdit::snapshot`], the snapshot the edit was
/// created on, no matter how many operations were requested before. An
/// operation blocked by a read-only region returns `Ok(false)` and leaves the
/// rest of the transaction usable. Dropping an open transaction cancels it.
pub struct TextEdit {
	buffer: TextBuffer,
	snapshot: TextSnapshot,
	read_only: ReadOnlySpanCollection,
	options: EditOptions,
	reiterated: Option<u64>,
	tag: Option<EditTag>,
	changes: Vec<PendingChange>,
	failed: bool,
	state: EditState,
}

impl TextEdit {
	pub(crate) fn new(
		buffer: TextBuffer,
		snapshot: TextSnapshot,
		read_only: ReadOnlySpanCollection,
		options: EditOptions,
		reiterated: Option<u64>,
		tag: Option<EditTag>,
	) -> Self {
		Self {
			buffer,
			snapshot,
			read_only,
			options,
			reiterated,
			tag,
			changes: Vec::new(),
			failed: false,
			state: EditState::Created,
		}
	}

	/// The snapshot every position of this edit refers to.
	pub fn snapshot(&self) -> &TextSnapshot {
		&self.snapshot
	}

	pub fn state(&self) -> EditState {
		self.state
	}

	pub fn options(&self) -> EditOptions {
		self.options
	}

	/// True if at least one change was accepted.
	pub fn has_effective_changes(&self) -> bool {
		!self.changes.is_empty()
	}

	/// True if any operation was rejected by a read-only region.
	pub fn has_failed_changes(&self) -> bool {
		self.failed
	}

	/// Inserts `text` at `position`.
	pub fn insert(&mut self, position: usize, text: &str) -> Result<bool> {
		self.begin_operation()?;
		if position > self.snapshot.len() {
			return Err(TextError::PositionOutOfRange {
				position,
				length: self.snapshot.len(),
			}
			.into());
		}
		if text.is_empty() {
			return Ok(true);
		}
		self.record(PendingChange::new(Span::empty(position), text))
	}

	/// Deletes `span`.
	pub fn delete(&mut self, span: Span) -> Result<bool> {
		self.begin_operation()?;
		self.check_span(span)?;
		if span.is_empty() {
			return Ok(true);
		}
		self.record(PendingChange::new(span, ""))
	}

	/// Replaces `span` with `text`.
	pub fn replace(&mut self, span: Span, text: &str) -> Result<bool> {
		self.begin_operation()?;
		self.check_span(span)?;
		if span.is_empty() && text.is_empty() {
			return Ok(true);
		}
		self.record(PendingChange::new(span, text))
	}

	/// Replaces `span` with `text` so that positions inside the replaced text
	/// keep their relative offset when tracked across this edit.
	pub fn replace_opaque(&mut self, span: Span, text: &str) -> Result<bool> {
		self.begin_operation()?;
		self.check_span(span)?;
		if span.is_empty() && text.is_empty() {
			return Ok(true);
		}
		self.record(PendingChange::opaque(span, text))
	}

	/// Publishes the accumulated changes as a new snapshot and returns the
	/// buffer's current snapshot.
	///
	/// Without changes, or when a changing handler cancels, the buffer is left
	/// as it was and the origin snapshot is returned.
	pub fn apply(&mut self) -> Result<TextSnapshot> {
		self.check_open()?;
		self.buffer.check_edit_access_for_edit()?;
		let changes = std::mem::take(&mut self.changes);
		let outcome = self
			.buffer
			.apply_text_edit(&self.snapshot, changes, self.options, self.reiterated, self.tag.clone());
		match outcome {
			Ok(ApplyOutcome::Published(after)) => {
				self.state = EditState::Applied;
				Ok(after)
			}
			Ok(ApplyOutcome::Unchanged) => {
				self.state = EditState::Applied;
				Ok(self.snapshot.clone())
			}
			Ok(ApplyOutcome::Canceled) => {
				self.state = EditState::Canceled;
				Ok(self.snapshot.clone())
			}
			Err(err) => {
				self.state = EditState::Canceled;
				Err(err)
			}
		}
	}

	/// Abandons the transaction.
	pub fn cancel(&mut self) -> Result<()> {
		self.check_open()?;
		self.close(EditState::Canceled);
		Ok(())
	}

	pub fn is_canceled(&self) -> bool {
		self.state == EditState::Canceled
	}

	fn check_open(&self) -> Result<()> {
		if !self.state.is_open() {
			return Err(EditError::TransactionClosed { state: self.state });
		}
		Ok(())
	}

	fn begin_operation(&mut self) -> Result<()> {
		self.check_open()?;
		self.buffer.check_edit_access_for_edit()?;
		self.state = EditState::Active;
		Ok(())
	}

	fn check_span(&self, span: Span) -> Result<()> {
		if span.end() > self.snapshot.len() {
			return Err(TextError::SpanOutOfRange {
				span,
				length: self.snapshot.len(),
			}
			.into());
		}
		Ok(())
	}

	fn record(&mut self, change: PendingChange) -> Result<bool> {
		if self.read_only.is_read_only(&self.snapshot, change.span, true)? {
			self.failed = true;
			tracing::debug!(
				buffer = %self.buffer.id(),
				version = self.snapshot.version_number(),
				span = %change.span,
				"buffer.edit_rejected"
			);
			return Ok(false);
		}
		self.changes.push(change);
		Ok(true)
	}

	fn close(&mut self, state: EditState) {
		self.state = state;
		self.buffer.release_edit();
		tracing::debug!(buffer = %self.buffer.id(), version = self.snapshot.version_number(), %state, "buffer.edit_closed");
	}
}

impl Drop for TextEdit {
	fn drop(&mut self) {
		if self.state.is_open() {
			self.close(EditState::Canceled);
		}
	}
}

impl fmt::Debug for TextEdit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TextEdit")
			.field("version", &self.snapshot.version_number())
			.field("state", &self.state)
			.field("changes", &self.changes.len())
			.field("failed", &self.failed)
			.finish()
	}
}

/// A transaction adding and removing read-only regions.
///
/// Applying it publishes a new [`ReadOnlySpanCollection`] but no new snapshot.
pub struct ReadOnlyRegionEdit {
	buffer: TextBuffer,
	snapshot: TextSnapshot,
	added: Vec<ReadOnlyRegion>,
	removed: Vec<ReadOnlyRegion>,
	state: EditState,
}

impl ReadOnlyRegionEdit {
	pub(crate) fn new(buffer: TextBuffer, snapshot: TextSnapshot) -> Self {
		Self {
			buffer,
			snapshot,
			added: Vec::new(),
			removed: Vec::new(),
			state: EditState::Created,
		}
	}

	/// The snapshot new regions are created on.
	pub fn snapshot(&self) -> &TextSnapshot {
		&self.snapshot
	}

	pub fn state(&self) -> EditState {
		self.state
	}

	/// Creates an edge-exclusive region that allows insertion at its edges.
	pub fn create_read_only_region(&mut self, span: Span) -> Result<ReadOnlyRegion> {
		self.create_region(span, SpanTrackingMode::EdgeExclusive, EdgeInsertionMode::Allow, None)
	}

	pub fn create_read_only_region_with(
		&mut self,
		span: Span,
		tracking: SpanTrackingMode,
		edge_insertion: EdgeInsertionMode,
	) -> Result<ReadOnlyRegion> {
		self.create_region(span, tracking, edge_insertion, None)
	}

	/// Creates a region that is only in force while `query` returns true.
	pub fn create_dynamic_read_only_region(
		&mut self,
		span: Span,
		tracking: SpanTrackingMode,
		edge_insertion: EdgeInsertionMode,
		query: impl Fn(bool) -> bool + Send + Sync + 'static,
	) -> Result<ReadOnlyRegion> {
		let query: ReadOnlyQuery = std::sync::Arc::new(query);
		self.create_region(span, tracking, edge_insertion, Some(query))
	}

	/// Removes `region`, returning false if the buffer does not hold it.
	pub fn remove_read_only_region(&mut self, region: &ReadOnlyRegion) -> Result<bool> {
		self.begin_operation()?;
		if let Some(index) = self.added.iter().position(|r| r == region) {
			self.added.remove(index);
			return Ok(true);
		}
		if self.removed.contains(region) || !self.buffer.read_only_regions().contains(region) {
			return Ok(false);
		}
		self.removed.push(region.clone());
		Ok(true)
	}

	/// Publishes the new region set.
	pub fn apply(&mut self) -> Result<ReadOnlySpanCollection> {
		self.check_open()?;
		self.buffer.check_edit_access_for_edit()?;
		self.state = EditState::Applied;
		let added = std::mem::take(&mut self.added);
		let removed = std::mem::take(&mut self.removed);
		Ok(self.buffer.apply_read_only_edit(added, removed))
	}

	pub fn cancel(&mut self) -> Result<()> {
		self.check_open()?;
		self.state = EditState::Canceled;
		self.buffer.release_edit();
		Ok(())
	}

	fn create_region(
		&mut self,
		span: Span,
		tracking: SpanTrackingMode,
		edge_insertion: EdgeInsertionMode,
		query: Option<ReadOnlyQuery>,
	) -> Result<ReadOnlyRegion> {
		self.begin_operation()?;
		let tracking = self.snapshot.create_tracking_span(span, tracking)?;
		let region = ReadOnlyRegion::new(tracking, edge_insertion, query);
		self.added.push(region.clone());
		Ok(region)
	}

	fn check_open(&self) -> Result<()> {
		if !self.state.is_open() {
			return Err(EditError::TransactionClosed { state: self.state });
		}
		Ok(())
	}

	fn begin_operation(&mut self) -> Result<()> {
		self.check_open()?;
		self.buffer.check_edit_access_for_edit()?;
		self.state = EditState::Active;
		Ok(())
	}
}

impl Drop for ReadOnlyRegionEdit {
	fn drop(&mut self) {
		if self.state.is_open() {
			self.state = EditState::Canceled;
			self.buffer.release_edit();
		}
	}
}

impl fmt::Debug for ReadOnlyRegionEdit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReadOnlyRegionEdit")
			.field("state", &self.state)
			.field("added", &self.added.len())
			.field("removed", &self.removed.len())
			.finish()
	}
}
