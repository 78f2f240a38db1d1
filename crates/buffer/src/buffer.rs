//! The mutable text buffer.

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

use parking_lot::{Mutex, RwLock};
use weft_text::{
	BufferId, ContentType, EditOptions, NormalizedChangeCollection, NormalizedSpanCollection, PendingChange, Span,
	StringRebuilder, TextSnapshot, TextVersion,
};
use weft_worker::{SerialQueue, TaskClass};

use crate::config::BufferConfig;
use crate::dispatch::DispatchQueue;
use crate::edit::{ApplyOutcome, ReadOnlyRegionEdit, TextEdit};
use crate::error::{ConfigError, EditError, Result};
use crate::events::{
	ChangedPriority, ContentTypeChangedArgs, EditTag, ReadOnlyRegionsChangedArgs, Subscriptions, TextContentChangedArgs,
	TextContentChangingArgs,
};
use crate::guarded::{ErrorSink, TracingErrorSink, guarded};
use crate::properties::PropertyCollection;
use crate::read_only::{ReadOnlyRegion, ReadOnlySpanCollection};

#[derive(Debug, Default)]
struct EditGate {
	in_progress: bool,
	owner: Option<ThreadId>,
	disposed: bool,
}

struct BufferInner {
	id: BufferId,
	config: BufferConfig,
	current: RwLock<TextSnapshot>,
	read_only: RwLock<ReadOnlySpanCollection>,
	gate: Mutex<EditGate>,
	subscriptions: Subscriptions,
	dispatch: DispatchQueue,
	background: Option<SerialQueue>,
	error_sink: RwLock<Arc<dyn ErrorSink>>,
	properties: PropertyCollection,
}

/// A mutable text buffer.
///
/// The buffer only ever moves its current snapshot forward; every snapshot
/// it has handed out stays valid. Handles are cheap to clone and all refer to
/// the same buffer.
///
/// Edits are single-writer: one transaction at a time, and only from the
/// owning thread once [`TextBuffer::take_thread_ownership`] was called.
/// Reading snapshots is safe from any thread.
#[derive(Clone)]
pub struct TextBuffer {
	inner: Arc<BufferInner>,
}

/// A non-owning buffer handle, for subscribers that need to edit the buffer
/// they observe.
#[derive(Clone)]
pub struct WeakTextBuffer(Weak<BufferInner>);

impl WeakTextBuffer {
	pub fn upgrade(&self) -> Option<TextBuffer> {
		self.0.upgrade().map(|inner| TextBuffer { inner })
	}
}

impl TextBuffer {
	/// Creates a plain text buffer with the default configuration.
	pub fn new(text: &str) -> std::result::Result<Self, ConfigError> {
		Self::with_config(text, ContentType::text(), BufferConfig::default())
	}

	pub fn with_content_type(text: &str, content_type: ContentType) -> std::result::Result<Self, ConfigError> {
		Self::with_config(text, content_type, BufferConfig::default())
	}

	/// Creates a buffer, starting its background event thread if enabled.
	pub fn with_config(text: &str, content_type: ContentType, config: BufferConfig) -> std::result::Result<Self, ConfigError> {
		config.validate()?;
		let id = BufferId::next();
		let content = StringRebuilder::from_text(text, config.rope_config());
		let version = TextVersion::initial(id, content.len());
		let snapshot = TextSnapshot::new(version, content, content_type);
		let background = if config.background.enabled {
			let queue = SerialQueue::spawn(TaskClass::Background, config.background.thread_name.clone())
				.map_err(ConfigError::Spawn)?;
			Some(queue)
		} else {
			None
		};
		tracing::debug!(buffer = %id, length = snapshot.len(), background = background.is_some(), "buffer.new");
		Ok(Self {
			inner: Arc::new(BufferInner {
				id,
				config,
				current: RwLock::new(snapshot),
				read_only: RwLock::new(ReadOnlySpanCollection::default()),
				gate: Mutex::new(EditGate::default()),
				subscriptions: Subscriptions::new(),
				dispatch: DispatchQueue::default(),
				background,
				error_sink: RwLock::new(Arc::new(TracingErrorSink)),
				properties: PropertyCollection::new(),
			}),
		})
	}

	pub fn id(&self) -> BufferId {
		self.inner.id
	}

	pub fn config(&self) -> &BufferConfig {
		&self.inner.config
	}

	pub fn downgrade(&self) -> WeakTextBuffer {
		WeakTextBuffer(Arc::downgrade(&self.inner))
	}

	pub fn ptr_eq(&self, other: &TextBuffer) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// The latest published snapshot.
	pub fn current_snapshot(&self) -> TextSnapshot {
		self.inner.current.read().clone()
	}

	pub fn content_type(&self) -> ContentType {
		self.inner.current.read().content_type().clone()
	}

	/// Event registration.
	pub fn subscriptions(&self) -> &Subscriptions {
		&self.inner.subscriptions
	}

	/// Side table for services attached to this buffer.
	pub fn properties(&self) -> &PropertyCollection {
		&self.inner.properties
	}

	/// Replaces the sink that receives subscriber panics.
	pub fn set_error_sink(&self, sink: Arc<dyn ErrorSink>) {
		*self.inner.error_sink.write() = sink;
	}

	/// The read-only regions currently in force.
	pub fn read_only_regions(&self) -> ReadOnlySpanCollection {
		self.inner.read_only.read().clone()
	}

	/// Whether inserting at `position` of the current snapshot is blocked.
	pub fn is_read_only_position(&self, position: usize) -> Result<bool> {
		let snapshot = self.current_snapshot();
		Ok(self.read_only_regions().is_read_only_position(&snapshot, position, false)?)
	}

	/// Whether replacing `span` of the current snapshot is blocked.
	pub fn is_read_only(&self, span: Span) -> Result<bool> {
		let snapshot = self.current_snapshot();
		Ok(self.read_only_regions().is_read_only(&snapshot, span, false)?)
	}

	/// Parts of `span` in the current snapshot covered by read-only regions.
	pub fn read_only_extents(&self, span: Span) -> Result<NormalizedSpanCollection> {
		let snapshot = self.current_snapshot();
		Ok(self.read_only_regions().extents(&snapshot, span)?)
	}

	/// Restricts editing to the calling thread.
	///
	/// Fails with [`EditError::WrongThread`] if another thread already owns the buffer.
	pub fn take_thread_ownership(&self) -> Result<()> {
		let current = std::thread::current().id();
		let mut gate = self.inner.gate.lock();
		match gate.owner {
			Some(owner) if owner != current => {
				tracing::warn!(buffer = %self.inner.id, "buffer.ownership_conflict");
				Err(EditError::WrongThread)
			}
			_ => {
				gate.owner = Some(current);
				Ok(())
			}
		}
	}

	/// Whether the calling thread may edit the buffer.
	pub fn check_edit_access(&self) -> bool {
		let gate = self.inner.gate.lock();
		gate.owner.is_none_or(|owner| owner == std::thread::current().id())
	}

	pub fn edit_in_progress(&self) -> bool {
		self.inner.gate.lock().in_progress
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.gate.lock().disposed
	}

	/// Opens a text edit transaction.
	///
	/// `reiterated` marks the resulting version as equivalent to an earlier
	/// version, as undo and redo do. `tag` is handed to every notification of
	/// the edit.
	pub fn create_edit(&self, options: EditOptions, reiterated: Option<u64>, tag: Option<EditTag>) -> Result<TextEdit> {
		let snapshot = self.begin_edit()?;
		Ok(TextEdit::new(self.clone(), snapshot, self.read_only_regions(), options, reiterated, tag))
	}

	/// Opens a text edit transaction with default options.
	pub fn edit(&self) -> Result<TextEdit> {
		self.create_edit(EditOptions::NONE, None, None)
	}

	pub fn create_read_only_region_edit(&self) -> Result<ReadOnlyRegionEdit> {
		let snapshot = self.begin_edit()?;
		Ok(ReadOnlyRegionEdit::new(self.clone(), snapshot))
	}

	/// Inserts `text` in a transaction of its own.
	pub fn insert(&self, position: usize, text: &str) -> Result<TextSnapshot> {
		let mut edit = self.edit()?;
		edit.insert(position, text)?;
		edit.apply()
	}

	/// Deletes `span` in a transaction of its own.
	pub fn delete(&self, span: Span) -> Result<TextSnapshot> {
		let mut edit = self.edit()?;
		edit.delete(span)?;
		edit.apply()
	}

	/// Replaces `span` in a transaction of its own.
	pub fn replace(&self, span: Span, text: &str) -> Result<TextSnapshot> {
		let mut edit = self.edit()?;
		edit.replace(span, text)?;
		edit.apply()
	}

	/// Publishes a snapshot with the same text and a new content type.
	///
	/// The new version carries no text changes. Changing to the current
	/// content type does nothing.
	pub fn change_content_type(&self, content_type: ContentType, tag: Option<EditTag>) -> Result<TextSnapshot> {
		let before = self.begin_edit()?;
		if before.content_type() == &content_type {
			self.release_edit();
			return Ok(before);
		}
		let version = match before.version().create_next(NormalizedChangeCollection::empty(), None) {
			Ok(version) => version,
			Err(err) => {
				self.release_edit();
				return Err(err.into());
			}
		};
		let after = TextSnapshot::new(version, before.content().clone(), content_type);
		*self.inner.current.write() = after.clone();
		self.release_edit();
		tracing::debug!(
			buffer = %self.inner.id,
			version = after.version_number(),
			from = %before.content_type(),
			to = %after.content_type(),
			"buffer.content_type_changed"
		);

		let args = ContentTypeChangedArgs::new(before, after.clone(), tag);
		let inner = Arc::clone(&self.inner);
		self.raise(Box::new(move || inner.deliver_content_type_changed(&args)));
		Ok(after)
	}

	/// Stops background delivery and rejects any further edit.
	///
	/// Background notifications already queued are still delivered.
	pub fn dispose(&self) {
		{
			let mut gate = self.inner.gate.lock();
			if gate.disposed {
				return;
			}
			gate.disposed = true;
		}
		if let Some(queue) = &self.inner.background {
			queue.shutdown();
		}
		tracing::debug!(buffer = %self.inner.id, "buffer.dispose");
	}

	/// Blocks until every background notification queued so far was delivered.
	///
	/// Returns at once when called from a background handler.
	pub fn flush_background(&self) {
		if let Some(queue) = &self.inner.background {
			queue.flush();
		}
	}

	fn begin_edit(&self) -> Result<TextSnapshot> {
		let mut gate = self.inner.gate.lock();
		check_gate(&gate, self.inner.id)?;
		if gate.in_progress {
			return Err(EditError::EditInProgress);
		}
		gate.in_progress = true;
		Ok(self.current_snapshot())
	}

	pub(crate) fn check_edit_access_for_edit(&self) -> Result<()> {
		check_gate(&self.inner.gate.lock(), self.inner.id)
	}

	pub(crate) fn release_edit(&self) {
		self.inner.gate.lock().in_progress = false;
	}

	pub(crate) fn apply_text_edit(
		&self,
		origin: &TextSnapshot,
		pending: Vec<PendingChange>,
		options: EditOptions,
		reiterated: Option<u64>,
		tag: Option<EditTag>,
	) -> Result<ApplyOutcome> {
		let changes = match NormalizedChangeCollection::normalize(origin.content(), pending, options) {
			Ok(changes) => changes,
			Err(err) => {
				self.release_edit();
				return Err(err.into());
			}
		};
		if changes.is_empty() {
			self.release_edit();
			return Ok(ApplyOutcome::Unchanged);
		}

		let changing = TextContentChangingArgs::new(origin.clone(), tag.clone());
		let sink = self.inner.error_sink();
		for handler in self.inner.subscriptions.changing() {
			guarded(&*sink, "changing", || handler(&changing));
		}
		if changing.is_canceled() {
			self.release_edit();
			tracing::debug!(buffer = %self.inner.id, version = origin.version_number(), "buffer.edit_canceled");
			return Ok(ApplyOutcome::Canceled);
		}

		let change_count = changes.len();
		let published = changes
			.apply_to(origin.content())
			.and_then(|content| Ok((content, origin.version().create_next(changes, reiterated)?)));
		let (content, version) = match published {
			Ok(parts) => parts,
			Err(err) => {
				self.release_edit();
				return Err(err.into());
			}
		};
		let after = TextSnapshot::new(version, content, origin.content_type().clone());
		*self.inner.current.write() = after.clone();
		self.release_edit();
		tracing::debug!(
			buffer = %self.inner.id,
			version = after.version_number(),
			changes = change_count,
			length = after.len(),
			"buffer.apply"
		);

		let args = TextContentChangedArgs::new(origin.clone(), after.clone(), options, tag);
		let inner = Arc::clone(&self.inner);
		self.raise(Box::new(move || inner.deliver_changed(&args)));
		Ok(ApplyOutcome::Published(after))
	}

	pub(crate) fn apply_read_only_edit(&self, added: Vec<ReadOnlyRegion>, removed: Vec<ReadOnlyRegion>) -> ReadOnlySpanCollection {
		let snapshot = self.current_snapshot();
		let published = {
			let mut read_only = self.inner.read_only.write();
			let regions: Vec<ReadOnlyRegion> = read_only
				.iter()
				.filter(|region| !removed.contains(region))
				.cloned()
				.chain(added.iter().cloned())
				.collect();
			*read_only = ReadOnlySpanCollection::from_regions(regions);
			read_only.clone()
		};
		self.release_edit();
		if added.is_empty() && removed.is_empty() {
			return published;
		}

		let mut affected = Vec::with_capacity(added.len() + removed.len());
		for region in added.iter().chain(removed.iter()) {
			match region.span().span_in(snapshot.version()) {
				Ok(span) => affected.push(span),
				Err(err) => tracing::warn!(buffer = %self.inner.id, region = ?region.id(), %err, "buffer.read_only_region_untracked"),
			}
		}
		tracing::debug!(
			buffer = %self.inner.id,
			added = added.len(),
			removed = removed.len(),
			regions = published.len(),
			"buffer.read_only_regions_changed"
		);

		let args = ReadOnlyRegionsChangedArgs::new(snapshot, NormalizedSpanCollection::new(affected));
		let sink = self.inner.error_sink();
		for handler in self.inner.subscriptions.read_only_regions_changed() {
			guarded(&*sink, "read_only_regions_changed", || handler(&args));
		}
		published
	}

	fn raise(&self, notification: crate::dispatch::Notification) {
		let inner = &self.inner;
		inner.dispatch.raise(notification, true, || inner.deliver_post_changed());
	}
}

fn check_gate(gate: &EditGate, id: BufferId) -> Result<()> {
	if gate.disposed {
		return Err(EditError::Disposed);
	}
	if let Some(owner) = gate.owner
		&& owner != std::thread::current().id()
	{
		tracing::warn!(buffer = %id, "buffer.wrong_thread");
		return Err(EditError::WrongThread);
	}
	Ok(())
}

impl BufferInner {
	fn error_sink(&self) -> Arc<dyn ErrorSink> {
		Arc::clone(&*self.error_sink.read())
	}

	fn deliver_changed(&self, args: &TextContentChangedArgs) {
		let sink = self.error_sink();
		for handler in self.subscriptions.changed(ChangedPriority::High) {
			guarded(&*sink, "changed_high", || handler(args));
		}
		self.deliver_background(args, &sink);
		for handler in self.subscriptions.changed(ChangedPriority::Medium) {
			guarded(&*sink, "changed_medium", || handler(args));
		}
		for handler in self.subscriptions.changed(ChangedPriority::Low) {
			guarded(&*sink, "changed_low", || handler(args));
		}
	}

	fn deliver_background(&self, args: &TextContentChangedArgs, sink: &Arc<dyn ErrorSink>) {
		if !self.subscriptions.has_background() {
			return;
		}
		let handlers = self.subscriptions.background();
		let Some(queue) = &self.background else {
			for handler in handlers {
				guarded(&**sink, "changed_background", || handler(args));
			}
			return;
		};
		let args = args.clone();
		let sink = Arc::clone(sink);
		let version = args.after().version_number();
		let job = move || {
			for handler in handlers {
				guarded(&*sink, "changed_background", || handler(&args));
			}
		};
		match queue.enqueue(job) {
			Ok(()) => tracing::trace!(buffer = %self.id, version, "buffer.background_enqueued"),
			Err(_) => tracing::debug!(buffer = %self.id, version, "buffer.background_closed"),
		}
	}

	fn deliver_content_type_changed(&self, args: &ContentTypeChangedArgs) {
		let sink = self.error_sink();
		for handler in self.subscriptions.content_type_changed() {
			guarded(&*sink, "content_type_changed", || handler(args));
		}
	}

	fn deliver_post_changed(&self) {
		let sink = self.error_sink();
		let snapshot = self.current.read().clone();
		for handler in self.subscriptions.post_changed() {
			guarded(&*sink, "post_changed", || handler(&snapshot));
		}
	}
}

impl fmt::Debug for TextBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let gate = self.inner.gate.lock();
		f.debug_struct("TextBuffer")
			.field("id", &self.inner.id)
			.field("version", &self.inner.current.read().version_number())
			.field("edit_in_progress", &gate.in_progress)
			.field("disposed", &gate.disposed)
			.finish()
	}
}
