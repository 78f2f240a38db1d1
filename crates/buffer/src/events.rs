//! Change notifications and their subscriber lists.
//!
//! Text changes are announced in a fixed order: [`Subscriptions::on_changing`]
//! handlers first (they may cancel), then changed handlers by tier
//! ([`ChangedPriority::High`], background, [`ChangedPriority::Medium`],
//! [`ChangedPriority::Low`]), then post-changed handlers once the buffer's
//! notification queue has drained.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use weft_text::{ContentType, EditOptions, NormalizedChangeCollection, NormalizedSpanCollection, TextSnapshot};

/// Opaque value attached to an edit and handed back in its notifications.
pub type EditTag = Arc<dyn Any + Send + Sync>;

/// Announced before a text change is published. Any handler may cancel it.
pub struct TextContentChangingArgs {
	before: TextSnapshot,
	tag: Option<EditTag>,
	canceled: AtomicBool,
}

impl TextContentChangingArgs {
	pub(crate) fn new(before: TextSnapshot, tag: Option<EditTag>) -> Self {
		Self {
			before,
			tag,
			canceled: AtomicBool::new(false),
		}
	}

	/// The snapshot the edit was made against.
	pub fn before(&self) -> &TextSnapshot {
		&self.before
	}

	pub fn tag(&self) -> Option<&EditTag> {
		self.tag.as_ref()
	}

	/// Rejects the edit. The buffer keeps its current snapshot.
	pub fn cancel(&self) {
		self.canceled.store(true, Ordering::Relaxed);
	}

	pub fn is_canceled(&self) -> bool {
		self.canceled.load(Ordering::Relaxed)
	}
}

/// Announced after a text change was published.
#[derive(Clone)]
pub struct TextContentChangedArgs {
	before: TextSnapshot,
	after: TextSnapshot,
	changes: NormalizedChangeCollection,
	options: EditOptions,
	tag: Option<EditTag>,
}

impl TextContentChangedArgs {
	pub(crate) fn new(before: TextSnapshot, after: TextSnapshot, options: EditOptions, tag: Option<EditTag>) -> Self {
		let changes = before.version().changes().cloned().unwrap_or_default();
		Self {
			before,
			after,
			changes,
			options,
			tag,
		}
	}

	pub fn before(&self) -> &TextSnapshot {
		&self.before
	}

	pub fn after(&self) -> &TextSnapshot {
		&self.after
	}

	/// The changes leading from `before` to `after`.
	pub fn changes(&self) -> &NormalizedChangeCollection {
		&self.changes
	}

	pub fn options(&self) -> EditOptions {
		self.options
	}

	pub fn tag(&self) -> Option<&EditTag> {
		self.tag.as_ref()
	}
}

impl fmt::Debug for TextContentChangedArgs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TextContentChangedArgs")
			.field("before", &self.before.version_number())
			.field("after", &self.after.version_number())
			.field("changes", &self.changes.len())
			.finish()
	}
}

/// Announced after the buffer's content type changed.
#[derive(Clone)]
pub struct ContentTypeChangedArgs {
	before: TextSnapshot,
	after: TextSnapshot,
	tag: Option<EditTag>,
}

impl ContentTypeChangedArgs {
	pub(crate) fn new(before: TextSnapshot, after: TextSnapshot, tag: Option<EditTag>) -> Self {
		Self { before, after, tag }
	}

	pub fn before(&self) -> &TextSnapshot {
		&self.before
	}

	pub fn after(&self) -> &TextSnapshot {
		&self.after
	}

	pub fn before_content_type(&self) -> &ContentType {
		self.before.content_type()
	}

	pub fn after_content_type(&self) -> &ContentType {
		self.after.content_type()
	}

	pub fn tag(&self) -> Option<&EditTag> {
		self.tag.as_ref()
	}
}

/// Announced after a read-only region edit was applied.
#[derive(Debug, Clone)]
pub struct ReadOnlyRegionsChangedArgs {
	snapshot: TextSnapshot,
	affected: NormalizedSpanCollection,
}

impl ReadOnlyRegionsChangedArgs {
	pub(crate) fn new(snapshot: TextSnapshot, affected: NormalizedSpanCollection) -> Self {
		Self { snapshot, affected }
	}

	/// The snapshot `affected` is expressed in.
	pub fn snapshot(&self) -> &TextSnapshot {
		&self.snapshot
	}

	/// Spans of every region that was added or removed.
	pub fn affected(&self) -> &NormalizedSpanCollection {
		&self.affected
	}
}

/// Synchronous tiers for changed handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangedPriority {
	High,
	Medium,
	Low,
}

/// Handle returned by every `on_*` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) type ChangingHandler = Arc<dyn Fn(&TextContentChangingArgs) + Send + Sync>;
pub(crate) type ChangedHandler = Arc<dyn Fn(&TextContentChangedArgs) + Send + Sync>;
pub(crate) type PostChangedHandler = Arc<dyn Fn(&TextSnapshot) + Send + Sync>;
pub(crate) type ContentTypeChangedHandler = Arc<dyn Fn(&ContentTypeChangedArgs) + Send + Sync>;
pub(crate) type ReadOnlyRegionsChangedHandler = Arc<dyn Fn(&ReadOnlyRegionsChangedArgs) + Send + Sync>;

struct HandlerList<H> {
	entries: Mutex<Vec<(SubscriptionId, H)>>,
}

impl<H: Clone> HandlerList<H> {
	fn new() -> Self {
		Self {
			entries: Mutex::new(Vec::new()),
		}
	}

	fn push(&self, id: SubscriptionId, handler: H) {
		self.entries.lock().push((id, handler));
	}

	fn remove(&self, id: SubscriptionId) -> bool {
		let mut entries = self.entries.lock();
		let before = entries.len();
		entries.retain(|(entry, _)| *entry != id);
		entries.len() != before
	}

	/// Copies the handlers out so none run under the lock.
	fn snapshot(&self) -> Vec<H> {
		self.entries.lock().iter().map(|(_, h)| h.clone()).collect()
	}

	fn len(&self) -> usize {
		self.entries.lock().len()
	}
}

/// Subscriber lists of one buffer.
///
/// Handlers may subscribe, unsubscribe and edit the buffer from inside a
/// notification. Registration changes take effect from the next notification.
pub struct Subscriptions {
	next_id: AtomicU64,
	changing: HandlerList<ChangingHandler>,
	high: HandlerList<ChangedHandler>,
	background: HandlerList<ChangedHandler>,
	medium: HandlerList<ChangedHandler>,
	low: HandlerList<ChangedHandler>,
	post_changed: HandlerList<PostChangedHandler>,
	content_type_changed: HandlerList<ContentTypeChangedHandler>,
	read_only_regions_changed: HandlerList<ReadOnlyRegionsChangedHandler>,
}

impl Subscriptions {
	pub(crate) fn new() -> Self {
		Self {
			next_id: AtomicU64::new(1),
			changing: HandlerList::new(),
			high: HandlerList::new(),
			background: HandlerList::new(),
			medium: HandlerList::new(),
			low: HandlerList::new(),
			post_changed: HandlerList::new(),
			content_type_changed: HandlerList::new(),
			read_only_regions_changed: HandlerList::new(),
		}
	}

	fn next_id(&self) -> SubscriptionId {
		SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
	}

	/// Runs before a text change is published; call [`TextContentChangingArgs::cancel`] to veto it.
	pub fn on_changing(&self, handler: impl Fn(&TextContentChangingArgs) + Send + Sync + 'static) -> SubscriptionId {
		let id = self.next_id();
		self.changing.push(id, Arc::new(handler));
		id
	}

	/// Runs on the editing thread after a text change is published.
	pub fn on_changed(
		&self,
		priority: ChangedPriority,
		handler: impl Fn(&TextContentChangedArgs) + Send + Sync + 'static,
	) -> SubscriptionId {
		let id = self.next_id();
		let list = match priority {
			ChangedPriority::High => &self.high,
			ChangedPriority::Medium => &self.medium,
			ChangedPriority::Low => &self.low,
		};
		list.push(id, Arc::new(handler));
		id
	}

	/// Runs on the buffer's background thread, one change at a time, in edit order.
	pub fn on_changed_background(&self, handler: impl Fn(&TextContentChangedArgs) + Send + Sync + 'static) -> SubscriptionId {
		let id = self.next_id();
		self.background.push(id, Arc::new(handler));
		id
	}

	/// Runs once after a batch of notifications, including those of edits made by handlers, has been delivered.
	pub fn on_post_changed(&self, handler: impl Fn(&TextSnapshot) + Send + Sync + 'static) -> SubscriptionId {
		let id = self.next_id();
		self.post_changed.push(id, Arc::new(handler));
		id
	}

	pub fn on_content_type_changed(&self, handler: impl Fn(&ContentTypeChangedArgs) + Send + Sync + 'static) -> SubscriptionId {
		let id = self.next_id();
		self.content_type_changed.push(id, Arc::new(handler));
		id
	}

	pub fn on_read_only_regions_changed(
		&self,
		handler: impl Fn(&ReadOnlyRegionsChangedArgs) + Send + Sync + 'static,
	) -> SubscriptionId {
		let id = self.next_id();
		self.read_only_regions_changed.push(id, Arc::new(handler));
		id
	}

	/// Removes a handler from whichever list holds it.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.changing.remove(id)
			|| self.high.remove(id)
			|| self.background.remove(id)
			|| self.medium.remove(id)
			|| self.low.remove(id)
			|| self.post_changed.remove(id)
			|| self.content_type_changed.remove(id)
			|| self.read_only_regions_changed.remove(id)
	}

	pub(crate) fn changing(&self) -> Vec<ChangingHandler> {
		self.changing.snapshot()
	}

	pub(crate) fn changed(&self, priority: ChangedPriority) -> Vec<ChangedHandler> {
		match priority {
			ChangedPriority::High => self.high.snapshot(),
			ChangedPriority::Medium => self.medium.snapshot(),
			ChangedPriority::Low => self.low.snapshot(),
		}
	}

	pub(crate) fn background(&self) -> Vec<ChangedHandler> {
		self.background.snapshot()
	}

	pub(crate) fn has_background(&self) -> bool {
		self.background.len() > 0
	}

	pub(crate) fn post_changed(&self) -> Vec<PostChangedHandler> {
		self.post_changed.snapshot()
	}

	pub(crate) fn content_type_changed(&self) -> Vec<ContentTypeChangedHandler> {
		self.content_type_changed.snapshot()
	}

	pub(crate) fn read_only_regions_changed(&self) -> Vec<ReadOnlyRegionsChangedHandler> {
		self.read_only_regions_changed.snapshot()
	}
}

impl fmt::Debug for Subscriptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscriptions")
			.field("changing", &self.changing.len())
			.field("high", &self.high.len())
			.field("background", &self.background.len())
			.field("medium", &self.medium.len())
			.field("low", &self.low.len())
			.field("post_changed", &self.post_changed.len())
			.finish_non_exhaustive()
	}
}
