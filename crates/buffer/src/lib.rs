//! Mutable text buffers over immutable snapshots.
//!
//! A [`TextBuffer`] publishes a new [`weft_text::TextSnapshot`] for every
//! applied [`TextEdit`]. Edits are checked against the buffer's read-only
//! regions, announced to subscribers in a fixed order, and delivered to
//! background subscribers on a dedicated thread in edit order.

/// The buffer and its edit gate.
pub mod buffer;
/// Buffer configuration loaded from TOML.
pub mod config;
mod dispatch;
/// Edit transactions.
pub mod edit;
/// Error types.
pub mod error;
/// Change notifications and subscriptions.
pub mod events;
mod guarded;
/// Spans that survive closing and reopening a document.
pub mod persistent;
/// Typed side table of buffer services.
pub mod properties;
/// Read-only regions.
pub mod read_only;

pub use buffer::{TextBuffer, WeakTextBuffer};
pub use config::{BackgroundSection, BufferConfig, RopeSection};
pub use edit::{EditState, ReadOnlyRegionEdit, TextEdit};
pub use error::{ConfigError, EditError, Result};
pub use events::{
	ChangedPriority, ContentTypeChangedArgs, EditTag, ReadOnlyRegionsChangedArgs, SubscriptionId, Subscriptions,
	TextContentChangedArgs, TextContentChangingArgs,
};
pub use guarded::{ErrorSink, TracingErrorSink};
pub use persistent::{LineColumnSpan, PersistentSpan};
pub use properties::PropertyCollection;
pub use read_only::{EdgeInsertionMode, ReadOnlyQuery, ReadOnlyRegion, ReadOnlySpanCollection, RegionId};
