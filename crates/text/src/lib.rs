//! Versioned text storage: persistent ropes, version chains, position
//! tracking and immutable snapshots.

/// Normalized change collections and edit options.
pub mod change;
/// Error types.
pub mod error;
/// Leaf-caching reads over a rope.
pub mod image;
/// Line terminator scanning and line-count deltas.
pub mod line_break;
/// The persistent rope.
pub mod rope;
/// Immutable snapshots and snapshot-bound points, spans and lines.
pub mod snapshot;
/// Character spans and span sets.
pub mod span;
/// Position and span tracking across versions.
pub mod tracking;
/// The version chain.
pub mod version;

pub use change::{EditOptions, NormalizedChangeCollection, PendingChange, TextChange};
pub use error::{Result, TextError};
pub use image::CachingTextImage;
pub use line_break::{LineBreakBoundaryConditions, compute_line_count_delta};
pub use rope::{LineExtent, RopeConfig, StringRebuilder};
pub use snapshot::{ContentType, SnapshotLine, SnapshotPoint, SnapshotSpan, TextSnapshot};
pub use span::{NormalizedSpanCollection, Span};
pub use tracking::{
	PointTrackingMode, SpanTrackingMode, TrackingBehavior, TrackingFidelity, TrackingPoint, TrackingSpan,
	track_position, track_position_backward_in_time, track_position_forward_in_time, track_span,
	track_span_backward_in_time, track_span_forward_in_time,
};
pub use version::{BufferId, TextVersion};
