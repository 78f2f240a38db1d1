use std::fmt;
use std::sync::Arc;

use super::history::History;
use super::{SpanTrackingMode, TrackingFidelity, track_span};
use crate::error::{Result, TextError};
use crate::snapshot::{SnapshotSpan, TextSnapshot};
use crate::span::Span;
use crate::version::TextVersion;

/// User supplied span tracking for [`SpanTrackingMode::Custom`].
///
/// Called as `behavior(from_version, target_version, span_in_from_version)`.
pub type TrackingBehavior = Arc<dyn Fn(&TextVersion, &TextVersion, Span) -> Span + Send + Sync>;

/// A span that can be resolved against any version of its buffer.
#[derive(Clone)]
pub struct TrackingSpan {
	mode: SpanTrackingMode,
	behavior: Option<TrackingBehavior>,
	history: Arc<History<Span>>,
}

impl TrackingSpan {
	/// Creates a span over `span` in `version`.
	///
	/// [`SpanTrackingMode::Custom`] needs a behavior; use [`TrackingSpan::custom`].
	pub fn new(version: &TextVersion, span: Span, mode: SpanTrackingMode, fidelity: TrackingFidelity) -> Result<Self> {
		if mode == SpanTrackingMode::Custom {
			return Err(TextError::CustomTrackingMode);
		}
		Self::build(version, span, mode, None, fidelity)
	}

	/// Creates a span tracked by `behavior`.
	pub fn custom(version: &TextVersion, span: Span, behavior: TrackingBehavior, fidelity: TrackingFidelity) -> Result<Self> {
		Self::build(version, span, SpanTrackingMode::Custom, Some(behavior), fidelity)
	}

	fn build(
		version: &TextVersion,
		span: Span,
		mode: SpanTrackingMode,
		behavior: Option<TrackingBehavior>,
		fidelity: TrackingFidelity,
	) -> Result<Self> {
		if span.end() > version.length() {
			return Err(TextError::SpanOutOfRange {
				span,
				length: version.length(),
			});
		}
		Ok(Self {
			mode,
			behavior,
			history: Arc::new(History::new(version.clone(), span, fidelity)),
		})
	}

	pub fn mode(&self) -> SpanTrackingMode {
		self.mode
	}

	pub fn fidelity(&self) -> TrackingFidelity {
		self.history.fidelity()
	}

	/// The version the span was created on.
	pub fn version(&self) -> TextVersion {
		self.history.origin().0
	}

	/// Resolves the span in `target`.
	pub fn span_in(&self, target: &TextVersion) -> Result<Span> {
		self.history.resolve(target, |from, span, target| match &self.behavior {
			Some(behavior) => {
				let tracked = behavior(from, target, span);
				if tracked.end() > target.length() {
					return Err(TextError::SpanOutOfRange {
						span: tracked,
						length: target.length(),
					});
				}
				Ok(tracked)
			}
			None => track_span(self.mode, span, from, target),
		})
	}

	/// Resolves the span in `snapshot`.
	pub fn get_span(&self, snapshot: &TextSnapshot) -> Result<SnapshotSpan> {
		SnapshotSpan::new(snapshot, self.span_in(snapshot.version())?)
	}

	/// Text covered by the span in `snapshot`.
	pub fn get_text(&self, snapshot: &TextSnapshot) -> Result<String> {
		snapshot.get_text(self.span_in(snapshot.version())?)
	}
}

impl fmt::Debug for TrackingSpan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (version, span) = self.history.origin();
		f.debug_struct("TrackingSpan")
			.field("version", &version.version_number())
			.field("span", &span)
			.field("mode", &self.mode)
			.field("fidelity", &self.fidelity())
			.finish()
	}
}
