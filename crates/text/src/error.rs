//! Error types for text storage and tracking.

use thiserror::Error;

use crate::span::Span;

/// Contract violations reported by text storage, versions and tracking.
///
/// Every variant describes a caller error. Nothing here is clamped or
/// recovered silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
	/// A position lies beyond the end of the text.
	#[error("position {position} is outside 0..={length}")]
	PositionOutOfRange {
		/// The offending position.
		position: usize,
		/// Length of the text the position was checked against.
		length: usize,
	},

	/// A span extends beyond the end of the text.
	#[error("span {span} is outside 0..{length}")]
	SpanOutOfRange {
		/// The offending span.
		span: Span,
		/// Length of the text the span was checked against.
		length: usize,
	},

	/// A line number does not exist in the text.
	#[error("line {line} is outside 0..{line_count}")]
	LineNumberOutOfRange {
		/// The requested line number.
		line: usize,
		/// Number of lines in the text.
		line_count: usize,
	},

	/// A span was built from a start that lies after its end.
	#[error("span start {start} is after end {end}")]
	InvalidSpan {
		/// Requested start.
		start: usize,
		/// Requested end.
		end: usize,
	},

	/// Two versions or snapshots from different buffers were combined.
	#[error("versions belong to different buffers")]
	VersionMismatch,

	/// The version chain does not connect the two versions.
	#[error("version {target} is not reachable from version {current}")]
	UnreachableVersion {
		/// Version the walk started from.
		current: u64,
		/// Version the walk was asked to reach.
		target: u64,
	},

	/// `create_next` was called on a version that already has a successor.
	#[error("version {0} already has a successor")]
	VersionAlreadyAdvanced(u64),

	/// A custom span tracking mode was used without a tracking behavior.
	#[error("custom span tracking requires a tracking behavior")]
	CustomTrackingMode,
}

/// Result alias for text operations.
pub type Result<T> = std::result::Result<T, TextError>;
