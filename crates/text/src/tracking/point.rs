use std::fmt;
use std::sync::Arc;

use super::history::History;
use super::{PointTrackingMode, TrackingFidelity, track_position};
use crate::error::{Result, TextError};
use crate::snapshot::{SnapshotPoint, TextSnapshot};
use crate::version::TextVersion;

/// A position that can be resolved against any version of its buffer.
///
/// Cloning is cheap and clones share their fidelity history.
#[derive(Clone)]
pub struct TrackingPoint {
	mode: PointTrackingMode,
	history: Arc<History<usize>>,
}

impl TrackingPoint {
	/// Creates a point at `position` in `version`.
	pub fn new(version: &TextVersion, position: usize, mode: PointTrackingMode, fidelity: TrackingFidelity) -> Result<Self> {
		if position > version.length() {
			return Err(TextError::PositionOutOfRange {
				position,
				length: version.length(),
			});
		}
		Ok(Self {
			mode,
			history: Arc::new(History::new(version.clone(), position, fidelity)),
		})
	}

	pub fn mode(&self) -> PointTrackingMode {
		self.mode
	}

	pub fn fidelity(&self) -> TrackingFidelity {
		self.history.fidelity()
	}

	/// The version the point was created on.
	pub fn version(&self) -> TextVersion {
		self.history.origin().0
	}

	/// Resolves the position in `target`.
	pub fn position_in(&self, target: &TextVersion) -> Result<usize> {
		let mode = self.mode;
		self.history.resolve(target, |from, position, target| track_position(mode, position, from, target))
	}

	/// Resolves the position in `snapshot`.
	pub fn get_position(&self, snapshot: &TextSnapshot) -> Result<usize> {
		self.position_in(snapshot.version())
	}

	/// Resolves the point in `snapshot`.
	pub fn get_point(&self, snapshot: &TextSnapshot) -> Result<SnapshotPoint> {
		SnapshotPoint::new(snapshot, self.get_position(snapshot)?)
	}

	/// The character at the point in `snapshot`.
	pub fn get_char(&self, snapshot: &TextSnapshot) -> Result<char> {
		snapshot.char_at(self.get_position(snapshot)?)
	}
}

impl fmt::Debug for TrackingPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (version, position) = self.history.origin();
		f.debug_struct("TrackingPoint")
			.field("version", &version.version_number())
			.field("position", &position)
			.field("mode", &self.mode)
			.field("fidelity", &self.fidelity())
			.finish()
	}
}
