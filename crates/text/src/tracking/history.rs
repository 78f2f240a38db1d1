use parking_lot::Mutex;

use super::TrackingFidelity;
use crate::error::Result;
use crate::version::TextVersion;

/// Values a tracking handle resolved, ordered by version number.
///
/// The first entry is always the version the handle was created on.
pub(super) struct History<T> {
	fidelity: TrackingFidelity,
	entries: Mutex<Vec<(TextVersion, T)>>,
}

impl<T: Copy> History<T> {
	pub(super) fn new(origin: TextVersion, value: T, fidelity: TrackingFidelity) -> Self {
		Self {
			fidelity,
			entries: Mutex::new(vec![(origin, value)]),
		}
	}

	pub(super) fn fidelity(&self) -> TrackingFidelity {
		self.fidelity
	}

	pub(super) fn origin(&self) -> (TextVersion, T) {
		let entries = self.entries.lock();
		let (version, value) = &entries[0];
		(version.clone(), *value)
	}

	/// Resolves the value for `target`, calling `track(from, value, target)` for
	/// the actual mapping.
	///
	/// `track` runs without the history locked.
	pub(super) fn resolve(&self, target: &TextVersion, track: impl FnOnce(&TextVersion, T, &TextVersion) -> Result<T>) -> Result<T> {
		let (origin, origin_value) = self.origin();
		origin.check_same_buffer(target)?;
		if self.fidelity == TrackingFidelity::Forward {
			return track(&origin, origin_value, target);
		}

		let number = target.version_number();
		let (from, value) = {
			let entries = self.entries.lock();
			if let Some((_, value)) = entries.iter().find(|(v, _)| v.version_number() == number) {
				return Ok(*value);
			}
			if self.fidelity == TrackingFidelity::UndoRedo && target.reiterated_version_number() != number {
				let reiterated = target.reiterated_version_number();
				if let Some((_, value)) = entries.iter().find(|(v, _)| v.version_number() == reiterated) {
					return Ok(*value);
				}
			}
			match entries.iter().rev().find(|(v, _)| v.version_number() < number) {
				Some((v, value)) => (v.clone(), *value),
				None => (origin.clone(), origin_value),
			}
		};

		let resolved = track(&from, value, target)?;
		if from.version_number() < number {
			let mut entries = self.entries.lock();
			let newest = entries.last().map_or(0, |(v, _)| v.version_number());
			if newest < number {
				entries.push((target.clone(), resolved));
			}
		}
		Ok(resolved)
	}
}
