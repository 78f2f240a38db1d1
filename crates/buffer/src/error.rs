//! Error types for buffers, edit transactions and buffer configuration.

use std::io;

use thiserror::Error;
use weft_text::TextError;

use crate::edit::EditState;

/// Contract violations raised by buffers and edit transactions.
///
/// A read-only region rejecting an operation is not an error; the operation
/// returns `Ok(false)` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
	/// Another edit transaction is still open on the buffer.
	#[error("an edit is already in progress")]
	EditInProgress,
	/// The calling thread does not own the buffer.
	#[error("the buffer is owned by another thread")]
	WrongThread,
	/// The transaction was already applied or canceled.
	#[error("the edit transaction is {state}")]
	TransactionClosed {
		/// State the transaction was left in.
		state: EditState,
	},
	/// The buffer was disposed.
	#[error("the buffer has been disposed")]
	Disposed,
	/// Bounds or version error from the text layer.
	#[error(transparent)]
	Text(#[from] TextError),
}

/// Errors raised while loading configuration or building a buffer from it.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML did not parse or did not match the schema.
	#[error("invalid buffer config: {0}")]
	Parse(#[from] toml::de::Error),
	/// A value parsed but is outside its allowed range.
	#[error("invalid buffer config: {0}")]
	Invalid(String),
	/// The background event thread could not be started.
	#[error("failed to start background event thread: {0}")]
	Spawn(#[source] io::Error),
}

/// Result alias for edit operations.
pub type Result<T> = std::result::Result<T, EditError>;
