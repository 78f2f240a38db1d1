//! Panic isolation for subscriber callbacks.

use std::panic::{AssertUnwindSafe, catch_unwind};

use weft_worker::panic_message;

/// Receives failures of subscriber callbacks.
pub trait ErrorSink: Send + Sync {
	/// Called once per panicking callback. `source` names the event being raised.
	fn report(&self, source: &'static str, message: &str);
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
	fn report(&self, source: &'static str, message: &str) {
		tracing::error!(source, message, "buffer.subscriber_panicked");
	}
}

/// Runs `f`, reporting a panic to `sink` instead of unwinding.
///
/// Returns false when `f` panicked.
pub(crate) fn guarded(sink: &dyn ErrorSink, source: &'static str, f: impl FnOnce()) -> bool {
	match catch_unwind(AssertUnwindSafe(f)) {
		Ok(()) => true,
		Err(payload) => {
			sink.report(source, &panic_message(&*payload));
			false
		}
	}
}
