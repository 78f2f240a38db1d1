//! Worker threads for work that must run off the calling thread.
//!
//! [`SerialQueue`] is the main entry point: a dedicated, named thread that
//! runs jobs strictly one after another in submission order.

mod class;
mod panic;
pub mod serial;
mod spawn;

pub use class::TaskClass;
pub use panic::panic_message;
pub use serial::{EnqueueError, SerialQueue};
pub use spawn::spawn_named_thread;
