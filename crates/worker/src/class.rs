/// Execution classes used to label worker threads in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Notification delivery that runs behind the thread that raised it.
	Background,
	/// Blocking work that owns a dedicated thread for its whole lifetime.
	Blocking,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Background => "background",
			Self::Blocking => "blocking",
		}
	}
}
