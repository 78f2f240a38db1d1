use std::fmt;
use std::sync::Arc;

/// Kind of content held by a buffer, such as `"text"` or `"rust"`.
///
/// A content type may derive from base types; [`ContentType::is_of_type`]
/// follows those links.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentType {
	name: Arc<str>,
	base_types: Arc<[ContentType]>,
}

impl ContentType {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			base_types: Arc::from([]),
		}
	}

	pub fn with_base_types(name: impl Into<Arc<str>>, base_types: impl IntoIterator<Item = ContentType>) -> Self {
		Self {
			name: name.into(),
			base_types: base_types.into_iter().collect(),
		}
	}

	/// The plain text content type every buffer starts with by default.
	pub fn text() -> Self {
		Self::new("text")
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn base_types(&self) -> &[ContentType] {
		&self.base_types
	}

	/// Returns true if this type or any of its bases is named `name`, ignoring case.
	pub fn is_of_type(&self, name: &str) -> bool {
		self.name.eq_ignore_ascii_case(name) || self.base_types.iter().any(|b| b.is_of_type(name))
	}
}

impl Default for ContentType {
	fn default() -> Self {
		Self::text()
	}
}

impl fmt::Display for ContentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

impl fmt::Debug for ContentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ContentType({})", self.name)
	}
}
