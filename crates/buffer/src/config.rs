//! Buffer configuration.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```toml
//! [rope]
//! leaf-max-chars = 1024
//! consolidate-max-chars = 256
//!
//! [background]
//! thread-name = "weft-buffer-events"
//! enabled = true
//! ```

use serde::Deserialize;
use weft_text::RopeConfig;

use crate::error::ConfigError;

/// Top-level buffer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BufferConfig {
	/// Rope leaf sizing.
	pub rope: RopeSection,
	/// Background change notifications.
	pub background: BackgroundSection,
}

/// `[rope]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RopeSection {
	/// Largest leaf built from inserted text, in characters.
	pub leaf_max_chars: usize,
	/// Leaves at or below this length next to an edit are merged into the edit's new leaf.
	pub consolidate_max_chars: usize,
}

impl Default for RopeSection {
	fn default() -> Self {
		let rope = RopeConfig::default();
		Self {
			leaf_max_chars: rope.leaf_max_chars,
			consolidate_max_chars: rope.consolidate_max_chars,
		}
	}
}

/// `[background]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BackgroundSection {
	/// Name of the thread that delivers background notifications.
	pub thread_name: String,
	/// When false, background subscribers run inline right after high priority ones.
	pub enabled: bool,
}

impl Default for BackgroundSection {
	fn default() -> Self {
		Self {
			thread_name: "weft-buffer-events".to_string(),
			enabled: true,
		}
	}
}

impl BufferConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: BufferConfig = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks ranges serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.rope.leaf_max_chars < 2 {
			return Err(ConfigError::Invalid(format!(
				"rope.leaf-max-chars must be at least 2, got {}",
				self.rope.leaf_max_chars
			)));
		}
		if self.rope.consolidate_max_chars > self.rope.leaf_max_chars {
			return Err(ConfigError::Invalid(format!(
				"rope.consolidate-max-chars ({}) exceeds rope.leaf-max-chars ({})",
				self.rope.consolidate_max_chars, self.rope.leaf_max_chars
			)));
		}
		if self.background.enabled && self.background.thread_name.trim().is_empty() {
			return Err(ConfigError::Invalid("background.thread-name must not be empty".to_string()));
		}
		Ok(())
	}

	pub fn rope_config(&self) -> RopeConfig {
		RopeConfig {
			leaf_max_chars: self.rope.leaf_max_chars,
			consolidate_max_chars: self.rope.consolidate_max_chars,
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_is_default() {
		assert_eq!(BufferConfig::from_toml_str("").unwrap(), BufferConfig::default());
	}

	#[test]
	fn parses_kebab_case_tables() {
		let config = BufferConfig::from_toml_str(
			r#"
			[rope]
			leaf-max-chars = 64
			consolidate-max-chars = 16

			[background]
			thread-name = "events"
			enabled = false
			"#,
		)
		.unwrap();
		assert_eq!(
			config.rope_config(),
			RopeConfig {
				leaf_max_chars: 64,
				consolidate_max_chars: 16,
			}
		);
		assert_eq!(config.background.thread_name, "events");
		assert!(!config.background.enabled);
	}

	#[test]
	fn partial_tables_keep_defaults() {
		let config = BufferConfig::from_toml_str("[rope]\nleaf-max-chars = 512\n").unwrap();
		assert_eq!(config.rope.leaf_max_chars, 512);
		assert_eq!(config.rope.consolidate_max_chars, 256);
		assert!(config.background.enabled);
	}

	#[test]
	fn rejects_unknown_keys() {
		let err = BufferConfig::from_toml_str("[rope]\nleaf-size = 4\n").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn rejects_out_of_range_values() {
		let err = BufferConfig::from_toml_str("[rope]\nleaf-max-chars = 1\nconsolidate-max-chars = 0\n").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)));

		let err = BufferConfig::from_toml_str("[rope]\nleaf-max-chars = 8\nconsolidate-max-chars = 9\n").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)));

		let err = BufferConfig::from_toml_str("[background]\nthread-name = \"  \"\n").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)));
	}
}
