//! Line break recognition and line-count bookkeeping for edits.
//!
//! Recognized terminators are `\r\n`, `\r`, `\n`, NEL (`U+0085`), LINE
//! SEPARATOR (`U+2028`) and PARAGRAPH SEPARATOR (`U+2029`). A `\r` directly
//! followed by `\n` is a single two-character terminator.

use bitflags::bitflags;

/// One line terminator inside a run of text, in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBreak {
	/// Offset of the first character of the terminator.
	pub start: usize,
	/// Length of the terminator in characters (1 or 2).
	pub len: usize,
}

impl LineBreak {
	#[inline]
	pub const fn end(&self) -> usize {
		self.start + self.len
	}
}

/// Returns true for every character that terminates a line on its own.
#[inline]
pub const fn is_line_break(c: char) -> bool {
	matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Collects the line terminators of `text`.
pub fn scan_line_breaks(text: &str) -> Vec<LineBreak> {
	let mut breaks = Vec::new();
	let mut chars = text.chars().peekable();
	let mut offset = 0;
	while let Some(c) = chars.next() {
		if c == '\r' && chars.peek() == Some(&'\n') {
			chars.next();
			breaks.push(LineBreak { start: offset, len: 2 });
			offset += 2;
			continue;
		}
		if is_line_break(c) {
			breaks.push(LineBreak { start: offset, len: 1 });
		}
		offset += 1;
	}
	breaks
}

/// Counts the line terminators of `text`.
pub fn line_break_count(text: &str) -> usize {
	let mut count = 0;
	let mut prev_cr = false;
	for c in text.chars() {
		if c == '\n' && prev_cr {
			prev_cr = false;
			continue;
		}
		if is_line_break(c) {
			count += 1;
		}
		prev_cr = c == '\r';
	}
	count
}

bitflags! {
	/// Characters adjacent to an edit that can pair with the edit's own text.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct LineBreakBoundaryConditions: u8 {
		/// The character just before the edit is `\r`.
		const PRECEDING_RETURN = 1 << 0;
		/// The character just after the edit is `\n`.
		const SUCCEEDING_NEWLINE = 1 << 1;
	}
}

/// Net change in line count when `old_text` is replaced by `new_text`.
///
/// The surrounding text only matters through the two boundary characters:
///
/// * a preceding `\r` absorbs a leading `\n` of the edit text into one terminator;
/// * a trailing `\r` of the edit text is absorbed by a succeeding `\n`;
/// * when the edit text is empty, a preceding `\r` and a succeeding `\n` meet and
///   form a single terminator.
pub fn compute_line_count_delta(conditions: LineBreakBoundaryConditions, old_text: &str, new_text: &str) -> isize {
	lines_in_context(conditions, new_text) - lines_in_context(conditions, old_text)
}

/// Terminators contributed by `text` once placed between the boundary characters.
///
/// The boundary characters' own terminators are constant across an edit and are
/// left out, which is why the result can be negative.
fn lines_in_context(conditions: LineBreakBoundaryConditions, text: &str) -> isize {
	let preceding_return = conditions.contains(LineBreakBoundaryConditions::PRECEDING_RETURN);
	let succeeding_newline = conditions.contains(LineBreakBoundaryConditions::SUCCEEDING_NEWLINE);

	let mut count = line_break_count(text) as isize;
	if text.is_empty() {
		if preceding_return && succeeding_newline {
			count -= 1;
		}
		return count;
	}
	if preceding_return && text.starts_with('\n') {
		count -= 1;
	}
	if succeeding_newline && text.ends_with('\r') {
		count -= 1;
	}
	count
}
