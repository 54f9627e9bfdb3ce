//! ASS (Advanced SubStation Alpha) subtitle documents.

mod color;
mod document;
mod time;

pub use color::{ass_color, ass_override_color};
pub use document::AssDocument;
pub use time::format_ass_time;

use subburn_models::TranscriptionSegment;

/// A segment together with its wrapped display lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub segment: TranscriptionSegment,
    pub lines: Vec<String>,
}

/// Make free text safe to place in a Dialogue text field.
///
/// Braces would open override blocks and backslashes start escapes, so both
/// are replaced with look-alikes. Line breaks become spaces.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            '\\' => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("a {\\b1} c\nd"), "a (/b1) c d");
        assert_eq!(sanitize_text("plain"), "plain");
    }
}
