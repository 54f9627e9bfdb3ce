//! Transcription segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// One timed unit of transcribed speech.
///
/// Times are in seconds from the start of the video. Segments are treated
/// as immutable values: segmentation produces new segments instead of
/// editing existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_segment_times"))]
pub struct TranscriptionSegment {
    /// Sequential id, reassigned after segmentation
    pub id: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Spoken text
    #[validate(length(max = 10000))]
    pub text: String,
}

impl TranscriptionSegment {
    pub fn new(id: u32, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            text: text.into(),
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Whether the trimmed text contains whitespace between two words.
    pub fn has_interior_whitespace(&self) -> bool {
        self.text.trim().chars().any(char::is_whitespace)
    }
}

fn validate_segment_times(segment: &TranscriptionSegment) -> Result<(), ValidationError> {
    if !segment.start.is_finite() || !segment.end.is_finite() {
        return Err(ValidationError::new("segment_time_not_finite"));
    }
    if segment.start < 0.0 {
        return Err(ValidationError::new("segment_start_negative"));
    }
    if segment.start >= segment.end {
        return Err(ValidationError::new("segment_start_not_before_end"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_and_whitespace() {
        let seg = TranscriptionSegment::new(0, 0.0, 1.0, "  hello   world ");
        assert_eq!(seg.word_count(), 2);
        assert!(seg.has_interior_whitespace());

        let single = TranscriptionSegment::new(0, 0.0, 1.0, " token ");
        assert_eq!(single.word_count(), 1);
        assert!(!single.has_interior_whitespace());
    }

    #[test]
    fn test_validation() {
        assert!(TranscriptionSegment::new(0, 0.0, 1.0, "ok").validate().is_ok());
        assert!(TranscriptionSegment::new(0, 1.0, 1.0, "x").validate().is_err());
        assert!(TranscriptionSegment::new(0, -1.0, 1.0, "x").validate().is_err());
        assert!(TranscriptionSegment::new(0, 0.0, f64::NAN, "x").validate().is_err());
    }
}
