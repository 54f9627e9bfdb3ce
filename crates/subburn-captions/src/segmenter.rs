//! Re-cuts transcription segments into caption-sized cues.
//!
//! Over-long segments are bisected recursively at the word boundary nearest
//! the middle of their text. Time is split in the same proportion as the
//! text, and a split that would leave either half shorter than the minimum
//! duration is abandoned. Segments without interior whitespace are never
//! split.

use serde::{Deserialize, Serialize};
use subburn_models::TranscriptionSegment;

/// Segmentation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Upper bound on cue duration in seconds
    pub max_duration_secs: f64,
    /// Splits never produce cues shorter than this
    pub min_duration_secs: f64,
    /// Optional upper bound on words per cue
    pub max_words: Option<usize>,
}

impl SegmenterConfig {
    /// Short cues: 2.5 s, 0.5 s floor, at most 6 words.
    pub fn word_capped() -> Self {
        Self {
            max_duration_secs: 2.5,
            min_duration_secs: 0.5,
            max_words: Some(6),
        }
    }

    /// Duration-only cues: 3 s, 1 s floor, no word cap.
    pub fn duration_only() -> Self {
        Self {
            max_duration_secs: 3.0,
            min_duration_secs: 1.0,
            max_words: None,
        }
    }

    /// Look up a preset by name (`word_capped` or `duration_only`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "word_capped" => Some(Self::word_capped()),
            "duration_only" => Some(Self::duration_only()),
            _ => None,
        }
    }

    /// Whether a segment already satisfies the bounds.
    fn accepts(&self, segment: &TranscriptionSegment) -> bool {
        let duration = segment.duration();
        if duration <= self.min_duration_secs || !segment.has_interior_whitespace() {
            return true;
        }
        let words_ok = self
            .max_words
            .map_or(true, |max| segment.word_count() <= max);
        duration <= self.max_duration_secs && words_ok
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self::word_capped()
    }
}

/// Segment a transcript. Output ids are sequential from zero.
pub fn segment(segments: &[TranscriptionSegment], config: &SegmenterConfig) -> Vec<TranscriptionSegment> {
    segments
        .iter()
        .flat_map(|s| split_recursive(s.clone(), config))
        .enumerate()
        .map(|(id, s)| TranscriptionSegment { id: id as u32, ..s })
        .collect()
}

fn split_recursive(segment: TranscriptionSegment, config: &SegmenterConfig) -> Vec<TranscriptionSegment> {
    if config.accepts(&segment) {
        return vec![segment];
    }

    match bisect(&segment, config.min_duration_secs) {
        Some((left, right)) => {
            let mut out = split_recursive(left, config);
            out.extend(split_recursive(right, config));
            out
        }
        None => vec![segment],
    }
}

/// Split once at the whitespace nearest the character midpoint.
fn bisect(
    segment: &TranscriptionSegment,
    min_duration: f64,
) -> Option<(TranscriptionSegment, TranscriptionSegment)> {
    let chars: Vec<char> = segment.text.trim().chars().collect();
    let split_at = nearest_whitespace(&chars, chars.len() / 2)?;

    let ratio = split_at as f64 / chars.len() as f64;
    let split_time = segment.start + segment.duration() * ratio;
    if split_time - segment.start < min_duration || segment.end - split_time < min_duration {
        return None;
    }

    let left: String = chars[..split_at].iter().collect();
    let right: String = chars[split_at..].iter().collect();

    Some((
        TranscriptionSegment::new(segment.id, segment.start, split_time, left.trim_end()),
        TranscriptionSegment::new(segment.id, split_time, segment.end, right.trim_start()),
    ))
}

/// Index of the whitespace char closest to `mid`, ties going left.
fn nearest_whitespace(chars: &[char], mid: usize) -> Option<usize> {
    if chars.is_empty() {
        return None;
    }
    let left = chars[..=mid.min(chars.len() - 1)]
        .iter()
        .rposition(|c| c.is_whitespace());
    let right = chars
        .get(mid..)
        .and_then(|tail| tail.iter().position(|c| c.is_whitespace()))
        .map(|offset| mid + offset);

    match (left, right) {
        (Some(l), Some(r)) if r - mid < mid - l => Some(r),
        (Some(l), _) => Some(l),
        (None, r) => r,
    }
}
