//! Text measurement and line wrapping.
//!
//! Width is measured through the [`TextMeasurer`] trait so callers work the
//! same whether real font metrics are available or only the heuristic table.

mod heuristic;
mod metrics;
mod wrap;

pub use heuristic::HeuristicMeasurer;
pub use metrics::FontMetricsMeasurer;
pub use wrap::wrap_lines;

use serde::{Deserialize, Serialize};
use subburn_models::{FontFamily, SubtitleStyle, TranscriptionSegment};

use crate::ass::{sanitize_text, Cue};

/// Measures rendered text width in pixels.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, font: FontFamily, size_px: f64) -> f64;
}

/// Line layout limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub max_lines: usize,
    /// Fraction of the video width a line may occupy
    pub max_width_ratio: f64,
}

impl LayoutConfig {
    pub fn max_width_px(&self, video_width: u32) -> f64 {
        f64::from(video_width) * self.max_width_ratio.clamp(0.05, 1.0)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_lines: 4,
            max_width_ratio: 0.8,
        }
    }
}

/// Wrap every segment into display lines.
pub fn layout_cues(
    segments: Vec<TranscriptionSegment>,
    style: &SubtitleStyle,
    video_width: u32,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> Vec<Cue> {
    let max_width = config.max_width_px(video_width);
    let size = f64::from(style.font_size_px);

    segments
        .into_iter()
        .map(|segment| {
            let text = sanitize_text(&segment.text);
            let lines = wrap_lines(&text, style.font_family, size, max_width, config.max_lines, measurer);
            Cue { segment, lines }
        })
        .filter(|cue| !cue.lines.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_drops_blank_segments() {
        let segments = vec![
            TranscriptionSegment::new(0, 0.0, 1.0, "hello"),
            TranscriptionSegment::new(1, 1.0, 2.0, "   "),
        ];
        let cues = layout_cues(
            segments,
            &SubtitleStyle::default(),
            1920,
            &LayoutConfig::default(),
            &HeuristicMeasurer,
        );
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].lines, vec!["hello".to_string()]);
    }

    #[test]
    fn test_max_width_ratio() {
        let config = LayoutConfig::default();
        assert!((config.max_width_px(1000) - 800.0).abs() < 1e-9);
    }
}
