//! Caption pipeline: segmentation, line layout and subtitle synthesis.
//!
//! Everything here is pure computation over in-memory values. The only
//! filesystem access is optional font loading for [`FontMetricsMeasurer`].

pub mod ass;
pub mod error;
pub mod layout;
pub mod segmenter;

pub use ass::{ass_color, format_ass_time, AssDocument, Cue};
pub use error::{CaptionError, CaptionResult};
pub use layout::{
    wrap_lines, FontMetricsMeasurer, HeuristicMeasurer, LayoutConfig, TextMeasurer,
};
pub use segmenter::{segment, SegmenterConfig};

use subburn_models::{SubtitleStyle, TranscriptionSegment};

/// Run the whole caption pipeline and return the subtitle document text.
///
/// Segments are re-cut to caption length, each cue is wrapped to the frame
/// width, and the result is rendered as an ASS document sized to the video.
pub fn render_captions(
    segments: &[TranscriptionSegment],
    style: &SubtitleStyle,
    width: u32,
    height: u32,
    segmenter: &SegmenterConfig,
    layout: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> CaptionResult<String> {
    let cues = segment(segments, segmenter);
    let cues = layout::layout_cues(cues, style, width, layout, measurer);
    Ok(AssDocument::new(style, width, height, measurer)?
        .with_cues(&cues)
        .render())
}
