use std::fmt::Write;

use subburn_models::{HexColor, PositionOrigin, SubtitleStyle};

use super::{ass_color, ass_override_color, format_ass_time, Cue};
use crate::error::{CaptionError, CaptionResult};
use crate::layout::TextMeasurer;

/// Horizontal padding on each side of a background box.
const BOX_PADDING_X_PX: f64 = 16.0;
const LINE_HEIGHT_RATIO: f64 = 1.2;
const MAX_CORNER_RADIUS_PX: f64 = 20.0;
/// Background darkening applied per line after the first.
const DARKEN_PER_LINE: f64 = 0.3;

const DEFAULT_STYLE: &str = "Default";
const SECOND_LINE_STYLE: &str = "Line2";

/// Builder for one subtitle document sized to a video frame.
///
/// Each cue line becomes two events sharing the cue's time window: a filled
/// rounded rectangle on layer 0 and the centered text on layer 1.
///
/// Vertical placement: the caption block is moved between the frame edge
/// named by [`PositionOrigin`] (0%) and the opposite edge (100%), and is
/// always kept fully inside the frame.
pub struct AssDocument<'a> {
    style: &'a SubtitleStyle,
    width: u32,
    height: u32,
    measurer: &'a dyn TextMeasurer,
    events: Vec<String>,
}

impl<'a> AssDocument<'a> {
    pub fn new(
        style: &'a SubtitleStyle,
        width: u32,
        height: u32,
        measurer: &'a dyn TextMeasurer,
    ) -> CaptionResult<Self> {
        if width == 0 || height == 0 {
            return Err(CaptionError::InvalidDimensions { width, height });
        }
        Ok(Self {
            style,
            width,
            height,
            measurer,
            events: Vec::new(),
        })
    }

    pub fn with_cues(mut self, cues: &[Cue]) -> Self {
        for cue in cues {
            self.push_cue(cue);
        }
        self
    }

    pub fn push_cue(&mut self, cue: &Cue) {
        let start = format_ass_time(cue.segment.start);
        let end = format_ass_time(cue.segment.end);
        let box_height = self.box_height();
        let top = self.block_top(cue.lines.len());
        let center_x = (f64::from(self.width) / 2.0).round();

        for (index, line) in cue.lines.iter().enumerate() {
            let center_y = (top + (index as f64 + 0.5) * box_height).round();
            let style_name = self.style_name(index);
            let background = ass_override_color(&self.background_for(index));
            let path = self.box_path(line, box_height);

            self.events.push(format!(
                "Dialogue: 0,{start},{end},{style_name},,0,0,0,,{{\\an5\\pos({center_x},{center_y})\\p1\\bord0\\shad0\\c&H{background}&\\3c&H{background}&}}{path}{{\\p0}}"
            ));
            self.events.push(format!(
                "Dialogue: 1,{start},{end},{style_name},,0,0,0,,{{\\an5\\pos({center_x},{center_y})}}{line}"
            ));
        }
    }

    /// Render the full document text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_header(&mut out);
        self.write_styles(&mut out);
        out.push_str("\n[Events]\n");
        out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
        for event in &self.events {
            out.push_str(event);
            out.push('\n');
        }
        out
    }

    /// Height of one background box in pixels.
    pub fn box_height(&self) -> f64 {
        (f64::from(self.style.font_size_px) * LINE_HEIGHT_RATIO).round()
    }

    /// Y coordinate of the top edge of a block of `line_count` lines.
    pub fn block_top(&self, line_count: usize) -> f64 {
        let block = self.box_height() * line_count as f64;
        let free = (f64::from(self.height) - block).max(0.0);
        let pct = self.style.vertical_position_pct.clamp(0.0, 100.0) / 100.0;
        let from_top = match self.style.position_origin {
            PositionOrigin::Top => pct,
            PositionOrigin::Bottom => 1.0 - pct,
        };
        (free * from_top).round()
    }

    fn write_header(&self, out: &mut String) {
        let _ = writeln!(out, "[Script Info]");
        let _ = writeln!(out, "; Script generated by subburn");
        let _ = writeln!(out, "Title: subburn captions");
        let _ = writeln!(out, "ScriptType: v4.00+");
        let _ = writeln!(out, "WrapStyle: 0");
        let _ = writeln!(out, "ScaledBorderAndShadow: yes");
        let _ = writeln!(out, "YCbCr Matrix: TV.709");
        let _ = writeln!(out, "PlayResX: {}", self.width);
        let _ = writeln!(out, "PlayResY: {}", self.height);
    }

    fn write_styles(&self, out: &mut String) {
        out.push_str("\n[V4+ Styles]\n");
        out.push_str(
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
             Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
             Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
        );
        self.write_style(out, DEFAULT_STYLE, &self.style.text_color, &self.style.background_color);
        if let Some(palette) = &self.style.second_line {
            self.write_style(out, SECOND_LINE_STYLE, &palette.text_color, &palette.background_color);
        }
    }

    fn write_style(&self, out: &mut String, name: &str, text: &HexColor, background: &HexColor) {
        let _ = writeln!(
            out,
            "Style: {},{},{},&H{},&H000000FF,&H{},&H{},-1,0,0,0,100,100,0,0,1,0,0,2,10,10,10,1",
            name,
            self.style.font_family,
            self.style.font_size_px,
            ass_color(text),
            ass_color(background),
            ass_color(background),
        );
    }

    fn style_name(&self, line_index: usize) -> &'static str {
        if line_index > 0 && self.style.second_line.is_some() {
            SECOND_LINE_STYLE
        } else {
            DEFAULT_STYLE
        }
    }

    fn background_for(&self, line_index: usize) -> HexColor {
        match (&self.style.second_line, line_index) {
            (_, 0) => self.style.background_color.clone(),
            (Some(palette), _) => palette.background_color.clone(),
            (None, i) => self.style.background_color.darken(DARKEN_PER_LINE * i as f64),
        }
    }

    /// Rounded-rectangle drawing sized to the measured line.
    fn box_path(&self, line: &str, box_height: f64) -> String {
        let size = f64::from(self.style.font_size_px);
        let text_width = self.measurer.measure(line, self.style.font_family, size);
        let w = (text_width + 2.0 * BOX_PADDING_X_PX)
            .round()
            .clamp(1.0, f64::from(self.width));
        let h = box_height;
        let r = (h / 4.0).min(MAX_CORNER_RADIUS_PX).round();

        format!(
            "m 0 {r} b 0 0 {r} 0 {r} 0 l {wr} 0 b {w} 0 {w} {r} {w} {r} l {w} {hr} b {w} {h} {wr} {h} {wr} {h} l {r} {h} b 0 {h} 0 {hr} 0 {hr} l 0 {r}",
            wr = w - r,
            hr = h - r,
        )
    }
}
