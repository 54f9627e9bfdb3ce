//! Caption styling: fonts, colors and placement.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::{ModelError, ModelResult};

/// Font families offered to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum FontFamily {
    #[default]
    Arial,
    Helvetica,
    #[serde(rename = "Times New Roman")]
    TimesNewRoman,
    Times,
    #[serde(rename = "Courier New")]
    CourierNew,
    Courier,
    Verdana,
    Georgia,
    Palatino,
    Garamond,
    Bookman,
    #[serde(rename = "Comic Sans MS")]
    ComicSansMs,
    #[serde(rename = "Trebuchet MS")]
    TrebuchetMs,
    #[serde(rename = "Arial Black")]
    ArialBlack,
    Impact,
    Tahoma,
    Roboto,
    #[serde(rename = "Open Sans")]
    OpenSans,
}

impl FontFamily {
    pub const ALL: [FontFamily; 18] = [
        FontFamily::Arial,
        FontFamily::Helvetica,
        FontFamily::TimesNewRoman,
        FontFamily::Times,
        FontFamily::CourierNew,
        FontFamily::Courier,
        FontFamily::Verdana,
        FontFamily::Georgia,
        FontFamily::Palatino,
        FontFamily::Garamond,
        FontFamily::Bookman,
        FontFamily::ComicSansMs,
        FontFamily::TrebuchetMs,
        FontFamily::ArialBlack,
        FontFamily::Impact,
        FontFamily::Tahoma,
        FontFamily::Roboto,
        FontFamily::OpenSans,
    ];

    /// Display name, as written into subtitle documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::Helvetica => "Helvetica",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::Times => "Times",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Courier => "Courier",
            FontFamily::Verdana => "Verdana",
            FontFamily::Georgia => "Georgia",
            FontFamily::Palatino => "Palatino",
            FontFamily::Garamond => "Garamond",
            FontFamily::Bookman => "Bookman",
            FontFamily::ComicSansMs => "Comic Sans MS",
            FontFamily::TrebuchetMs => "Trebuchet MS",
            FontFamily::ArialBlack => "Arial Black",
            FontFamily::Impact => "Impact",
            FontFamily::Tahoma => "Tahoma",
            FontFamily::Roboto => "Roboto",
            FontFamily::OpenSans => "Open Sans",
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FontFamily {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FontFamily::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownFont(s.to_string()))
    }
}

/// An sRGB color written as `#RRGGBB`.
///
/// Always stored normalized (leading `#`, uppercase hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct HexColor(String);

impl HexColor {
    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn parse(s: &str) -> ModelResult<Self> {
        let digits = s.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ModelError::InvalidColor(s.to_string()));
        }
        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{:02X}{:02X}{:02X}", r, g, b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Red, green and blue components.
    pub fn rgb(&self) -> (u8, u8, u8) {
        // Parsed on construction, so every pair is valid hex.
        let channel = |i: usize| u8::from_str_radix(&self.0[i..i + 2], 16).unwrap_or(0);
        (channel(1), channel(3), channel(5))
    }

    /// Darken every channel by `fraction` (0.0 keeps the color, 1.0 is black).
    pub fn darken(&self, fraction: f64) -> Self {
        let keep = 1.0 - fraction.clamp(0.0, 1.0);
        let scale = |c: u8| (f64::from(c) * keep).floor() as u8;
        let (r, g, b) = self.rgb();
        Self::from_rgb(scale(r), scale(g), scale(b))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HexColor {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HexColor::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Which frame edge `vertical_position_pct` is measured from.
///
/// With `Top`, 0% puts the caption block against the top edge and 100%
/// against the bottom edge. `Bottom` mirrors that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PositionOrigin {
    #[default]
    Top,
    Bottom,
}

/// Colors for caption lines after the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LinePalette {
    pub text_color: HexColor,
    pub background_color: HexColor,
}

/// Caption style for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct SubtitleStyle {
    #[serde(default)]
    pub font_family: FontFamily,

    /// Font size in video pixels
    #[validate(range(min = 8, max = 400))]
    pub font_size_px: u32,

    /// Vertical placement in percent of frame height
    #[validate(range(min = 0.0, max = 100.0))]
    pub vertical_position_pct: f64,

    #[serde(default)]
    pub position_origin: PositionOrigin,

    pub text_color: HexColor,

    pub background_color: HexColor,

    /// Optional palette for the second and later lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_line: Option<LinePalette>,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_family: FontFamily::Arial,
            font_size_px: 48,
            vertical_position_pct: 85.0,
            position_origin: PositionOrigin::Top,
            text_color: HexColor::from_rgb(0xFF, 0xFF, 0xFF),
            background_color: HexColor::from_rgb(0, 0, 0),
            second_line: None,
        }
    }
}
