use std::collections::HashMap;
use std::path::Path;

use subburn_models::FontFamily;
use tracing::{debug, warn};
use ttf_parser::{name_id, Face};

use super::{HeuristicMeasurer, TextMeasurer};
use crate::error::{CaptionError, CaptionResult};

/// Measures text with glyph advances from real font files.
///
/// Families without a loaded face, and glyphs missing from a face, fall back
/// to [`HeuristicMeasurer`] so a partial font directory still works.
#[derive(Debug, Default)]
pub struct FontMetricsMeasurer {
    faces: HashMap<FontFamily, Vec<u8>>,
}

impl FontMetricsMeasurer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.ttf`/`.otf` in `dir` whose family name is a known font.
    ///
    /// Regular faces win over bold or italic ones of the same family.
    pub fn from_dir(dir: impl AsRef<Path>) -> CaptionResult<Self> {
        let dir = dir.as_ref();
        let mut measurer = Self::new();
        let mut regular: HashMap<FontFamily, bool> = HashMap::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"));
            if !is_font {
                continue;
            }

            let data = std::fs::read(&path)?;
            let (family, is_regular) = match Self::identify(&data) {
                Ok(found) => found,
                Err(message) => {
                    warn!(path = %path.display(), "Skipping font file: {}", message);
                    continue;
                }
            };
            let Some(family) = family else {
                continue;
            };

            if regular.get(&family).copied().unwrap_or(false) && !is_regular {
                continue;
            }
            debug!(path = %path.display(), font = %family, "Loaded font metrics");
            regular.insert(family, is_regular);
            measurer.faces.insert(family, data);
        }

        Ok(measurer)
    }

    /// Register font data for a family directly.
    pub fn insert(&mut self, family: FontFamily, data: Vec<u8>) -> CaptionResult<()> {
        Face::parse(&data, 0)
            .map_err(|e| CaptionError::font_load(family.as_str(), e.to_string()))?;
        self.faces.insert(family, data);
        Ok(())
    }

    pub fn has_family(&self, family: FontFamily) -> bool {
        self.faces.contains_key(&family)
    }

    pub fn loaded_families(&self) -> usize {
        self.faces.len()
    }

    fn identify(data: &[u8]) -> Result<(Option<FontFamily>, bool), String> {
        let face = Face::parse(data, 0).map_err(|e| e.to_string())?;
        let family = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == name_id::TYPOGRAPHIC_FAMILY || n.name_id == name_id::FAMILY)
            .filter_map(|n| n.to_string())
            .find_map(|name| name.parse::<FontFamily>().ok());
        Ok((family, face.is_regular()))
    }
}

impl TextMeasurer for FontMetricsMeasurer {
    fn measure(&self, text: &str, font: FontFamily, size_px: f64) -> f64 {
        let Some(face) = self.faces.get(&font).and_then(|d| Face::parse(d, 0).ok()) else {
            return HeuristicMeasurer.measure(text, font, size_px);
        };

        let scale = size_px / f64::from(face.units_per_em().max(1));
        let fallback_scale = size_px * HeuristicMeasurer::font_factor(font);

        text.chars()
            .map(|c| {
                face.glyph_index(c)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| f64::from(adv) * scale)
                    .unwrap_or_else(|| HeuristicMeasurer::char_width(c) * fallback_scale)
            })
            .sum()
    }
}
