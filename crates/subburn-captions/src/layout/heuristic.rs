use subburn_models::FontFamily;

use super::TextMeasurer;

/// Width estimate from per-character classes, used when no font data is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMeasurer;

impl HeuristicMeasurer {
    /// Approximate advance of one character, in ems.
    pub fn char_width(c: char) -> f64 {
        match c {
            'i' | 'l' | 'I' | 'j' => 0.3,
            't' | 'f' | 'r' | '1' => 0.4,
            'a'..='z' if !matches!(c, 'm' | 'w') => 0.5,
            'm' | 'w' => 0.8,
            'M' | 'W' => 0.9,
            'E' | 'F' | 'L' | 'T' | 'Z' => 0.6,
            'J' => 0.5,
            'A'..='Z' => 0.7,
            '0'..='9' => 0.6,
            ' ' | '.' | ',' | ':' | ';' | '!' | '`' | '\'' | '|' => 0.3,
            '(' | ')' | '[' | ']' | '{' | '}' | '-' | '/' | '\\' => 0.4,
            '^' | '*' | '"' => 0.5,
            '@' | '%' => 0.9,
            '#' | '&' => 0.7,
            _ => 0.6,
        }
    }

    /// Relative width of a family compared to Arial.
    pub fn font_factor(font: FontFamily) -> f64 {
        match font {
            FontFamily::TimesNewRoman | FontFamily::Times => 0.95,
            FontFamily::CourierNew | FontFamily::Courier => 1.1,
            FontFamily::Verdana | FontFamily::Bookman => 1.05,
            FontFamily::Garamond => 0.9,
            FontFamily::ComicSansMs | FontFamily::Impact => 1.1,
            FontFamily::ArialBlack => 1.15,
            _ => 1.0,
        }
    }
}

impl TextMeasurer for HeuristicMeasurer {
    fn measure(&self, text: &str, font: FontFamily, size_px: f64) -> f64 {
        let ems: f64 = text.chars().map(Self::char_width).sum();
        ems * size_px * Self::font_factor(font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_classes() {
        assert_eq!(HeuristicMeasurer::char_width('i'), 0.3);
        assert_eq!(HeuristicMeasurer::char_width('a'), 0.5);
        assert_eq!(HeuristicMeasurer::char_width('m'), 0.8);
        assert_eq!(HeuristicMeasurer::char_width('W'), 0.9);
        assert_eq!(HeuristicMeasurer::char_width('A'), 0.7);
        assert_eq!(HeuristicMeasurer::char_width('E'), 0.6);
        assert_eq!(HeuristicMeasurer::char_width(' '), 0.3);
        assert_eq!(HeuristicMeasurer::char_width('é'), 0.6);
    }

    #[test]
    fn test_measure_scales_with_size_and_font() {
        let m = HeuristicMeasurer;
        let arial = m.measure("mi", FontFamily::Arial, 10.0);
        assert!((arial - 11.0).abs() < 1e-9);
        let black = m.measure("mi", FontFamily::ArialBlack, 10.0);
        assert!((black - 11.0 * 1.15).abs() < 1e-9);
        assert_eq!(m.measure("", FontFamily::Arial, 10.0), 0.0);
    }
}
