use subburn_models::HexColor;

/// Convert `#RRGGBB` to the ASS style color body `AABBGGRR` (alpha 00).
pub fn ass_color(color: &HexColor) -> String {
    let (r, g, b) = color.rgb();
    format!("00{:02X}{:02X}{:02X}", b, g, r)
}

/// Convert `#RRGGBB` to the `BBGGRR` body used by `\c` override tags.
pub fn ass_override_color(color: &HexColor) -> String {
    let (r, g, b) = color.rgb();
    format!("{:02X}{:02X}{:02X}", b, g, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> HexColor {
        HexColor::parse(s).unwrap()
    }

    #[test]
    fn test_ass_color_component_order() {
        assert_eq!(ass_color(&hex("#FF0000")), "000000FF");
        assert_eq!(ass_color(&hex("#00FF00")), "0000FF00");
        assert_eq!(ass_color(&hex("#0000FF")), "00FF0000");
        assert_eq!(ass_color(&hex("#123456")), "00563412");
    }

    #[test]
    fn test_override_color() {
        assert_eq!(ass_override_color(&hex("#123456")), "563412");
    }
}
