/// Tolerance in centiseconds for binary floating point noise.
const CENTI_EPSILON: f64 = 1e-6;

/// Format seconds as `H:MM:SS.CC`.
///
/// Centiseconds are floored straight from the seconds value, so `1.9996`
/// becomes `0:00:01.99` and `3661.256` becomes `1:01:01.25`. Negative and
/// non-finite input clamps to zero.
pub fn format_ass_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let centis = (seconds * 100.0 + CENTI_EPSILON).floor() as u64;

    let hours = centis / 360_000;
    let minutes = (centis / 6_000) % 60;
    let secs = (centis / 100) % 60;
    let cs = centis % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, cs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_truncates_centiseconds() {
        assert_eq!(format_ass_time(3661.256), "1:01:01.25");
        assert_eq!(format_ass_time(1.999), "0:00:01.99");
    }

    #[test]
    fn test_sub_millisecond_remainder_is_not_rounded_up() {
        assert_eq!(format_ass_time(1.9996), "0:00:01.99");
        assert_eq!(format_ass_time(59.9999), "0:00:59.99");
        assert_eq!(format_ass_time(3599.9995), "0:59:59.99");
    }

    #[test]
    fn test_format_edges() {
        assert_eq!(format_ass_time(0.0), "0:00:00.00");
        assert_eq!(format_ass_time(-3.0), "0:00:00.00");
        assert_eq!(format_ass_time(f64::NAN), "0:00:00.00");
        assert_eq!(format_ass_time(59.5), "0:00:59.50");
        assert_eq!(format_ass_time(36000.0), "10:00:00.00");
    }

    #[test]
    fn test_float_noise_does_not_lose_a_centisecond() {
        // 0.29 * 100 is 28.999999999999996 in binary floating point
        assert_eq!(format_ass_time(0.29), "0:00:00.29");
        assert_eq!(format_ass_time(0.57), "0:00:00.57");
    }
}
