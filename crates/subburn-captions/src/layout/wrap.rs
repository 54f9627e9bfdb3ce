use subburn_models::FontFamily;

use super::TextMeasurer;

const ELLIPSIS: char = '…';

/// Wrap `text` into at most `max_lines` lines no wider than `max_width_px`.
///
/// Tries one line, then two, and so on, splitting into roughly equal
/// chunks at word boundaries; the first candidate where every line fits is
/// returned. When nothing fits, lines are filled greedily and the final
/// line is truncated with an ellipsis. Non-empty input always yields at
/// least one non-empty line.
pub fn wrap_lines(
    text: &str,
    font: FontFamily,
    size_px: f64,
    max_width_px: f64,
    max_lines: usize,
    measurer: &dyn TextMeasurer,
) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let max_lines = max_lines.max(1);
    let fits = |line: &str| measurer.measure(line, font, size_px) <= max_width_px;
    let chars: Vec<char> = normalized.chars().collect();

    for count in 1..=max_lines {
        let candidate = balanced_split(&chars, count);
        if candidate.iter().all(|line| fits(line)) {
            return candidate;
        }
    }

    force_fill(&chars, max_lines, &fits)
}

/// Split into `count` chunks of roughly `len / count` chars at spaces.
fn balanced_split(chars: &[char], count: usize) -> Vec<String> {
    let len = chars.len();
    let ideal = len.div_ceil(count);
    let mut lines = Vec::with_capacity(count);
    let mut cursor = 0;

    for _ in 1..count {
        let target = cursor + ideal;
        if target >= len {
            break;
        }
        let left = chars[cursor..=target]
            .iter()
            .rposition(|c| *c == ' ')
            .map(|i| cursor + i)
            .filter(|&i| i > cursor);
        let right = chars[target..].iter().position(|c| *c == ' ').map(|i| target + i);

        let split = match (left, right) {
            (Some(l), Some(r)) if r - target < target - l => r,
            (Some(l), _) => l,
            (None, Some(r)) => r,
            (None, None) => break,
        };

        lines.push(collect(&chars[cursor..split]));
        cursor = split + 1;
    }

    if cursor < len {
        lines.push(collect(&chars[cursor..]));
    }
    lines.retain(|l| !l.is_empty());
    lines
}

/// Greedy fallback: fill lines with the longest fitting prefix.
fn force_fill(chars: &[char], max_lines: usize, fits: &dyn Fn(&str) -> bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(max_lines);
    let mut rest = chars;

    while lines.len() + 1 < max_lines && !rest.is_empty() {
        if fits(&collect(rest)) {
            break;
        }
        let cut = fitting_prefix_len(rest, fits);
        let cut = match rest[..cut].iter().rposition(|c| *c == ' ') {
            Some(space) if cut < rest.len() && rest[cut] != ' ' && space > 0 => space,
            _ => cut,
        };
        lines.push(collect(&rest[..cut]));
        rest = trim_start(&rest[cut..]);
    }

    if !rest.is_empty() {
        let last = collect(rest);
        if fits(&last) {
            lines.push(last);
        } else {
            lines.push(ellipsize(rest, fits));
        }
    }
    lines
}

/// Longest prefix (at least one char) that fits.
fn fitting_prefix_len(chars: &[char], fits: &dyn Fn(&str) -> bool) -> usize {
    let mut best = 1;
    for end in 2..=chars.len() {
        if fits(&collect(&chars[..end])) {
            best = end;
        } else {
            break;
        }
    }
    best
}

fn ellipsize(chars: &[char], fits: &dyn Fn(&str) -> bool) -> String {
    let with_ellipsis = |end: usize| format!("{}{}", collect(&chars[..end]), ELLIPSIS);
    let mut best = 1;
    for end in 2..chars.len() {
        if fits(&with_ellipsis(end)) {
            best = end;
        } else {
            break;
        }
    }
    with_ellipsis(best)
}

fn trim_start(chars: &[char]) -> &[char] {
    let skip = chars.iter().take_while(|c| c.is_whitespace()).count();
    &chars[skip..]
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect::<String>().trim().to_string()
}
