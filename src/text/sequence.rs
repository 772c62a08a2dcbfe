use crate::geometry::Path;

/// Fraction of the font size used as the average glyph advance.
///
/// Real glyph metrics are not consulted when sizing or walking path text.
/// The sequencer and the path walker must both go through
/// [`average_advance`] so the repetition count matches the spacing.
pub const AVERAGE_ADVANCE_RATIO: f32 = 0.6;

/// Upper bound on the characters [`repeat_for_path`] emits for one element.
pub const MAX_PATH_STREAM_CHARS: usize = 1 << 16;

/// Estimated advance of one character at `font_size`.
pub fn average_advance(font_size: f32) -> f32 {
    font_size * AVERAGE_ADVANCE_RATIO
}

/// Builds the character stream laid along `path`.
///
/// The whitespace-separated words of `text` are repeated as many times as
/// roughly fit the path length, one space between words and between
/// repetitions. Text is returned unrepeated when the path cannot be walked
/// (fewer than two points, or zero length) and an empty string when `text`
/// holds no words.
pub fn repeat_for_path(text: &str, font_size: f32, path: &Path, space_between: f32) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }

    if !path.is_traversable() {
        return text.to_string();
    }

    let path_length = path.length();
    if path_length == 0.0 {
        return text.to_string();
    }

    let count = repetition_count(&words, font_size, path_length, space_between);
    let sequence = words.join(" ");
    vec![sequence.as_str(); count].join(" ")
}

/// Number of times the word sequence repeats along a path of `path_length`.
fn repetition_count(words: &[&str], font_size: f32, path_length: f32, space_between: f32) -> usize {
    let advance = average_advance(font_size);
    let letters: usize = words.iter().map(|word| word.chars().count()).sum();
    let sequence_width =
        letters as f32 * advance + words.len().saturating_sub(1) as f32 * space_between;

    let per_repetition = sequence_width + space_between;
    if !per_repetition.is_finite() || per_repetition <= 0.0 {
        return 1;
    }

    let fit = (path_length / per_repetition).floor();
    if !fit.is_finite() || fit < 1.0 {
        return 1;
    }

    // One separator follows every repetition.
    let chars_per_repetition = letters + words.len();
    let limit = (MAX_PATH_STREAM_CHARS / chars_per_repetition).max(1);
    if fit > limit as f32 {
        log::warn!(
            "Path text would repeat {fit} times; capping at {limit} ({MAX_PATH_STREAM_CHARS} characters)"
        );
        return limit;
    }
    fit as usize
}
