use crate::metrics::TextMeasure;

/// Greedy word packing. Words come from whitespace splitting and are never
/// broken, so a word wider than `max_width` ends up alone on an overflowing
/// line.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    max_width: f32,
    metrics: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if metrics.text_width(&candidate, font_size) <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
