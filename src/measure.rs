use serde::Deserialize;
use unicode_width::UnicodeWidthStr;

/// Approximate text metrics for label placement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    /// Labels wider than this are wrapped at word boundaries
    pub max_label_width: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 6.0,
            line_height: 13.0,
            max_label_width: 100.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    /// Greedy word wrap. A single word wider than the limit gets its own line.
    pub fn wrap(&self, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();

        for word in text.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if self.text_width(&candidate) > self.max_label_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }

        if !line.is_empty() || lines.is_empty() {
            lines.push(line);
        }
        lines
    }

    /// Height of a block of `lines` text lines.
    pub fn block_height(&self, lines: usize) -> f64 {
        lines as f64 * self.line_height
    }
}
