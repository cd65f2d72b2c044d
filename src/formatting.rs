use crate::tags::{Tag, compare};
use std::sync::Arc;
use yansi::Paint;

const FALLBACK_COLUMNS: usize = 80;

/// Color palette for the non-tag parts of shell output.
pub struct ColorPalette {
    pub muted: (u8, u8, u8),
    pub header: (u8, u8, u8),
}

impl ColorPalette {
    pub const CATPPUCCIN: Self = Self {
        muted: (108, 112, 134),  // Gray
        header: (148, 226, 213), // Teal
    };
}

/// Formatting context passed to everything the shell prints.
pub struct FormatContext {
    pub use_color: bool,
    pub palette: ColorPalette,
    pub columns: usize,
}

impl FormatContext {
    pub fn new(use_color: bool) -> Self {
        Self { use_color, palette: ColorPalette::CATPPUCCIN, columns: terminal_columns() }
    }

    pub fn format_header(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.header;
            Paint::rgb(text, r, g, b).bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_muted(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.muted;
            Paint::rgb(text, r, g, b).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_tag(&self, tag: &Tag) -> String {
        if self.use_color {
            let (r, g, b) = tag.display_color();
            Paint::rgb(tag.name(), r, g, b).bold().to_string()
        } else {
            tag.name().to_string()
        }
    }

    /// One registry line: name padded to `width`, then its color or
    /// `no color`.
    pub fn format_tag_row(&self, tag: &Tag, width: usize) -> String {
        let pad = width.saturating_sub(tag.name().chars().count());
        let color = match tag.color() {
            Some(c) => c.to_string(),
            None => self.format_muted("no color"),
        };
        format!("{}{}  {}", self.format_tag(tag), " ".repeat(pad), color)
    }

    /// Tags sorted by key and joined with `", "`, or `-` when empty.
    pub fn format_tag_list(&self, tags: &[Arc<Tag>]) -> String {
        if tags.is_empty() {
            return "-".to_string();
        }
        let mut sorted: Vec<&Arc<Tag>> = tags.iter().collect();
        sorted.sort_by(|a, b| compare(a, b));
        sorted.iter().map(|t| self.format_tag(t)).collect::<Vec<_>>().join(", ")
    }

    /// Tag names laid out as `[name]` chips, wrapped to the terminal width.
    pub fn format_chips(&self, tags: &[Arc<Tag>]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();
        let mut used = 0;
        for tag in tags {
            let visible = tag.name().chars().count() + 2;
            if used > 0 && used + 1 + visible > self.columns {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            if used > 0 {
                line.push(' ');
                used += 1;
            }
            line.push('[');
            line.push_str(&self.format_tag(tag));
            line.push(']');
            used += visible;
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines
    }
}

pub fn terminal_columns() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w))
        .filter(|w| *w > 0)
        .unwrap_or(FALLBACK_COLUMNS)
}
