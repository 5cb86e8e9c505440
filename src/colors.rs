use crate::config::TAG_COLORS;
use std::collections::HashMap;

const FALLBACK_COLOR: &str = "transparent";

/// Hands out palette colors to tags in first-seen order.
#[derive(Debug, Clone)]
pub struct TagColorAssigner {
    palette: &'static [&'static str],
    assigned: HashMap<String, &'static str>,
}

impl Default for TagColorAssigner {
    fn default() -> Self {
        Self::new(&TAG_COLORS)
    }
}

impl TagColorAssigner {
    pub fn new(palette: &'static [&'static str]) -> Self {
        Self {
            palette,
            assigned: HashMap::new(),
        }
    }

    pub fn color_for(&mut self, tag: &str) -> &'static str {
        if let Some(&color) = self.assigned.get(tag) {
            return color;
        }
        if self.palette.is_empty() {
            return FALLBACK_COLOR;
        }
        let color = self.palette[self.assigned.len() % self.palette.len()];
        self.assigned.insert(tag.to_owned(), color);
        color
    }
}
