use crate::span::SpanId;
use std::collections::HashSet;

/// Indent guides highlighted while the pointer is over a span's ancestry
#[derive(Debug, Clone, Default)]
pub struct HoverIndentGuides {
    ids: HashSet<SpanId>,
}

impl HoverIndentGuides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &HashSet<SpanId> {
        &self.ids
    }

    pub fn add_hover_indent_guide_id(&mut self, span_id: &str) {
        self.ids.insert(span_id.to_string());
    }

    pub fn remove_hover_indent_guide_id(&mut self, span_id: &str) {
        self.ids.remove(span_id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_guides() {
        let mut guides = HoverIndentGuides::new();
        guides.add_hover_indent_guide_id("a");
        guides.add_hover_indent_guide_id("b");
        guides.add_hover_indent_guide_id("a");
        assert_eq!(guides.ids().len(), 2);

        guides.remove_hover_indent_guide_id("a");
        guides.remove_hover_indent_guide_id("missing");
        assert!(guides.ids().contains("b"));
        assert_eq!(guides.ids().len(), 1);
    }
}
