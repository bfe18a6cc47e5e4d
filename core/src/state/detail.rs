use crate::span::SpanId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Collapsible part of a span's detail panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailSection {
    /// The detail row itself
    Row,
    Logs,
    Tags,
    Process,
    References,
    StackTraces,
    Warnings,
}

/// Composite key of a detail toggle. `item` indexes into the span's logs or
/// references for per-item toggles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetailKey {
    pub span_id: SpanId,
    pub section: DetailSection,
    pub item: Option<usize>,
}

impl DetailKey {
    pub fn section(span_id: &str, section: DetailSection) -> Self {
        Self {
            span_id: span_id.to_string(),
            section,
            item: None,
        }
    }

    pub fn item(span_id: &str, section: DetailSection, item: usize) -> Self {
        Self {
            span_id: span_id.to_string(),
            section,
            item: Some(item),
        }
    }
}

/// Expanded detail panels. A key that is not present is collapsed.
#[derive(Debug, Clone, Default)]
pub struct DetailState {
    open: HashSet<DetailKey>,
}

impl DetailState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, key: &DetailKey) -> bool {
        self.open.contains(key)
    }

    pub fn open_keys(&self) -> &HashSet<DetailKey> {
        &self.open
    }

    /// Spans whose detail row is expanded
    pub fn open_rows(&self) -> HashSet<SpanId> {
        self.open
            .iter()
            .filter(|k| k.section == DetailSection::Row && k.item.is_none())
            .map(|k| k.span_id.clone())
            .collect()
    }

    /// Flip one key and return its new state
    pub fn toggle(&mut self, key: DetailKey) -> bool {
        let now_open = if self.open.remove(&key) {
            false
        } else {
            self.open.insert(key.clone());
            true
        };
        tracing::debug!(
            span_id = %key.span_id,
            section = ?key.section,
            item = ?key.item,
            open = now_open,
            "toggled span detail"
        );
        now_open
    }

    pub fn toggle_row(&mut self, span_id: &str) -> bool {
        self.toggle(DetailKey::section(span_id, DetailSection::Row))
    }

    pub fn toggle_logs(&mut self, span_id: &str) -> bool {
        self.toggle(DetailKey::section(span_id, DetailSection::Logs))
    }

    pub fn toggle_log_item(&mut self, span_id: &str, log_index: usize) -> bool {
        self.toggle(DetailKey::item(span_id, DetailSection::Logs, log_index))
    }

    pub fn toggle_tags(&mut self, span_id: &str) -> bool {
        self.toggle(DetailKey::section(span_id, DetailSection::Tags))
    }

    pub fn toggle_process(&mut self, span_id: &str) -> bool {
        self.toggle(DetailKey::section(span_id, DetailSection::Process))
    }

    pub fn toggle_references(&mut self, span_id: &str) -> bool {
        self.toggle(DetailKey::section(span_id, DetailSection::References))
    }

    pub fn toggle_reference_item(&mut self, span_id: &str, reference_index: usize) -> bool {
        self.toggle(DetailKey::item(
            span_id,
            DetailSection::References,
            reference_index,
        ))
    }

    pub fn toggle_stack_traces(&mut self, span_id: &str) -> bool {
        self.toggle(DetailKey::section(span_id, DetailSection::StackTraces))
    }

    pub fn toggle_warnings(&mut self, span_id: &str) -> bool {
        self.toggle(DetailKey::section(span_id, DetailSection::Warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_is_collapsed() {
        let state = DetailState::new();
        assert!(!state.is_open(&DetailKey::section("a", DetailSection::Tags)));
    }

    #[test]
    fn toggling_twice_restores_state() {
        let mut state = DetailState::new();
        let key = DetailKey::section("a", DetailSection::Warnings);

        assert!(state.toggle(key.clone()));
        assert!(!state.toggle(key.clone()));
        assert!(!state.is_open(&key));
        assert!(state.open_keys().is_empty());
    }

    #[test]
    fn sub_items_are_independent() {
        let mut state = DetailState::new();
        state.toggle_logs("a");
        state.toggle_log_item("a", 0);
        state.toggle_log_item("a", 2);
        state.toggle_log_item("a", 0);

        assert!(state.is_open(&DetailKey::section("a", DetailSection::Logs)));
        assert!(!state.is_open(&DetailKey::item("a", DetailSection::Logs, 0)));
        assert!(state.is_open(&DetailKey::item("a", DetailSection::Logs, 2)));
        // Same index under another section is a different key
        assert!(!state.is_open(&DetailKey::item("a", DetailSection::References, 2)));
    }

    #[test]
    fn open_rows_lists_only_row_toggles() {
        let mut state = DetailState::new();
        state.toggle_row("a");
        state.toggle_tags("b");
        state.toggle_row("c");

        let rows = state.open_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.contains("a") && rows.contains("c"));
    }
}
