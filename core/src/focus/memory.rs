use super::store::{PaneId, PanelStateStore, TracePanelState};
use dashmap::DashMap;

/// In-memory pane store backed by a DashMap, shareable through an `Arc`
#[derive(Debug, Default)]
pub struct InMemoryPanelStore {
    panes: DashMap<PaneId, TracePanelState>,
}

impl InMemoryPanelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    pub fn remove_pane(&self, pane_id: &str) {
        self.panes.remove(pane_id);
    }
}

impl PanelStateStore for InMemoryPanelStore {
    fn trace_panel_state(&self, pane_id: &str) -> TracePanelState {
        self.panes
            .get(pane_id)
            .map(|state| state.value().clone())
            .unwrap_or_default()
    }

    fn set_trace_panel_state(&self, pane_id: &str, state: TracePanelState) {
        tracing::debug!(pane = pane_id, span_id = ?state.span_id, "pane focus updated");
        self.panes.insert(pane_id.to_string(), state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unknown_pane_has_no_focus() {
        let store = InMemoryPanelStore::new();
        assert_eq!(store.focused_span_id("left"), None);
        assert_eq!(store.pane_count(), 0);
    }

    #[test]
    fn panes_are_independent() {
        let store = Arc::new(InMemoryPanelStore::new());
        store.set_focused_span_id("left", Some("a".into()));
        store.set_focused_span_id("right", Some("b".into()));

        let shared = Arc::clone(&store);
        assert_eq!(shared.focused_span_id("left").as_deref(), Some("a"));
        assert_eq!(shared.focused_span_id("right").as_deref(), Some("b"));

        store.remove_pane("left");
        assert_eq!(store.focused_span_id("left"), None);
        assert_eq!(store.pane_count(), 1);
    }
}
