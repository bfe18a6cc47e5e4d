use spanview_core::{Config, FrontendSettings, InMemoryPanelStore, RenderBundle, TraceViewModel};
use std::sync::Arc;

/// A view model wired to a pane store the test can inspect
pub struct TestView {
    pub model: TraceViewModel,
    pub store: Arc<InMemoryPanelStore>,
}

impl TestView {
    pub fn new(config: Config) -> Self {
        Self::with_settings(config, FrontendSettings::default())
    }

    pub fn with_settings(config: Config, settings: FrontendSettings) -> Self {
        let store = Arc::new(InMemoryPanelStore::new());
        let model = TraceViewModel::new(&config, settings, store.clone());
        Self { model, store }
    }

    pub fn bundle(&mut self) -> Option<RenderBundle> {
        self.model.snapshot().bundle().cloned()
    }

    /// Span ids of the visible rows, in order
    pub fn visible_ids(&mut self) -> Vec<String> {
        self.bundle()
            .map(|b| {
                b.visible_rows
                    .iter()
                    .map(|&i| b.trace.spans[i].span_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
