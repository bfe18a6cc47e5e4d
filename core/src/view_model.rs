use crate::config::{Config, ViewConfig};
use crate::critical_path::{CacheStats, CriticalPath, CriticalPathCache};
use crate::error::ViewRangeError;
use crate::focus::{
    self, Activation, FocusLink, FocusLinkResolver, InMemoryPanelStore, PaneId, PanelStateStore,
    QueryRef, SplitOpener,
};
use crate::settings::FrontendSettings;
use crate::span::SpanId;
use crate::state::{
    ChildrenState, DetailKey, DetailState, HoverIndentGuides, SearchState, ViewRange,
    ViewRangeTimeUpdate,
};
use crate::trace::Trace;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Everything the timeline needs to draw one frame, taken from a single state
#[derive(Debug, Clone, Serialize)]
pub struct RenderBundle {
    #[serde(skip)]
    pub trace: Arc<Trace>,
    pub trace_id: String,
    pub hidden_span_ids: HashSet<SpanId>,
    pub detail_states: HashSet<DetailKey>,
    pub hover_indent_guide_ids: HashSet<SpanId>,
    pub search_query: String,
    pub search_matches: HashSet<SpanId>,
    pub focused_span_id_for_search: Option<SpanId>,
    pub view_range: ViewRange,
    pub critical_path: Option<Arc<CriticalPath>>,
    pub focused_span_id: Option<SpanId>,
    /// Indices into `trace.spans` of the rows to draw, in order
    pub visible_rows: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "bundle", rename_all = "snake_case")]
pub enum RenderState {
    NoData,
    Ready(RenderBundle),
}

impl RenderState {
    pub fn bundle(&self) -> Option<&RenderBundle> {
        match self {
            RenderState::NoData => None,
            RenderState::Ready(bundle) => Some(bundle),
        }
    }
}

/// State of one trace view.
///
/// Owns every per-trace controller and hands out consistent snapshots. The
/// focused span is the exception: it lives in a pane store shared with the
/// embedding application and survives trace switches.
pub struct TraceViewModel {
    view: ViewConfig,
    trace: Option<Arc<Trace>>,
    children: ChildrenState,
    details: DetailState,
    hover: HoverIndentGuides,
    search: SearchState,
    view_range: ViewRange,
    critical_paths: CriticalPathCache,
    resolver: FocusLinkResolver,
    store: Arc<dyn PanelStateStore>,
    pane_id: PaneId,
    active_query: Option<QueryRef>,
}

impl TraceViewModel {
    pub fn new(config: &Config, settings: FrontendSettings, store: Arc<dyn PanelStateStore>) -> Self {
        Self {
            view: config.view.clone(),
            trace: None,
            children: ChildrenState::new(),
            details: DetailState::new(),
            hover: HoverIndentGuides::new(),
            search: SearchState::new(),
            view_range: ViewRange::new(),
            critical_paths: CriticalPathCache::new(config.critical_path.cache_capacity),
            resolver: FocusLinkResolver::from_config(&config.focus, settings),
            store,
            pane_id: config.focus.pane_id.clone(),
            active_query: None,
        }
    }

    /// View model with its own in-memory pane store
    pub fn standalone(config: &Config, settings: FrontendSettings) -> Self {
        Self::new(config, settings, Arc::new(InMemoryPanelStore::new()))
    }

    // ========================================================================
    // Trace lifecycle
    // ========================================================================

    pub fn trace(&self) -> Option<&Arc<Trace>> {
        self.trace.as_ref()
    }

    /// Display a trace, or nothing.
    ///
    /// A different trace id starts from fresh per-trace state. The same id with
    /// new data keeps what the user has folded and opened and only recomputes
    /// derived state.
    pub fn set_trace(&mut self, trace: Option<Arc<Trace>>) {
        let previous_id = self.trace.as_ref().map(|t| t.trace_id.clone());
        let next_id = trace.as_ref().map(|t| t.trace_id.clone());

        if previous_id == next_id {
            if let Some(previous) = &previous_id {
                tracing::debug!(trace_id = %previous, "trace refreshed");
            }
            self.trace = trace;
            self.search.refresh(self.trace.as_deref());
            return;
        }

        if let Some(previous) = &previous_id {
            self.critical_paths.invalidate(previous);
        }
        self.trace = trace;
        self.reset_per_trace_state();

        match &self.trace {
            Some(trace) => {
                tracing::info!(
                    trace_id = %trace.trace_id,
                    spans = trace.len(),
                    "displaying trace"
                );
                if self.view.collapse_on_load {
                    let roots = trace.root_ids();
                    self.children.collapse_all(trace, &roots);
                }
            }
            None => tracing::info!("no trace to display"),
        }
    }

    fn reset_per_trace_state(&mut self) {
        self.children = ChildrenState::new();
        self.details = DetailState::new();
        self.hover.clear();
        self.view_range.reset();
        // The query is user input and carries over; its matches do not
        let query = self.search.query().to_string();
        self.search.set_search(&query, self.trace.as_deref());
    }

    pub fn set_active_query(&mut self, query: Option<QueryRef>) {
        self.active_query = query;
    }

    pub fn active_query(&self) -> Option<&QueryRef> {
        self.active_query.as_ref()
    }

    // ========================================================================
    // Children visibility
    // ========================================================================

    pub fn collapse_one(&mut self, span_id: &str) {
        self.children.collapse_one(span_id);
    }

    pub fn expand_one(&mut self, span_id: &str) {
        self.children.expand_one(span_id);
    }

    pub fn toggle_children(&mut self, span_id: &str) {
        self.children.toggle(span_id);
    }

    pub fn collapse_all(&mut self, root_ids: &[SpanId]) {
        if let Some(trace) = &self.trace {
            self.children.collapse_all(trace, root_ids);
        }
    }

    /// Fold every root of the displayed trace
    pub fn collapse_all_roots(&mut self) {
        if let Some(trace) = &self.trace {
            let roots = trace.root_ids();
            self.children.collapse_all(trace, &roots);
        }
    }

    pub fn expand_all(&mut self) {
        self.children.expand_all();
    }

    pub fn collapse_level(&mut self) {
        if let Some(trace) = &self.trace {
            self.children.collapse_level(trace);
        }
    }

    pub fn expand_level(&mut self) {
        if let Some(trace) = &self.trace {
            self.children.expand_level(trace);
        }
    }

    pub fn children(&self) -> &ChildrenState {
        &self.children
    }

    // ========================================================================
    // Detail toggles
    // ========================================================================

    pub fn toggle_detail(&mut self, key: DetailKey) -> bool {
        self.details.toggle(key)
    }

    pub fn toggle_detail_row(&mut self, span_id: &str) -> bool {
        self.details.toggle_row(span_id)
    }

    pub fn toggle_logs(&mut self, span_id: &str) -> bool {
        self.details.toggle_logs(span_id)
    }

    pub fn toggle_log_item(&mut self, span_id: &str, log_index: usize) -> bool {
        self.details.toggle_log_item(span_id, log_index)
    }

    pub fn toggle_tags(&mut self, span_id: &str) -> bool {
        self.details.toggle_tags(span_id)
    }

    pub fn toggle_process(&mut self, span_id: &str) -> bool {
        self.details.toggle_process(span_id)
    }

    pub fn toggle_references(&mut self, span_id: &str) -> bool {
        self.details.toggle_references(span_id)
    }

    pub fn toggle_reference_item(&mut self, span_id: &str, reference_index: usize) -> bool {
        self.details.toggle_reference_item(span_id, reference_index)
    }

    pub fn toggle_stack_traces(&mut self, span_id: &str) -> bool {
        self.details.toggle_stack_traces(span_id)
    }

    pub fn toggle_warnings(&mut self, span_id: &str) -> bool {
        self.details.toggle_warnings(span_id)
    }

    pub fn details(&self) -> &DetailState {
        &self.details
    }

    // ========================================================================
    // Hover indent guides
    // ========================================================================

    pub fn add_hover_indent_guide_id(&mut self, span_id: &str) {
        self.hover.add_hover_indent_guide_id(span_id);
    }

    pub fn remove_hover_indent_guide_id(&mut self, span_id: &str) {
        self.hover.remove_hover_indent_guide_id(span_id);
    }

    // ========================================================================
    // Search
    // ========================================================================

    pub fn set_search(&mut self, query: &str) {
        self.search.set_search(query, self.trace.as_deref());
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn next_match(&mut self) -> Option<SpanId> {
        let trace = self.trace.as_ref()?;
        self.search.next_match(trace).map(str::to_string)
    }

    pub fn prev_match(&mut self) -> Option<SpanId> {
        let trace = self.trace.as_ref()?;
        self.search.prev_match(trace).map(str::to_string)
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    // ========================================================================
    // View range
    // ========================================================================

    pub fn update_view_range_time(
        &mut self,
        start: f64,
        end: f64,
        track_src: Option<&str>,
    ) -> Result<(), ViewRangeError> {
        self.view_range.update_view_range_time(start, end, track_src)
    }

    pub fn update_next_view_range_time(&mut self, update: ViewRangeTimeUpdate) {
        self.view_range.update_next_view_range_time(update);
    }

    pub fn discard_next_view_range(&mut self) {
        self.view_range.discard_next();
    }

    pub fn reset_view_range(&mut self) {
        self.view_range.reset();
    }

    pub fn zoom(&mut self, factor: f64) -> Result<(), ViewRangeError> {
        self.view_range.zoom(factor)
    }

    pub fn view_range(&self) -> &ViewRange {
        &self.view_range
    }

    // ========================================================================
    // Critical path
    // ========================================================================

    /// Critical path of the displayed trace, `None` when disabled or without a trace
    pub fn critical_path(&mut self) -> Option<Arc<CriticalPath>> {
        if !self.view.critical_path {
            return None;
        }
        let trace = self.trace.as_ref()?;
        Some(self.critical_paths.get(trace))
    }

    pub fn critical_path_stats(&self) -> CacheStats {
        self.critical_paths.stats()
    }

    // ========================================================================
    // Focus
    // ========================================================================

    pub fn pane_id(&self) -> &str {
        &self.pane_id
    }

    pub fn focused_span_id(&self) -> Option<SpanId> {
        self.store.focused_span_id(&self.pane_id)
    }

    pub fn resolve_focus_link(&self, trace_id: &str, span_id: &str) -> FocusLink {
        self.resolver.resolve(
            self.trace.as_ref().map(|t| t.trace_id.as_str()),
            self.active_query.as_ref(),
            trace_id,
            span_id,
        )
    }

    pub fn activate(&self, link: &FocusLink, opener: Option<&dyn SplitOpener>) -> Activation {
        focus::activate(link, self.store.as_ref(), &self.pane_id, opener)
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    pub fn snapshot(&mut self) -> RenderState {
        let Some(trace) = self.trace.clone() else {
            return RenderState::NoData;
        };
        let critical_path = self.critical_path();

        RenderState::Ready(RenderBundle {
            trace_id: trace.trace_id.clone(),
            hidden_span_ids: self.children.hidden_ids().clone(),
            detail_states: self.details.open_keys().clone(),
            hover_indent_guide_ids: self.hover.ids().clone(),
            search_query: self.search.query().to_string(),
            search_matches: self.search.matches().clone(),
            focused_span_id_for_search: self.search.focused_span_id().map(str::to_string),
            view_range: self.view_range,
            critical_path,
            focused_span_id: self.focused_span_id(),
            visible_rows: self.children.visible_rows(&trace),
            trace,
        })
    }
}
