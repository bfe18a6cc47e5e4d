use crate::span::SpanId;
use serde::{Deserialize, Serialize};

/// Identifier of an explore pane
pub type PaneId = String;

/// Trace panel state kept per pane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePanelState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<SpanId>,
}

/// Panel states of a pane, grouped by visualisation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelsState {
    pub trace: TracePanelState,
}

impl PanelsState {
    pub fn focusing(span_id: impl Into<SpanId>) -> Self {
        Self {
            trace: TracePanelState {
                span_id: Some(span_id.into()),
            },
        }
    }
}

/// Shared pane-level state outliving any single trace view.
/// Pluggable so the view model can run against an embedding application's store.
pub trait PanelStateStore: Send + Sync {
    // ========================================================================
    // Trace Panel Operations
    // ========================================================================

    /// Panel state of a pane, default when the pane has none yet
    fn trace_panel_state(&self, pane_id: &str) -> TracePanelState;

    /// Replace the trace panel state of a pane
    fn set_trace_panel_state(&self, pane_id: &str, state: TracePanelState);

    // ========================================================================
    // Convenience
    // ========================================================================

    /// Focused span of a pane
    fn focused_span_id(&self, pane_id: &str) -> Option<SpanId> {
        self.trace_panel_state(pane_id).span_id
    }

    fn set_focused_span_id(&self, pane_id: &str, span_id: Option<SpanId>) {
        self.set_trace_panel_state(pane_id, TracePanelState { span_id });
    }
}
