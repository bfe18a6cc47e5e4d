//! Links from a span reference to the span itself: either a focus toggle in
//! the current view or a split view opened on the referenced trace.

pub mod memory;
pub mod store;

pub use memory::InMemoryPanelStore;
pub use store::{PaneId, PanelStateStore, PanelsState, TracePanelState};

use crate::config::FocusConfig;
use crate::settings::FrontendSettings;
use crate::span::SpanId;
use anyhow::Result;
use serde::{Deserialize, Serialize};

const LINK_TITLE: &str = "Deep link to this span";

/// Query currently driving a pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRef {
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    pub query: String,
}

impl QueryRef {
    pub fn new(query_type: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            ref_id: "A".to_string(),
            query_type: Some(query_type.into()),
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRef {
    pub uid: String,
    pub name: String,
}

impl DataSourceRef {
    /// Both halves must be configured for a datasource to exist
    pub fn from_config(config: &FocusConfig) -> Option<Self> {
        match (&config.datasource_uid, &config.datasource_name) {
            (Some(uid), name) => Some(Self {
                uid: uid.clone(),
                name: name.clone().unwrap_or_default(),
            }),
            (None, _) => None,
        }
    }
}

/// Which query types make a link back to the displayed trace a focus toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusPolicy {
    same_trace_query_types: Vec<String>,
}

impl FocusPolicy {
    pub fn new<I, S>(query_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            same_trace_query_types: query_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn query_types(&self) -> &[String] {
        &self.same_trace_query_types
    }

    /// Query type used when a link has to build a fresh query
    fn lookup_query_type(&self) -> &str {
        self.same_trace_query_types
            .first()
            .map(String::as_str)
            .unwrap_or("traceql")
    }

    pub fn is_same_trace(
        &self,
        displayed_trace_id: Option<&str>,
        active_query: Option<&QueryRef>,
        trace_id: &str,
    ) -> bool {
        let Some(displayed) = displayed_trace_id else {
            return false;
        };
        let Some(query) = active_query else {
            return false;
        };
        let type_matches = query
            .query_type
            .as_deref()
            .is_some_and(|t| self.same_trace_query_types.iter().any(|s| s == t));

        displayed == trace_id && type_matches && query.query == trace_id
    }
}

impl Default for FocusPolicy {
    fn default() -> Self {
        Self::new(["traceql"])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalLink {
    pub datasource_uid: String,
    pub datasource_name: String,
    pub query: QueryRef,
    pub panels_state: PanelsState,
}

/// What a link renderer needs to draw and open the link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub title: String,
    pub url: String,
    pub internal: InternalLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOpenRequest {
    pub datasource_uid: String,
    pub query: QueryRef,
    pub panels_state: PanelsState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum FocusAction {
    /// Focus the span in the current pane, or unfocus it if already focused
    ToggleFocus(SpanId),
    SplitOpen(SplitOpenRequest),
    /// Inert link
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusLink {
    pub descriptor: LinkDescriptor,
    pub action: FocusAction,
}

/// Outcome of activating a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Focus after the toggle
    Focused(Option<SpanId>),
    SplitOpened,
    SplitFailed,
    Inert,
}

/// Receives split-view requests; implemented by whatever hosts the panes
pub trait SplitOpener {
    fn split_open(&self, request: &SplitOpenRequest) -> Result<()>;
}

pub struct FocusLinkResolver {
    policy: FocusPolicy,
    datasource: Option<DataSourceRef>,
    settings: FrontendSettings,
}

impl FocusLinkResolver {
    pub fn new(
        policy: FocusPolicy,
        datasource: Option<DataSourceRef>,
        settings: FrontendSettings,
    ) -> Self {
        Self {
            policy,
            datasource,
            settings,
        }
    }

    pub fn from_config(config: &FocusConfig, settings: FrontendSettings) -> Self {
        Self::new(
            FocusPolicy::new(config.same_trace_query_types.iter().cloned()),
            DataSourceRef::from_config(config),
            settings,
        )
    }

    pub fn policy(&self) -> &FocusPolicy {
        &self.policy
    }

    pub fn resolve(
        &self,
        displayed_trace_id: Option<&str>,
        active_query: Option<&QueryRef>,
        trace_id: &str,
        span_id: &str,
    ) -> FocusLink {
        let same_trace = self
            .policy
            .is_same_trace(displayed_trace_id, active_query, trace_id);

        let query = match active_query {
            Some(active) if same_trace => active.clone(),
            _ => QueryRef::new(self.policy.lookup_query_type(), trace_id),
        };
        let panels_state = PanelsState::focusing(span_id);
        let (datasource_uid, datasource_name) = self
            .datasource
            .as_ref()
            .map(|ds| (ds.uid.clone(), ds.name.clone()))
            .unwrap_or_default();

        let action = if same_trace {
            FocusAction::ToggleFocus(span_id.to_string())
        } else if !self.settings.explore_enabled {
            FocusAction::None
        } else {
            FocusAction::SplitOpen(SplitOpenRequest {
                datasource_uid: datasource_uid.clone(),
                query: query.clone(),
                panels_state: panels_state.clone(),
            })
        };

        let url = self.explore_url(&datasource_uid, &query, &panels_state);
        tracing::debug!(trace_id, span_id, same_trace, "resolved focus link");

        FocusLink {
            descriptor: LinkDescriptor {
                title: LINK_TITLE.to_string(),
                url,
                internal: InternalLink {
                    datasource_uid,
                    datasource_name,
                    query,
                    panels_state,
                },
            },
            action,
        }
    }

    fn explore_url(&self, datasource_uid: &str, query: &QueryRef, panels: &PanelsState) -> String {
        let pane = serde_json::json!({
            "datasource": datasource_uid,
            "queries": [query],
            "panelsState": panels,
        });
        format!(
            "{}/explore?left={}",
            self.settings.link_prefix(),
            urlencoding::encode(&pane.to_string())
        )
    }
}

/// Focus `span_id` in a pane, or clear the focus when it is already focused.
/// Returns the focus after the toggle.
pub fn toggle_focus(store: &dyn PanelStateStore, pane_id: &str, span_id: &str) -> Option<SpanId> {
    let next = match store.focused_span_id(pane_id) {
        Some(current) if current == span_id => None,
        _ => Some(span_id.to_string()),
    };
    store.set_focused_span_id(pane_id, next.clone());
    next
}

/// Carry out a link's action
pub fn activate(
    link: &FocusLink,
    store: &dyn PanelStateStore,
    pane_id: &str,
    opener: Option<&dyn SplitOpener>,
) -> Activation {
    match &link.action {
        FocusAction::ToggleFocus(span_id) => {
            Activation::Focused(toggle_focus(store, pane_id, span_id))
        }
        FocusAction::SplitOpen(request) => {
            let Some(opener) = opener else {
                tracing::warn!(query = %request.query.query, "no split opener available");
                return Activation::SplitFailed;
            };
            match opener.split_open(request) {
                Ok(()) => Activation::SplitOpened,
                Err(e) => {
                    tracing::warn!(query = %request.query.query, "split open failed: {}", e);
                    Activation::SplitFailed
                }
            }
        }
        FocusAction::None => Activation::Inert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingOpener {
        requests: RefCell<Vec<SplitOpenRequest>>,
        fail: bool,
    }

    impl SplitOpener for RecordingOpener {
        fn split_open(&self, request: &SplitOpenRequest) -> Result<()> {
            if self.fail {
                anyhow::bail!("pane limit reached");
            }
            self.requests.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    fn resolver() -> FocusLinkResolver {
        FocusLinkResolver::new(
            FocusPolicy::default(),
            Some(DataSourceRef {
                uid: "tempo-1".into(),
                name: "Tempo".into(),
            }),
            FrontendSettings {
                app_sub_url: "/grafana/".into(),
                ..FrontendSettings::default()
            },
        )
    }

    #[test]
    fn same_trace_traceql_query_toggles_focus() {
        let query = QueryRef::new("traceql", "t1");
        let link = resolver().resolve(Some("t1"), Some(&query), "t1", "s1");
        assert_eq!(link.action, FocusAction::ToggleFocus("s1".into()));
        assert_eq!(link.descriptor.internal.query, query);
    }

    #[test]
    fn other_trace_or_query_opens_split() {
        let r = resolver();
        let query = QueryRef::new("traceql", "t1");

        let link = r.resolve(Some("t1"), Some(&query), "t2", "s9");
        match &link.action {
            FocusAction::SplitOpen(req) => {
                assert_eq!(req.query.query, "t2");
                assert_eq!(req.datasource_uid, "tempo-1");
                assert_eq!(req.panels_state.trace.span_id.as_deref(), Some("s9"));
            }
            other => panic!("expected split open, got {:?}", other),
        }

        let search = QueryRef::new("search", "t1");
        let link = r.resolve(Some("t1"), Some(&search), "t1", "s1");
        assert!(matches!(link.action, FocusAction::SplitOpen(_)));

        let link = r.resolve(Some("t1"), None, "t1", "s1");
        assert!(matches!(link.action, FocusAction::SplitOpen(_)));
    }

    #[test]
    fn policy_accepts_extra_query_types() {
        let policy = FocusPolicy::new(["traceql", "traceId"]);
        let query = QueryRef::new("traceId", "t1");
        assert!(policy.is_same_trace(Some("t1"), Some(&query), "t1"));
        assert!(!FocusPolicy::default().is_same_trace(Some("t1"), Some(&query), "t1"));
    }

    #[test]
    fn url_points_at_explore_under_sub_url() {
        let link = resolver().resolve(None, None, "t2", "s9");
        let url = &link.descriptor.url;
        assert!(url.starts_with("/grafana/explore?left="));
        let encoded = url.trim_start_matches("/grafana/explore?left=");
        let decoded = urlencoding::decode(encoded).unwrap();
        let pane: serde_json::Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(pane["datasource"], "tempo-1");
        assert_eq!(pane["queries"][0]["query"], "t2");
        assert_eq!(pane["panelsState"]["trace"]["spanId"], "s9");
    }

    #[test]
    fn missing_datasource_leaves_identity_empty() {
        let r = FocusLinkResolver::new(FocusPolicy::default(), None, FrontendSettings::default());
        let link = r.resolve(None, None, "t2", "s9");
        assert_eq!(link.descriptor.internal.datasource_uid, "");
        assert_eq!(link.descriptor.internal.datasource_name, "");
        assert!(matches!(link.action, FocusAction::SplitOpen(_)));
    }

    #[test]
    fn explore_disabled_makes_split_links_inert() {
        let settings = FrontendSettings {
            explore_enabled: false,
            ..FrontendSettings::default()
        };
        let r = FocusLinkResolver::new(FocusPolicy::default(), None, settings);
        let link = r.resolve(Some("t1"), None, "t2", "s9");
        assert_eq!(link.action, FocusAction::None);
        assert!(!link.descriptor.url.is_empty());

        let store = InMemoryPanelStore::new();
        assert_eq!(activate(&link, &store, "left", None), Activation::Inert);
    }

    #[test]
    fn toggling_twice_clears_focus() {
        let store = InMemoryPanelStore::new();
        assert_eq!(toggle_focus(&store, "left", "a"), Some("a".into()));
        assert_eq!(toggle_focus(&store, "left", "a"), None);
        assert_eq!(store.focused_span_id("left"), None);
    }

    #[test]
    fn toggling_different_spans_keeps_last() {
        let store = InMemoryPanelStore::new();
        toggle_focus(&store, "left", "a");
        toggle_focus(&store, "left", "b");
        assert_eq!(store.focused_span_id("left").as_deref(), Some("b"));
    }

    #[test]
    fn split_failures_leave_focus_untouched() {
        let store = InMemoryPanelStore::new();
        store.set_focused_span_id("left", Some("a".into()));
        let link = resolver().resolve(Some("t1"), None, "t2", "s9");

        let failing = RecordingOpener {
            requests: RefCell::new(Vec::new()),
            fail: true,
        };
        assert_eq!(
            activate(&link, &store, "left", Some(&failing)),
            Activation::SplitFailed
        );
        assert_eq!(store.focused_span_id("left").as_deref(), Some("a"));

        let opener = RecordingOpener {
            requests: RefCell::new(Vec::new()),
            fail: false,
        };
        assert_eq!(
            activate(&link, &store, "left", Some(&opener)),
            Activation::SplitOpened
        );
        assert_eq!(opener.requests.borrow().len(), 1);
    }
}
