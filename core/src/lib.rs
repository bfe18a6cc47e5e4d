pub mod config;
pub mod critical_path;
pub mod error;
pub mod focus;
pub mod ingest;
pub mod settings;
pub mod span;
pub mod state;
pub mod trace;
pub mod view_model;

pub use config::Config;
pub use critical_path::{compute_critical_path, CriticalPath, CriticalPathCache, CriticalSection};
pub use error::{TraceError, ViewRangeError};
pub use focus::{
    Activation, FocusAction, FocusLink, FocusLinkResolver, FocusPolicy, InMemoryPanelStore,
    LinkDescriptor, PanelStateStore, QueryRef, SplitOpenRequest, SplitOpener,
};
pub use settings::FrontendSettings;
pub use span::{KeyValue, LogEvent, Process, RefType, Span, SpanId, SpanReference};
pub use trace::Trace;
pub use view_model::{RenderBundle, RenderState, TraceViewModel};
