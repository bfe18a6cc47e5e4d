//! Small independent state containers composed by [`crate::TraceViewModel`].

pub mod children;
pub mod detail;
pub mod hover;
pub mod search;
pub mod view_range;

pub use children::ChildrenState;
pub use detail::{DetailKey, DetailSection, DetailState};
pub use hover::HoverIndentGuides;
pub use search::{filter_spans, SearchState};
pub use view_range::{Reframe, ViewRange, ViewRangeTimeUpdate};
