use crate::span::SpanId;
use crate::trace::Trace;
use std::collections::HashSet;

/// Which subtrees of the timeline are folded.
///
/// A span in the hidden set keeps its own row but hides every row below it.
#[derive(Debug, Clone, Default)]
pub struct ChildrenState {
    hidden: HashSet<SpanId>,
}

impl ChildrenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hidden_ids(&self) -> &HashSet<SpanId> {
        &self.hidden
    }

    pub fn is_collapsed(&self, span_id: &str) -> bool {
        self.hidden.contains(span_id)
    }

    pub fn collapse_one(&mut self, span_id: &str) {
        if self.hidden.insert(span_id.to_string()) {
            tracing::debug!(span_id, "collapsed span");
        }
    }

    pub fn expand_one(&mut self, span_id: &str) {
        if self.hidden.remove(span_id) {
            tracing::debug!(span_id, "expanded span");
        }
    }

    pub fn toggle(&mut self, span_id: &str) {
        if self.is_collapsed(span_id) {
            self.expand_one(span_id);
        } else {
            self.collapse_one(span_id);
        }
    }

    /// Replace the hidden set with `root_ids` and everything below them
    pub fn collapse_all(&mut self, trace: &Trace, root_ids: &[SpanId]) {
        let mut hidden = HashSet::new();
        for root in root_ids {
            if !trace.contains(root) {
                continue;
            }
            hidden.insert(root.clone());
            hidden.extend(trace.descendants(root).into_iter().map(|s| s.span_id.clone()));
        }
        tracing::debug!(hidden = hidden.len(), "collapsed all");
        self.hidden = hidden;
    }

    pub fn expand_all(&mut self) {
        self.hidden.clear();
    }

    /// Fold one more level: on every branch, the deepest parent that is still open
    /// gets folded. Does nothing once every parent is folded.
    pub fn collapse_level(&mut self, trace: &Trace) {
        if self.all_parents_folded(trace) {
            return;
        }

        let mut next = self.hidden.clone();
        let mut nearest_open_parent: Option<(usize, &str)> = None;
        for span in &trace.spans {
            match nearest_open_parent {
                Some((depth, id)) if span.depth <= depth => {
                    next.insert(id.to_string());
                    nearest_open_parent = span
                        .has_children
                        .then_some((span.depth, span.span_id.as_str()));
                }
                _ => {
                    if span.has_children && !next.contains(&span.span_id) {
                        nearest_open_parent = Some((span.depth, span.span_id.as_str()));
                    }
                }
            }
        }
        if let Some((_, id)) = nearest_open_parent {
            next.insert(id.to_string());
        }
        self.hidden = next;
    }

    /// Unfold one level: on every branch, the shallowest folded span opens
    pub fn expand_level(&mut self, trace: &Trace) {
        if self.hidden.is_empty() {
            return;
        }

        let mut next = self.hidden.clone();
        let mut expanded_depth: Option<usize> = None;
        for span in &trace.spans {
            let may_expand = match expanded_depth {
                Some(depth) => span.depth <= depth,
                None => true,
            };
            if may_expand && next.remove(&span.span_id) {
                expanded_depth = Some(span.depth);
            } else if may_expand {
                expanded_depth = None;
            }
        }
        self.hidden = next;
    }

    /// Indices into `trace.spans` of rows not folded away under an ancestor
    pub fn visible_rows(&self, trace: &Trace) -> Vec<usize> {
        let mut rows = Vec::with_capacity(trace.len());
        let mut folded_at: Option<usize> = None;
        for (idx, span) in trace.spans.iter().enumerate() {
            if let Some(depth) = folded_at {
                if span.depth > depth {
                    continue;
                }
                folded_at = None;
            }
            rows.push(idx);
            if self.hidden.contains(&span.span_id) {
                folded_at = Some(span.depth);
            }
        }
        rows
    }

    fn all_parents_folded(&self, trace: &Trace) -> bool {
        trace
            .spans
            .iter()
            .filter(|s| s.has_children)
            .all(|s| self.hidden.contains(&s.span_id))
    }
}
