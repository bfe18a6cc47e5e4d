use crate::error::TraceError;
use crate::span::{Process, RefType, Span, SpanId};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Span count per service, in first-seen order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub span_count: usize,
}

/// A distributed trace with its spans in tree order.
///
/// Tree order means every parent precedes its children and siblings are sorted by
/// start time. Spans whose parent is not part of the trace are treated as roots.
/// Node `i` of the internal graph is `spans[i]`, and each edge runs from a parent
/// to a child, weighted with the reference type that links them.
#[derive(Debug, Clone)]
pub struct Trace {
    pub trace_id: String,
    pub spans: Vec<Span>,
    pub processes: HashMap<String, Process>,
    pub start_time: u64,
    pub end_time: u64,
    pub duration: u64,
    pub trace_name: String,
    pub services: Vec<ServiceSummary>,
    index: HashMap<SpanId, usize>,
    graph: DiGraph<usize, RefType>,
}

impl Trace {
    /// Build a trace from spans in any order
    pub fn build(
        trace_id: impl Into<String>,
        spans: Vec<Span>,
        processes: HashMap<String, Process>,
    ) -> Result<Self, TraceError> {
        let trace_id = trace_id.into();
        if spans.is_empty() {
            return Err(TraceError::EmptyTrace);
        }

        let mut by_id: HashMap<SpanId, usize> = HashMap::with_capacity(spans.len());
        for (idx, span) in spans.iter().enumerate() {
            if span.trace_id != trace_id {
                return Err(TraceError::TraceIdMismatch {
                    span_id: span.span_id.clone(),
                    expected: trace_id.clone(),
                    found: span.trace_id.clone(),
                });
            }
            if by_id.insert(span.span_id.clone(), idx).is_some() {
                return Err(TraceError::DuplicateSpan(span.span_id.clone()));
            }
        }

        // parent index -> child indices, roots collected separately
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (idx, span) in spans.iter().enumerate() {
            match span.parent_span_id.as_ref().and_then(|p| by_id.get(p)) {
                Some(&parent_idx) => children.entry(parent_idx).or_default().push(idx),
                None => {
                    if let Some(parent) = &span.parent_span_id {
                        tracing::warn!(
                            trace_id = %trace_id,
                            span_id = %span.span_id,
                            parent = %parent,
                            "parent span missing from trace, treating span as a root"
                        );
                    }
                    roots.push(idx);
                }
            }
        }

        let by_start = |a: &usize, b: &usize| {
            spans[*a]
                .start_time
                .cmp(&spans[*b].start_time)
                .then(a.cmp(b))
        };
        roots.sort_by(by_start);
        for list in children.values_mut() {
            list.sort_by(by_start);
        }

        // Pre-order walk; children pushed in reverse so the earliest pops first
        let mut order: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
        let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((idx, depth)) = stack.pop() {
            order.push((idx, depth));
            if let Some(kids) = children.get(&idx) {
                stack.extend(kids.iter().rev().map(|&k| (k, depth + 1)));
            }
        }

        if order.len() != spans.len() {
            let reached: HashSet<usize> = order.iter().map(|(idx, _)| *idx).collect();
            let stuck = spans
                .iter()
                .enumerate()
                .find(|(idx, _)| !reached.contains(idx))
                .map(|(_, span)| span.span_id.clone())
                .unwrap_or_default();
            return Err(TraceError::ParentCycle(stuck));
        }

        let start_time = spans.iter().map(|s| s.start_time).min().unwrap_or(0);
        let end_time = spans.iter().map(Span::end_time).max().unwrap_or(start_time);

        let ids: Vec<SpanId> = spans.iter().map(|s| s.span_id.clone()).collect();
        let mut slots: Vec<Option<Span>> = spans.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        for (idx, depth) in &order {
            let Some(mut span) = slots[*idx].take() else {
                continue;
            };
            let kids = children.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            span.depth = *depth;
            span.has_children = !kids.is_empty();
            span.child_span_ids = kids.iter().map(|k| ids[*k].clone()).collect();
            span.relative_start_time = span.start_time.saturating_sub(start_time);
            if span.parent_span_id.is_some() && *depth == 0 {
                // Dangling parent reference
                span.parent_span_id = None;
            }
            ordered.push(span);
        }

        let index: HashMap<SpanId, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, s)| (s.span_id.clone(), i))
            .collect();

        let mut graph = DiGraph::with_capacity(ordered.len(), ordered.len());
        for i in 0..ordered.len() {
            graph.add_node(i);
        }
        for (i, span) in ordered.iter().enumerate() {
            if let Some(parent_idx) = span.parent_span_id.as_ref().and_then(|p| index.get(p)) {
                let weight = span.parent_ref_type().unwrap_or(RefType::ChildOf);
                graph.add_edge(NodeIndex::new(*parent_idx), NodeIndex::new(i), weight);
            }
        }

        // Services in order of first appearance
        let span_counts = ordered.iter().map(|s| s.service_name.as_str()).counts();
        let services = ordered
            .iter()
            .map(|s| s.service_name.as_str())
            .unique()
            .map(|name| ServiceSummary {
                name: name.to_string(),
                span_count: span_counts.get(name).copied().unwrap_or(0),
            })
            .collect();

        let trace_name = ordered
            .first()
            .map(|root| format!("{}: {}", root.service_name, root.operation_name))
            .unwrap_or_default();

        tracing::debug!(
            trace_id = %trace_id,
            spans = ordered.len(),
            "built trace"
        );

        Ok(Self {
            trace_id,
            spans: ordered,
            processes,
            start_time,
            end_time,
            duration: end_time - start_time,
            trace_name,
            services,
            index,
            graph,
        })
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn span(&self, span_id: &str) -> Option<&Span> {
        self.index.get(span_id).map(|&i| &self.spans[i])
    }

    pub fn index_of(&self, span_id: &str) -> Option<usize> {
        self.index.get(span_id).copied()
    }

    pub fn contains(&self, span_id: &str) -> bool {
        self.index.contains_key(span_id)
    }

    /// Spans without a parent in this trace
    pub fn roots(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|s| s.depth == 0)
    }

    pub fn root_ids(&self) -> Vec<SpanId> {
        self.roots().map(|s| s.span_id.clone()).collect()
    }

    pub fn parent(&self, span: &Span) -> Option<&Span> {
        span.parent_span_id.as_deref().and_then(|p| self.span(p))
    }

    /// Direct children with the reference type that links each to `span_id`,
    /// in start-time order
    pub fn children_with_ref(&self, span_id: &str) -> Vec<(&Span, RefType)> {
        let Some(&idx) = self.index.get(span_id) else {
            return Vec::new();
        };
        let mut kids: Vec<(&Span, RefType)> = self
            .graph
            .edges(NodeIndex::new(idx))
            .map(|edge| (&self.spans[self.graph[edge.target()]], *edge.weight()))
            .collect();
        kids.sort_by_key(|(span, _)| self.index_of(&span.span_id).unwrap_or(usize::MAX));
        kids
    }

    /// Every span below `span_id`, excluding `span_id` itself
    pub fn descendants(&self, span_id: &str) -> Vec<&Span> {
        let Some(&idx) = self.index.get(span_id) else {
            return Vec::new();
        };
        let start = NodeIndex::new(idx);
        let mut dfs = Dfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                found.push(&self.spans[self.graph[node]]);
            }
        }
        found
    }

    /// True when `ancestor_id` lies on the parent chain of `span_id`
    pub fn is_ancestor(&self, ancestor_id: &str, span_id: &str) -> bool {
        let mut current = self.span(span_id).and_then(|s| self.parent(s));
        while let Some(span) = current {
            if span.span_id == ancestor_id {
                return true;
            }
            current = self.parent(span);
        }
        false
    }

    pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.start_time as i64)
    }
}
