use crate::span::{RefType, Span, SpanId};
use crate::trace::Trace;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Portion of a span's time that lies on the critical path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalSection {
    pub span_id: SpanId,
    pub section_start: u64,
    pub section_end: u64,
}

/// Chain of spans that bounds the trace's end-to-end latency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    pub trace_id: String,
    /// Spans on the path in timeline order
    pub path: Vec<SpanId>,
    pub span_ids: HashSet<SpanId>,
    pub sections: Vec<CriticalSection>,
    pub total_duration_us: u64,
    pub trace_duration_us: u64,
    pub percentage_of_total: f64,
}

impl CriticalPath {
    pub fn contains(&self, span_id: &str) -> bool {
        self.span_ids.contains(span_id)
    }
}

/// Credit every microsecond of the trace either to a span's own work or to the
/// child it was waiting on at that moment.
///
/// Working backwards from a span's end, the child that finished last is the one
/// the span waited on. A sibling that finished exactly when that child started
/// gated it and joins the path too, and so on back in time. Once the chain
/// breaks, the remaining time is the span's own work.
///
/// Children linked with `FollowsFrom` are not waited on and are ignored.
/// Children are clipped to their parent's interval and dropped when they fall
/// entirely outside it. A child still running at the cursor overlaps the one
/// already chosen and is skipped. Ties on end time go to the later start, then
/// to the child that comes first in the timeline.
pub fn compute_critical_path(trace: &Trace) -> CriticalPath {
    let mut sections = Vec::new();
    let mut on_path = HashSet::new();

    // With several roots the one that finishes last bounds the trace
    let root = trace
        .roots()
        .fold(None, |best: Option<&Span>, span| match best {
            Some(b) if b.end_time() >= span.end_time() => Some(b),
            _ => Some(span),
        });
    if let Some(root) = root {
        walk(
            trace,
            root,
            (root.start_time, root.end_time()),
            &mut sections,
            &mut on_path,
        );
    }
    sections.sort_by_key(|s| s.section_start);

    let path: Vec<SpanId> = trace
        .spans
        .iter()
        .filter(|s| on_path.contains(&s.span_id))
        .map(|s| s.span_id.clone())
        .collect();

    let total_duration_us: u64 = sections
        .iter()
        .map(|s| s.section_end - s.section_start)
        .sum();
    let percentage_of_total = if trace.duration > 0 {
        (total_duration_us as f64 / trace.duration as f64) * 100.0
    } else {
        0.0
    };

    CriticalPath {
        trace_id: trace.trace_id.clone(),
        span_ids: on_path,
        path,
        sections,
        total_duration_us,
        trace_duration_us: trace.duration,
        percentage_of_total,
    }
}

fn walk(
    trace: &Trace,
    span: &Span,
    (start, end): (u64, u64),
    sections: &mut Vec<CriticalSection>,
    on_path: &mut HashSet<SpanId>,
) {
    on_path.insert(span.span_id.clone());

    let children = trace.children_with_ref(&span.span_id);
    let mut cursor = end;
    let mut chained = false;
    while cursor > start {
        let mut chosen: Option<(&Span, u64, u64)> = None;
        for &(child, ref_type) in &children {
            if ref_type == RefType::FollowsFrom {
                continue;
            }
            let child_start = child.start_time.max(start);
            let child_end = child.end_time().min(end);
            if child_start > child_end || child_start >= cursor || child_end > cursor {
                continue;
            }
            // Past the first pick only a sibling ending right at the cursor gated it
            if chained && child_end < cursor {
                continue;
            }
            let better = match chosen {
                None => true,
                Some((_, best_start, best_end)) => {
                    child_end > best_end || (child_end == best_end && child_start > best_start)
                }
            };
            if better {
                chosen = Some((child, child_start, child_end));
            }
        }

        let Some((child, child_start, child_end)) = chosen else {
            break;
        };
        push_section(sections, span, child_end, cursor);
        walk(trace, child, (child_start, child_end), sections, on_path);
        cursor = child_start;
        chained = true;
    }
    push_section(sections, span, start, cursor);
}

fn push_section(sections: &mut Vec<CriticalSection>, span: &Span, start: u64, end: u64) {
    if start < end {
        sections.push(CriticalSection {
            span_id: span.span_id.clone(),
            section_start: start,
            section_end: end,
        });
    }
}

struct CachedPath {
    trace: Arc<Trace>,
    path: Arc<CriticalPath>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Critical paths memoized per trace.
///
/// Entries are keyed by trace id and only reused while the caller hands in the
/// very same `Arc<Trace>`; a refreshed trace with the same id recomputes.
pub struct CriticalPathCache {
    entries: LruCache<String, CachedPath>,
    hits: u64,
    misses: u64,
}

impl CriticalPathCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, trace: &Arc<Trace>) -> Arc<CriticalPath> {
        if let Some(cached) = self.entries.get(&trace.trace_id) {
            if Arc::ptr_eq(&cached.trace, trace) {
                self.hits += 1;
                return Arc::clone(&cached.path);
            }
        }

        self.misses += 1;
        let path = Arc::new(compute_critical_path(trace));
        tracing::debug!(
            trace_id = %trace.trace_id,
            spans = path.path.len(),
            percentage = path.percentage_of_total,
            "computed critical path"
        );
        self.entries.put(
            trace.trace_id.clone(),
            CachedPath {
                trace: Arc::clone(trace),
                path: Arc::clone(&path),
            },
        );
        path
    }

    pub fn invalidate(&mut self, trace_id: &str) {
        self.entries.pop(trace_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

impl Default for CriticalPathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
