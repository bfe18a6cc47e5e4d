use crate::span::{KeyValue, Span, SpanId};
use crate::trace::Trace;
use std::collections::HashSet;

/// Span ids matching a free-text query.
///
/// The query is split on whitespace. Tokens prefixed with `-` name tag keys that
/// are skipped during key/value matching; every other token is an include
/// filter. A span matches when any include filter is a case-insensitive
/// substring of its operation name, service name, a tag, a log field or a
/// process tag, or equals its span id. A blank query matches nothing.
pub fn filter_spans(query: &str, trace: &Trace) -> HashSet<SpanId> {
    let mut include: Vec<String> = Vec::new();
    let mut exclude_keys: Vec<String> = Vec::new();
    for token in query.split_whitespace() {
        match token.strip_prefix('-') {
            Some(key) if !key.is_empty() => exclude_keys.push(key.to_lowercase()),
            _ => include.push(token.to_lowercase()),
        }
    }
    if include.is_empty() {
        return HashSet::new();
    }

    trace
        .spans
        .iter()
        .filter(|span| span_matches(span, &include, &exclude_keys))
        .map(|span| span.span_id.clone())
        .collect()
}

fn text_matches(filters: &[String], text: &str) -> bool {
    let text = text.to_lowercase();
    filters.iter().any(|f| text.contains(f.as_str()))
}

fn key_values_match(filters: &[String], exclude_keys: &[String], kvs: &[KeyValue]) -> bool {
    kvs.iter().any(|kv| {
        if exclude_keys.iter().any(|k| *k == kv.key.to_lowercase()) {
            return false;
        }
        text_matches(filters, &kv.key) || text_matches(filters, &kv.value_string())
    })
}

fn span_matches(span: &Span, include: &[String], exclude_keys: &[String]) -> bool {
    text_matches(include, &span.operation_name)
        || text_matches(include, &span.service_name)
        || key_values_match(include, exclude_keys, &span.tags)
        || span
            .logs
            .iter()
            .any(|log| key_values_match(include, exclude_keys, &log.fields))
        || key_values_match(include, exclude_keys, &span.process_tags)
        || include
            .iter()
            .any(|f| f.eq_ignore_ascii_case(&span.span_id))
}

/// Query plus its derived matches and a cursor for stepping through them
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    query: String,
    matches: HashSet<SpanId>,
    focused: Option<SpanId>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &HashSet<SpanId> {
        &self.matches
    }

    /// Match the cursor currently sits on
    pub fn focused_span_id(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    pub fn set_search(&mut self, query: &str, trace: Option<&Trace>) {
        self.query = query.to_string();
        self.focused = None;
        self.refresh(trace);
    }

    /// Recompute matches against the given trace
    pub fn refresh(&mut self, trace: Option<&Trace>) {
        self.matches = match trace {
            Some(trace) => filter_spans(&self.query, trace),
            None => HashSet::new(),
        };
        if let Some(focused) = &self.focused {
            if !self.matches.contains(focused) {
                self.focused = None;
            }
        }
        tracing::debug!(query = %self.query, matches = self.matches.len(), "search updated");
    }

    /// Matches in timeline order
    pub fn ordered_matches<'a>(&self, trace: &'a Trace) -> Vec<&'a SpanId> {
        trace
            .spans
            .iter()
            .filter(|s| self.matches.contains(&s.span_id))
            .map(|s| &s.span_id)
            .collect()
    }

    pub fn next_match(&mut self, trace: &Trace) -> Option<&str> {
        self.step(trace, 1)
    }

    pub fn prev_match(&mut self, trace: &Trace) -> Option<&str> {
        self.step(trace, -1)
    }

    fn step(&mut self, trace: &Trace, delta: isize) -> Option<&str> {
        let ordered = self.ordered_matches(trace);
        if ordered.is_empty() {
            self.focused = None;
            return None;
        }
        let len = ordered.len() as isize;
        let next = match self
            .focused
            .as_ref()
            .and_then(|f| ordered.iter().position(|id| *id == f))
        {
            Some(pos) => (pos as isize + delta).rem_euclid(len),
            None if delta >= 0 => 0,
            None => len - 1,
        };
        self.focused = Some(ordered[next as usize].clone());
        self.focused.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::KeyValue;
    use std::collections::HashMap;

    fn trace() -> Trace {
        Trace::build(
            "t1",
            vec![
                Span::new("aaa1", "t1", "HTTP GET /checkout", 0, 100)
                    .with_service("frontend")
                    .with_tag("http.status_code", 500),
                Span::new("bbb2", "t1", "charge", 10, 50)
                    .with_parent("aaa1")
                    .with_service("payments")
                    .with_tag("error", true),
                Span::new("ccc3", "t1", "SELECT orders", 20, 10)
                    .with_parent("aaa1")
                    .with_service("orders-db")
                    .with_log(25, vec![KeyValue::new("event", "Slow Query")]),
            ],
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn empty_query_matches_nothing() {
        let trace = trace();
        assert!(filter_spans("", &trace).is_empty());
        assert!(filter_spans("   ", &trace).is_empty());
    }

    #[test]
    fn matches_are_case_insensitive_substrings() {
        let trace = trace();
        let hits = filter_spans("CHECKOUT", &trace);
        assert_eq!(hits, HashSet::from(["aaa1".to_string()]));

        let hits = filter_spans("slow", &trace);
        assert_eq!(hits, HashSet::from(["ccc3".to_string()]));

        let hits = filter_spans("payments orders", &trace);
        assert_eq!(hits.len(), 2);

        let hits = filter_spans("bbb2", &trace);
        assert!(hits.contains("bbb2"));
    }

    #[test]
    fn excluded_keys_are_skipped() {
        let trace = trace();
        assert!(filter_spans("error", &trace).contains("bbb2"));
        assert!(filter_spans("error -error", &trace).is_empty());
    }

    #[test]
    fn cursor_cycles_in_timeline_order() {
        let trace = trace();
        let mut search = SearchState::new();
        search.set_search("o", Some(&trace));
        assert_eq!(search.matches().len(), 3);

        assert_eq!(search.next_match(&trace), Some("aaa1"));
        assert_eq!(search.next_match(&trace), Some("bbb2"));
        assert_eq!(search.next_match(&trace), Some("ccc3"));
        assert_eq!(search.next_match(&trace), Some("aaa1"));
        assert_eq!(search.prev_match(&trace), Some("ccc3"));

        search.set_search("charge", Some(&trace));
        assert_eq!(search.focused_span_id(), None);
        assert_eq!(search.prev_match(&trace), Some("bbb2"));
    }

    #[test]
    fn refresh_without_trace_empties_matches() {
        let trace = trace();
        let mut search = SearchState::new();
        search.set_search("charge", Some(&trace));
        search.refresh(None);
        assert!(search.matches().is_empty());
        assert_eq!(search.query(), "charge");
    }
}
