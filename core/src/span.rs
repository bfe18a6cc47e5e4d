use serde::{Deserialize, Serialize};

pub type SpanId = String;

/// How a span relates to the span it references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefType {
    ChildOf,
    FollowsFrom,
}

/// A reference from one span to another, possibly in a different trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanReference {
    pub ref_type: RefType,
    pub trace_id: String,
    pub span_id: SpanId,
}

/// A tag, process tag or log field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: serde_json::Value,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Value rendered the way it is displayed and searched
    pub fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A timestamped log entry attached to a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: u64,
    pub fields: Vec<KeyValue>,
}

/// The process (service instance) that emitted a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub service_name: String,
    pub tags: Vec<KeyValue>,
}

/// One timed operation within a trace.
///
/// Times are microseconds since the Unix epoch. The fields after `stack_traces`
/// are derived when the owning [`crate::Trace`] is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub span_id: SpanId,
    pub trace_id: String,
    pub parent_span_id: Option<SpanId>,
    pub operation_name: String,
    pub process_id: String,
    pub service_name: String,
    pub start_time: u64,
    pub duration: u64,
    pub tags: Vec<KeyValue>,
    pub process_tags: Vec<KeyValue>,
    pub logs: Vec<LogEvent>,
    pub references: Vec<SpanReference>,
    pub warnings: Vec<String>,
    pub stack_traces: Vec<String>,

    pub depth: usize,
    pub has_children: bool,
    pub child_span_ids: Vec<SpanId>,
    pub relative_start_time: u64,
}

impl Span {
    pub fn new(
        span_id: impl Into<SpanId>,
        trace_id: impl Into<String>,
        operation_name: impl Into<String>,
        start_time: u64,
        duration: u64,
    ) -> Self {
        Self {
            span_id: span_id.into(),
            trace_id: trace_id.into(),
            parent_span_id: None,
            operation_name: operation_name.into(),
            process_id: String::new(),
            service_name: String::from("unknown"),
            start_time,
            duration,
            tags: Vec::new(),
            process_tags: Vec::new(),
            logs: Vec::new(),
            references: Vec::new(),
            warnings: Vec::new(),
            stack_traces: Vec::new(),
            depth: 0,
            has_children: false,
            child_span_ids: Vec::new(),
            relative_start_time: 0,
        }
    }

    /// Attach this span to `parent_id` with a `ChildOf` reference
    pub fn with_parent(mut self, parent_id: impl Into<SpanId>) -> Self {
        let parent_id = parent_id.into();
        self.references.insert(
            0,
            SpanReference {
                ref_type: RefType::ChildOf,
                trace_id: self.trace_id.clone(),
                span_id: parent_id.clone(),
            },
        );
        self.parent_span_id = Some(parent_id);
        self
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.tags.push(KeyValue::new(key, value));
        self
    }

    pub fn with_log(mut self, timestamp: u64, fields: Vec<KeyValue>) -> Self {
        self.logs.push(LogEvent { timestamp, fields });
        self
    }

    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }

    /// Reference type linking this span to its parent, if it has one
    pub fn parent_ref_type(&self) -> Option<RefType> {
        let parent = self.parent_span_id.as_ref()?;
        self.references
            .iter()
            .find(|r| &r.span_id == parent)
            .map(|r| r.ref_type)
            .or(Some(RefType::ChildOf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_parent_records_child_of_reference() {
        let span = Span::new("b", "t1", "GET /users", 10, 5).with_parent("a");
        assert_eq!(span.parent_span_id.as_deref(), Some("a"));
        assert_eq!(span.parent_ref_type(), Some(RefType::ChildOf));
        assert_eq!(span.end_time(), 15);
    }

    #[test]
    fn value_string_unquotes_strings() {
        assert_eq!(KeyValue::new("http.method", "GET").value_string(), "GET");
        assert_eq!(KeyValue::new("http.status", 200).value_string(), "200");
        assert_eq!(KeyValue::new("error", true).value_string(), "true");
    }
}
