//! Conversion of Jaeger query-API documents into [`Trace`]s.
//!
//! Accepts either the API envelope `{"data": [trace, ...]}` or a bare trace object
//! `{"traceID", "spans", "processes"}`.

use crate::error::TraceError;
use crate::span::{KeyValue, LogEvent, Process, RefType, Span, SpanReference};
use crate::trace::Trace;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JaegerDocument {
    Envelope { data: Vec<JaegerTrace> },
    Single(JaegerTrace),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JaegerTrace {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    pub spans: Vec<JaegerSpan>,
    #[serde(default)]
    pub processes: HashMap<String, JaegerProcess>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JaegerSpan {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "spanID")]
    pub span_id: String,
    pub operation_name: String,
    #[serde(default)]
    pub references: Vec<JaegerReference>,
    pub start_time: u64,
    pub duration: u64,
    #[serde(default)]
    pub tags: Vec<JaegerKeyValue>,
    #[serde(default)]
    pub logs: Vec<JaegerLog>,
    #[serde(rename = "processID", default)]
    pub process_id: String,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub stack_traces: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JaegerReference {
    pub ref_type: String,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "spanID")]
    pub span_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JaegerKeyValue {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct JaegerLog {
    pub timestamp: u64,
    #[serde(default)]
    pub fields: Vec<JaegerKeyValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JaegerProcess {
    pub service_name: String,
    #[serde(default)]
    pub tags: Vec<JaegerKeyValue>,
}

impl From<JaegerKeyValue> for KeyValue {
    fn from(kv: JaegerKeyValue) -> Self {
        KeyValue {
            key: kv.key,
            value: kv.value,
        }
    }
}

fn parse_ref_type(raw: &str) -> RefType {
    match raw.to_ascii_uppercase().as_str() {
        "FOLLOWS_FROM" => RefType::FollowsFrom,
        _ => RefType::ChildOf,
    }
}

/// Parse every trace contained in a JSON document
pub fn traces_from_json(json: &str) -> Result<Vec<Trace>, TraceError> {
    raw_traces(json)?.into_iter().map(from_jaeger).collect()
}

/// Parse one trace out of a JSON document, the first when no id is given.
///
/// Only the selected trace is converted; other traces in the document may be
/// malformed without affecting it.
pub fn select_trace_from_json(json: &str, trace_id: Option<&str>) -> Result<Trace, TraceError> {
    let raw = raw_traces(json)?;
    let picked = match trace_id {
        Some(id) => raw
            .into_iter()
            .find(|t| t.trace_id == id)
            .ok_or_else(|| TraceError::TraceNotFound(id.to_string()))?,
        None => raw.into_iter().next().ok_or(TraceError::NoTrace)?,
    };
    from_jaeger(picked)
}

/// Parse the first trace contained in a JSON document
pub fn from_jaeger_json(json: &str) -> Result<Trace, TraceError> {
    select_trace_from_json(json, None)
}

fn raw_traces(json: &str) -> Result<Vec<JaegerTrace>, TraceError> {
    let doc: JaegerDocument = serde_json::from_str(json)?;
    Ok(match doc {
        JaegerDocument::Envelope { data } => data,
        JaegerDocument::Single(trace) => vec![trace],
    })
}

/// Convert one raw Jaeger trace
pub fn from_jaeger(raw: JaegerTrace) -> Result<Trace, TraceError> {
    let processes: HashMap<String, Process> = raw
        .processes
        .into_iter()
        .map(|(id, p)| {
            (
                id,
                Process {
                    service_name: p.service_name,
                    tags: p.tags.into_iter().map(KeyValue::from).collect(),
                },
            )
        })
        .collect();

    let trace_warnings = raw.warnings.unwrap_or_default();
    if !trace_warnings.is_empty() {
        tracing::warn!(
            trace_id = %raw.trace_id,
            warnings = ?trace_warnings,
            "trace carries warnings"
        );
    }

    let mut spans = Vec::with_capacity(raw.spans.len());
    for raw_span in raw.spans {
        let references: Vec<SpanReference> = raw_span
            .references
            .into_iter()
            .map(|r| SpanReference {
                ref_type: parse_ref_type(&r.ref_type),
                trace_id: r.trace_id,
                span_id: r.span_id,
            })
            .collect();

        // First same-trace CHILD_OF wins, otherwise the first same-trace reference
        let parent_span_id = references
            .iter()
            .filter(|r| r.trace_id == raw_span.trace_id)
            .find(|r| r.ref_type == RefType::ChildOf)
            .or_else(|| {
                references
                    .iter()
                    .find(|r| r.trace_id == raw_span.trace_id)
            })
            .map(|r| r.span_id.clone());

        let mut warnings = raw_span.warnings.unwrap_or_default();
        let (service_name, process_tags) = match processes.get(&raw_span.process_id) {
            Some(process) => (process.service_name.clone(), process.tags.clone()),
            None => {
                tracing::warn!(
                    span_id = %raw_span.span_id,
                    process_id = %raw_span.process_id,
                    "span references an unknown process"
                );
                warnings.push(format!("unknown process {}", raw_span.process_id));
                (String::from("unknown"), Vec::new())
            }
        };

        let mut span = Span::new(
            raw_span.span_id,
            raw_span.trace_id,
            raw_span.operation_name,
            raw_span.start_time,
            raw_span.duration,
        );
        span.parent_span_id = parent_span_id;
        span.process_id = raw_span.process_id;
        span.service_name = service_name;
        span.process_tags = process_tags;
        span.tags = raw_span.tags.into_iter().map(KeyValue::from).collect();
        span.logs = raw_span
            .logs
            .into_iter()
            .map(|log| LogEvent {
                timestamp: log.timestamp,
                fields: log.fields.into_iter().map(KeyValue::from).collect(),
            })
            .collect();
        span.references = references;
        span.warnings = warnings;
        span.stack_traces = raw_span.stack_traces.unwrap_or_default();
        spans.push(span);
    }

    Trace::build(raw.trace_id, spans, processes)
}
