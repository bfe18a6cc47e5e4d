//! Plain-text rendering of a view-model snapshot, shared by the
//! non-interactive commands and the TUI panels.

use spanview_core::critical_path::CriticalPath;
use spanview_core::focus::{FocusAction, FocusLink};
use spanview_core::span::{KeyValue, Span};
use spanview_core::state::{DetailKey, DetailSection};
use spanview_core::{RenderBundle, Trace};
use std::collections::HashSet;

pub const DEFAULT_BAR_WIDTH: usize = 40;

/// Human friendly duration from microseconds
pub fn format_duration(us: u64) -> String {
    if us >= 1_000_000 {
        format!("{:.2}s", us as f64 / 1_000_000.0)
    } else if us >= 1_000 {
        format!("{:.2}ms", us as f64 / 1_000.0)
    } else {
        format!("{}µs", us)
    }
}

/// First eight characters of an id
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Row flags, one character each: critical path, search match, focus
pub fn row_flags(bundle: &RenderBundle, span: &Span) -> String {
    let critical = bundle
        .critical_path
        .as_ref()
        .is_some_and(|p| p.contains(&span.span_id));
    let matched = bundle.search_matches.contains(&span.span_id);
    let focused = bundle.focused_span_id.as_deref() == Some(span.span_id.as_str());

    [
        if critical { '*' } else { ' ' },
        if matched { '+' } else { ' ' },
        if focused { '>' } else { ' ' },
    ]
    .iter()
    .collect()
}

/// Indentation plus fold marker for a span's row
pub fn tree_prefix(bundle: &RenderBundle, span: &Span) -> String {
    let fold = if !span.has_children {
        ' '
    } else if bundle.hidden_span_ids.contains(&span.span_id) {
        '▸'
    } else {
        '▾'
    };
    let guides: String = ancestor_guides(&bundle.trace, span, &bundle.hover_indent_guide_ids);
    format!("{}{} ", guides, fold)
}

/// One column per ancestor; an ancestor with a hovered guide is drawn heavier
fn ancestor_guides(trace: &Trace, span: &Span, hovered: &HashSet<String>) -> String {
    let mut chain = Vec::new();
    let mut current = trace.parent(span);
    while let Some(parent) = current {
        chain.push(if hovered.contains(&parent.span_id) {
            "┃ "
        } else {
            "│ "
        });
        current = trace.parent(parent);
    }
    chain.reverse();
    chain.concat()
}

/// Bar of `width` cells showing where the span sits inside the committed view range
pub fn timeline_bar(trace: &Trace, span: &Span, view: (f64, f64), width: usize) -> String {
    let mut cells = vec!['·'; width];
    let (view_start, view_end) = view;
    let view_len = view_end - view_start;
    if width == 0 || trace.duration == 0 || view_len <= 0.0 {
        return cells.into_iter().collect();
    }

    let total = trace.duration as f64;
    let start = (span.start_time.saturating_sub(trace.start_time)) as f64 / total;
    let end = (span.end_time().saturating_sub(trace.start_time)) as f64 / total;
    let to_cell = |fraction: f64| ((fraction - view_start) / view_len) * width as f64;

    let first = to_cell(start);
    let last = to_cell(end);
    if last < 0.0 || first > width as f64 {
        return cells.into_iter().collect();
    }
    let first = first.max(0.0).floor() as usize;
    let last = (last.min(width as f64).ceil() as usize).max(first + 1).min(width);
    for cell in cells.iter_mut().take(last).skip(first) {
        *cell = '█';
    }
    cells.into_iter().collect()
}

pub fn render_row(bundle: &RenderBundle, index: usize, bar_width: usize) -> Option<String> {
    let span = bundle.trace.spans.get(index)?;
    Some(format!(
        "{} {}{}: {}  {}  {}",
        row_flags(bundle, span),
        tree_prefix(bundle, span),
        span.service_name,
        span.operation_name,
        format_duration(span.duration),
        timeline_bar(&bundle.trace, span, bundle.view_range.current, bar_width),
    ))
}

/// Every visible row, with detail lines under rows whose detail panel is open
pub fn render_rows(bundle: &RenderBundle, bar_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for &index in &bundle.visible_rows {
        let Some(row) = render_row(bundle, index, bar_width) else {
            continue;
        };
        lines.push(row);
        let span = &bundle.trace.spans[index];
        if bundle
            .detail_states
            .contains(&DetailKey::section(&span.span_id, DetailSection::Row))
        {
            lines.extend(
                detail_lines(&bundle.trace, span, &bundle.detail_states)
                    .into_iter()
                    .map(|l| format!("      {}", l)),
            );
        }
    }
    lines
}

fn key_values(kvs: &[KeyValue]) -> Vec<String> {
    kvs.iter()
        .map(|kv| format!("  {} = {}", kv.key, kv.value_string()))
        .collect()
}

/// Detail panel of one span. Closed sections show a one-line count.
pub fn detail_lines(trace: &Trace, span: &Span, open: &HashSet<DetailKey>) -> Vec<String> {
    let is_open = |section| open.contains(&DetailKey::section(&span.span_id, section));
    let mut lines = vec![
        format!("{} ({})", span.operation_name, span.service_name),
        format!(
            "span {}  start +{}  duration {}",
            span.span_id,
            format_duration(span.start_time.saturating_sub(trace.start_time)),
            format_duration(span.duration)
        ),
    ];

    lines.push(format!("[t] tags ({})", span.tags.len()));
    if is_open(DetailSection::Tags) {
        lines.extend(key_values(&span.tags));
    }

    lines.push(format!("[p] process ({})", span.process_tags.len()));
    if is_open(DetailSection::Process) {
        lines.extend(key_values(&span.process_tags));
    }

    lines.push(format!("[o] logs ({})", span.logs.len()));
    if is_open(DetailSection::Logs) {
        for (i, log) in span.logs.iter().enumerate() {
            let offset = format_duration(log.timestamp.saturating_sub(span.start_time));
            let item_open =
                open.contains(&DetailKey::item(&span.span_id, DetailSection::Logs, i));
            if item_open {
                lines.push(format!("  {} +{}", i, offset));
                lines.extend(key_values(&log.fields).into_iter().map(|l| format!("  {}", l)));
            } else {
                let summary = log
                    .fields
                    .iter()
                    .map(|kv| format!("{}={}", kv.key, kv.value_string()))
                    .collect::<Vec<_>>()
                    .join(" ");
                lines.push(format!("  {} +{} {}", i, offset, summary));
            }
        }
    }

    if !span.references.is_empty() {
        lines.push(format!("[r] references ({})", span.references.len()));
        if is_open(DetailSection::References) {
            for (i, reference) in span.references.iter().enumerate() {
                let item_open = open.contains(&DetailKey::item(
                    &span.span_id,
                    DetailSection::References,
                    i,
                ));
                let target = match trace.span(&reference.span_id) {
                    Some(target) if item_open => format!(
                        "{} ({}: {})",
                        reference.span_id, target.service_name, target.operation_name
                    ),
                    _ => reference.span_id.clone(),
                };
                lines.push(format!("  {:?} {}", reference.ref_type, target));
            }
        }
    }

    if !span.stack_traces.is_empty() {
        lines.push(format!("[s] stack traces ({})", span.stack_traces.len()));
        if is_open(DetailSection::StackTraces) {
            lines.extend(span.stack_traces.iter().map(|s| format!("  {}", s)));
        }
    }

    if !span.warnings.is_empty() {
        lines.push(format!("[w] warnings ({})", span.warnings.len()));
        if is_open(DetailSection::Warnings) {
            lines.extend(span.warnings.iter().map(|w| format!("  {}", w)));
        }
    }

    lines
}

pub fn render_summary(trace: &Trace) -> Vec<String> {
    let started = trace
        .start_datetime()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "?".to_string());
    let services = trace
        .services
        .iter()
        .map(|s| format!("{} ({})", s.name, s.span_count))
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        format!("Trace {}  {}", trace.trace_id, trace.trace_name),
        format!(
            "• Started: {}  • Duration: {}  • Spans: {}",
            started,
            format_duration(trace.duration),
            trace.len()
        ),
        format!("• Services: {}", services),
    ]
}

pub fn render_critical_path(path: &CriticalPath, trace: &Trace) -> Vec<String> {
    let mut lines = vec![format!(
        "Critical path: {} ({:.1}% of {} total), {} spans",
        format_duration(path.total_duration_us),
        path.percentage_of_total,
        format_duration(path.trace_duration_us),
        path.path.len()
    )];

    for (i, span_id) in path.path.iter().enumerate() {
        let arrow = if i == 0 {
            "┌─→"
        } else if i == path.path.len() - 1 {
            "└─→"
        } else {
            "├─→"
        };
        let own: u64 = path
            .sections
            .iter()
            .filter(|s| &s.span_id == span_id)
            .map(|s| s.section_end - s.section_start)
            .sum();
        let label = trace
            .span(span_id)
            .map(|s| format!("{}: {}", s.service_name, s.operation_name))
            .unwrap_or_else(|| span_id.clone());
        lines.push(format!(
            "{} [{}] {} ({})",
            arrow,
            format_duration(own),
            label,
            short_id(span_id)
        ));
    }
    lines
}

pub fn render_link(link: &FocusLink) -> Vec<String> {
    let action = match &link.action {
        FocusAction::ToggleFocus(span_id) => format!("toggle focus on {}", span_id),
        FocusAction::SplitOpen(request) => format!(
            "open split view on {} ({})",
            request.query.query,
            if request.datasource_uid.is_empty() {
                "no datasource"
            } else {
                request.datasource_uid.as_str()
            }
        ),
        FocusAction::None => "none (explore disabled)".to_string(),
    };
    vec![
        link.descriptor.title.clone(),
        format!("• URL: {}", link.descriptor.url),
        format!("• Action: {}", action),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn trace() -> Trace {
        Trace::build(
            "t1",
            vec![
                Span::new("a", "t1", "root", 1_000, 1_000).with_service("api"),
                Span::new("b", "t1", "child", 1_500, 500)
                    .with_parent("a")
                    .with_service("db"),
            ],
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn durations_pick_a_unit() {
        assert_eq!(format_duration(830), "830µs");
        assert_eq!(format_duration(12_500), "12.50ms");
        assert_eq!(format_duration(2_000_000), "2.00s");
    }

    #[test]
    fn short_ids_cut_on_char_boundaries() {
        assert_eq!(short_id("a1a1a1a1b2b2"), "a1a1a1a1");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("abcdefgé-span"), "abcdefgé");
    }

    #[test]
    fn bar_covers_the_span_share_of_the_view() {
        let trace = trace();
        let child = trace.span("b").unwrap();
        assert_eq!(timeline_bar(&trace, child, (0.0, 1.0), 4), "··██");
        // Zoomed onto the first half the child is off screen
        assert_eq!(timeline_bar(&trace, child, (0.0, 0.4), 4), "····");
        let root = trace.span("a").unwrap();
        assert_eq!(timeline_bar(&trace, root, (0.5, 1.5), 4), "██··");
    }

    #[test]
    fn closed_sections_only_show_counts() {
        let trace = trace();
        let span = trace.span("a").unwrap();
        let lines = detail_lines(&trace, span, &HashSet::new());
        assert!(lines.iter().any(|l| l == "[t] tags (0)"));
        assert!(!lines.iter().any(|l| l.starts_with("[w]")));
    }
}
