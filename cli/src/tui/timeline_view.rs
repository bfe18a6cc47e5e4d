use crate::render::{format_duration, row_flags, timeline_bar, tree_prefix};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use spanview_core::RenderBundle;

/// Render the span rows with their timeline bars
pub fn render_timeline(f: &mut Frame, area: Rect, bundle: &RenderBundle, selected: usize) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let label_width = (inner_width * 55) / 100;
    let bar_width = inner_width.saturating_sub(label_width + 1);
    let view = bundle.view_range.current;

    let items: Vec<ListItem> = bundle
        .visible_rows
        .iter()
        .filter_map(|&index| bundle.trace.spans.get(index))
        .map(|span| {
            let critical = bundle
                .critical_path
                .as_ref()
                .is_some_and(|p| p.contains(&span.span_id));
            let matched = bundle.search_matches.contains(&span.span_id);
            let search_cursor =
                bundle.focused_span_id_for_search.as_deref() == Some(span.span_id.as_str());
            let focused = bundle.focused_span_id.as_deref() == Some(span.span_id.as_str());

            let label = format!(
                "{} {}{}: {} {}",
                row_flags(bundle, span),
                tree_prefix(bundle, span),
                span.service_name,
                span.operation_name,
                format_duration(span.duration)
            );
            let label: String = label.chars().take(label_width).collect();
            let padded = format!("{:<width$} ", label, width = label_width);

            let mut label_style = Style::default();
            if matched {
                label_style = label_style.fg(Color::Magenta);
            }
            if search_cursor {
                label_style = label_style.add_modifier(Modifier::UNDERLINED);
            }
            if focused {
                label_style = label_style.add_modifier(Modifier::BOLD);
            }
            let bar_style = if critical {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Green)
            };

            ListItem::new(Line::from(vec![
                Span::styled(padded, label_style),
                Span::styled(timeline_bar(&bundle.trace, span, view, bar_width), bar_style),
            ]))
        })
        .collect();

    let title = format!(
        "🕒 Timeline [j/k space c/e [/]] {}/{} rows",
        bundle.visible_rows.len(),
        bundle.trace.len()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !bundle.visible_rows.is_empty() {
        state.select(Some(selected.min(bundle.visible_rows.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut state);
}
