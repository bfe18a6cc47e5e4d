use crate::render::detail_lines;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use spanview_core::RenderBundle;

pub fn render_detail(f: &mut Frame, area: Rect, bundle: &RenderBundle, span_id: Option<&str>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("🔎 Span Details [enter t p o r s w]");

    let span = span_id.and_then(|id| bundle.trace.span(id));
    let Some(span) = span else {
        let widget = Paragraph::new("No span selected")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(widget, area);
        return;
    };

    let text = detail_lines(&bundle.trace, span, &bundle.detail_states).join("\n");
    let widget = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}
