use crate::render::render_critical_path;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use spanview_core::RenderBundle;

pub fn render_critical_path_panel(f: &mut Frame, area: Rect, bundle: &RenderBundle) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("🎯 Critical Path");

    match &bundle.critical_path {
        Some(path) => {
            let text = render_critical_path(path, &bundle.trace).join("\n");
            let widget = Paragraph::new(text)
                .block(block)
                .style(Style::default().fg(Color::Yellow))
                .wrap(Wrap { trim: true });
            f.render_widget(widget, area);
        }
        None => {
            let widget = Paragraph::new("Critical path disabled in config")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(widget, area);
        }
    }
}
