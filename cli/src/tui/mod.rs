pub mod critical_path;
pub mod detail_view;
pub mod timeline_view;

use crate::render::format_duration;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use spanview_core::focus::Activation;
use spanview_core::span::SpanId;
use spanview_core::state::{DetailSection, ViewRangeTimeUpdate};
use spanview_core::{RenderBundle, RenderState, TraceViewModel};
use std::io;
use tui_textarea::TextArea;

const PAN_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

struct App {
    model: TraceViewModel,
    selected: usize,
    hovered: Option<SpanId>,
    input_mode: InputMode,
    search_input: TextArea<'static>,
    show_help: bool,
    status_message: String,
}

impl App {
    fn new(model: TraceViewModel) -> Self {
        let mut search_input = TextArea::default();
        search_input.set_block(Block::default().borders(Borders::ALL).title("Search"));
        search_input.set_cursor_line_style(Style::default());

        let mut app = Self {
            model,
            selected: 0,
            hovered: None,
            input_mode: InputMode::Normal,
            search_input,
            show_help: false,
            status_message: "Press ? for help".to_string(),
        };
        app.sync_hover();
        app
    }

    fn visible_ids(&self) -> Vec<SpanId> {
        let Some(trace) = self.model.trace() else {
            return Vec::new();
        };
        self.model
            .children()
            .visible_rows(trace)
            .into_iter()
            .map(|i| trace.spans[i].span_id.clone())
            .collect()
    }

    fn selected_span_id(&self) -> Option<SpanId> {
        self.visible_ids().into_iter().nth(self.selected)
    }

    /// Keep the selection on a row and the hover guide on the selected span
    fn sync_hover(&mut self) {
        let visible = self.visible_ids();
        self.selected = self.selected.min(visible.len().saturating_sub(1));
        let current = visible.get(self.selected).cloned();
        if current == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            self.model.remove_hover_indent_guide_id(&previous);
        }
        if let Some(id) = &current {
            self.model.add_hover_indent_guide_id(id);
        }
        self.hovered = current;
    }

    fn select_next(&mut self) {
        self.selected = self.selected.saturating_add(1);
        self.sync_hover();
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.sync_hover();
    }

    fn select_span(&mut self, span_id: &str) {
        if let Some(pos) = self.visible_ids().iter().position(|id| id == span_id) {
            self.selected = pos;
        }
        self.sync_hover();
    }

    fn with_selected(&mut self, action: impl FnOnce(&mut TraceViewModel, &str)) {
        if let Some(id) = self.selected_span_id() {
            action(&mut self.model, &id);
            self.sync_hover();
        }
    }

    fn toggle_section(&mut self, section: DetailSection) {
        self.with_selected(|model, id| {
            match section {
                DetailSection::Row => model.toggle_detail_row(id),
                DetailSection::Logs => model.toggle_logs(id),
                DetailSection::Tags => model.toggle_tags(id),
                DetailSection::Process => model.toggle_process(id),
                DetailSection::References => model.toggle_references(id),
                DetailSection::StackTraces => model.toggle_stack_traces(id),
                DetailSection::Warnings => model.toggle_warnings(id),
            };
        });
    }

    /// Move the search cursor and unfold whatever hides the match
    fn jump_to_match(&mut self, forward: bool) {
        let found = if forward {
            self.model.next_match()
        } else {
            self.model.prev_match()
        };
        let Some(span_id) = found else {
            self.status_message = "No matches".to_string();
            return;
        };

        let ancestors: Vec<SpanId> = match self.model.trace() {
            Some(trace) => {
                let mut chain = Vec::new();
                let mut current = trace.span(&span_id).and_then(|s| trace.parent(s));
                while let Some(parent) = current {
                    chain.push(parent.span_id.clone());
                    current = trace.parent(parent);
                }
                chain
            }
            None => Vec::new(),
        };
        for ancestor in ancestors {
            self.model.expand_one(&ancestor);
        }
        self.select_span(&span_id);
        self.status_message = format!(
            "Match {} of {}",
            span_id,
            self.model.search().matches().len()
        );
    }

    fn toggle_focus(&mut self) {
        let (Some(trace_id), Some(span_id)) = (
            self.model.trace().map(|t| t.trace_id.clone()),
            self.selected_span_id(),
        ) else {
            return;
        };
        let link = self.model.resolve_focus_link(&trace_id, &span_id);
        self.status_message = match self.model.activate(&link, None) {
            Activation::Focused(Some(id)) => format!("Focused {}", id),
            Activation::Focused(None) => "Focus cleared".to_string(),
            Activation::SplitOpened => "Opened split view".to_string(),
            Activation::SplitFailed => format!("Cannot open split view: {}", link.descriptor.url),
            Activation::Inert => "Explore is disabled".to_string(),
        };
    }

    fn zoom(&mut self, factor: f64) {
        if let Err(e) = self.model.zoom(factor) {
            self.status_message = format!("Zoom failed: {}", e);
        }
    }

    fn pan(&mut self, delta: f64) {
        let (start, end) = self.model.view_range().current;
        if let Err(e) = self
            .model
            .update_view_range_time(start + delta, end + delta, Some("pan"))
        {
            self.status_message = format!("Pan failed: {}", e);
        }
    }

    /// First press previews a zoom onto the selected span, second press commits it
    fn stage_zoom_to_selected(&mut self) {
        if let Some((start, end)) = self.model.view_range().preview() {
            match self
                .model
                .update_view_range_time(start, end, Some("span zoom"))
            {
                Ok(()) => self.status_message = "Zoomed to span".to_string(),
                Err(e) => self.status_message = format!("Zoom failed: {}", e),
            }
            return;
        }

        let (Some(trace), Some(span_id)) = (self.model.trace().cloned(), self.selected_span_id())
        else {
            return;
        };
        let Some(span) = trace.span(&span_id) else {
            return;
        };
        if trace.duration == 0 {
            return;
        }
        let total = trace.duration as f64;
        let anchor = span.start_time.saturating_sub(trace.start_time) as f64 / total;
        let shift = span.end_time().saturating_sub(trace.start_time) as f64 / total;
        self.model
            .update_next_view_range_time(ViewRangeTimeUpdate::reframe(anchor, shift));
        self.status_message = "Press z again to zoom, Esc to cancel".to_string();
    }

    fn apply_search(&mut self) {
        let query = self.search_input.lines().join(" ");
        self.model.set_search(&query);
        self.status_message = format!(
            "{} matches for '{}'",
            self.model.search().matches().len(),
            query
        );
    }
}

pub fn launch_tui(model: TraceViewModel) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(model);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        let state = app.model.snapshot();
        terminal.draw(|f| ui(f, app, &state))?;

        if !event::poll(std::time::Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.show_help {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1) | KeyCode::Esc) {
                app.show_help = false;
            }
            continue;
        }

        match app.input_mode {
            InputMode::Search => handle_search_key(app, key),
            InputMode::Normal => {
                if !handle_normal_key(app, key) {
                    return Ok(());
                }
            }
        }
    }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.apply_search();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        _ => {
            app.search_input.input(key);
        }
    }
}

/// Returns false when the user asked to quit
fn handle_normal_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::Char('?') | KeyCode::F(1) => app.show_help = true,

        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),

        // Folding
        KeyCode::Char(' ') => app.with_selected(|model, id| model.toggle_children(id)),
        KeyCode::Char('c') => {
            app.model.collapse_all_roots();
            app.sync_hover();
        }
        KeyCode::Char('e') => {
            app.model.expand_all();
            app.sync_hover();
        }
        KeyCode::Char('[') => {
            app.model.collapse_level();
            app.sync_hover();
        }
        KeyCode::Char(']') => {
            app.model.expand_level();
            app.sync_hover();
        }

        // Details
        KeyCode::Enter => app.toggle_section(DetailSection::Row),
        KeyCode::Char('t') => app.toggle_section(DetailSection::Tags),
        KeyCode::Char('p') => app.toggle_section(DetailSection::Process),
        KeyCode::Char('o') => app.toggle_section(DetailSection::Logs),
        KeyCode::Char('r') => app.toggle_section(DetailSection::References),
        KeyCode::Char('s') => app.toggle_section(DetailSection::StackTraces),
        KeyCode::Char('w') => app.toggle_section(DetailSection::Warnings),

        // Search
        KeyCode::Char('/') => app.input_mode = InputMode::Search,
        KeyCode::Char('n') => app.jump_to_match(true),
        KeyCode::Char('N') => app.jump_to_match(false),

        KeyCode::Char('f') => app.toggle_focus(),

        // View range
        KeyCode::Char('+') => app.zoom(0.5),
        KeyCode::Char('-') => app.zoom(2.0),
        KeyCode::Char('h') | KeyCode::Left => app.pan(-PAN_STEP),
        KeyCode::Char('l') | KeyCode::Right => app.pan(PAN_STEP),
        KeyCode::Char('z') => app.stage_zoom_to_selected(),
        KeyCode::Char('0') => app.model.reset_view_range(),
        KeyCode::Esc => app.model.discard_next_view_range(),
        _ => {}
    }
    true
}

fn render_help_modal(f: &mut Frame) {
    let area = f.size();
    let modal_width = (area.width * 60) / 100;
    let modal_height = (area.height * 70) / 100;
    let modal_area = Rect {
        x: (area.width - modal_width) / 2,
        y: (area.height - modal_height) / 2,
        width: modal_width,
        height: modal_height,
    };

    let help_text = [
        "🔍 SPANVIEW - KEYBOARD SHORTCUTS",
        "",
        "┌─ NAVIGATION ─────────────────────────────────────────┐",
        "│  j / k / ↑↓     Select span                         │",
        "│  space          Fold / unfold selected span         │",
        "│  c / e          Collapse / expand everything        │",
        "│  [ / ]          Collapse / expand one level         │",
        "└──────────────────────────────────────────────────────┘",
        "",
        "┌─ DETAILS ────────────────────────────────────────────┐",
        "│  enter          Toggle detail row                   │",
        "│  t p o          Tags, process, logs                 │",
        "│  r s w          References, stack traces, warnings  │",
        "└──────────────────────────────────────────────────────┘",
        "",
        "┌─ SEARCH & FOCUS ─────────────────────────────────────┐",
        "│  /              Edit search query                   │",
        "│  n / N          Next / previous match               │",
        "│  f              Toggle focus on selected span       │",
        "└──────────────────────────────────────────────────────┘",
        "",
        "┌─ TIME RANGE ─────────────────────────────────────────┐",
        "│  + / -          Zoom in / out                       │",
        "│  h / l / ←→     Pan                                 │",
        "│  z              Preview zoom to span, z again apply │",
        "│  0 / Esc        Reset range / cancel preview        │",
        "└──────────────────────────────────────────────────────┘",
        "",
        "│  ? / F1         Toggle this help screen             │",
        "│  q              Quit                                │",
    ];

    f.render_widget(Clear, modal_area);
    let help_widget = Paragraph::new(help_text.join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("📖 Help")
                .style(Style::default().bg(Color::Black).fg(Color::Cyan)),
        )
        .style(Style::default().bg(Color::Black).fg(Color::White))
        .wrap(Wrap { trim: false });
    f.render_widget(help_widget, modal_area);
}

fn header_text(bundle: &RenderBundle) -> String {
    let (start, end) = bundle.view_range.current;
    let preview = bundle
        .view_range
        .preview()
        .map(|(s, e)| format!("  preview {:.0}%–{:.0}%", s * 100.0, e * 100.0))
        .unwrap_or_default();
    let critical = bundle
        .critical_path
        .as_ref()
        .map(|p| format!("  • Critical path {:.1}%", p.percentage_of_total))
        .unwrap_or_default();
    let search = if bundle.search_query.is_empty() {
        String::new()
    } else {
        format!(
            "  • Search '{}' ({} matches)",
            bundle.search_query,
            bundle.search_matches.len()
        )
    };
    let focus = bundle
        .focused_span_id
        .as_ref()
        .map(|id| format!("  • Focus {}", id))
        .unwrap_or_default();

    format!(
        "{}  • {}  • View {:.0}%–{:.0}%{}{}{}{}",
        bundle.trace.trace_name,
        format_duration(bundle.trace.duration),
        start * 100.0,
        end * 100.0,
        preview,
        critical,
        search,
        focus
    )
}

fn ui(f: &mut Frame, app: &App, state: &RenderState) {
    let size = f.size();
    let Some(bundle) = state.bundle() else {
        let widget = Paragraph::new("No trace data")
            .block(Block::default().borders(Borders::ALL).title("Spanview"))
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(widget, size);
        return;
    };

    let footer_height = if app.input_mode == InputMode::Search { 3 } else { 1 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(footer_height),
        ])
        .split(size);

    let header = Paragraph::new(header_text(bundle))
        .block(Block::default().borders(Borders::ALL).title("Spanview"));
    f.render_widget(header, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[1]);
    timeline_view::render_timeline(f, columns[0], bundle, app.selected);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[1]);
    let selected = bundle
        .visible_rows
        .get(app.selected)
        .and_then(|&i| bundle.trace.spans.get(i))
        .map(|s| s.span_id.as_str());
    detail_view::render_detail(f, side[0], bundle, selected);
    critical_path::render_critical_path_panel(f, side[1], bundle);

    match app.input_mode {
        InputMode::Search => f.render_widget(app.search_input.widget(), rows[2]),
        InputMode::Normal => {
            let status = Paragraph::new(app.status_message.as_str())
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(status, rows[2]);
        }
    }

    if app.show_help {
        render_help_modal(f);
    }
}
