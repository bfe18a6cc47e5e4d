use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use spanview::loader::{load_settings, load_trace};
use spanview::{render, tui};
use spanview_core::config::LoggingConfig;
use spanview_core::focus::QueryRef;
use spanview_core::state::filter_spans;
use spanview_core::{compute_critical_path, Config, RenderState, TraceViewModel};

#[derive(Parser)]
#[command(name = "spanview")]
#[command(about = "Trace timeline viewer with critical path and span search", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "spanview.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the span tree with critical path and search markers
    Show {
        /// Jaeger JSON trace file
        file: PathBuf,
        /// Pick a trace by id when the file holds several
        #[arg(long)]
        trace_id: Option<String>,
        /// Fold every subtree before printing
        #[arg(long)]
        collapse: bool,
        /// Mark spans matching this query
        #[arg(long)]
        search: Option<String>,
        /// Output the render snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the critical path of a trace
    CriticalPath {
        file: PathBuf,
        #[arg(long)]
        trace_id: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// List spans matching a query
    Search {
        file: PathBuf,
        query: String,
        #[arg(long)]
        trace_id: Option<String>,
    },

    /// Resolve the link from a span reference while FILE is displayed
    Link {
        file: PathBuf,
        /// Trace the reference points at
        target_trace_id: String,
        /// Span the reference points at
        span_id: String,
        /// Pick the displayed trace by id when the file holds several
        #[arg(long)]
        trace_id: Option<String>,
        /// Type of the query driving the pane (defaults to the first same-trace type)
        #[arg(long)]
        query_type: Option<String>,
        /// Query string driving the pane (defaults to the displayed trace id)
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Launch the interactive timeline
    Tui {
        file: PathBuf,
        #[arg(long)]
        trace_id: Option<String>,
    },

    /// Show frontend settings and build information
    Info {
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)?;
    config.validate()?;

    // Terminal output would corrupt the TUI
    if !matches!(cli.command, Commands::Tui { .. }) {
        init_logging(&config.logging);
    }

    match cli.command {
        Commands::Show {
            file,
            trace_id,
            collapse,
            search,
            json,
        } => handle_show(&config, &file, trace_id.as_deref(), collapse, search, json)?,
        Commands::CriticalPath {
            file,
            trace_id,
            json,
        } => handle_critical_path(&file, trace_id.as_deref(), json)?,
        Commands::Search {
            file,
            query,
            trace_id,
        } => handle_search(&file, &query, trace_id.as_deref())?,
        Commands::Link {
            file,
            target_trace_id,
            span_id,
            trace_id,
            query_type,
            query,
            json,
        } => handle_link(
            &config,
            &file,
            trace_id.as_deref(),
            &target_trace_id,
            &span_id,
            query_type,
            query,
            json,
        )?,
        Commands::Tui { file, trace_id } => {
            let mut model = build_model(&config)?;
            let trace = load_trace(&file, trace_id.as_deref())?;
            model.set_active_query(Some(QueryRef::new(
                default_query_type(&config),
                trace.trace_id.clone(),
            )));
            model.set_trace(Some(trace));
            tui::launch_tui(model)?;
        }
        Commands::Info { json } => handle_info(&config, json)?,
        Commands::Config => {
            print!("{}", Config::default_toml()?);
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let log_level = match logging.level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_target(logging.include_modules)
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn build_model(config: &Config) -> Result<TraceViewModel> {
    let settings = load_settings(config)?;
    Ok(TraceViewModel::standalone(config, settings))
}

fn default_query_type(config: &Config) -> String {
    config
        .focus
        .same_trace_query_types
        .first()
        .cloned()
        .unwrap_or_else(|| "traceql".to_string())
}

fn handle_show(
    config: &Config,
    file: &std::path::Path,
    trace_id: Option<&str>,
    collapse: bool,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let mut model = build_model(config)?;
    let trace = load_trace(file, trace_id)?;
    model.set_trace(Some(Arc::clone(&trace)));
    if collapse {
        model.collapse_all_roots();
    }
    if let Some(query) = search {
        model.set_search(&query);
    }

    let state = model.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let RenderState::Ready(bundle) = state else {
        return Err(anyhow!("Trace has no data"));
    };
    for line in render::render_summary(&trace) {
        println!("{}", line);
    }
    if !bundle.search_query.is_empty() {
        println!(
            "• Search '{}': {} matches",
            bundle.search_query,
            bundle.search_matches.len()
        );
    }
    println!();
    for line in render::render_rows(&bundle, render::DEFAULT_BAR_WIDTH) {
        println!("{}", line);
    }
    Ok(())
}

fn handle_critical_path(file: &std::path::Path, trace_id: Option<&str>, json: bool) -> Result<()> {
    let trace = load_trace(file, trace_id)?;
    let path = compute_critical_path(&trace);

    if json {
        println!("{}", serde_json::to_string_pretty(&path)?);
        return Ok(());
    }

    println!("🎯 Trace {}", trace.trace_id);
    for line in render::render_critical_path(&path, &trace) {
        println!("{}", line);
    }
    Ok(())
}

fn handle_search(file: &std::path::Path, query: &str, trace_id: Option<&str>) -> Result<()> {
    let trace = load_trace(file, trace_id)?;
    let matches = filter_spans(query, &trace);

    println!("🔍 {} matches for '{}'", matches.len(), query);
    for span in trace.spans.iter().filter(|s| matches.contains(&s.span_id)) {
        println!(
            "  {:<16} {:<20} {} ({})",
            render::short_id(&span.span_id),
            span.service_name,
            span.operation_name,
            render::format_duration(span.duration)
        );
    }
    Ok(())
}

fn handle_link(
    config: &Config,
    file: &std::path::Path,
    trace_id: Option<&str>,
    target_trace_id: &str,
    span_id: &str,
    query_type: Option<String>,
    query: Option<String>,
    json: bool,
) -> Result<()> {
    let mut model = build_model(config)?;
    let trace = load_trace(file, trace_id)?;
    let active = QueryRef::new(
        query_type.unwrap_or_else(|| default_query_type(config)),
        query.unwrap_or_else(|| trace.trace_id.clone()),
    );
    model.set_trace(Some(trace));
    model.set_active_query(Some(active));

    let link = model.resolve_focus_link(target_trace_id, span_id);
    if json {
        println!("{}", serde_json::to_string_pretty(&link)?);
        return Ok(());
    }
    for line in render::render_link(&link) {
        println!("{}", line);
    }
    Ok(())
}

fn handle_info(config: &Config, json: bool) -> Result<()> {
    let settings = load_settings(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let build = &settings.build_info;
    if build.hide_version {
        println!("ℹ️  Build information hidden");
    } else {
        println!(
            "ℹ️  Version {} ({}) {} [{}]",
            build.version, build.commit, build.edition, build.env
        );
    }
    println!(
        "• App URL: {}  • Sub path: {}",
        settings.app_url,
        settings.link_prefix()
    );
    println!(
        "• Explore: {}",
        if settings.explore_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    let mut toggles: Vec<_> = settings
        .feature_toggles
        .iter()
        .filter(|(_, on)| **on)
        .map(|(name, _)| name.as_str())
        .collect();
    toggles.sort_unstable();
    println!("• Feature toggles: {}", toggles.join(", "));
    println!(
        "• Same-trace query types: {}",
        config.focus.same_trace_query_types.join(", ")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_accepts_displayed_trace_id() {
        let cli = Cli::try_parse_from([
            "spanview",
            "link",
            "traces.json",
            "00f067aa0ba902b7",
            "f6f6f6f6",
            "--trace-id",
            "00f067aa0ba902b7",
        ])
        .unwrap();
        match cli.command {
            Commands::Link {
                trace_id,
                target_trace_id,
                ..
            } => {
                assert_eq!(trace_id.as_deref(), Some("00f067aa0ba902b7"));
                assert_eq!(target_trace_id, "00f067aa0ba902b7");
            }
            _ => panic!("expected link command"),
        }
    }
}
