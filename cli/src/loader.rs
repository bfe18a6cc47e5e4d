use anyhow::{Context, Result};
use spanview_core::{ingest, Config, FrontendSettings, Trace};
use std::path::Path;
use std::sync::Arc;

/// Read a Jaeger JSON file and pick one trace from it, the first when no id is given
pub fn load_trace(path: &Path, trace_id: Option<&str>) -> Result<Arc<Trace>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {:?}", path))?;
    let trace = ingest::select_trace_from_json(&json, trace_id)
        .with_context(|| format!("Failed to load trace from {:?}", path))?;
    Ok(Arc::new(trace))
}

/// Frontend settings from the configured file, defaults when none is configured
pub fn load_settings(config: &Config) -> Result<FrontendSettings> {
    match &config.settings.path {
        Some(path) => FrontendSettings::from_file(path),
        None => Ok(FrontendSettings::default()),
    }
}
