use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Build metadata the frontend shows in its footer
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildInfo {
    pub hide_version: bool,
    pub version: String,
    pub commit: String,
    pub edition: String,
    pub env: String,
}

/// The part of the frontend settings payload the trace view reads.
///
/// Keys are camelCase as served to the browser; unknown keys are ignored so a
/// full settings document can be loaded as is.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendSettings {
    pub app_url: String,
    pub app_sub_url: String,
    pub explore_enabled: bool,
    pub feature_toggles: HashMap<String, bool>,
    pub build_info: BuildInfo,
}

impl Default for FrontendSettings {
    fn default() -> Self {
        Self {
            app_url: String::new(),
            app_sub_url: String::new(),
            explore_enabled: true,
            feature_toggles: HashMap::new(),
            build_info: BuildInfo::default(),
        }
    }
}

impl FrontendSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse frontend settings")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read frontend settings {:?}", path.as_ref()))?;
        Self::from_json(&contents)
    }

    pub fn is_feature_enabled(&self, name: &str) -> bool {
        self.feature_toggles.get(name).copied().unwrap_or(false)
    }

    /// Sub-path prefix for in-app links, without a trailing slash
    pub fn link_prefix(&self) -> &str {
        self.app_sub_url.trim_end_matches('/')
    }
}
