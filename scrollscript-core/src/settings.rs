//! Process-level settings
//!
//! Breakpoint thresholds, the "pro" capability flag, scrollTrigger defaults
//! and runtime timings. Loaded from JSON; every field has a default.

use crate::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming a settings JSON file
pub const SETTINGS_ENV: &str = "SCROLLSCRIPT_SETTINGS";

/// Error type for loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Named viewport-width threshold (inclusive upper bound of its range)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointDef {
    pub key: String,
    pub value: u32,
}

impl BreakpointDef {
    pub fn new(key: impl Into<String>, value: u32) -> Self {
        Self { key: key.into(), value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Breakpoint thresholds, ascending by value
    pub breakpoints: Vec<BreakpointDef>,
    /// Enables the extended special conditions (`dark`, `retina`, `no-hover`)
    pub pro: bool,
    /// Merged underneath every built scrollTrigger block
    pub scroll_trigger_defaults: ValueMap,
    pub reinit_debounce_ms: u64,
    pub preview_cooldown_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let mut scroll_trigger_defaults = ValueMap::new();
        scroll_trigger_defaults.insert("start".to_string(), Value::from("top 80%"));
        scroll_trigger_defaults.insert("end".to_string(), Value::from("bottom 20%"));
        scroll_trigger_defaults.insert("toggleActions".to_string(), Value::from("play none none none"));

        Self {
            breakpoints: vec![BreakpointDef::new("mobile", 767), BreakpointDef::new("tablet", 1024)],
            pro: false,
            scroll_trigger_defaults,
            reinit_debounce_ms: 150,
            preview_cooldown_ms: 300,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Load from the file named by `SCROLLSCRIPT_SETTINGS`, or defaults when unset
    pub fn from_env() -> Result<Self, SettingsError> {
        match std::env::var(SETTINGS_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn with_breakpoints(mut self, breakpoints: Vec<BreakpointDef>) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn with_pro(mut self, pro: bool) -> Self {
        self.pro = pro;
        self
    }

    /// True if `slug` names one of the configured breakpoints
    pub fn is_breakpoint(&self, slug: &str) -> bool {
        self.breakpoints.iter().any(|b| b.key == slug)
    }
}
