//! Validation request/response

use crate::build::BuildMode;
use scrollscript_core::{BuiltConfig, Diagnostic};
use serde::{Deserialize, Serialize};

/// Id used for the built config when the request names no widget
pub const DEFAULT_WIDGET_ID: &str = "scrollscript";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub script: String,
    #[serde(default)]
    pub mode: BuildMode,
    #[serde(default)]
    pub lint_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
}

impl ValidationRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            mode: BuildMode::Auto,
            lint_only: false,
            widget_id: None,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn lint_only(mut self) -> Self {
        self.lint_only = true;
        self
    }

    pub fn with_widget_id(mut self, id: impl Into<String>) -> Self {
        self.widget_id = Some(id.into());
        self
    }

    pub fn widget_id(&self) -> &str {
        self.widget_id.as_deref().unwrap_or(DEFAULT_WIDGET_ID)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub ok: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub config: Option<BuiltConfig>,
}

impl ValidationResponse {
    pub fn failed(errors: Vec<Diagnostic>, warnings: Vec<Diagnostic>) -> Self {
        Self { ok: false, errors, warnings, config: None }
    }

    pub fn passed(warnings: Vec<Diagnostic>, config: Option<BuiltConfig>) -> Self {
        Self { ok: true, errors: Vec::new(), warnings, config }
    }
}
