//! ScrollScript - scroll animation DSL
//!
//! Parses the line-oriented animation script, coerces values and builds the
//! tween or timeline config the runtime resolves per breakpoint.

mod ast;
mod build;
mod coerce;
mod parser;
mod validate;

pub use ast::{
    ConditionScope, FieldMap, MediaScope, ParsedDocument, RawStep, ScopeTimeline, Sourced,
    TimelineBlock,
};
pub use build::{
    animation_spec, build, build_timeline, build_tween, normalize_step, BuildMode, BuildOptions,
    BuildOutput,
};
pub use coerce::{
    bool_number_or_string, deferred_expression, is_numeric, parse_bool, parse_integer,
    parse_number, parse_vars_list, smart_value, split_top_level,
};
pub use parser::{parse, strip_comment};
pub use validate::{ValidationRequest, ValidationResponse, DEFAULT_WIDGET_ID};

use scrollscript_core::{ScriptError, Settings, TargetSpec};
use tracing::debug;

/// Main ScrollScript engine
#[derive(Debug, Clone, Default)]
pub struct ScrollScript {
    settings: Settings,
}

impl ScrollScript {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn parse(&self, script: &str) -> Result<ParsedDocument, ScriptError> {
        parser::parse(script)
    }

    /// Build options seeded from settings
    pub fn options(&self, element_id: &str, target: TargetSpec, mode: BuildMode) -> BuildOptions {
        BuildOptions::new(element_id, self.settings.scroll_trigger_defaults.clone())
            .with_target(target)
            .with_mode(mode)
    }

    /// Parse and build; parse warnings come first in the output
    pub fn compile(
        &self,
        script: &str,
        element_id: &str,
        target: TargetSpec,
        mode: BuildMode,
    ) -> Result<BuildOutput, ScriptError> {
        let doc = self.parse(script)?;
        let mut out = build::build(&doc, &self.options(element_id, target, mode));
        let mut warnings = doc.warnings;
        warnings.append(&mut out.warnings);
        out.warnings = warnings;
        Ok(out)
    }

    pub fn validate(&self, request: &ValidationRequest) -> ValidationResponse {
        if request.script.trim().is_empty() {
            return ValidationResponse::failed(vec![ScriptError::empty_script().into()], Vec::new());
        }

        let doc = match self.parse(&request.script) {
            Ok(doc) => doc,
            Err(e) => return ValidationResponse::failed(vec![e.into()], Vec::new()),
        };

        let mut warnings = doc.warnings.clone();
        let config = if request.lint_only {
            None
        } else {
            let options = self.options(request.widget_id(), TargetSpec::default(), request.mode);
            let mut out = build::build(&doc, &options);
            warnings.append(&mut out.warnings);
            Some(out.config)
        };

        debug!(
            lint_only = request.lint_only,
            warnings = warnings.len(),
            "validated script"
        );
        ValidationResponse::passed(warnings, config)
    }
}
