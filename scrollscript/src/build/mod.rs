//! Config builders
//!
//! Project a `ParsedDocument` onto the `BuiltConfig` shape the runtime
//! consumes. Single non-special condition scopes become `media` entries; OR/AND
//! groups and device conditions become ordered `conditions` entries.

mod timeline;
mod tween;

pub use timeline::{build_timeline, normalize_step};
pub use tween::{animation_spec, build_tween};

use crate::ast::{FieldMap, MediaScope, ParsedDocument};
use scrollscript_core::{
    canonical_slug, BuiltConfig, Condition, Diagnostic, ScriptError, TargetSpec, Value, ValueMap,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Which widget shape to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Timeline when the script declares steps, tween otherwise
    #[default]
    Auto,
    Tween,
    Timeline,
}

/// Host-supplied inputs to a build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub element_id: String,
    pub scroll_trigger_defaults: ValueMap,
    /// Target used when the script has no `[target] selector`
    pub target: TargetSpec,
    pub mode: BuildMode,
}

impl BuildOptions {
    pub fn new(element_id: impl Into<String>, scroll_trigger_defaults: ValueMap) -> Self {
        Self {
            element_id: element_id.into(),
            scroll_trigger_defaults,
            target: TargetSpec::default(),
            mode: BuildMode::Auto,
        }
    }

    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.target = target;
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub config: BuiltConfig,
    pub warnings: Vec<Diagnostic>,
}

/// Build the widget config selected by `options.mode`
pub fn build(parsed: &ParsedDocument, options: &BuildOptions) -> BuildOutput {
    let mut warnings = Vec::new();

    let use_timeline = match options.mode {
        BuildMode::Auto => parsed.has_steps(),
        BuildMode::Timeline => {
            if !parsed.has_steps() {
                warnings.push(
                    ScriptError::build_warning("Timeline mode requested but the script has no [step.N] sections")
                        .into(),
                );
            }
            true
        }
        BuildMode::Tween => {
            if parsed.has_steps() {
                warnings.push(
                    ScriptError::build_warning("Tween mode requested; [step.N] sections are ignored").into(),
                );
            }
            false
        }
    };

    let config = if use_timeline {
        BuiltConfig::Timeline(build_timeline(parsed, options, &mut warnings))
    } else {
        BuiltConfig::Tween(build_tween(parsed, options, &mut warnings))
    };

    debug!(
        widget = config.kind().as_str(),
        media = config.media_slugs().len(),
        warnings = warnings.len(),
        "built config"
    );

    BuildOutput { config, warnings }
}

/// Where a condition scope's override is stored
pub(crate) enum ScopeRoute<'a> {
    Media(String),
    Condition(&'a str, &'a Condition),
}

/// Populated scopes in first-appearance order
pub(crate) fn routed_scopes(parsed: &ParsedDocument) -> Vec<(ScopeRoute<'_>, &MediaScope)> {
    parsed
        .conditions
        .iter()
        .filter_map(|scope| {
            let media = parsed.media.get(&scope.key).filter(|m| !m.is_empty())?;
            let route = match scope.condition.media_slug() {
                Some(slug) => ScopeRoute::Media(canonical_slug(slug).to_string()),
                None => ScopeRoute::Condition(&scope.key, &scope.condition),
            };
            Some((route, media))
        })
        .collect()
}

/// Strip provenance
pub(crate) fn plain(fields: &FieldMap) -> ValueMap {
    fields.iter().map(|(k, s)| (k.clone(), s.value.clone())).collect()
}

/// Remove `strict` from a block and report whether it was set
pub(crate) fn take_strict(map: &mut ValueMap) -> bool {
    map.remove("strict").and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Settings defaults overlaid with the parsed scroll block
pub(crate) fn scroll_trigger(defaults: &ValueMap, parsed: &FieldMap) -> ValueMap {
    let mut merged = defaults.clone();
    merged.extend(plain(parsed));
    merged.remove("strict");
    merged
}

fn selector_of(fields: &FieldMap) -> Option<&str> {
    fields
        .get("selector")
        .and_then(|s| s.value.as_text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A parsed selector forces a custom target; otherwise the host's target stands
pub(crate) fn resolve_target(host: &TargetSpec, fields: &FieldMap) -> TargetSpec {
    match selector_of(fields) {
        Some(selector) => TargetSpec::custom(selector),
        None => host.clone(),
    }
}

pub(crate) fn override_target(fields: &FieldMap) -> Option<TargetSpec> {
    selector_of(fields).map(TargetSpec::custom)
}

pub(crate) fn canonical_disabled(parsed: &ParsedDocument) -> BTreeSet<String> {
    parsed.disabled.iter().map(|s| canonical_slug(s).to_string()).collect()
}

pub(crate) fn is_true(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use scrollscript_core::{Settings, TargetKind, WidgetKind, DEFAULT_RANGE_SLUG};

    fn options() -> BuildOptions {
        BuildOptions::new("w1", Settings::default().scroll_trigger_defaults)
    }

    #[test]
    fn test_auto_mode_selects_widget() {
        let tween = build(&parse("[animation]\nduration: 1").unwrap(), &options());
        assert_eq!(tween.config.kind(), WidgetKind::ScrollAnimation);

        let timeline = build(&parse("[step.1]\nto: x=1").unwrap(), &options());
        assert_eq!(timeline.config.kind(), WidgetKind::ScrollTimeline);
    }

    #[test]
    fn test_forced_modes_warn() {
        let doc = parse("[animation]\nduration: 1").unwrap();
        let out = build(&doc, &options().with_mode(BuildMode::Timeline));
        assert_eq!(out.config.kind(), WidgetKind::ScrollTimeline);
        assert_eq!(out.warnings.len(), 1);

        let doc = parse("[step.1]\nto: x=1").unwrap();
        let out = build(&doc, &options().with_mode(BuildMode::Tween));
        assert_eq!(out.config.kind(), WidgetKind::ScrollAnimation);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_scope_routing() {
        let script = "[animation @mobile]\nduration: 1\n[animation @mobile @tablet]\nduration: 2\n[animation @reduced-motion]\nduration: 0\n[animation @desktop]\nduration: 3";
        let out = build(&parse(script).unwrap(), &options());
        let BuiltConfig::Tween(config) = out.config else { panic!("expected tween") };

        assert_eq!(
            config.media.keys().cloned().collect::<Vec<_>>(),
            vec![DEFAULT_RANGE_SLUG.to_string(), "mobile".to_string()]
        );
        let keys: Vec<&str> = config.conditions.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["mobile|tablet", "reduced-motion"]);
    }

    #[test]
    fn test_empty_scope_omitted() {
        let out = build(&parse("[animation @mobile]\n[animation]\nduration: 1").unwrap(), &options());
        assert!(out.config.media_slugs().is_empty());
    }

    #[test]
    fn test_target_override() {
        let out = build(&parse("[target]\nselector: .card").unwrap(), &options());
        assert_eq!(out.config.target(), &TargetSpec::custom(".card"));

        let host = options().with_target(TargetSpec::wrapper("#w1"));
        let out = build(&parse("[animation]\nduration: 1").unwrap(), &host);
        assert_eq!(out.config.target().kind, TargetKind::Wrapper);
        assert_eq!(out.config.target().selector, "#w1");
    }

    #[test]
    fn test_disabled_alias_canonical() {
        let out = build(&parse("[disable @desktop @mobile]").unwrap(), &options());
        assert!(out.config.disabled().contains(DEFAULT_RANGE_SLUG));
        assert!(out.config.is_disabled("desktop"));
        assert!(out.config.is_disabled("mobile"));
    }

    #[test]
    fn test_json_round_trip() {
        let script = "[animation]\ntype: fromTo\nfrom: x=calc_scroll_width_neg, opacity=0\nto: x=0\nrepeat: 2\nyoyo: true\n[scroll]\nscrub: true\n[animation @mobile]\nduration: 0,4\nstrict: true\n[scroll @mobile+@dark]\nmarkers: yes\n[disable @tablet]";
        let out = build(&parse(script).unwrap(), &options());
        let json = out.config.to_json_string().unwrap();
        let back = BuiltConfig::from_json_str(&json).unwrap();
        assert_eq!(back, out.config);

        let timeline = "[timeline]\ndefaults.ease: none\n[step.1]\ntype: fromTo\nfrom: x=0\nto: x=100\nduration: 1\n[step.2]\ntype: addLabel\nlabel: mid\n[step.1 @mobile]\nto: x=50";
        let out = build(&parse(timeline).unwrap(), &options());
        let json = out.config.to_json_string().unwrap();
        assert_eq!(BuiltConfig::from_json_str(&json).unwrap(), out.config);
    }
}
