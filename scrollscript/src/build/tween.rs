//! Single-tween builder

use super::{
    canonical_disabled, is_true, override_target, plain, resolve_target, routed_scopes,
    scroll_trigger, take_strict, BuildOptions, ScopeRoute,
};
use crate::ast::{FieldMap, MediaScope, ParsedDocument};
use scrollscript_core::{
    AnimationSpec, ConditionVariant, Diagnostic, ScriptError, TweenConfig, TweenMethod,
    TweenOverride, Value,
};
use std::collections::BTreeMap;

/// Base tween with defaults filled in. Overrides stay sparse; the resolver
/// merges them per range.
pub fn build_tween(
    parsed: &ParsedDocument,
    options: &BuildOptions,
    warnings: &mut Vec<Diagnostic>,
) -> TweenConfig {
    let mut media = BTreeMap::new();
    let mut conditions = Vec::new();

    for (route, scope) in routed_scopes(parsed) {
        if !scope.timeline.steps.is_empty() || !scope.timeline.defaults.is_empty() {
            warnings.push(
                ScriptError::build_warning("Timeline overrides are ignored by single-tween widgets").into(),
            );
        }
        let variant = tween_override(scope);
        if variant.is_empty() {
            continue;
        }
        match route {
            ScopeRoute::Media(slug) => {
                media.insert(slug, variant);
            }
            ScopeRoute::Condition(key, condition) => conditions.push(ConditionVariant {
                key: key.to_string(),
                condition: condition.clone(),
                variant,
            }),
        }
    }

    TweenConfig {
        id: options.element_id.clone(),
        target: resolve_target(&options.target, &parsed.target),
        animation: animation_spec(&parsed.animation),
        scroll_trigger: scroll_trigger(&options.scroll_trigger_defaults, &parsed.scroll),
        media,
        conditions,
        disabled: canonical_disabled(parsed),
    }
}

/// Apply parsed animation fields over the defaults
pub fn animation_spec(fields: &FieldMap) -> AnimationSpec {
    let mut spec = AnimationSpec::default();

    for (key, sourced) in fields {
        let value = &sourced.value;
        match key.as_str() {
            "type" => {
                if let Some(method) = value.as_text().and_then(TweenMethod::parse) {
                    spec.method = method;
                }
            }
            "from" => {
                if let Value::Object(map) = value {
                    spec.from = map.clone();
                }
            }
            "to" => {
                if let Value::Object(map) = value {
                    spec.to = map.clone();
                }
            }
            "duration" => spec.duration = value.as_f64().unwrap_or(spec.duration),
            "delay" => spec.delay = value.as_f64().unwrap_or(spec.delay),
            "ease" => spec.ease = value.clone(),
            "stagger" => spec.stagger = value.clone(),
            "strict" => {}
            _ => {
                spec.extra.insert(key.clone(), value.clone());
            }
        }
    }

    spec
}

fn tween_override(scope: &MediaScope) -> TweenOverride {
    let mut animation = plain(&scope.animation);
    let mut scroll_trigger = plain(&scope.scroll);
    let strict = take_strict(&mut animation) | take_strict(&mut scroll_trigger);

    TweenOverride {
        animation,
        scroll_trigger,
        target: override_target(&scope.target),
        strict: strict || is_true(scope.timeline.defaults.get("strict").map(|s| &s.value)),
    }
}
