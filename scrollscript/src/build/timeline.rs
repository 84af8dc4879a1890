//! Timeline builder

use super::{
    canonical_disabled, override_target, plain, resolve_target, routed_scopes, scroll_trigger,
    take_strict, BuildOptions, ScopeRoute,
};
use crate::ast::{MediaScope, ParsedDocument, RawStep};
use scrollscript_core::{
    ConditionVariant, Diagnostic, ScriptError, Step, StepMethod, TimelineConfig, TimelineOverride,
    TimelineVars, Value, ValueMap,
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Step keys that are not tween vars
const STRUCTURAL_KEYS: &[&str] = &["type", "from", "to", "selector", "position", "label", "split"];

/// Base timeline plus merged per-slug overrides
pub fn build_timeline(
    parsed: &ParsedDocument,
    options: &BuildOptions,
    warnings: &mut Vec<Diagnostic>,
) -> TimelineConfig {
    let ignored: Vec<&String> = parsed.animation.keys().filter(|k| k.as_str() != "strict").collect();
    if !ignored.is_empty() {
        warnings.push(
            ScriptError::build_warning(format!(
                "[animation] properties are ignored by timeline widgets: {}",
                ignored.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
            ))
            .into(),
        );
    }

    let mut defaults = plain(&parsed.timeline.defaults);
    defaults.remove("strict");

    let timeline_vars = TimelineVars {
        defaults,
        scroll_trigger: scroll_trigger(&options.scroll_trigger_defaults, &parsed.scroll),
    };

    let mut media = BTreeMap::new();
    let mut conditions = Vec::new();

    for (route, scope) in routed_scopes(parsed) {
        let variant = timeline_override(&parsed.timeline.steps, scope);
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

    TimelineConfig {
        id: options.element_id.clone(),
        target: resolve_target(&options.target, &parsed.target),
        timeline_vars,
        steps: parsed.timeline.steps.iter().map(normalize_step).collect(),
        media,
        conditions,
        disabled: canonical_disabled(parsed),
    }
}

fn timeline_override(base_steps: &[RawStep], scope: &MediaScope) -> TimelineOverride {
    let steps = if scope.timeline.steps.is_empty() {
        None
    } else {
        let mut merged: BTreeMap<u32, RawStep> =
            base_steps.iter().map(|s| (s.index, s.clone())).collect();
        for (index, step) in &scope.timeline.steps {
            match merged.get_mut(index) {
                Some(existing) => existing.merge_from(step),
                None => {
                    merged.insert(*index, step.clone());
                }
            }
        }
        Some(merged.values().map(normalize_step).collect())
    };

    let mut defaults = plain(&scope.timeline.defaults);
    let mut scroll = plain(&scope.scroll);
    let strict = take_strict(&mut defaults)
        | take_strict(&mut scroll)
        | scope.animation.get("strict").and_then(|s| s.value.as_bool()).unwrap_or(false);

    let vars = TimelineVars { defaults, scroll_trigger: scroll };

    TimelineOverride {
        steps,
        timeline_vars: (!vars.is_empty()).then_some(vars),
        target: override_target(&scope.target),
        strict,
    }
}

/// Turn a raw step into `{method, selector, vars, vars2, position}`
pub fn normalize_step(raw: &RawStep) -> Step {
    let method = raw
        .get("type")
        .and_then(Value::as_text)
        .and_then(StepMethod::parse)
        .unwrap_or_default();

    let side = |key: &str| -> ValueMap {
        raw.get(key).and_then(Value::as_object).cloned().unwrap_or_default()
    };

    let shared: ValueMap = raw
        .fields
        .iter()
        .filter(|(key, _)| !STRUCTURAL_KEYS.contains(&key.as_str()))
        .map(|(key, sourced)| (key.clone(), sourced.value.clone()))
        .collect();

    let with_shared = |mut vars: ValueMap| -> ValueMap {
        vars.extend(shared.clone());
        vars
    };

    let (vars, vars2) = match method {
        StepMethod::FromTo => (Value::Object(side("from")), Some(with_shared(side("to")))),
        StepMethod::From => (Value::Object(with_shared(side("from"))), None),
        StepMethod::To | StepMethod::Set => (Value::Object(with_shared(side("to"))), None),
        StepMethod::AddLabel => {
            let label = raw
                .get("label")
                .and_then(Value::as_text)
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(fallback_label);
            (Value::text(label), None)
        }
        StepMethod::Call => (Value::Object(ValueMap::new()), None),
    };

    Step {
        method,
        selector: raw.get("selector").and_then(Value::as_text).map(str::to_string),
        vars,
        vars2,
        position: raw.get("position").cloned(),
        split: raw.get("split").and_then(Value::as_text).map(str::to_string),
    }
}

fn fallback_label() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("label-{}", &id[..8])
}
