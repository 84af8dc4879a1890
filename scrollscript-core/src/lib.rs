//! ScrollScript Core - Fundamental types
//!
//! This crate provides the types shared by the parser and the runtime:
//! - `Value`: Coerced DSL values (numbers, booleans, text, deferred `calc(...)`)
//! - `ScriptError` / `Diagnostic`: Structured errors and `{message, line}` diagnostics
//! - `BuiltConfig`: The tween/timeline configuration handed to the runtime
//! - `Settings`: Breakpoints, capability flag, defaults and timings

mod value;
mod error;
mod config;
mod settings;

pub use value::{Value, ValueMap, is_calc_expression};
pub use error::{ScriptError, Diagnostic, Severity, codes};
pub use config::{
    AnimationSpec, BuiltConfig, Condition, ConditionKind, ConditionVariant, Step, StepMethod,
    TargetKind, TargetSpec, TimelineConfig, TimelineOverride, TimelineVars, TweenConfig,
    TweenMethod, TweenOverride, WidgetKind, canonical_slug, is_special_tag,
    DEFAULT_RANGE_SLUG, DESKTOP_ALIAS, SPECIAL_CONDITION_TAGS,
};
pub use settings::{BreakpointDef, Settings, SettingsError, SETTINGS_ENV};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{BuiltConfig, Diagnostic, ScriptError, Settings, Severity, Value, ValueMap};
    pub use crate::error::codes;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod value_tests {
        use super::*;

        #[test]
        fn test_json_integer_stays_integer() {
            let v = Value::from_json(json!(3));
            assert_eq!(v, Value::Int(3));
            assert_eq!(v.as_i64(), Some(3));
        }

        #[test]
        fn test_json_float_stays_float() {
            let v: Value = serde_json::from_str("50.0").unwrap();
            assert_eq!(v, Value::Number(50.0));
            assert_eq!(serde_json::to_string(&v).unwrap(), "50.0");
        }

        #[test]
        fn test_calc_string_is_deferred() {
            let v = Value::from_json(json!("calc(sw * -1)"));
            assert!(v.is_deferred());
            assert_eq!(v.to_json(), json!("calc(sw * -1)"));

            let plain = Value::from_json(json!("calculator"));
            assert_eq!(plain, Value::Text("calculator".to_string()));
        }

        #[test]
        fn test_calc_text_keeps_variant_through_json() {
            let v = Value::from("calc(vw / 2)");
            assert_eq!(v, Value::Expr("calc(vw / 2)".to_string()));
            assert_eq!(v.as_text(), Some("calc(vw / 2)"));

            let mut map = ValueMap::new();
            map.insert("snap".to_string(), Value::text("calc(sw)"));
            map.insert("start".to_string(), Value::from("top 80%"));
            let original = Value::Object(map);
            let json = serde_json::to_string(&original).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, original);
        }

        #[test]
        fn test_contains_deferred_nested() {
            let mut inner = ValueMap::new();
            inner.insert("x".to_string(), Value::Expr("calc(vw)".to_string()));
            let v = Value::List(vec![Value::Int(1), Value::Object(inner)]);
            assert!(v.contains_deferred());
            assert!(!Value::List(vec![Value::Int(1)]).contains_deferred());
        }

        #[test]
        fn test_display() {
            let mut map = ValueMap::new();
            map.insert("y".to_string(), Value::Number(50.0));
            map.insert("opacity".to_string(), Value::Int(0));
            assert_eq!(Value::Object(map).to_string(), "{opacity=0, y=50}");
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_warning_to_diagnostic() {
            let err = ScriptError::missing_separator(4);
            assert!(err.is_warning());
            let diag: Diagnostic = err.into();
            assert_eq!(diag.line, Some(4));
            assert_eq!(diag.message, "Expected 'key: value'");
        }

        #[test]
        fn test_internal_is_fatal() {
            let err = ScriptError::internal("pattern failed to compile");
            assert_eq!(err.severity, Severity::Fatal);
            assert!(err.to_string().starts_with("[INTERNAL]"));
        }

        #[test]
        fn test_diagnostic_wire_shape() {
            let diag = Diagnostic::new("Empty script.", None);
            assert_eq!(serde_json::to_value(&diag).unwrap(), json!({"message": "Empty script.", "line": null}));
        }
    }

    mod config_tests {
        use super::*;
        use std::collections::{BTreeMap, BTreeSet};

        fn sample_tween() -> BuiltConfig {
            let mut media = BTreeMap::new();
            let mut anim = ValueMap::new();
            anim.insert("duration".to_string(), Value::Number(0.4));
            media.insert("mobile".to_string(), TweenOverride { animation: anim, strict: true, ..Default::default() });

            let mut disabled = BTreeSet::new();
            disabled.insert("tablet".to_string());

            let mut rm = ValueMap::new();
            rm.insert("duration".to_string(), Value::Int(0));

            BuiltConfig::Tween(TweenConfig {
                id: "w1".to_string(),
                target: TargetSpec::wrapper(".w1"),
                animation: AnimationSpec::default(),
                scroll_trigger: Settings::default().scroll_trigger_defaults,
                media,
                conditions: vec![ConditionVariant {
                    key: "reduced-motion".to_string(),
                    condition: Condition::single("reduced-motion"),
                    variant: TweenOverride { animation: rm, ..Default::default() },
                }],
                disabled,
            })
        }

        #[test]
        fn test_widget_tag() {
            let json = serde_json::to_value(sample_tween()).unwrap();
            assert_eq!(json["widget"], "scroll_animation");
            assert_eq!(json["animation"]["type"], "from");
            assert_eq!(json["animation"]["ease"], "power2.out");
            assert_eq!(json["media"]["mobile"]["strict"], true);
            assert_eq!(json["conditions"][0]["type"], "single");
            assert_eq!(json["conditions"][0]["tags"], json!(["reduced-motion"]));
        }

        #[test]
        fn test_round_trip() {
            let config = sample_tween();
            let text = config.to_json_string().unwrap();
            let back = BuiltConfig::from_json_str(&text).unwrap();
            assert_eq!(back, config);
        }

        #[test]
        fn test_disabled_desktop_alias() {
            let mut config = sample_tween();
            if let BuiltConfig::Tween(ref mut c) = config {
                c.disabled.insert("desktop".to_string());
            }
            assert!(config.is_disabled(DEFAULT_RANGE_SLUG));
            assert!(config.is_disabled("tablet"));
            assert!(!config.is_disabled("mobile"));
        }

        #[test]
        fn test_condition_keys() {
            assert_eq!(Condition::single("mobile").key(), "mobile");
            assert_eq!(Condition::any(vec!["mobile".into(), "tablet".into()]).key(), "mobile|tablet");
            assert_eq!(Condition::all(vec!["mobile".into(), "dark".into()]).key(), "mobile+dark");
            assert_eq!(Condition::single("mobile").media_slug(), Some("mobile"));
            assert_eq!(Condition::single("dark").media_slug(), None);
            assert!(Condition::all(vec!["dark".into(), "retina".into()]).is_device_only());
        }

        #[test]
        fn test_step_method_parse() {
            assert_eq!(StepMethod::parse("fromTo"), Some(StepMethod::FromTo));
            assert_eq!(StepMethod::parse("ADDLABEL"), Some(StepMethod::AddLabel));
            assert_eq!(StepMethod::parse("tween"), None);
            assert!(!StepMethod::Call.produces_tween());
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let s = Settings::default();
            assert_eq!(s.breakpoints.len(), 2);
            assert!(s.is_breakpoint("mobile"));
            assert!(!s.pro);
        }

        #[test]
        fn test_partial_json_keeps_defaults() {
            let s = Settings::from_json_str(r#"{"pro": true, "breakpoints": [{"key": "phone", "value": 600}]}"#).unwrap();
            assert!(s.pro);
            assert_eq!(s.breakpoints, vec![BreakpointDef::new("phone", 600)]);
            assert_eq!(s.reinit_debounce_ms, 150);
            assert!(s.scroll_trigger_defaults.contains_key("start"));
        }

        #[test]
        fn test_invalid_json() {
            assert!(matches!(Settings::from_json_str("{"), Err(SettingsError::Json(_))));
        }
    }
}
