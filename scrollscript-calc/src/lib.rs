//! ScrollScript Calc - deferred `calc(...)` evaluation
//!
//! A `calc(...)` value is compiled once into a normalized body, then
//! evaluated against live geometry whenever an animation is attached:
//!
//! 1. `2sw` style adjacency is rewritten to `2 * sw`
//! 2. variables are substituted as literal numbers (longest name first)
//! 3. anything outside digits, `.`, `+ - * /`, parentheses and whitespace
//!    fails closed to `0`
//! 4. the numeric string is parsed once and cached by its substituted text
//!
//! Evaluation never returns an error to the caller. Failures log a warning
//! and yield `0.0`.

mod expr;
mod geometry;

pub use expr::{ExprError, Expr, Op, parse_expr, eval_expr, MAX_DEPTH};
pub use geometry::{Geometry, VARIABLE_NAMES};

use regex::Regex;
use scrollscript_core::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

fn adjacency_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d)(sw|cw|ch|vw|vh)").ok())
        .as_ref()
}

/// Compiled-expression cache keyed by fully substituted expression text
#[derive(Debug, Default)]
pub struct ExpressionCache {
    compiled: Mutex<HashMap<String, Arc<Expr>>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.compiled.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut compiled) = self.compiled.lock() {
            compiled.clear();
        }
    }

    fn get_or_compile(&self, substituted: &str) -> Result<Arc<Expr>, ExprError> {
        if let Ok(compiled) = self.compiled.lock() {
            if let Some(expr) = compiled.get(substituted) {
                return Ok(expr.clone());
            }
        }

        let expr = Arc::new(parse_expr(substituted)?);
        if let Ok(mut compiled) = self.compiled.lock() {
            compiled.insert(substituted.to_string(), expr.clone());
        }
        Ok(expr)
    }
}

/// A `calc(...)` expression ready to be evaluated against geometry
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    body: String,
}

/// Normalize `calc(<body>)` text into an evaluator
pub fn compile_expression(text: &str) -> CompiledExpression {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("calc(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);

    let body = match adjacency_pattern() {
        Some(re) => re.replace_all(body, "$1 * $2").into_owned(),
        None => body.to_string(),
    };

    CompiledExpression { source: trimmed.to_string(), body }
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Body after adjacency rewriting, before substitution
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Evaluate against live geometry; fails closed to `0.0`
    pub fn evaluate(&self, geometry: &Geometry, cache: &ExpressionCache) -> f64 {
        match self.try_evaluate(geometry, cache) {
            Ok(value) => value,
            Err(e) => {
                warn!(expression = %self.source, error = %e, "calc expression failed, using 0");
                0.0
            }
        }
    }

    pub fn try_evaluate(&self, geometry: &Geometry, cache: &ExpressionCache) -> Result<f64, ExprError> {
        let substituted = geometry.substitute(&self.body);

        // Safety gate: only numbers and arithmetic survive substitution
        let leftover: String = substituted
            .chars()
            .filter(|c| !(c.is_ascii_digit() || ".+-*/()".contains(*c) || c.is_whitespace()))
            .collect();
        if !leftover.is_empty() {
            return Err(ExprError::UnsafeCharacters(leftover));
        }

        let expr = cache.get_or_compile(substituted.trim())?;
        eval_expr(&expr)
    }
}

/// Compile and evaluate in one step
pub fn evaluate(text: &str, geometry: &Geometry, cache: &ExpressionCache) -> f64 {
    compile_expression(text).evaluate(geometry, cache)
}

/// Replace every deferred expression inside `value` with its current number
pub fn materialize(value: &Value, geometry: &Geometry, cache: &ExpressionCache) -> Value {
    match value {
        Value::Expr(text) => Value::Number(evaluate(text, geometry, cache)),
        Value::List(items) => Value::List(items.iter().map(|v| materialize(v, geometry, cache)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), materialize(v, geometry, cache)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollscript_core::ValueMap;

    fn element() -> Geometry {
        Geometry::new(1440.0, 900.0).with_element(800.0, 300.0, 1200.0)
    }

    #[test]
    fn test_negative_scroll_width() {
        let cache = ExpressionCache::new();
        assert_eq!(evaluate("calc(sw * -1)", &element(), &cache), -400.0);
    }

    #[test]
    fn test_adjacency_rewrite() {
        let compiled = compile_expression("calc(2sw + 10)");
        assert_eq!(compiled.body(), "2 * sw + 10");
        let cache = ExpressionCache::new();
        assert_eq!(compiled.evaluate(&element(), &cache), 810.0);
    }

    #[test]
    fn test_deeply_nested_fails_closed() {
        let cache = ExpressionCache::new();
        let text = format!("calc({}sw{})", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(evaluate(&text, &element(), &cache), 0.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_center_variables() {
        let cache = ExpressionCache::new();
        assert_eq!(evaluate("calc(center)", &element(), &cache), 320.0);
        assert_eq!(evaluate("calc(vcenter)", &element(), &cache), 300.0);
        assert_eq!(evaluate("calc(vh / 2 - ch)", &element(), &cache), 150.0);
    }

    #[test]
    fn test_unknown_identifier_fails_closed() {
        let cache = ExpressionCache::new();
        let compiled = compile_expression("calc(window.close())");
        assert!(matches!(compiled.try_evaluate(&element(), &cache), Err(ExprError::UnsafeCharacters(_))));
        assert_eq!(compiled.evaluate(&element(), &cache), 0.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_division_by_zero_yields_zero() {
        let cache = ExpressionCache::new();
        assert_eq!(evaluate("calc(vw / 0)", &element(), &cache), 0.0);
    }

    #[test]
    fn test_cache_keyed_by_substituted_text() {
        let cache = ExpressionCache::new();
        let compiled = compile_expression("calc(sw * -1)");
        compiled.evaluate(&element(), &cache);
        compiled.evaluate(&element(), &cache);
        assert_eq!(cache.len(), 1);

        let wider = Geometry::new(1440.0, 900.0).with_element(800.0, 300.0, 1600.0);
        assert_eq!(compiled.evaluate(&wider, &cache), -800.0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_materialize_nested() {
        let cache = ExpressionCache::new();
        let mut vars = ValueMap::new();
        vars.insert("x".to_string(), Value::Expr("calc(sw * -1)".to_string()));
        vars.insert("opacity".to_string(), Value::Int(1));
        let out = materialize(&Value::Object(vars), &element(), &cache);
        let map = out.as_object().unwrap();
        assert_eq!(map["x"], Value::Number(-400.0));
        assert_eq!(map["opacity"], Value::Int(1));
        assert!(!out.contains_deferred());
    }
}
