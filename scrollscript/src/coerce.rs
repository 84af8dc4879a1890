//! Scalar coercion and the vars-list micro-syntax
//!
//! Raw DSL text becomes a typed `Value`. Strings that look like `calc(...)`
//! (or one of the legacy keywords) are only tagged as deferred here; they are
//! evaluated at attach time against live geometry.

use scrollscript_core::{is_calc_expression, Value, ValueMap};

/// Legacy keywords and the expressions they stand for
const CALC_KEYWORDS: &[(&str, &str)] = &[
    ("calc_scroll_width_neg", "calc(sw * -1)"),
    ("calc_scroll_width", "calc(sw)"),
    ("calc_100vh", "calc(vh)"),
];

/// Check if text is a plain number literal (sign, digits, one decimal point, exponent)
pub fn is_numeric(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    // Rejects "inf", "NaN" and friends that f64 parsing would accept
    if !text.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E')) {
        return false;
    }
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    text.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}

/// Parse a number, accepting a locale decimal comma (`0,5`)
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if is_numeric(text) {
        return text.parse().ok();
    }
    if text.matches(',').count() == 1 && !text.contains('=') {
        let swapped = text.replace(',', ".");
        if is_numeric(&swapped) {
            return swapped.parse().ok();
        }
    }
    None
}

/// `true/yes/on` and `false/no/off`, case-insensitive
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Integer field; accepts `2`, `-1` and integral floats like `3.0`
pub fn parse_integer(text: &str) -> Option<i64> {
    let n = parse_number(text)?;
    // 2^63 itself is already out of range
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Expand a legacy calc keyword, or recognize a `calc(...)` string
pub fn deferred_expression(text: &str) -> Option<String> {
    let text = text.trim();
    if let Some((_, expr)) = CALC_KEYWORDS.iter().find(|(kw, _)| *kw == text) {
        return Some(expr.to_string());
    }
    if is_calc_expression(text) {
        return Some(text.to_string());
    }
    None
}

/// Smart coercion: locale decimal, number, boolean word, deferred expression, text
pub fn smart_value(raw: &str) -> Value {
    let raw = raw.trim();

    if raw.matches(',').count() == 1 && !raw.contains('=') {
        let swapped = raw.replace(',', ".");
        if is_numeric(&swapped) {
            if let Ok(n) = swapped.parse() {
                return Value::Number(n);
            }
        }
    }

    if is_numeric(raw) {
        if let Ok(n) = raw.parse() {
            return Value::Number(n);
        }
    }

    if let Some(b) = parse_bool(raw) {
        return Value::Bool(b);
    }

    match deferred_expression(raw) {
        Some(expr) => Value::Expr(expr),
        None => Value::text(raw),
    }
}

/// `scrub` / `snap`: boolean word, then number, then string
pub fn bool_number_or_string(raw: &str) -> Value {
    if let Some(b) = parse_bool(raw) {
        return Value::Bool(b);
    }
    match parse_number(raw) {
        Some(n) => Value::Number(n),
        None => Value::text(raw.trim()),
    }
}

/// Split on commas that are not inside parentheses
pub fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (byte_pos, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth <= 0 => {
                parts.push(&input[start..byte_pos]);
                start = byte_pos + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Parse `y=50, opacity=0, ease=power2.out` into a map.
///
/// Only parenthesized commas are protected: `x=calc(sw*2, 3)` stays one pair,
/// while `stagger={amount:1, from:end}` does not. Pairs without `=` or with an
/// empty key are skipped.
pub fn parse_vars_list(input: &str) -> ValueMap {
    let mut vars = ValueMap::new();
    for part in split_top_level(input) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), smart_value(value));
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_numbers() {
        assert_eq!(smart_value("50"), Value::Number(50.0));
        assert_eq!(smart_value("-0.25"), Value::Number(-0.25));
        assert_eq!(smart_value("0,8"), Value::Number(0.8));
        assert_eq!(smart_value("1e3"), Value::Number(1000.0));
    }

    #[test]
    fn test_smart_not_numbers() {
        assert_eq!(smart_value("inf"), Value::Text("inf".to_string()));
        assert_eq!(smart_value("top 80%"), Value::Text("top 80%".to_string()));
        assert_eq!(smart_value("1,2,3"), Value::Text("1,2,3".to_string()));
        assert_eq!(smart_value("a,b"), Value::Text("a,b".to_string()));
    }

    #[test]
    fn test_smart_booleans() {
        assert_eq!(smart_value("Yes"), Value::Bool(true));
        assert_eq!(smart_value("off"), Value::Bool(false));
        assert_eq!(smart_value("TRUE"), Value::Bool(true));
    }

    #[test]
    fn test_smart_deferred() {
        assert_eq!(smart_value("calc_scroll_width_neg"), Value::Expr("calc(sw * -1)".to_string()));
        assert_eq!(smart_value("calc_scroll_width"), Value::Expr("calc(sw)".to_string()));
        assert_eq!(smart_value("calc_100vh"), Value::Expr("calc(vh)".to_string()));
        assert_eq!(smart_value("calc(vw / 2)"), Value::Expr("calc(vw / 2)".to_string()));
    }

    #[test]
    fn test_vars_list_basic() {
        let vars = parse_vars_list("y=50, opacity=0, ease=power2.out");
        assert_eq!(vars.len(), 3);
        assert_eq!(vars["y"], Value::Number(50.0));
        assert_eq!(vars["opacity"], Value::Number(0.0));
        assert_eq!(vars["ease"], Value::Text("power2.out".to_string()));
    }

    #[test]
    fn test_vars_list_parenthesized_comma() {
        let vars = parse_vars_list("x=calc(sw*2, 3), y=10");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["x"], Value::Expr("calc(sw*2, 3)".to_string()));
    }

    #[test]
    fn test_vars_list_braces_not_protected() {
        let vars = parse_vars_list("y=50, ease=power2.out, stagger={amount:1}");
        assert_eq!(vars.len(), 3);
        assert_eq!(vars["stagger"], Value::Text("{amount:1}".to_string()));

        // The comma inside braces splits; the tail has no '=' and is dropped
        let vars = parse_vars_list("stagger={amount:1, from:end}, y=5");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["stagger"], Value::Text("{amount:1".to_string()));
        assert_eq!(vars["y"], Value::Number(5.0));
    }

    #[test]
    fn test_vars_list_skips_malformed() {
        let vars = parse_vars_list("opacity, =5, x=1=2");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["x"], Value::Text("1=2".to_string()));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("-1"), Some(-1));
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("2.5"), None);
        assert_eq!(parse_integer("many"), None);
        assert_eq!(parse_integer("1e30"), None);
        assert_eq!(parse_integer("-1e30"), None);
        assert_eq!(parse_integer("1e15"), Some(1_000_000_000_000_000));
    }

    #[test]
    fn test_bool_number_or_string() {
        assert_eq!(bool_number_or_string("true"), Value::Bool(true));
        assert_eq!(bool_number_or_string("1.5"), Value::Number(1.5));
        assert_eq!(bool_number_or_string("labels"), Value::Text("labels".to_string()));
        assert_eq!(bool_number_or_string(" calc(sw) "), Value::Expr("calc(sw)".to_string()));
    }
}
