//! Line-oriented script parser
//!
//! Malformed lines never abort the parse. They are recorded as warnings with
//! their line number and skipped; only internal failures return `Err`.

use crate::ast::{is_vars_key, ConditionScope, FieldMap, ParsedDocument, RawStep, Sourced};
use crate::coerce::{
    bool_number_or_string, parse_bool, parse_integer, parse_number, parse_vars_list, smart_value,
};
use regex::Regex;
use scrollscript_core::{
    Condition, ConditionKind, ScriptError, StepMethod, TweenMethod, Value, ValueMap,
};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

fn condition_pattern() -> Result<&'static Regex, ScriptError> {
    static PATTERN: OnceLock<Result<Regex, String>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"@([A-Za-z0-9_-]+(?:\+@[A-Za-z0-9_-]+)*)").map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| ScriptError::internal(format!("condition pattern failed to compile: {}", e)))
}

/// Parse script text into a document
pub fn parse(input: &str) -> Result<ParsedDocument, ScriptError> {
    let pattern = condition_pattern()?;
    let mut parser = Parser::new();
    let mut line_count = 0;

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        line_count = line_no;
        let stripped = strip_comment(raw_line);
        let line = stripped.trim();
        if line.is_empty() {
            continue;
        }

        if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
            parser.header(&line[1..line.len() - 1], line_no, pattern);
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) => parser.property(key.trim(), value.trim(), line_no),
            None => parser.warn(ScriptError::missing_separator(line_no)),
        }
    }

    let doc = parser.finish();
    debug!(
        lines = line_count,
        warnings = doc.warnings.len(),
        steps = doc.timeline.steps.len(),
        scopes = doc.conditions.len(),
        "parsed script"
    );
    Ok(doc)
}

/// Cut the line at the first unescaped `//`; `\//` stands for a literal `//`
pub fn strip_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    loop {
        match rest.find("//") {
            None => {
                out.push_str(rest);
                break;
            }
            Some(pos) if pos > 0 && rest.as_bytes()[pos - 1] == b'\\' => {
                out.push_str(&rest[..pos - 1]);
                out.push_str("//");
                rest = &rest[pos + 2..];
            }
            Some(pos) => {
                out.push_str(&rest[..pos]);
                break;
            }
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Animation,
    Scroll,
    Target,
    Timeline,
    Step(u32),
    Disable,
}

/// Where a property ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Animation,
    Scroll,
    Target,
    Defaults,
    Step(u32),
}

/// A coerced property ready to be stored
#[derive(Debug, Clone, PartialEq)]
enum Field {
    Set(String, Value),
    /// `stagger.amount: 1` → `stagger = {amount: 1}`
    Nested(String, String, Value),
}

struct Parser {
    doc: ParsedDocument,
    base_steps: BTreeMap<u32, RawStep>,
    section: Option<Section>,
    scope: Option<String>,
}

impl Parser {
    fn new() -> Self {
        Self {
            doc: ParsedDocument::default(),
            base_steps: BTreeMap::new(),
            section: None,
            scope: None,
        }
    }

    fn warn(&mut self, error: ScriptError) {
        self.doc.warnings.push(error.into());
    }

    fn header(&mut self, content: &str, line: usize, pattern: &Regex) {
        let (name, conditions) = split_header(content, pattern);
        let condition = self.combine_conditions(conditions, line);

        if name == "disable" {
            match condition {
                Some(c) if c.kind == ConditionKind::And => {
                    self.doc.disabled.insert(c.key());
                }
                Some(c) => self.doc.disabled.extend(c.tags),
                None => self.warn(ScriptError::invalid_placement(
                    "[disable] needs at least one @tag",
                    line,
                )),
            }
            self.section = Some(Section::Disable);
            self.scope = None;
            return;
        }

        let section = match name.as_str() {
            "animation" => Some(Section::Animation),
            "scroll" => Some(Section::Scroll),
            "target" => Some(Section::Target),
            "timeline" => Some(Section::Timeline),
            other => other
                .strip_prefix("step.")
                .and_then(|n| n.parse::<u32>().ok())
                .map(Section::Step),
        };

        // Unknown headers leave the current section in place
        let Some(section) = section else {
            self.warn(ScriptError::unknown_section(&name, line));
            return;
        };

        let scope = condition.map(|c| self.register_scope(c, line));
        self.scope = scope;
        self.section = Some(section);

        if let (Section::Step(index), None) = (section, &self.scope) {
            self.base_steps
                .entry(index)
                .or_insert_with(|| RawStep::new(index, line));
        }
    }

    fn combine_conditions(&mut self, conditions: Vec<Condition>, line: usize) -> Option<Condition> {
        if conditions.len() <= 1 {
            return conditions.into_iter().next();
        }

        if conditions.iter().all(|c| c.kind == ConditionKind::Single) {
            let mut tags: Vec<String> = Vec::new();
            for tag in conditions.into_iter().flat_map(|c| c.tags) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            return Some(if tags.len() == 1 {
                Condition::single(tags.remove(0))
            } else {
                Condition::any(tags)
            });
        }

        self.warn(ScriptError::invalid_placement(
            "Only one condition group is allowed when a header uses '+'; extra conditions ignored",
            line,
        ));
        conditions.into_iter().next()
    }

    fn register_scope(&mut self, condition: Condition, line: usize) -> String {
        let key = condition.key();
        if self.doc.condition(&key).is_none() {
            self.doc.conditions.push(ConditionScope { key: key.clone(), condition, line });
        }
        key
    }

    fn property(&mut self, key: &str, raw: &str, line: usize) {
        if key.is_empty() {
            self.warn(ScriptError::invalid_placement("Missing property name before ':'", line));
            return;
        }

        if self.scope.is_none() {
            if let Some((slot, rest)) = dotted_route(key) {
                self.write(slot, rest, raw, line);
                return;
            }
        }

        let slot = match self.section {
            None => {
                self.warn(ScriptError::invalid_placement(
                    format!("Property '{}' appears before any section", key),
                    line,
                ));
                return;
            }
            Some(Section::Disable) => {
                self.warn(ScriptError::invalid_placement(
                    format!("Property '{}' is not allowed in [disable]", key),
                    line,
                ));
                return;
            }
            Some(Section::Timeline) => {
                match defaults_key(key) {
                    Some(rest) => {
                        self.write(Slot::Defaults, rest, raw, line);
                    }
                    None => self.warn(
                        ScriptError::invalid_placement(
                            format!("Property '{}' is not allowed directly under [timeline]", key),
                            line,
                        )
                        .with_suggestion(format!("Use 'defaults.{}'", key)),
                    ),
                }
                return;
            }
            Some(Section::Animation) => Slot::Animation,
            Some(Section::Scroll) => Slot::Scroll,
            Some(Section::Target) => Slot::Target,
            Some(Section::Step(index)) => Slot::Step(index),
        };

        self.write(slot, key, raw, line);
    }

    fn write(&mut self, slot: Slot, key: &str, raw: &str, line: usize) {
        let field = match slot {
            Slot::Animation => animation_field(key, raw, line),
            Slot::Scroll => scroll_field(key, raw, line),
            Slot::Target => Ok(target_field(key, raw)),
            Slot::Defaults => defaults_field(key, raw, line),
            Slot::Step(_) => self.step_field(key, raw, line),
        };

        match field {
            Ok(field) => {
                // Reopened step headers extend their vars lists
                let merge_vars = matches!(slot, Slot::Step(_));
                store(self.fields_mut(slot, line), field, line, merge_vars)
            }
            Err(warning) => self.warn(warning),
        }
    }

    fn step_field(&mut self, key: &str, raw: &str, line: usize) -> Result<Field, ScriptError> {
        if matches!(key.to_ascii_lowercase().as_str(), "type" | "method") {
            let method = match StepMethod::parse(raw) {
                Some(method) => method,
                None => {
                    self.warn(
                        ScriptError::invalid_value(
                            key,
                            "one of to, from, fromTo, set, addLabel, call",
                            raw,
                            line,
                        )
                        .with_suggestion("Falling back to 'to'"),
                    );
                    StepMethod::To
                }
            };
            return Ok(Field::Set("type".to_string(), Value::from(method.as_str())));
        }
        step_field(key, raw, line)
    }

    /// Field map for a slot, honouring the active condition scope
    fn fields_mut(&mut self, slot: Slot, line: usize) -> &mut FieldMap {
        match &self.scope {
            None => match slot {
                Slot::Animation => &mut self.doc.animation,
                Slot::Scroll => &mut self.doc.scroll,
                Slot::Target => &mut self.doc.target,
                Slot::Defaults => &mut self.doc.timeline.defaults,
                Slot::Step(index) => {
                    &mut self
                        .base_steps
                        .entry(index)
                        .or_insert_with(|| RawStep::new(index, line))
                        .fields
                }
            },
            Some(key) => {
                let scope = self.doc.media.entry(key.clone()).or_default();
                match slot {
                    Slot::Animation => &mut scope.animation,
                    Slot::Scroll => &mut scope.scroll,
                    Slot::Target => &mut scope.target,
                    Slot::Defaults => &mut scope.timeline.defaults,
                    Slot::Step(index) => {
                        &mut scope
                            .timeline
                            .steps
                            .entry(index)
                            .or_insert_with(|| RawStep::new(index, line))
                            .fields
                    }
                }
            }
        }
    }

    fn finish(mut self) -> ParsedDocument {
        self.doc.timeline.steps = self.base_steps.into_values().collect();
        self.doc
    }
}

/// Header text → lowercased section name and condition entries
fn split_header(content: &str, pattern: &Regex) -> (String, Vec<Condition>) {
    let mut conditions = Vec::new();
    for caps in pattern.captures_iter(content) {
        let Some(token) = caps.get(1) else { continue };
        let tags: Vec<String> = token.as_str().split("+@").map(str::to_string).collect();
        if tags.len() > 1 {
            conditions.push(Condition::all(tags));
        } else {
            conditions.push(Condition::single(token.as_str()));
        }
    }

    let name = pattern.replace_all(content, "").trim().to_ascii_lowercase();
    (name, conditions)
}

/// Section-namespaced keys usable anywhere outside a condition scope
fn dotted_route(key: &str) -> Option<(Slot, &str)> {
    let lower = key.to_ascii_lowercase();
    let routes = [
        ("timeline.defaults.", Slot::Defaults),
        ("animation.", Slot::Animation),
        ("scroll.", Slot::Scroll),
        ("target.", Slot::Target),
    ];
    routes.into_iter().find_map(|(prefix, slot)| {
        (lower.starts_with(prefix) && key.len() > prefix.len()).then(|| (slot, &key[prefix.len()..]))
    })
}

/// `defaults.<k>` or `timeline.defaults.<k>` inside a `[timeline]` section
fn defaults_key(key: &str) -> Option<&str> {
    let lower = key.to_ascii_lowercase();
    ["timeline.defaults.", "defaults."].into_iter().find_map(|prefix| {
        (lower.starts_with(prefix) && key.len() > prefix.len()).then(|| &key[prefix.len()..])
    })
}

/// `stagger.<x>` / `text.<x>`
fn nested_key(key: &str) -> Option<(&'static str, &str)> {
    let lower = key.to_ascii_lowercase();
    ["stagger", "text"].into_iter().find_map(|parent| {
        let prefix_len = parent.len() + 1;
        (lower.starts_with(parent) && lower[parent.len()..].starts_with('.') && key.len() > prefix_len)
            .then(|| (parent, &key[prefix_len..]))
    })
}

fn store(fields: &mut FieldMap, field: Field, line: usize, merge_vars: bool) {
    match field {
        Field::Set(key, value) => {
            if merge_vars && is_vars_key(&key) {
                if let (Some(existing), Value::Object(incoming)) = (fields.get_mut(&key), &value) {
                    if let Value::Object(ours) = &mut existing.value {
                        ours.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
                        existing.source_line = line;
                        return;
                    }
                }
            }
            fields.insert(key, Sourced::new(value, line));
        }
        Field::Nested(parent, child, value) => {
            let entry = fields
                .entry(parent)
                .or_insert_with(|| Sourced::new(Value::Object(ValueMap::new()), line));
            if !matches!(entry.value, Value::Object(_)) {
                entry.value = Value::Object(ValueMap::new());
            }
            if let Value::Object(map) = &mut entry.value {
                map.insert(child, value);
            }
            entry.source_line = line;
        }
    }
}

// ========== Typed Fields ==========

fn number(key: &str, raw: &str, line: usize) -> Result<Value, ScriptError> {
    parse_number(raw)
        .map(Value::Number)
        .ok_or_else(|| ScriptError::invalid_value(key, "a number", raw, line))
}

fn boolean(key: &str, raw: &str, line: usize) -> Result<Value, ScriptError> {
    parse_bool(raw)
        .map(Value::Bool)
        .ok_or_else(|| ScriptError::invalid_value(key, "true or false", raw, line))
}

fn integer(key: &str, raw: &str, line: usize) -> Result<Value, ScriptError> {
    parse_integer(raw)
        .map(Value::Int)
        .ok_or_else(|| ScriptError::invalid_value(key, "an integer", raw, line))
}

fn animation_field(key: &str, raw: &str, line: usize) -> Result<Field, ScriptError> {
    if let Some((parent, child)) = nested_key(key) {
        return Ok(Field::Nested(parent.to_string(), child.to_string(), smart_value(raw)));
    }

    let lower = key.to_ascii_lowercase();
    let field = match lower.as_str() {
        "type" | "method" => {
            let method = TweenMethod::parse(raw).ok_or_else(|| {
                ScriptError::invalid_value(key, "one of from, to, fromTo, set", raw, line)
            })?;
            Field::Set("type".to_string(), Value::from(method.as_str()))
        }
        "from" | "to" => Field::Set(lower.clone(), Value::Object(parse_vars_list(raw))),
        "duration" | "delay" | "stagger" => Field::Set(lower.clone(), number(key, raw, line)?),
        "strict" | "yoyo" => Field::Set(lower.clone(), boolean(key, raw, line)?),
        "repeat" => Field::Set(lower.clone(), integer(key, raw, line)?),
        "ease" => Field::Set(lower.clone(), smart_value(raw)),
        _ => Field::Set(key.to_string(), smart_value(raw)),
    };
    Ok(field)
}

fn scroll_field(key: &str, raw: &str, line: usize) -> Result<Field, ScriptError> {
    let lower = key.to_ascii_lowercase();
    let field = match lower.as_str() {
        "scrub" | "snap" => Field::Set(lower.clone(), bool_number_or_string(raw)),
        "once" | "pin" | "markers" | "strict" => Field::Set(lower.clone(), boolean(key, raw, line)?),
        "pinspacing" => Field::Set("pinSpacing".to_string(), boolean(key, raw, line)?),
        "anticipatepin" => Field::Set("anticipatePin".to_string(), number(key, raw, line)?),
        "toggleactions" => Field::Set("toggleActions".to_string(), Value::from(raw)),
        _ => Field::Set(key.to_string(), smart_value(raw)),
    };
    Ok(field)
}

fn target_field(key: &str, raw: &str) -> Field {
    if key.eq_ignore_ascii_case("selector") {
        Field::Set("selector".to_string(), Value::from(raw))
    } else {
        Field::Set(key.to_string(), smart_value(raw))
    }
}

fn defaults_field(key: &str, raw: &str, line: usize) -> Result<Field, ScriptError> {
    let lower = key.to_ascii_lowercase();
    let field = match lower.as_str() {
        "duration" | "delay" | "stagger" => Field::Set(lower.clone(), number(key, raw, line)?),
        "strict" => Field::Set(lower.clone(), boolean(key, raw, line)?),
        _ => Field::Set(key.to_string(), smart_value(raw)),
    };
    Ok(field)
}

/// Step keys other than the method
fn step_field(key: &str, raw: &str, line: usize) -> Result<Field, ScriptError> {
    if let Some((parent, child)) = nested_key(key) {
        return Ok(Field::Nested(parent.to_string(), child.to_string(), smart_value(raw)));
    }

    let lower = key.to_ascii_lowercase();
    let field = match lower.as_str() {
        "from" | "to" => Field::Set(lower.clone(), Value::Object(parse_vars_list(raw))),
        "startat" => Field::Set("startAt".to_string(), Value::Object(parse_vars_list(raw))),
        "duration" | "delay" | "stagger" => Field::Set(lower.clone(), number(key, raw, line)?),
        "yoyo" => Field::Set(lower.clone(), boolean(key, raw, line)?),
        "repeat" => Field::Set(lower.clone(), integer(key, raw, line)?),
        "selector" | "label" | "split" => Field::Set(lower.clone(), Value::from(raw)),
        "position" | "ease" => Field::Set(lower.clone(), smart_value(raw)),
        _ => Field::Set(key.to_string(), smart_value(raw)),
    };
    Ok(field)
}
