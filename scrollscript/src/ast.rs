//! Parsed document tree

use scrollscript_core::{Condition, Diagnostic, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Leaf value with the line it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced {
    pub value: Value,
    #[serde(rename = "sourceLine")]
    pub source_line: usize,
}

impl Sourced {
    pub fn new(value: Value, source_line: usize) -> Self {
        Self { value, source_line }
    }
}

/// Field name → sourced value
pub type FieldMap = BTreeMap<String, Sourced>;

/// One `[step.N]` block before normalization
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawStep {
    pub index: u32,
    /// Header line of the first `[step.N]` occurrence
    pub line: usize,
    pub fields: FieldMap,
}

impl RawStep {
    pub fn new(index: u32, line: usize) -> Self {
        Self { index, line, fields: FieldMap::new() }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).map(|s| &s.value)
    }

    /// Override fields win; vars-lists merge key by key
    pub fn merge_from(&mut self, other: &RawStep) {
        for (key, incoming) in &other.fields {
            let merged = match (self.fields.get_mut(key), &incoming.value) {
                (Some(existing), Value::Object(theirs)) if is_vars_key(key) => {
                    match &mut existing.value {
                        Value::Object(ours) => {
                            for (k, v) in theirs {
                                ours.insert(k.clone(), v.clone());
                            }
                            existing.source_line = incoming.source_line;
                            true
                        }
                        _ => false,
                    }
                }
                _ => false,
            };
            if !merged {
                self.fields.insert(key.clone(), incoming.clone());
            }
        }
    }
}

pub(crate) fn is_vars_key(key: &str) -> bool {
    matches!(key, "from" | "to" | "startAt")
}

/// Base timeline: defaults plus steps sorted by declared index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelineBlock {
    pub defaults: FieldMap,
    pub steps: Vec<RawStep>,
}

/// Timeline part of a condition scope; steps stay sparse for index-wise merging
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeTimeline {
    pub defaults: FieldMap,
    pub steps: BTreeMap<u32, RawStep>,
}

/// Sparse override written under a condition scope
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaScope {
    pub animation: FieldMap,
    pub scroll: FieldMap,
    pub target: FieldMap,
    pub timeline: ScopeTimeline,
}

impl MediaScope {
    pub fn is_empty(&self) -> bool {
        self.animation.is_empty()
            && self.scroll.is_empty()
            && self.target.is_empty()
            && self.timeline.defaults.is_empty()
            && self.timeline.steps.is_empty()
    }
}

/// Condition scope in order of first appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionScope {
    pub key: String,
    pub condition: Condition,
    pub line: usize,
}

/// Root output of the parser
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub animation: FieldMap,
    pub scroll: FieldMap,
    pub target: FieldMap,
    pub timeline: TimelineBlock,
    /// Scope key → sparse override
    pub media: BTreeMap<String, MediaScope>,
    pub conditions: Vec<ConditionScope>,
    pub disabled: BTreeSet<String>,
    pub warnings: Vec<Diagnostic>,
}

impl ParsedDocument {
    pub fn has_steps(&self) -> bool {
        !self.timeline.steps.is_empty()
    }

    pub fn condition(&self, key: &str) -> Option<&ConditionScope> {
        self.conditions.iter().find(|c| c.key == key)
    }

    pub fn animation_value(&self, key: &str) -> Option<&Value> {
        self.animation.get(key).map(|s| &s.value)
    }

    pub fn scroll_value(&self, key: &str) -> Option<&Value> {
        self.scroll.get(key).map(|s| &s.value)
    }
}
