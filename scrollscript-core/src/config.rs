//! Built configuration shapes
//!
//! `BuiltConfig` is what the builder produces on the server side and what the
//! runtime resolves on the client side. It must survive a JSON round trip
//! unchanged, so every field here is plain serde data.

use crate::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Slug of the open-ended range above the widest breakpoint
pub const DEFAULT_RANGE_SLUG: &str = "_default_desktop";

/// Author-facing name for the default range
pub const DESKTOP_ALIAS: &str = "desktop";

/// Tags that name device/accessibility conditions rather than breakpoints
pub const SPECIAL_CONDITION_TAGS: &[&str] = &["reduced-motion", "dark", "retina", "no-hover"];

/// Maps the `desktop` alias onto the default range slug
pub fn canonical_slug(slug: &str) -> &str {
    if slug == DESKTOP_ALIAS {
        DEFAULT_RANGE_SLUG
    } else {
        slug
    }
}

pub fn is_special_tag(tag: &str) -> bool {
    SPECIAL_CONDITION_TAGS.contains(&tag)
}

// ========== Conditions ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Single,
    Or,
    And,
}

/// Tag-based predicate from a section header (`@mobile`, `@mobile @tablet`, `@mobile+@dark`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub tags: Vec<String>,
}

impl Condition {
    pub fn single(tag: impl Into<String>) -> Self {
        Self { kind: ConditionKind::Single, tags: vec![tag.into()] }
    }

    pub fn any(tags: Vec<String>) -> Self {
        Self { kind: ConditionKind::Or, tags }
    }

    pub fn all(tags: Vec<String>) -> Self {
        Self { kind: ConditionKind::And, tags }
    }

    /// Scope key: the tag itself, `a|b` for OR groups, `a+b` for AND groups
    pub fn key(&self) -> String {
        match self.kind {
            ConditionKind::Single => self.tags.first().cloned().unwrap_or_default(),
            ConditionKind::Or => self.tags.join("|"),
            ConditionKind::And => self.tags.join("+"),
        }
    }

    /// Single tag that is not a device/accessibility condition: a legacy media slug
    pub fn media_slug(&self) -> Option<&str> {
        match (self.kind, self.tags.as_slice()) {
            (ConditionKind::Single, [tag]) if !is_special_tag(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| canonical_slug(t) == tag)
    }

    /// True if every tag is a device/accessibility condition
    pub fn is_device_only(&self) -> bool {
        !self.tags.is_empty() && self.tags.iter().all(|t| is_special_tag(t))
    }
}

/// A condition group together with the override it selects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionVariant<T> {
    pub key: String,
    #[serde(flatten)]
    pub condition: Condition,
    #[serde(flatten)]
    pub variant: T,
}

// ========== Shared Pieces ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Wrapper,
    Custom,
}

/// Which DOM subset to animate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub selector: String,
}

impl TargetSpec {
    pub fn wrapper(selector: impl Into<String>) -> Self {
        Self { kind: TargetKind::Wrapper, selector: selector.into() }
    }

    pub fn custom(selector: impl Into<String>) -> Self {
        Self { kind: TargetKind::Custom, selector: selector.into() }
    }
}

// ========== Tween ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TweenMethod {
    #[default]
    From,
    To,
    FromTo,
    Set,
}

impl TweenMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "from" => Some(TweenMethod::From),
            "to" => Some(TweenMethod::To),
            "fromto" => Some(TweenMethod::FromTo),
            "set" => Some(TweenMethod::Set),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TweenMethod::From => "from",
            TweenMethod::To => "to",
            TweenMethod::FromTo => "fromTo",
            TweenMethod::Set => "set",
        }
    }
}

/// Single-tween animation block with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    #[serde(rename = "type")]
    pub method: TweenMethod,
    pub from: ValueMap,
    pub to: ValueMap,
    pub duration: f64,
    pub delay: f64,
    pub ease: Value,
    pub stagger: Value,
    /// Additional tween vars carried through unchanged (`repeat`, `yoyo`, `text`, ...)
    #[serde(flatten)]
    pub extra: ValueMap,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        let mut from = ValueMap::new();
        from.insert("y".to_string(), Value::Number(50.0));
        from.insert("opacity".to_string(), Value::Number(0.0));
        let mut to = ValueMap::new();
        to.insert("y".to_string(), Value::Number(0.0));
        to.insert("opacity".to_string(), Value::Number(1.0));

        Self {
            method: TweenMethod::From,
            from,
            to,
            duration: 0.8,
            delay: 0.0,
            ease: Value::from("power2.out"),
            stagger: Value::Number(0.0),
            extra: ValueMap::new(),
        }
    }
}

/// Sparse per-slug override for a tween widget
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenOverride {
    #[serde(skip_serializing_if = "ValueMap::is_empty")]
    pub animation: ValueMap,
    #[serde(rename = "scrollTrigger", skip_serializing_if = "ValueMap::is_empty")]
    pub scroll_trigger: ValueMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSpec>,
    #[serde(skip_serializing_if = "is_false")]
    pub strict: bool,
}

impl TweenOverride {
    pub fn is_empty(&self) -> bool {
        self.animation.is_empty() && self.scroll_trigger.is_empty() && self.target.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweenConfig {
    pub id: String,
    pub target: TargetSpec,
    pub animation: AnimationSpec,
    #[serde(rename = "scrollTrigger")]
    pub scroll_trigger: ValueMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub media: BTreeMap<String, TweenOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionVariant<TweenOverride>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub disabled: BTreeSet<String>,
}

// ========== Timeline ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepMethod {
    #[default]
    To,
    From,
    FromTo,
    Set,
    AddLabel,
    Call,
}

impl StepMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "to" => Some(StepMethod::To),
            "from" => Some(StepMethod::From),
            "fromto" => Some(StepMethod::FromTo),
            "set" => Some(StepMethod::Set),
            "addlabel" => Some(StepMethod::AddLabel),
            "call" => Some(StepMethod::Call),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepMethod::To => "to",
            StepMethod::From => "from",
            StepMethod::FromTo => "fromTo",
            StepMethod::Set => "set",
            StepMethod::AddLabel => "addLabel",
            StepMethod::Call => "call",
        }
    }

    /// `call` steps are placeholders and never become tweens
    pub fn produces_tween(&self) -> bool {
        !matches!(self, StepMethod::AddLabel | StepMethod::Call)
    }
}

/// Normalized timeline step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Step {
    pub method: StepMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Tween vars (the from-side for `fromTo`); the label text for `addLabel`
    pub vars: Value,
    /// To-side vars for `fromTo`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars2: Option<ValueMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineVars {
    #[serde(skip_serializing_if = "ValueMap::is_empty")]
    pub defaults: ValueMap,
    #[serde(rename = "scrollTrigger", skip_serializing_if = "ValueMap::is_empty")]
    pub scroll_trigger: ValueMap,
}

impl TimelineVars {
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.scroll_trigger.is_empty()
    }
}

/// Per-slug override for a timeline widget; steps are already merged with the base
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    #[serde(rename = "timelineVars", skip_serializing_if = "Option::is_none")]
    pub timeline_vars: Option<TimelineVars>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSpec>,
    #[serde(skip_serializing_if = "is_false")]
    pub strict: bool,
}

impl TimelineOverride {
    pub fn is_empty(&self) -> bool {
        self.steps.is_none() && self.timeline_vars.is_none() && self.target.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    pub id: String,
    pub target: TargetSpec,
    #[serde(rename = "timelineVars")]
    pub timeline_vars: TimelineVars,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub media: BTreeMap<String, TimelineOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionVariant<TimelineOverride>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub disabled: BTreeSet<String>,
}

// ========== Widget Union ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    ScrollAnimation,
    ScrollTimeline,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::ScrollAnimation => "scroll_animation",
            WidgetKind::ScrollTimeline => "scroll_timeline",
        }
    }
}

/// The unit persisted and transmitted between builder and runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget")]
pub enum BuiltConfig {
    #[serde(rename = "scroll_animation")]
    Tween(TweenConfig),
    #[serde(rename = "scroll_timeline")]
    Timeline(TimelineConfig),
}

impl BuiltConfig {
    pub fn kind(&self) -> WidgetKind {
        match self {
            BuiltConfig::Tween(_) => WidgetKind::ScrollAnimation,
            BuiltConfig::Timeline(_) => WidgetKind::ScrollTimeline,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BuiltConfig::Tween(c) => &c.id,
            BuiltConfig::Timeline(c) => &c.id,
        }
    }

    pub fn target(&self) -> &TargetSpec {
        match self {
            BuiltConfig::Tween(c) => &c.target,
            BuiltConfig::Timeline(c) => &c.target,
        }
    }

    pub fn disabled(&self) -> &BTreeSet<String> {
        match self {
            BuiltConfig::Tween(c) => &c.disabled,
            BuiltConfig::Timeline(c) => &c.disabled,
        }
    }

    /// True if animation must not run on the range named `slug`
    pub fn is_disabled(&self, slug: &str) -> bool {
        let slug = canonical_slug(slug);
        self.disabled().iter().any(|d| canonical_slug(d) == slug)
    }

    pub fn media_slugs(&self) -> Vec<&str> {
        match self {
            BuiltConfig::Tween(c) => c.media.keys().map(String::as_str).collect(),
            BuiltConfig::Timeline(c) => c.media.keys().map(String::as_str).collect(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}
