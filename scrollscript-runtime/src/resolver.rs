//! Responsive resolver
//!
//! Picks the effective variant of a built config for one breakpoint range:
//!
//! 1. a disabled range has no variant at all
//! 2. an active reduced-motion condition wins, even on the default range
//! 3. the first condition group tagged with the range (insertion order), then
//!    the range's own media override, then the nearest narrower non-strict
//!    media override
//! 4. the first device-only condition group that holds
//! 5. the base config
//!
//! The chosen override is merged field by field over the base.

use crate::breakpoints::{build_breakpoint_ranges, range_by_slug, range_for_width, BreakpointRange};
use crate::conditions::{ConditionCache, SpecialCondition};
use crate::traits::EnvironmentProbe;
use scrollscript_calc::{materialize, ExpressionCache, Geometry};
use scrollscript_core::{
    canonical_slug, AnimationSpec, BuiltConfig, Condition, ConditionKind, ConditionVariant,
    Settings, Step, TargetSpec, TimelineOverride, TimelineVars, TweenMethod, TweenOverride, Value,
    ValueMap,
};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Which part of the config produced a variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantSource {
    Base,
    Media(String),
    Condition(String),
}

impl fmt::Display for VariantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantSource::Base => write!(f, "base"),
            VariantSource::Media(slug) => write!(f, "media:{}", slug),
            VariantSource::Condition(key) => write!(f, "condition:{}", key),
        }
    }
}

impl Serialize for VariantSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget")]
pub enum VariantBody {
    #[serde(rename = "scroll_animation")]
    Tween {
        animation: AnimationSpec,
        #[serde(rename = "scrollTrigger")]
        scroll_trigger: ValueMap,
    },
    #[serde(rename = "scroll_timeline")]
    Timeline {
        #[serde(rename = "timelineVars")]
        timeline_vars: TimelineVars,
        steps: Vec<Step>,
    },
}

/// Fully merged tween or timeline for one runtime state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveVariant {
    pub id: String,
    pub source: VariantSource,
    pub target: TargetSpec,
    #[serde(flatten)]
    pub body: VariantBody,
}

impl ActiveVariant {
    /// Evaluate every deferred `calc(...)` value against live geometry
    pub fn materialize(&self, geometry: &Geometry, cache: &ExpressionCache) -> ActiveVariant {
        let map = |m: &ValueMap| -> ValueMap {
            m.iter().map(|(k, v)| (k.clone(), materialize(v, geometry, cache))).collect()
        };

        let body = match &self.body {
            VariantBody::Tween { animation, scroll_trigger } => VariantBody::Tween {
                animation: AnimationSpec {
                    from: map(&animation.from),
                    to: map(&animation.to),
                    ease: materialize(&animation.ease, geometry, cache),
                    stagger: materialize(&animation.stagger, geometry, cache),
                    extra: map(&animation.extra),
                    ..animation.clone()
                },
                scroll_trigger: map(scroll_trigger),
            },
            VariantBody::Timeline { timeline_vars, steps } => VariantBody::Timeline {
                timeline_vars: TimelineVars {
                    defaults: map(&timeline_vars.defaults),
                    scroll_trigger: map(&timeline_vars.scroll_trigger),
                },
                steps: steps
                    .iter()
                    .map(|step| Step {
                        vars: materialize(&step.vars, geometry, cache),
                        vars2: step.vars2.as_ref().map(|v| map(v)),
                        position: step.position.as_ref().map(|p| materialize(p, geometry, cache)),
                        ..step.clone()
                    })
                    .collect(),
            },
        };

        ActiveVariant { body, ..self.clone() }
    }
}

/// Sparse override types that carry a `strict` flag
trait Override {
    fn is_strict(&self) -> bool;
}

impl Override for TweenOverride {
    fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Override for TimelineOverride {
    fn is_strict(&self) -> bool {
        self.strict
    }
}

enum Selection<'a, O> {
    Base,
    Media(&'a str, &'a O),
    Condition(&'a str, &'a O),
}

impl<'a, O> Selection<'a, O> {
    fn split(self) -> (VariantSource, Option<&'a O>) {
        match self {
            Selection::Base => (VariantSource::Base, None),
            Selection::Media(slug, o) => (VariantSource::Media(slug.to_string()), Some(o)),
            Selection::Condition(key, o) => (VariantSource::Condition(key.to_string()), Some(o)),
        }
    }
}

/// Resolution session: owns memoized ranges, condition values and compiled expressions
pub struct Resolver {
    settings: Settings,
    probe: Arc<dyn EnvironmentProbe>,
    ranges: OnceLock<Vec<BreakpointRange>>,
    conditions: ConditionCache,
    expressions: ExpressionCache,
}

impl Resolver {
    pub fn new(settings: Settings, probe: Arc<dyn EnvironmentProbe>) -> Self {
        Self {
            settings,
            probe,
            ranges: OnceLock::new(),
            conditions: ConditionCache::new(),
            expressions: ExpressionCache::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ranges(&self) -> &[BreakpointRange] {
        self.ranges.get_or_init(|| build_breakpoint_ranges(&self.settings.breakpoints))
    }

    pub fn range_for_width(&self, width: u32) -> Option<&BreakpointRange> {
        range_for_width(self.ranges(), width)
    }

    pub fn range_by_slug(&self, slug: &str) -> Option<&BreakpointRange> {
        range_by_slug(self.ranges(), slug)
    }

    pub fn expressions(&self) -> &ExpressionCache {
        &self.expressions
    }

    /// Truth of a special-condition tag; other tags are never active
    pub fn is_tag_active(&self, tag: &str) -> bool {
        SpecialCondition::from_tag(tag)
            .map(|c| self.conditions.is_active(c, self.probe.as_ref(), self.settings.pro))
            .unwrap_or(false)
    }

    pub fn resolve_for_width(&self, config: &BuiltConfig, width: u32) -> Option<ActiveVariant> {
        let range = self.range_for_width(width)?;
        self.resolve(config, range)
    }

    /// Resolve for a named range (`desktop` accepted); unknown slugs resolve to nothing
    pub fn resolve_forced(&self, config: &BuiltConfig, slug: &str) -> Option<ActiveVariant> {
        match self.range_by_slug(slug) {
            Some(range) => self.resolve(config, range),
            None => {
                warn!(slug, "unknown breakpoint");
                None
            }
        }
    }

    pub fn resolve(&self, config: &BuiltConfig, range: &BreakpointRange) -> Option<ActiveVariant> {
        if config.is_disabled(&range.slug) {
            debug!(unit = config.id(), range = %range.slug, "range disabled");
            return None;
        }

        let variant = match config {
            BuiltConfig::Tween(c) => {
                let (source, chosen) = self.select(&c.media, &c.conditions, range).split();
                let mut animation = c.animation.clone();
                let mut scroll_trigger = c.scroll_trigger.clone();
                let mut target = c.target.clone();
                if let Some(o) = chosen {
                    apply_animation_override(&mut animation, &o.animation);
                    scroll_trigger.extend(o.scroll_trigger.clone());
                    if let Some(t) = &o.target {
                        target = t.clone();
                    }
                }
                ActiveVariant {
                    id: c.id.clone(),
                    source,
                    target,
                    body: VariantBody::Tween { animation, scroll_trigger },
                }
            }
            BuiltConfig::Timeline(c) => {
                let (source, chosen) = self.select(&c.media, &c.conditions, range).split();
                let mut timeline_vars = c.timeline_vars.clone();
                let mut steps = c.steps.clone();
                let mut target = c.target.clone();
                if let Some(o) = chosen {
                    if let Some(vars) = &o.timeline_vars {
                        timeline_vars.defaults.extend(vars.defaults.clone());
                        timeline_vars.scroll_trigger.extend(vars.scroll_trigger.clone());
                    }
                    if let Some(s) = &o.steps {
                        steps = s.clone();
                    }
                    if let Some(t) = &o.target {
                        target = t.clone();
                    }
                }
                ActiveVariant {
                    id: c.id.clone(),
                    source,
                    target,
                    body: VariantBody::Timeline { timeline_vars, steps },
                }
            }
        };

        debug!(unit = %variant.id, range = %range.slug, source = %variant.source, "variant resolved");
        Some(variant)
    }

    fn select<'a, O: Override>(
        &self,
        media: &'a BTreeMap<String, O>,
        conditions: &'a [ConditionVariant<O>],
        range: &BreakpointRange,
    ) -> Selection<'a, O> {
        let slug = range.slug.as_str();
        let reduced_motion = SpecialCondition::ReducedMotion.tag();

        if self.is_tag_active(reduced_motion) {
            if let Some(c) = conditions.iter().find(|c| c.key == reduced_motion) {
                return Selection::Condition(&c.key, &c.variant);
            }
        }

        if let Some(c) = conditions.iter().find(|c| self.matches_range(&c.condition, slug)) {
            return Selection::Condition(&c.key, &c.variant);
        }

        if let Some((key, o)) = media.iter().find(|(key, _)| canonical_slug(key) == slug) {
            return Selection::Media(key, o);
        }

        // "This and wider": nearest narrower override that is not strict
        if !range.is_default() {
            let ranges = self.ranges();
            if let Some(pos) = ranges.iter().position(|r| r.slug == slug) {
                for narrower in ranges[..pos].iter().rev() {
                    if let Some((key, o)) = media.get_key_value(&narrower.slug) {
                        if !o.is_strict() {
                            return Selection::Media(key, o);
                        }
                    }
                }
            }
        }

        if let Some(c) = conditions
            .iter()
            .find(|c| c.condition.is_device_only() && self.device_condition_holds(&c.condition))
        {
            return Selection::Condition(&c.key, &c.variant);
        }

        Selection::Base
    }

    /// Group tagged with the range; AND groups also need every other tag active
    fn matches_range(&self, condition: &Condition, slug: &str) -> bool {
        if !condition.has_tag(slug) {
            return false;
        }
        match condition.kind {
            ConditionKind::And => condition
                .tags
                .iter()
                .all(|t| canonical_slug(t) == slug || self.is_tag_active(t)),
            ConditionKind::Or | ConditionKind::Single => true,
        }
    }

    fn device_condition_holds(&self, condition: &Condition) -> bool {
        match condition.kind {
            ConditionKind::And => condition.tags.iter().all(|t| self.is_tag_active(t)),
            ConditionKind::Or | ConditionKind::Single => {
                condition.tags.iter().any(|t| self.is_tag_active(t))
            }
        }
    }
}

/// Override fields replace base fields; `from`/`to` merge key by key
fn apply_animation_override(spec: &mut AnimationSpec, fields: &ValueMap) {
    for (key, value) in fields {
        match key.as_str() {
            "type" => {
                if let Some(method) = value.as_text().and_then(TweenMethod::parse) {
                    spec.method = method;
                }
            }
            "from" | "to" => {
                if let Value::Object(vars) = value {
                    let side = if key == "from" { &mut spec.from } else { &mut spec.to };
                    side.extend(vars.clone());
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
}
