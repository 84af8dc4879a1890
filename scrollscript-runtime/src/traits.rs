//! Host seams
//!
//! The runtime never touches a DOM or an animation library directly. Hosts
//! implement these traits; tests use in-memory fakes.

use crate::RuntimeError;
use crate::resolver::ActiveVariant;
use scrollscript_calc::Geometry;
use scrollscript_core::TargetSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Opaque token returned by `MediaQueryHost::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Called with the new match state whenever it flips, including the initial state
pub type MatchListener = Box<dyn FnMut(bool) + Send>;

/// Live media-query subscriptions (viewport width ranges)
pub trait MediaQueryHost: Send + Sync {
    fn subscribe(&self, query: &str, listener: MatchListener) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);
}

/// One-shot environment queries for device and accessibility conditions
pub trait EnvironmentProbe: Send + Sync {
    fn matches(&self, query: &str) -> bool;
}

/// Third-party animation engine
pub trait AnimationEngine: Send + Sync {
    fn is_available(&self) -> bool;

    /// Live geometry of the unit's target, `None` if it is not in the document
    fn locate_target(&self, unit: &str, target: &TargetSpec) -> Option<Geometry>;

    /// Construct and attach a tween or timeline for a materialized variant
    fn create(&self, unit: &str, variant: &ActiveVariant) -> Result<Box<dyn AnimationHandle>, RuntimeError>;
}

/// A constructed tween or timeline
pub trait AnimationHandle: Send {
    fn play_from_start(&mut self);

    /// Total duration in seconds
    fn duration(&self) -> f64;

    /// Stop and detach. With `keep_artifacts`, expensive derived state
    /// (e.g. split text) is left in place for reuse.
    fn kill(&mut self, keep_artifacts: bool);
}

/// Probe answering from a fixed set of matching queries
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    matching: HashSet<String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.matching.insert(query.into());
        self
    }

    /// Mark special conditions (`reduced-motion`, `dark`, ...) as active by tag
    pub fn with_conditions<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            if let Some(condition) = crate::SpecialCondition::from_tag(tag.as_ref()) {
                self.matching.insert(condition.query().to_string());
            }
        }
        self
    }
}

impl EnvironmentProbe for StaticEnvironment {
    fn matches(&self, query: &str) -> bool {
        self.matching.contains(query)
    }
}
