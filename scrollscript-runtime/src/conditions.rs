//! Device and accessibility conditions

use crate::traits::EnvironmentProbe;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialCondition {
    ReducedMotion,
    Dark,
    Retina,
    NoHover,
}

impl SpecialCondition {
    pub const ALL: [SpecialCondition; 4] = [
        SpecialCondition::ReducedMotion,
        SpecialCondition::Dark,
        SpecialCondition::Retina,
        SpecialCondition::NoHover,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SpecialCondition::ReducedMotion => "reduced-motion",
            SpecialCondition::Dark => "dark",
            SpecialCondition::Retina => "retina",
            SpecialCondition::NoHover => "no-hover",
        }
    }

    pub fn query(&self) -> &'static str {
        match self {
            SpecialCondition::ReducedMotion => "(prefers-reduced-motion: reduce)",
            SpecialCondition::Dark => "(prefers-color-scheme: dark)",
            SpecialCondition::Retina => "(min-resolution: 2dppx)",
            SpecialCondition::NoHover => "(hover: none)",
        }
    }

    /// Everything but reduced-motion needs the pro capability
    pub fn requires_pro(&self) -> bool {
        !matches!(self, SpecialCondition::ReducedMotion)
    }

    pub fn available(pro: bool) -> Vec<SpecialCondition> {
        Self::ALL.into_iter().filter(|c| pro || !c.requires_pro()).collect()
    }
}

/// Per-session memo of condition truth values; each query is asked once
#[derive(Debug, Default)]
pub struct ConditionCache {
    values: Mutex<HashMap<SpecialCondition, bool>>,
}

impl ConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unavailable conditions are never active
    pub fn is_active(&self, condition: SpecialCondition, probe: &dyn EnvironmentProbe, pro: bool) -> bool {
        if condition.requires_pro() && !pro {
            return false;
        }

        if let Ok(values) = self.values.lock() {
            if let Some(&active) = values.get(&condition) {
                return active;
            }
        }

        let active = probe.matches(condition.query());
        debug!(condition = condition.tag(), active, "special condition evaluated");
        if let Ok(mut values) = self.values.lock() {
            values.insert(condition, active);
        }
        active
    }

    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
