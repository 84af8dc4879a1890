//! Unit registry
//!
//! Maps each animated unit to its current responsive context and an advisory
//! preview lock. Locking never blocks; callers that find a unit locked skip it.

use crate::context::ResponsiveContext;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct UnitEntry {
    context: Option<ResponsiveContext>,
    locked: bool,
}

#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Mutex<HashMap<String, UnitEntry>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock; `false` if it was already held
    pub fn try_lock(&self, unit: &str) -> bool {
        match self.units.lock() {
            Ok(mut units) => {
                let entry = units.entry(unit.to_string()).or_default();
                let acquired = !entry.locked;
                entry.locked = true;
                acquired
            }
            Err(_) => false,
        }
    }

    /// Release the lock; `true` only if it was held
    pub fn unlock(&self, unit: &str) -> bool {
        let released = self
            .units
            .lock()
            .ok()
            .and_then(|mut units| {
                units.get_mut(unit).map(|entry| std::mem::replace(&mut entry.locked, false))
            })
            .unwrap_or(false);
        if released {
            debug!(unit, "unit unlocked");
        }
        released
    }

    pub fn is_locked(&self, unit: &str) -> bool {
        self.units
            .lock()
            .map(|units| units.get(unit).map_or(false, |e| e.locked))
            .unwrap_or(false)
    }

    pub fn has_context(&self, unit: &str) -> bool {
        self.units
            .lock()
            .map(|units| units.get(unit).map_or(false, |e| e.context.is_some()))
            .unwrap_or(false)
    }

    /// Store a new context, cleaning up the previous one first
    pub fn replace_context(&self, unit: &str, context: ResponsiveContext) {
        self.teardown(unit, false);
        if let Ok(mut units) = self.units.lock() {
            units.entry(unit.to_string()).or_default().context = Some(context);
        }
    }

    /// Clean up the unit's context and kill its handles; returns how many were killed
    pub fn teardown(&self, unit: &str, keep_artifacts: bool) -> usize {
        // Cleanup runs outside the lock: it calls back into the host
        let previous = self
            .units
            .lock()
            .ok()
            .and_then(|mut units| units.get_mut(unit).and_then(|e| e.context.take()));

        let Some(mut context) = previous else {
            return 0;
        };

        let handles = context.cleanup();
        let killed = handles.len();
        for mut handle in handles {
            handle.kill(keep_artifacts);
        }
        debug!(unit, killed, keep_artifacts, "unit torn down");
        killed
    }

    pub fn units(&self) -> Vec<String> {
        let mut units: Vec<String> = self
            .units
            .lock()
            .map(|units| units.keys().cloned().collect())
            .unwrap_or_default();
        units.sort();
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::testing::{config, FakeHandle, HandleLog};
    use crate::traits::{AnimationHandle, StaticEnvironment};
    use scrollscript_core::Settings;
    use std::sync::Arc;

    fn forced_context(log: &HandleLog) -> ResponsiveContext {
        let resolver = Resolver::new(Settings::default(), Arc::new(StaticEnvironment::new()));
        let log = log.clone();
        ResponsiveContext::forced(
            &resolver,
            &config("[animation]\nduration: 1"),
            "mobile",
            Box::new(move |_, _| Some(Box::new(FakeHandle::new(&log, 1.0)) as Box<dyn AnimationHandle>)),
        )
    }

    #[test]
    fn test_lock_is_advisory() {
        let registry = UnitRegistry::new();
        assert!(registry.try_lock("a"));
        assert!(!registry.try_lock("a"));
        assert!(registry.is_locked("a"));
        assert!(!registry.is_locked("b"));
    }

    #[test]
    fn test_unlock_twice_releases_once() {
        let registry = UnitRegistry::new();
        registry.try_lock("a");
        assert!(registry.unlock("a"));
        assert!(!registry.unlock("a"));
        assert!(!registry.unlock("never-seen"));
    }

    #[test]
    fn test_replace_runs_previous_cleanup() {
        let registry = UnitRegistry::new();
        let log = HandleLog::default();

        registry.replace_context("a", forced_context(&log));
        assert!(registry.has_context("a"));
        assert_eq!(log.kills(), 0);

        registry.replace_context("a", forced_context(&log));
        assert_eq!(log.kills(), 1);
        assert_eq!(registry.units(), vec!["a".to_string()]);
    }

    #[test]
    fn test_teardown_keeps_artifacts_on_request() {
        let registry = UnitRegistry::new();
        let log = HandleLog::default();
        registry.replace_context("a", forced_context(&log));

        assert_eq!(registry.teardown("a", true), 1);
        assert_eq!(log.kept_artifacts(), 1);
        assert_eq!(registry.teardown("a", true), 0);
        assert!(!registry.has_context("a"));
    }

    #[test]
    fn test_teardown_does_not_touch_lock() {
        let registry = UnitRegistry::new();
        registry.try_lock("a");
        registry.teardown("a", false);
        assert!(registry.is_locked("a"));
    }
}
