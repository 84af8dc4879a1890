//! Unit lifecycle: initialization, debounced re-initialization and live preview
//!
//! Failures never reach the caller as errors. They are logged and reported as
//! `false`, so one broken unit cannot block the others.

use crate::context::{MatchCallback, ResponsiveContext};
use crate::registry::UnitRegistry;
use crate::resolver::Resolver;
use crate::scheduler::Debouncer;
use crate::traits::{AnimationEngine, EnvironmentProbe, MediaQueryHost};
use crate::RuntimeError;
use scrollscript_core::{BuiltConfig, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Runtime {
    resolver: Arc<Resolver>,
    host: Arc<dyn MediaQueryHost>,
    engine: Arc<dyn AnimationEngine>,
    registry: Arc<UnitRegistry>,
    reinit: Debouncer,
    unlocks: Debouncer,
    cooldown: Duration,
}

impl Runtime {
    pub fn new(
        settings: Settings,
        probe: Arc<dyn EnvironmentProbe>,
        host: Arc<dyn MediaQueryHost>,
        engine: Arc<dyn AnimationEngine>,
    ) -> Self {
        let reinit = Debouncer::new(Duration::from_millis(settings.reinit_debounce_ms));
        let cooldown = Duration::from_millis(settings.preview_cooldown_ms);
        Self {
            resolver: Arc::new(Resolver::new(settings, probe)),
            host,
            engine,
            registry: Arc::new(UnitRegistry::new()),
            reinit,
            unlocks: Debouncer::new(cooldown),
            cooldown,
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn is_locked(&self, unit: &str) -> bool {
        self.registry.is_locked(unit)
    }

    /// Tear down the unit's previous state and subscribe it to every range.
    ///
    /// Returns `false` without touching anything while the unit is locked by a
    /// preview, or when the engine is missing.
    pub fn init_unit(&self, config: Arc<BuiltConfig>) -> bool {
        let unit = config.id().to_string();

        if self.registry.is_locked(&unit) {
            debug!(unit = %unit, "unit locked, init skipped");
            return false;
        }
        if !self.engine.is_available() {
            warn!(unit = %unit, "{}", RuntimeError::EngineUnavailable);
            return false;
        }

        self.registry.teardown(&unit, false);
        let callback = self.attach_callback(&unit);
        let context = ResponsiveContext::live(self.resolver.clone(), self.host.clone(), config, callback);
        debug!(unit = %unit, ranges = context.subscription_count(), "unit initialized");
        self.registry.replace_context(&unit, context);
        true
    }

    /// Debounced `init_unit`: rapid requests for one unit collapse into one
    pub fn schedule_reinit(&self, config: Arc<BuiltConfig>) {
        let unit = config.id().to_string();
        let runtime = self.clone();
        self.reinit.schedule(&unit, move || {
            runtime.init_unit(config);
        });
    }

    /// Play the variant for `slug` once, locking the unit until shortly after it ends
    pub fn preview(&self, unit: &str, config: &BuiltConfig, slug: &str) -> bool {
        self.registry.try_lock(unit);
        self.unlocks.cancel(unit);

        match self.run_preview(unit, config, slug) {
            Ok(duration) => {
                let delay = unlock_delay(duration, self.cooldown);
                let registry = self.registry.clone();
                let owned = unit.to_string();
                self.unlocks.schedule_after(unit, delay, move || {
                    registry.unlock(&owned);
                });
                debug!(unit, slug, duration, "preview started");
                true
            }
            Err(e) => {
                warn!(unit, slug, "preview failed: {}", e);
                self.registry.unlock(unit);
                false
            }
        }
    }

    fn run_preview(&self, unit: &str, config: &BuiltConfig, slug: &str) -> Result<f64, RuntimeError> {
        if !self.engine.is_available() {
            return Err(RuntimeError::EngineUnavailable);
        }
        if self.engine.locate_target(unit, config.target()).is_none() {
            return Err(RuntimeError::TargetNotFound(unit.to_string()));
        }

        // Split text and similar artifacts are reused by the preview
        self.registry.teardown(unit, true);

        let context = ResponsiveContext::forced(&self.resolver, config, slug, self.attach_callback(unit));
        let duration = context
            .restart()
            .ok_or_else(|| RuntimeError::NoActiveVariant(slug.to_string()))?;
        self.registry.replace_context(unit, context);
        Ok(duration)
    }

    /// Cancel pending work for the unit and kill its handles
    pub fn teardown_unit(&self, unit: &str) -> usize {
        self.reinit.cancel(unit);
        self.registry.teardown(unit, false)
    }

    /// Locate the target, evaluate deferred values and build the handle
    fn attach_callback(&self, unit: &str) -> MatchCallback {
        let engine = self.engine.clone();
        let resolver = self.resolver.clone();
        let unit = unit.to_string();

        Box::new(move |range, variant| {
            let Some(geometry) = engine.locate_target(&unit, &variant.target) else {
                warn!(unit = %unit, range = %range.slug, "{}", RuntimeError::TargetNotFound(unit.clone()));
                return None;
            };

            let variant = variant.materialize(&geometry, resolver.expressions());
            match engine.create(&unit, &variant) {
                Ok(handle) => {
                    debug!(unit = %unit, range = %range.slug, source = %variant.source, "animation attached");
                    Some(handle)
                }
                Err(e) => {
                    warn!(unit = %unit, range = %range.slug, "{}", e);
                    None
                }
            }
        })
    }
}

/// Animation length plus cooldown; saturates instead of overflowing
fn unlock_delay(seconds: f64, cooldown: Duration) -> Duration {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    Duration::try_from_secs_f64(seconds)
        .unwrap_or(Duration::MAX)
        .saturating_add(cooldown)
}
