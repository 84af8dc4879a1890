//! Responsive contexts
//!
//! A context ties one built config to the host's media queries. Each
//! non-disabled range owns a live subscription; when a range starts matching
//! its variant is resolved and handed to the match callback, and when it stops
//! matching the handle it produced is killed.

use crate::breakpoints::BreakpointRange;
use crate::resolver::{ActiveVariant, Resolver};
use crate::traits::{AnimationHandle, MediaQueryHost, SubscriptionId};
use scrollscript_core::BuiltConfig;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Builds a tween/timeline for a resolved variant; `None` if nothing was attached
pub type MatchCallback =
    Box<dyn FnMut(&BreakpointRange, &ActiveVariant) -> Option<Box<dyn AnimationHandle>> + Send>;

/// Live subscriptions, or one forced range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMode {
    Live,
    Forced(String),
}

type HandleMap = BTreeMap<String, Box<dyn AnimationHandle>>;

pub struct ResponsiveContext {
    host: Option<Arc<dyn MediaQueryHost>>,
    subscriptions: Vec<SubscriptionId>,
    handles: Arc<Mutex<HandleMap>>,
    cleaned: bool,
}

impl std::fmt::Debug for ResponsiveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsiveContext")
            .field("subscriptions", &self.subscriptions)
            .field("handles", &self.handle_count())
            .field("cleaned", &self.cleaned)
            .finish()
    }
}

/// Create a context for `config` in the given mode
pub fn create_responsive_context(
    resolver: Arc<Resolver>,
    host: Arc<dyn MediaQueryHost>,
    config: Arc<BuiltConfig>,
    mode: ContextMode,
    callback: MatchCallback,
) -> ResponsiveContext {
    match mode {
        ContextMode::Forced(slug) => ResponsiveContext::forced(&resolver, &config, &slug, callback),
        ContextMode::Live => ResponsiveContext::live(resolver, host, config, callback),
    }
}

impl ResponsiveContext {
    fn empty() -> Self {
        Self {
            host: None,
            subscriptions: Vec::new(),
            handles: Arc::new(Mutex::new(HandleMap::new())),
            cleaned: false,
        }
    }

    /// Subscribe every non-disabled range
    pub fn live(
        resolver: Arc<Resolver>,
        host: Arc<dyn MediaQueryHost>,
        config: Arc<BuiltConfig>,
        callback: MatchCallback,
    ) -> Self {
        let mut context = Self::empty();
        let callback = Arc::new(Mutex::new(callback));

        for range in resolver.ranges() {
            if config.is_disabled(&range.slug) {
                debug!(unit = config.id(), range = %range.slug, "disabled range not subscribed");
                continue;
            }

            let listener = {
                let resolver = resolver.clone();
                let config = config.clone();
                let callback = callback.clone();
                let handles = context.handles.clone();
                let range = range.clone();
                Box::new(move |matches: bool| {
                    on_match_change(&resolver, &config, &range, matches, &callback, &handles)
                })
            };

            let id = host.subscribe(&range.query, listener);
            context.subscriptions.push(id);
        }

        context.host = Some(host);
        context
    }

    /// Resolve one range synchronously, without subscriptions
    pub fn forced(resolver: &Resolver, config: &BuiltConfig, slug: &str, mut callback: MatchCallback) -> Self {
        let context = Self::empty();

        let Some(range) = resolver.range_by_slug(slug) else {
            warn!(unit = config.id(), slug, "forced breakpoint does not exist");
            return context;
        };
        if config.is_disabled(&range.slug) {
            debug!(unit = config.id(), range = %range.slug, "forced range disabled");
            return context;
        }

        if let Some(variant) = resolver.resolve(config, range) {
            if let Some(handle) = callback(range, &variant) {
                if let Ok(mut handles) = context.handles.lock() {
                    handles.insert(range.slug.clone(), handle);
                }
            }
        }
        context
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// Slugs of ranges that currently own a handle
    pub fn active_ranges(&self) -> Vec<String> {
        self.handles.lock().map(|h| h.keys().cloned().collect()).unwrap_or_default()
    }

    /// Play every held handle from the start; returns the longest duration
    pub fn restart(&self) -> Option<f64> {
        let mut handles = self.handles.lock().ok()?;
        let longest = handles.values_mut().fold(None, |longest, handle| {
            handle.play_from_start();
            let duration = handle.duration();
            Some(longest.map_or(duration, |l: f64| l.max(duration)))
        });
        longest
    }

    pub fn is_cleaned(&self) -> bool {
        self.cleaned
    }

    /// Drop every subscription and hand back the handles still alive.
    /// Later calls do nothing and return an empty list.
    pub fn cleanup(&mut self) -> Vec<Box<dyn AnimationHandle>> {
        if self.cleaned {
            return Vec::new();
        }
        self.cleaned = true;

        if let Some(host) = &self.host {
            for id in self.subscriptions.drain(..) {
                host.unsubscribe(id);
            }
        }

        match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles).into_values().collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn on_match_change(
    resolver: &Resolver,
    config: &BuiltConfig,
    range: &BreakpointRange,
    matches: bool,
    callback: &Mutex<MatchCallback>,
    handles: &Mutex<HandleMap>,
) {
    debug!(unit = config.id(), range = %range.slug, matches, "range match changed");

    // Either way the previous handle for this range is finished
    let previous = handles.lock().ok().and_then(|mut h| h.remove(&range.slug));
    if let Some(mut handle) = previous {
        handle.kill(false);
    }

    if !matches {
        return;
    }

    let Some(variant) = resolver.resolve(config, range) else {
        return;
    };

    let handle = match callback.lock() {
        Ok(mut callback) => callback(range, &variant),
        Err(_) => {
            warn!(unit = config.id(), "match callback poisoned");
            None
        }
    };

    if let Some(handle) = handle {
        if let Ok(mut h) = handles.lock() {
            h.insert(range.slug.clone(), handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, FakeHandle, FakeHost, HandleLog};
    use crate::traits::StaticEnvironment;
    use scrollscript_core::Settings;

    fn resolver() -> Arc<Resolver> {
        Arc::new(Resolver::new(Settings::default(), Arc::new(StaticEnvironment::new())))
    }

    fn recording_callback(log: &HandleLog, seen: &Arc<Mutex<Vec<String>>>) -> MatchCallback {
        let log = log.clone();
        let seen = seen.clone();
        Box::new(move |range, _variant| {
            if let Ok(mut s) = seen.lock() {
                s.push(range.slug.clone());
            }
            Some(Box::new(FakeHandle::new(&log, 1.0)) as Box<dyn AnimationHandle>)
        })
    }

    #[test]
    fn test_live_context_follows_width() {
        let host = Arc::new(FakeHost::new(375));
        let log = HandleLog::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(config("[animation]\nduration: 1"));

        let mut context = ResponsiveContext::live(resolver(), host.clone(), config, recording_callback(&log, &seen));
        assert_eq!(context.subscription_count(), 3);
        assert_eq!(context.active_ranges(), vec!["mobile".to_string()]);

        host.resize(900);
        assert_eq!(context.active_ranges(), vec!["tablet".to_string()]);
        assert_eq!(log.kills(), 1);

        host.resize(1000);
        assert_eq!(*seen.lock().unwrap(), vec!["mobile".to_string(), "tablet".to_string()]);

        let handles = context.cleanup();
        assert_eq!(handles.len(), 1);
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn test_disabled_ranges_not_subscribed() {
        let host = Arc::new(FakeHost::new(375));
        let log = HandleLog::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(config("[animation]\nduration: 1\n[disable @mobile]"));

        let context = ResponsiveContext::live(resolver(), host, config, recording_callback(&log, &seen));
        assert_eq!(context.subscription_count(), 2);
        assert_eq!(context.handle_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cleanup_idempotent() {
        let host = Arc::new(FakeHost::new(1440));
        let log = HandleLog::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(config("[animation]\nduration: 1"));

        let mut context = ResponsiveContext::live(resolver(), host.clone(), config, recording_callback(&log, &seen));
        assert_eq!(context.cleanup().len(), 1);
        assert!(context.cleanup().is_empty());
        assert!(context.is_cleaned());
        assert_eq!(host.unsubscribe_calls(), 3);
    }

    #[test]
    fn test_forced_context() {
        let log = HandleLog::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = config("[animation]\nduration: 1");
        let r = resolver();

        let mut context = ResponsiveContext::forced(&r, &config, "desktop", recording_callback(&log, &seen));
        assert_eq!(context.subscription_count(), 0);
        assert_eq!(context.active_ranges(), vec!["_default_desktop".to_string()]);
        assert_eq!(context.restart(), Some(1.0));
        assert_eq!(log.plays(), 1);
        assert_eq!(context.cleanup().len(), 1);
    }

    #[test]
    fn test_create_dispatches_on_mode() {
        let host = Arc::new(FakeHost::new(375));
        let log = HandleLog::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(config("[animation]\nduration: 1"));

        let forced = create_responsive_context(
            resolver(),
            host.clone(),
            config.clone(),
            ContextMode::Forced("tablet".to_string()),
            recording_callback(&log, &seen),
        );
        assert_eq!(forced.subscription_count(), 0);
        assert_eq!(forced.active_ranges(), vec!["tablet".to_string()]);

        let live = create_responsive_context(resolver(), host.clone(), config, ContextMode::Live, recording_callback(&log, &seen));
        assert_eq!(live.subscription_count(), 3);
        assert_eq!(host.listener_count(), 3);
    }

    #[test]
    fn test_forced_skips_disabled_and_unknown() {
        let log = HandleLog::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = config("[animation]\nduration: 1\n[disable @tablet]");
        let r = resolver();

        let context = ResponsiveContext::forced(&r, &config, "tablet", recording_callback(&log, &seen));
        assert_eq!(context.handle_count(), 0);
        let context = ResponsiveContext::forced(&r, &config, "watch", recording_callback(&log, &seen));
        assert_eq!(context.handle_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(context.restart(), None);
    }
}
