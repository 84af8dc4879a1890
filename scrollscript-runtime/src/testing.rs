//! In-memory hosts for unit tests

use crate::resolver::ActiveVariant;
use crate::traits::{AnimationEngine, AnimationHandle, MatchListener, MediaQueryHost, SubscriptionId};
use crate::RuntimeError;
use scrollscript::{BuildMode, ScrollScript};
use scrollscript_calc::Geometry;
use scrollscript_core::{BuiltConfig, TargetSpec};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn config(script: &str) -> BuiltConfig {
    ScrollScript::default()
        .compile(script, "unit", TargetSpec::wrapper("#unit"), BuildMode::Auto)
        .unwrap()
        .config
}

/// Evaluate the width queries produced by `build_breakpoint_ranges`
fn query_matches(query: &str, width: u32) -> bool {
    if query == "all" {
        return true;
    }
    query.split(" and ").all(|part| {
        let inner = part.trim().trim_start_matches('(').trim_end_matches(')');
        let Some((feature, value)) = inner.split_once(':') else {
            return false;
        };
        let Ok(px) = value.trim().trim_end_matches("px").parse::<u32>() else {
            return false;
        };
        match feature.trim() {
            "min-width" => width >= px,
            "max-width" => width <= px,
            _ => false,
        }
    })
}

struct Subscription {
    query: String,
    listener: MatchListener,
    matching: bool,
}

/// Viewport whose width can be changed; listeners fire on every flip
pub struct FakeHost {
    width: Mutex<u32>,
    next_id: AtomicU64,
    subscriptions: Mutex<BTreeMap<u64, Subscription>>,
    unsubscribes: AtomicUsize,
}

impl FakeHost {
    pub fn new(width: u32) -> Self {
        Self {
            width: Mutex::new(width),
            next_id: AtomicU64::new(1),
            subscriptions: Mutex::new(BTreeMap::new()),
            unsubscribes: AtomicUsize::new(0),
        }
    }

    pub fn resize(&self, width: u32) {
        *self.width.lock().unwrap() = width;
        let mut subscriptions = self.subscriptions.lock().unwrap();
        for sub in subscriptions.values_mut() {
            let matching = query_matches(&sub.query, width);
            if matching != sub.matching {
                sub.matching = matching;
                (sub.listener)(matching);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

impl MediaQueryHost for FakeHost {
    fn subscribe(&self, query: &str, mut listener: MatchListener) -> SubscriptionId {
        let width = *self.width.lock().unwrap();
        let matching = query_matches(query, width);
        listener(matching);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .unwrap()
            .insert(id, Subscription { query: query.to_string(), listener, matching });
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().unwrap().remove(&id.0);
    }
}

/// Shared counters for every handle created from it
#[derive(Debug, Clone, Default)]
pub struct HandleLog {
    plays: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
    kept: Arc<AtomicUsize>,
}

impl HandleLog {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Kills that asked for artifacts to be kept
    pub fn kept_artifacts(&self) -> usize {
        self.kept.load(Ordering::SeqCst)
    }
}

pub struct FakeHandle {
    log: HandleLog,
    duration: f64,
}

impl FakeHandle {
    pub fn new(log: &HandleLog, duration: f64) -> Self {
        Self { log: log.clone(), duration }
    }
}

impl AnimationHandle for FakeHandle {
    fn play_from_start(&mut self) {
        self.log.plays.fetch_add(1, Ordering::SeqCst);
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn kill(&mut self, keep_artifacts: bool) {
        self.log.kills.fetch_add(1, Ordering::SeqCst);
        if keep_artifacts {
            self.log.kept.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Engine that records every variant it is asked to build
pub struct FakeEngine {
    available: AtomicBool,
    failing: AtomicBool,
    geometry: Option<Geometry>,
    duration: f64,
    pub log: HandleLog,
    created: Mutex<Vec<ActiveVariant>>,
}

impl FakeEngine {
    pub fn new(duration: f64) -> Self {
        Self {
            available: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            geometry: Some(Geometry::new(1440.0, 900.0).with_element(400.0, 300.0, 1400.0)),
            duration,
            log: HandleLog::default(),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn without_target(mut self) -> Self {
        self.geometry = None;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every later `create` call fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<ActiveVariant> {
        self.created.lock().unwrap().clone()
    }
}

impl AnimationEngine for FakeEngine {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn locate_target(&self, _unit: &str, _target: &TargetSpec) -> Option<Geometry> {
        self.geometry
    }

    fn create(&self, _unit: &str, variant: &ActiveVariant) -> Result<Box<dyn AnimationHandle>, RuntimeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RuntimeError::Engine("tween construction failed".to_string()));
        }
        self.created.lock().unwrap().push(variant.clone());
        Ok(Box::new(FakeHandle::new(&self.log, self.duration)))
    }
}

#[test]
fn test_query_matches() {
    assert!(query_matches("all", 5));
    assert!(query_matches("(max-width: 767px)", 767));
    assert!(!query_matches("(max-width: 767px)", 768));
    assert!(query_matches("(min-width: 768px) and (max-width: 1024px)", 900));
    assert!(!query_matches("(min-width: 1025px)", 1024));
}
