//! ScrollScript Runtime
//!
//! Turns a `BuiltConfig` into live animations:
//! - Breakpoint ranges and special conditions (reduced-motion, dark, ...)
//! - Responsive resolution of the active variant for a range
//! - Responsive contexts subscribing each range through a `MediaQueryHost`
//! - Unit registry with advisory preview locks, debounced re-init and preview

mod breakpoints;
mod conditions;
mod context;
mod error;
mod registry;
mod resolver;
mod runtime;
mod scheduler;
mod traits;

#[cfg(test)]
mod testing;

pub use breakpoints::{build_breakpoint_ranges, range_by_slug, range_for_width, BreakpointRange};
pub use conditions::{ConditionCache, SpecialCondition};
pub use context::{create_responsive_context, ContextMode, MatchCallback, ResponsiveContext};
pub use error::RuntimeError;
pub use registry::UnitRegistry;
pub use resolver::{ActiveVariant, Resolver, VariantBody, VariantSource};
pub use runtime::Runtime;
pub use scheduler::Debouncer;
pub use traits::{
    AnimationEngine, AnimationHandle, EnvironmentProbe, MatchListener, MediaQueryHost,
    StaticEnvironment, SubscriptionId,
};

/// Re-export the types a host integration needs
pub mod prelude {
    pub use crate::{
        ActiveVariant, AnimationEngine, AnimationHandle, EnvironmentProbe, MediaQueryHost,
        Resolver, Runtime, RuntimeError, StaticEnvironment,
    };
    pub use scrollscript_core::prelude::*;
}
