//! Breakpoint ranges
//!
//! Thresholds partition `[1, ∞)` into contiguous inclusive ranges:
//! `[1, v1]`, `[v1 + 1, v2]`, ..., and an open default range above the widest.

use scrollscript_core::{canonical_slug, BreakpointDef, DEFAULT_RANGE_SLUG};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointRange {
    pub slug: String,
    /// Media query matching exactly this range
    pub query: String,
    pub min: u32,
    /// `None` for the open default range
    pub max: Option<u32>,
}

impl BreakpointRange {
    pub fn contains(&self, width: u32) -> bool {
        width >= self.min && self.max.map_or(true, |max| width <= max)
    }

    pub fn is_default(&self) -> bool {
        self.slug == DEFAULT_RANGE_SLUG
    }
}

/// Build contiguous ranges from breakpoint definitions in any order.
///
/// Thresholds are sorted ascending; a repeated or zero threshold would make an
/// empty range and is dropped.
pub fn build_breakpoint_ranges(defs: &[BreakpointDef]) -> Vec<BreakpointRange> {
    let mut sorted: Vec<&BreakpointDef> = defs.iter().filter(|d| d.value > 0).collect();
    sorted.sort_by_key(|d| d.value);
    sorted.dedup_by_key(|d| d.value);

    if sorted.is_empty() {
        return vec![BreakpointRange {
            slug: DEFAULT_RANGE_SLUG.to_string(),
            query: "all".to_string(),
            min: 1,
            max: None,
        }];
    }

    let mut ranges = Vec::with_capacity(sorted.len() + 1);
    let mut min = 1;
    for def in &sorted {
        let query = if min == 1 {
            format!("(max-width: {}px)", def.value)
        } else {
            format!("(min-width: {}px) and (max-width: {}px)", min, def.value)
        };
        ranges.push(BreakpointRange { slug: def.key.clone(), query, min, max: Some(def.value) });
        min = def.value + 1;
    }

    ranges.push(BreakpointRange {
        slug: DEFAULT_RANGE_SLUG.to_string(),
        query: format!("(min-width: {}px)", min),
        min,
        max: None,
    });
    ranges
}

pub fn range_for_width(ranges: &[BreakpointRange], width: u32) -> Option<&BreakpointRange> {
    ranges.iter().find(|r| r.contains(width))
}

/// Look up by slug, accepting the `desktop` alias
pub fn range_by_slug<'a>(ranges: &'a [BreakpointRange], slug: &str) -> Option<&'a BreakpointRange> {
    let slug = canonical_slug(slug);
    ranges.iter().find(|r| r.slug == slug)
}
