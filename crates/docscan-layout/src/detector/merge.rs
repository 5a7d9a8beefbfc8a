//! Region merge: collapse overlapping table detections
//!
//! Two regions overlap when their intersection covers more than `overlap_threshold` of
//! either region's own area (`intersection_over_self`, checked both ways, NOT `IoU`).
//!
//! Algorithm (greedy, repeated until convergence):
//! 1. Walk regions in order; each unused region absorbs every later unused region it
//!    overlaps, growing as it goes
//! 2. Absorbed pair → bbox union, confidence max, cells concatenated (no dedup),
//!    method [`TableMethod::MergedFallback`]
//! 3. Repeat while a pass merged anything, so `merge(merge(x)) == merge(x)`

// Pipeline stage functions take Vec ownership for data flow semantics
#![allow(clippy::needless_pass_by_value)]

use log::debug;

use crate::config::MergeConfig;
use crate::types::{TableMethod, TableRegion};

/// Merges overlapping [`TableRegion`]s
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionMerger {
    config: MergeConfig,
}

impl RegionMerger {
    #[inline]
    #[must_use = "returns a new RegionMerger instance"]
    pub fn new() -> Self {
        Self {
            config: MergeConfig::default(),
        }
    }

    #[inline]
    #[must_use = "returns a new RegionMerger with custom config"]
    pub const fn with_config(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Whether two regions overlap enough to merge
    #[must_use]
    pub fn overlaps(&self, a: &TableRegion, b: &TableRegion) -> bool {
        if a.bbox.intersection_area(&b.bbox) <= 0.0 {
            return false;
        }
        let ratio = a
            .bbox
            .intersection_over_self(&b.bbox)
            .max(b.bbox.intersection_over_self(&a.bbox));
        ratio > self.config.overlap_threshold
    }

    /// Merge until no two output regions overlap
    #[must_use = "returns the merged regions"]
    pub fn merge(&self, regions: Vec<TableRegion>) -> Vec<TableRegion> {
        let input_count = regions.len();
        let mut current = regions;
        let mut passes = 0usize;

        loop {
            passes += 1;
            let (next, merged_any) = self.single_pass(current);
            current = next;
            if !merged_any {
                break;
            }
        }

        debug!(
            "Merged {} table candidates into {} regions ({} passes)",
            input_count,
            current.len(),
            passes
        );
        current
    }

    fn single_pass(&self, regions: Vec<TableRegion>) -> (Vec<TableRegion>, bool) {
        if regions.len() <= 1 {
            return (regions, false);
        }

        let mut slots: Vec<Option<TableRegion>> = regions.into_iter().map(Some).collect();
        let mut output = Vec::with_capacity(slots.len());
        let mut merged_any = false;

        for i in 0..slots.len() {
            let Some(mut current) = slots[i].take() else {
                continue;
            };
            for slot in slots.iter_mut().skip(i + 1) {
                let absorb = slot
                    .as_ref()
                    .is_some_and(|other| self.overlaps(&current, other));
                if absorb {
                    if let Some(other) = slot.take() {
                        current = Self::absorb(current, other);
                        merged_any = true;
                    }
                }
            }
            output.push(current);
        }

        (output, merged_any)
    }

    fn absorb(mut base: TableRegion, other: TableRegion) -> TableRegion {
        base.bbox = base.bbox.union(&other.bbox);
        base.confidence = base.confidence.max(other.confidence);
        base.cells.extend(other.cells);
        base.method = TableMethod::MergedFallback;
        base
    }
}
