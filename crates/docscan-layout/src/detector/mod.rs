//! # Table detection
//!
//! Candidate table regions come from independent [`TableStrategy`] providers. Their
//! outputs are unioned, then [`RegionMerger`] collapses overlapping candidates.
//!
//! ## Strategies
//!
//! ### Line morphology ([`LineMorphologyStrategy`])
//! - **Needs:** raster image
//! - **Process:** Otsu binarisation, horizontal/vertical opening, external contours
//! - **Output:** ruled regions (confidence 0.7), cells only when
//!   `assign_cells_to_ruled_regions` is set
//!
//! ### Token alignment ([`TokenAlignmentStrategy`])
//! - **Needs:** OCR tokens
//! - **Process:** runs of consecutive column-aligned lines, then [`ColumnAssigner`]
//! - **Output:** regions with (row, col) cells (confidence 0.6)
//!
//! Strategies declare a [`Capability`] instead of the detector probing for libraries or
//! inputs: a strategy runs only when the page carries what its capability needs, and a
//! disabled strategy declares [`Capability::Unavailable`]. Extra providers (for example an
//! ML-assisted detector) are registered with [`TableDetector::with_strategy`].

mod alignment;
mod columns;
mod line_morphology;
mod merge;

pub use alignment::TokenAlignmentStrategy;
pub use columns::ColumnAssigner;
pub use line_morphology::LineMorphologyStrategy;
pub use merge::RegionMerger;

use std::fmt;

use docscan_ocr::Token;
use image::DynamicImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::line_grouper::LineGrouper;
use crate::types::{Line, TableMethod, TableRegion};

/// What a detection provider can do with the current build and configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Provider is disabled or its backend is missing
    Unavailable,
    /// Needs a raster image
    LineMorphology,
    /// Needs OCR tokens
    TokenAlignment,
    /// Works from the raster, the tokens, or both
    MlAssisted,
}

impl Capability {
    /// Whether the page carries the inputs this capability needs
    #[must_use]
    pub fn is_satisfied_by(self, page: &PageContext<'_>) -> bool {
        match self {
            Self::Unavailable => false,
            Self::LineMorphology => page.image.is_some(),
            Self::TokenAlignment => !page.tokens.is_empty(),
            Self::MlAssisted => page.image.is_some() || !page.tokens.is_empty(),
        }
    }
}

/// Inputs of one detection call
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub image: Option<&'a DynamicImage>,
    pub tokens: &'a [Token],
    /// `tokens` grouped into lines
    pub lines: &'a [Line],
}

/// A table detection provider
pub trait TableStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Declared capability; [`Capability::Unavailable`] providers never run
    fn capability(&self) -> Capability;

    /// Candidate regions for the page
    ///
    /// # Errors
    ///
    /// A failing strategy is logged and skipped by [`TableDetector`]; its error never
    /// aborts detection.
    fn detect(&self, page: &PageContext<'_>) -> Result<Vec<TableRegion>>;
}

/// Runs every available strategy and merges their candidates
pub struct TableDetector {
    strategies: Vec<Box<dyn TableStrategy>>,
    merger: RegionMerger,
    assigner: ColumnAssigner,
    grouper: LineGrouper,
    assign_ruled_cells: bool,
}

impl fmt::Debug for TableDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("TableDetector")
            .field("strategies", &names)
            .field("merger", &self.merger)
            .field("assign_ruled_cells", &self.assign_ruled_cells)
            .finish_non_exhaustive()
    }
}

impl Default for TableDetector {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TableDetector {
    /// Detector with the two built-in strategies and default thresholds
    #[inline]
    #[must_use = "returns a new TableDetector instance"]
    pub fn new() -> Self {
        Self::with_config(&LayoutConfig::default())
    }

    /// Detector with the two built-in strategies configured from `config`
    #[must_use = "returns a new TableDetector with custom config"]
    pub fn with_config(config: &LayoutConfig) -> Self {
        let assigner = ColumnAssigner::with_config(config.columns);
        Self {
            strategies: vec![
                Box::new(LineMorphologyStrategy::with_config(config.line_morphology)),
                Box::new(TokenAlignmentStrategy::with_config(
                    config.alignment,
                    assigner,
                )),
            ],
            merger: RegionMerger::with_config(config.merge),
            assigner,
            grouper: LineGrouper::with_config(config.line_grouping),
            assign_ruled_cells: config.line_morphology.assign_cells_to_ruled_regions,
        }
    }

    /// Register an additional provider
    #[must_use = "returns the detector with the strategy registered"]
    pub fn with_strategy(mut self, strategy: Box<dyn TableStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Declared capability of every registered provider, in registration order
    #[must_use]
    pub fn capabilities(&self) -> Vec<Capability> {
        self.strategies.iter().map(|s| s.capability()).collect()
    }

    /// Union of every runnable strategy's candidates, before merging
    #[must_use]
    pub fn candidates(&self, page: &PageContext<'_>) -> Vec<TableRegion> {
        let mut candidates = Vec::new();

        for strategy in &self.strategies {
            let capability = strategy.capability();
            if !capability.is_satisfied_by(page) {
                debug!(
                    "Skipping table strategy '{}' ({:?})",
                    strategy.name(),
                    capability
                );
                continue;
            }
            match strategy.detect(page) {
                Ok(regions) => {
                    debug!(
                        "Table strategy '{}' found {} candidates",
                        strategy.name(),
                        regions.len()
                    );
                    candidates.extend(regions);
                }
                Err(e) => warn!("Table strategy '{}' failed: {}", strategy.name(), e),
            }
        }

        if self.assign_ruled_cells {
            for region in &mut candidates {
                if region.method == TableMethod::LineMorphology && region.cells.is_empty() {
                    self.fill_ruled_region(region, page.tokens);
                }
            }
        }

        candidates
    }

    /// Detect and merge table regions
    #[must_use]
    pub fn detect(&self, page: &PageContext<'_>) -> Vec<TableRegion> {
        self.merger.merge(self.candidates(page))
    }

    fn fill_ruled_region(&self, region: &mut TableRegion, tokens: &[Token]) {
        let inside: Vec<Token> = tokens
            .iter()
            .filter(|t| region.owns(&t.bbox))
            .cloned()
            .collect();
        if inside.is_empty() {
            return;
        }
        let lines = self.grouper.lines(&inside);
        self.assigner.assign(&lines, region);
    }
}
