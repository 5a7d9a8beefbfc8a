//! Layout engine configuration
//!
//! Every threshold the engine uses lives here, one struct per component, each with a
//! `Default` carrying the tuned constants. [`LayoutConfig`] aggregates them and
//! deserialises from TOML/JSON with every field optional.
//!
//! ```
//! use docscan_layout::LayoutConfig;
//!
//! let config: LayoutConfig = serde_json::from_str(r#"{"alignment": {"min_table_rows": 3}}"#).unwrap();
//! assert_eq!(config.alignment.min_table_rows, 3);
//! assert!((config.alignment.column_tolerance - 20.0).abs() < f64::EPSILON);
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

/// Line grouping: tokens whose top-Y lies within `y_threshold` of the line anchor share a line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineGroupingConfig {
    /// Max vertical distance (px) between a token top and the line's anchor top (default 10)
    pub y_threshold: f64,
}

impl Default for LineGroupingConfig {
    #[inline]
    fn default() -> Self {
        Self { y_threshold: 10.0 }
    }
}

/// Ruled-table detection on the raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineMorphologyConfig {
    pub enabled: bool,
    /// Length (px) of the horizontal/vertical structuring element (default 40)
    pub kernel_len: u32,
    /// Candidates must be strictly wider than this (default 100)
    pub min_width: u32,
    /// Candidates must be strictly taller than this (default 50)
    pub min_height: u32,
    pub confidence: f64,
    /// Assign the tokens inside a ruled region to (row, col) cells (default false)
    pub assign_cells_to_ruled_regions: bool,
}

impl Default for LineMorphologyConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: true,
            kernel_len: 40,
            min_width: 100,
            min_height: 50,
            confidence: 0.7,
            assign_cells_to_ruled_regions: false,
        }
    }
}

/// Token-alignment detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub enabled: bool,
    /// Max left-X distance (px) for two tokens to count as column-aligned (default 20)
    pub column_tolerance: f64,
    /// Both lines of a pair need at least this many tokens (default 2)
    pub min_tokens_per_line: usize,
    /// Fraction of the shorter line's tokens that must align (default 0.5)
    pub min_aligned_fraction: f64,
    /// Lines a row-group needs before it becomes a candidate (default 2)
    pub min_table_rows: usize,
    pub confidence: f64,
}

impl Default for AlignmentConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: true,
            column_tolerance: 20.0,
            min_tokens_per_line: 2,
            min_aligned_fraction: 0.5,
            min_table_rows: 2,
            confidence: 0.6,
        }
    }
}

/// Column anchor resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Gap (px) that opens a new anchor, and slack allowed left of an anchor (default 15)
    pub anchor_tolerance: f64,
}

impl Default for ColumnConfig {
    #[inline]
    fn default() -> Self {
        Self {
            anchor_tolerance: 15.0,
        }
    }
}

/// Region merge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Regions merge when intersection / own area exceeds this for either region (default 0.3)
    pub overlap_threshold: f64,
}

impl Default for MergeConfig {
    #[inline]
    fn default() -> Self {
        Self {
            overlap_threshold: 0.3,
        }
    }
}

/// Lenient table reconstruction from a flat token list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Fewer input (and surviving) tokens than this is rejected (default 6)
    pub min_tokens: usize,
    /// Tokens below this confidence are dropped (default 0.25)
    pub confidence_floor: f64,
    /// Max top-Y distance (px) to the row's last token (default 10)
    pub row_y_threshold: f64,
    pub min_row_cells: usize,
    /// Rows above this many cells are truncated (default 12)
    pub max_row_cells: usize,
    /// Cells kept from a truncated row (default 6)
    pub truncate_to: usize,
    /// Raw and accepted rows needed (default 3)
    pub min_rows: usize,
    /// Accepted rows with a digit may have up to this many cells (default 8)
    pub max_cells_with_digit: usize,
    /// Accepted rows without a digit may have up to this many cells (default 6)
    pub max_cells_without_digit: usize,
    /// Lenient second pass ceiling (default 10)
    pub lenient_max_cells: usize,
    /// A row is consistent when its cell count is within this of the mean (default 2)
    pub consistency_tolerance: f64,
    pub primary_consistency: f64,
    pub primary_min_rows: usize,
    pub secondary_consistency: f64,
    pub secondary_min_rows: usize,
    pub wide_min_avg_cols: f64,
    pub wide_min_rows: usize,
    /// Rescue rule: fraction of rows containing a digit (default 0.6)
    pub numeric_row_fraction: f64,
    pub numeric_min_rows: usize,
}

impl Default for FallbackConfig {
    #[inline]
    fn default() -> Self {
        Self {
            min_tokens: 6,
            confidence_floor: 0.25,
            row_y_threshold: 10.0,
            min_row_cells: 2,
            max_row_cells: 12,
            truncate_to: 6,
            min_rows: 3,
            max_cells_with_digit: 8,
            max_cells_without_digit: 6,
            lenient_max_cells: 10,
            consistency_tolerance: 2.0,
            primary_consistency: 0.4,
            primary_min_rows: 3,
            secondary_consistency: 0.3,
            secondary_min_rows: 5,
            wide_min_avg_cols: 3.0,
            wide_min_rows: 4,
            numeric_row_fraction: 0.6,
            numeric_min_rows: 4,
        }
    }
}

/// Strict structure check applied to positioned blocks from a structured OCR engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Fewer blocks than this is never a table (default 8)
    pub min_blocks: usize,
    /// Max center-Y distance (px) to the previous block of the row (default 15)
    pub row_y_threshold: f64,
    /// Rows with fewer blocks are ignored (default 2)
    pub min_blocks_per_row: usize,
    pub min_rows: usize,
    /// A row is consistent when its column count is within this of the mean (default 1)
    pub column_tolerance: f64,
    pub min_consistent_fraction: f64,
    pub min_avg_cols: f64,
    /// Reject when more than this fraction of first-row texts contain ':' or '/' (default 0.3)
    pub max_form_indicator_fraction: f64,
    /// Rows inspected by the repetition check (default 5)
    pub repetition_rows: usize,
    /// Texts longer than this are ignored by the repetition check (default 15)
    pub short_text_max_chars: usize,
    /// Occurrences for a text to count as repeated (default 2)
    pub min_repeat_count: usize,
    /// Distinct repeated texts required (default 3)
    pub min_repeated_texts: usize,
    /// Row grouping threshold (px, center-Y) used when rebuilding the grid (default 20)
    pub reconstruct_y_threshold: f64,
}

impl Default for StructureConfig {
    #[inline]
    fn default() -> Self {
        Self {
            min_blocks: 8,
            row_y_threshold: 15.0,
            min_blocks_per_row: 2,
            min_rows: 3,
            column_tolerance: 1.0,
            min_consistent_fraction: 0.8,
            min_avg_cols: 3.0,
            max_form_indicator_fraction: 0.3,
            repetition_rows: 5,
            short_text_max_chars: 15,
            min_repeat_count: 2,
            min_repeated_texts: 3,
            reconstruct_y_threshold: 20.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub line_grouping: LineGroupingConfig,
    pub line_morphology: LineMorphologyConfig,
    pub alignment: AlignmentConfig,
    pub columns: ColumnConfig,
    pub merge: MergeConfig,
    pub fallback: FallbackConfig,
    pub structure: StructureConfig,
}

impl LayoutConfig {
    /// Reject out-of-range values
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        non_negative("line_grouping.y_threshold", self.line_grouping.y_threshold)?;

        let morph = &self.line_morphology;
        // imageproc masks are capped at 511 px per side
        if morph.kernel_len == 0 || morph.kernel_len > 511 {
            return Err(LayoutError::Config(format!(
                "line_morphology.kernel_len must be in 1..=511, got {}",
                morph.kernel_len
            )));
        }
        unit_interval("line_morphology.confidence", morph.confidence)?;

        let align = &self.alignment;
        non_negative("alignment.column_tolerance", align.column_tolerance)?;
        unit_interval("alignment.min_aligned_fraction", align.min_aligned_fraction)?;
        unit_interval("alignment.confidence", align.confidence)?;
        at_least("alignment.min_tokens_per_line", align.min_tokens_per_line, 1)?;
        at_least("alignment.min_table_rows", align.min_table_rows, 1)?;

        non_negative("columns.anchor_tolerance", self.columns.anchor_tolerance)?;
        unit_interval("merge.overlap_threshold", self.merge.overlap_threshold)?;

        let fb = &self.fallback;
        unit_interval("fallback.confidence_floor", fb.confidence_floor)?;
        non_negative("fallback.row_y_threshold", fb.row_y_threshold)?;
        at_least("fallback.truncate_to", fb.truncate_to, 1)?;
        if fb.min_row_cells > fb.max_row_cells {
            return Err(LayoutError::Config(format!(
                "fallback.min_row_cells ({}) exceeds fallback.max_row_cells ({})",
                fb.min_row_cells, fb.max_row_cells
            )));
        }
        unit_interval("fallback.primary_consistency", fb.primary_consistency)?;
        unit_interval("fallback.secondary_consistency", fb.secondary_consistency)?;
        unit_interval("fallback.numeric_row_fraction", fb.numeric_row_fraction)?;

        let st = &self.structure;
        non_negative("structure.row_y_threshold", st.row_y_threshold)?;
        non_negative("structure.reconstruct_y_threshold", st.reconstruct_y_threshold)?;
        unit_interval("structure.min_consistent_fraction", st.min_consistent_fraction)?;
        unit_interval(
            "structure.max_form_indicator_fraction",
            st.max_form_indicator_fraction,
        )?;
        Ok(())
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LayoutError::Config(format!(
            "{field} must be a non-negative number, got {value}"
        )))
    }
}

fn unit_interval(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LayoutError::Config(format!(
            "{field} must be in [0, 1], got {value}"
        )))
    }
}

fn at_least(field: &str, value: usize, min: usize) -> Result<()> {
    if value >= min {
        Ok(())
    } else {
        Err(LayoutError::Config(format!(
            "{field} must be at least {min}, got {value}"
        )))
    }
}
