//! Data model shared by the layout stages
//!
//! - [`Line`]: tokens sharing a top-Y band, ordered left to right (per analysis call only)
//! - [`Cell`] / [`TableRegion`]: detected table with its (row, col) cells
//! - [`TextBlock`]: a prose token outside every table
//! - [`FormattedTable`] / [`LayoutResult`]: the serialisable output

use docscan_ocr::{BBox, Token};
use serde::{Deserialize, Serialize};

/// Tokens sharing approximately the same top-Y, sorted by left-X
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Top-Y of the token that opened the line
    pub anchor_top: f64,
    pub tokens: Vec<Token>,
}

impl Line {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Union of the token boxes (`None` for an empty line)
    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        union_of(self.tokens.iter().map(|t| t.bbox))
    }

    /// Tokens' left edges, in line order
    pub fn lefts(&self) -> impl Iterator<Item = f64> + '_ {
        self.tokens.iter().map(Token::left)
    }

    /// Tokens' text joined by single spaces
    #[must_use]
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Smallest box covering every box of the iterator
pub(crate) fn union_of(mut boxes: impl Iterator<Item = BBox>) -> Option<BBox> {
    let first = boxes.next()?;
    Some(boxes.fold(first, |acc, b| acc.union(&b)))
}

/// How a table region was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMethod {
    /// Ruling lines found by morphological opening on the raster
    LineMorphology,
    /// Column-aligned consecutive token lines
    TokenAlignment,
    /// Union of overlapping detections
    MergedFallback,
}

impl TableMethod {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LineMorphology => "line_morphology",
            Self::TokenAlignment => "token_alignment",
            Self::MergedFallback => "merged_fallback",
        }
    }
}

impl std::fmt::Display for TableMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub bbox: BBox,
    pub confidence: f64,
}

/// A detected table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    pub bbox: BBox,
    pub confidence: f64,
    pub cells: Vec<Cell>,
    pub method: TableMethod,
}

impl TableRegion {
    #[inline]
    #[must_use = "returns a new TableRegion instance"]
    pub const fn new(bbox: BBox, confidence: f64, method: TableMethod) -> Self {
        Self {
            bbox,
            confidence,
            cells: Vec::new(),
            method,
        }
    }

    /// Add a cell, keeping (row, col) unique within this region
    ///
    /// A second token landing on an occupied coordinate is joined into the existing cell:
    /// text joined by a space, box union, lowest confidence.
    pub fn add_cell(&mut self, cell: Cell) {
        if let Some(existing) = self
            .cells
            .iter_mut()
            .find(|c| c.row == cell.row && c.col == cell.col)
        {
            existing.text.push(' ');
            existing.text.push_str(&cell.text);
            existing.bbox = existing.bbox.union(&cell.bbox);
            existing.confidence = existing.confidence.min(cell.confidence);
        } else {
            self.cells.push(cell);
        }
    }

    /// Whether the token box lies fully inside this region (edges inclusive)
    #[inline]
    #[must_use]
    pub fn owns(&self, bbox: &BBox) -> bool {
        self.bbox.contains(bbox)
    }

    /// `(max row + 1) × (max col + 1)` text grid, "" for missing cells
    ///
    /// On duplicate coordinates (possible after a merge) the later cell wins.
    #[must_use]
    pub fn grid(&self) -> Vec<Vec<String>> {
        let Some(rows) = self.cells.iter().map(|c| c.row).max() else {
            return Vec::new();
        };
        let cols = self.cells.iter().map(|c| c.col).max().unwrap_or(0);

        let mut grid = vec![vec![String::new(); cols + 1]; rows + 1];
        for cell in &self.cells {
            grid[cell.row][cell.col].clone_from(&cell.text);
        }
        grid
    }

    /// Number of distinct row indices
    #[must_use]
    pub fn row_count(&self) -> usize {
        let mut rows: Vec<usize> = self.cells.iter().map(|c| c.row).collect();
        rows.sort_unstable();
        rows.dedup();
        rows.len()
    }

    /// Number of distinct column indices
    #[must_use]
    pub fn col_count(&self) -> usize {
        let mut cols: Vec<usize> = self.cells.iter().map(|c| c.col).collect();
        cols.sort_unstable();
        cols.dedup();
        cols.len()
    }
}

/// Prose text outside every table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub bbox: BBox,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl From<&Token> for TextBlock {
    fn from(token: &Token) -> Self {
        Self {
            text: token.text.clone(),
            bbox: token.bbox,
            confidence: token.confidence,
            page: token.page,
        }
    }
}

/// Serialisable view of a [`TableRegion`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedTable {
    pub bbox: BBox,
    pub confidence: f64,
    pub method: TableMethod,
    pub structured_data: Vec<Vec<String>>,
    pub cells: Vec<Cell>,
    pub row_count: usize,
    pub col_count: usize,
}

impl From<&TableRegion> for FormattedTable {
    fn from(region: &TableRegion) -> Self {
        Self {
            bbox: region.bbox,
            confidence: region.confidence,
            method: region.method,
            structured_data: region.grid(),
            cells: region.cells.clone(),
            row_count: region.row_count(),
            col_count: region.col_count(),
        }
    }
}

/// Output of one layout analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub text_blocks: Vec<TextBlock>,
    pub tables: Vec<FormattedTable>,
    pub layout_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LayoutResult {
    /// Empty result carrying an error message
    #[inline]
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
