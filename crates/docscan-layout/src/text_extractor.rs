//! Prose extraction and output formatting
//!
//! A token is table-owned iff its box lies fully inside some region's box (all four edges,
//! inclusive). Every other token becomes a [`TextBlock`], in input order.

// ZST struct methods use &self for API consistency
#![allow(clippy::trivially_copy_pass_by_ref)]

use docscan_ocr::Token;
use log::debug;

use crate::types::{FormattedTable, TableRegion, TextBlock};

/// Splits tokens into prose and table content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextExtractor;

impl TextExtractor {
    #[inline]
    #[must_use = "returns a new TextExtractor instance"]
    pub const fn new() -> Self {
        Self
    }

    /// Tokens outside every table, as text blocks
    #[must_use]
    pub fn extract(&self, tokens: &[Token], tables: &[TableRegion]) -> Vec<TextBlock> {
        let blocks: Vec<TextBlock> = tokens
            .iter()
            .filter(|t| !tables.iter().any(|table| table.owns(&t.bbox)))
            .map(TextBlock::from)
            .collect();
        debug!(
            "Text extraction: {} of {} tokens are prose ({} tables)",
            blocks.len(),
            tokens.len(),
            tables.len()
        );
        blocks
    }

    /// Serialisable view of every table
    #[must_use]
    pub fn format_tables(&self, tables: &[TableRegion]) -> Vec<FormattedTable> {
        tables.iter().map(FormattedTable::from).collect()
    }
}
