//! Token-alignment table detection
//!
//! Two consecutive lines are column-aligned when both carry at least
//! `min_tokens_per_line` tokens and at least `min_aligned_fraction` of the shorter line's
//! tokens have a left-X within `column_tolerance` of some token of the other line.
//! Maximal runs of aligned consecutive lines form row-groups; a row-group with at least
//! `min_table_rows` lines becomes a candidate.

// Token counts are far below f64 mantissa range
#![allow(clippy::cast_precision_loss)]

use std::ops::Range;

use log::trace;

use super::{Capability, ColumnAssigner, PageContext, TableStrategy};
use crate::config::AlignmentConfig;
use crate::error::Result;
use crate::types::{union_of, Line, TableMethod, TableRegion};

/// Finds tables as runs of column-aligned token lines
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenAlignmentStrategy {
    config: AlignmentConfig,
    assigner: ColumnAssigner,
}

impl TokenAlignmentStrategy {
    #[inline]
    #[must_use = "returns a new TokenAlignmentStrategy instance"]
    pub fn new() -> Self {
        Self {
            config: AlignmentConfig::default(),
            assigner: ColumnAssigner::new(),
        }
    }

    #[inline]
    #[must_use = "returns a new TokenAlignmentStrategy with custom config"]
    pub const fn with_config(config: AlignmentConfig, assigner: ColumnAssigner) -> Self {
        Self { config, assigner }
    }

    /// Whether two lines share enough column positions
    #[must_use]
    pub fn lines_aligned(&self, a: &Line, b: &Line) -> bool {
        let min_tokens = self.config.min_tokens_per_line;
        if a.len() < min_tokens || b.len() < min_tokens {
            return false;
        }

        let (shorter, other) = if b.len() < a.len() { (b, a) } else { (a, b) };
        let aligned = shorter
            .lefts()
            .filter(|&x| {
                other
                    .lefts()
                    .any(|y| (x - y).abs() <= self.config.column_tolerance)
            })
            .count();

        aligned as f64 >= shorter.len() as f64 * self.config.min_aligned_fraction
    }

    /// Line index ranges of every qualifying row-group
    #[must_use]
    pub fn row_groups(&self, lines: &[Line]) -> Vec<Range<usize>> {
        let mut groups = Vec::new();
        let mut start = 0;

        while start < lines.len() {
            let mut end = start + 1;
            while end < lines.len() && self.lines_aligned(&lines[end - 1], &lines[end]) {
                end += 1;
            }
            if end - start >= self.config.min_table_rows {
                trace!("Aligned row-group: lines {start}..{end}");
                groups.push(start..end);
            }
            start = end;
        }

        groups
    }

    /// Build candidate regions from grouped lines
    #[must_use]
    pub fn regions(&self, lines: &[Line]) -> Vec<TableRegion> {
        self.row_groups(lines)
            .into_iter()
            .filter_map(|range| {
                let group = &lines[range];
                let bbox = union_of(group.iter().flat_map(|l| l.tokens.iter().map(|t| t.bbox)))?;
                let mut region =
                    TableRegion::new(bbox, self.config.confidence, TableMethod::TokenAlignment);
                self.assigner.assign(group, &mut region);
                Some(region)
            })
            .collect()
    }
}

impl TableStrategy for TokenAlignmentStrategy {
    fn name(&self) -> &str {
        "token-alignment"
    }

    fn capability(&self) -> Capability {
        if self.config.enabled {
            Capability::TokenAlignment
        } else {
            Capability::Unavailable
        }
    }

    fn detect(&self, page: &PageContext<'_>) -> Result<Vec<TableRegion>> {
        Ok(self.regions(page.lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_grouper::LineGrouper;
    use docscan_ocr::{BBox, Token};

    fn token(text: &str, left: f64, top: f64) -> Token {
        Token::new(text, BBox::from_ltwh(left, top, 40.0, 12.0), 0.9).unwrap()
    }

    fn row(top: f64, cells: &[(&str, f64)]) -> Vec<Token> {
        cells.iter().map(|(t, x)| token(t, *x, top)).collect()
    }

    #[test]
    fn test_aligned_pair_uses_shorter_line() {
        let strategy = TokenAlignmentStrategy::new();
        let grouper = LineGrouper::new();
        let mut tokens = row(0.0, &[("a", 10.0), ("b", 100.0), ("c", 200.0), ("d", 300.0)]);
        // 2 of the shorter line's 2 tokens align
        tokens.extend(row(30.0, &[("e", 15.0), ("f", 290.0)]));
        let lines = grouper.lines(&tokens);
        assert!(strategy.lines_aligned(&lines[0], &lines[1]));
    }

    #[test]
    fn test_single_token_line_breaks_run() {
        let strategy = TokenAlignmentStrategy::new();
        let mut tokens = row(0.0, &[("Name", 10.0), ("Amt", 200.0)]);
        tokens.extend(row(30.0, &[("Aspirin", 12.0), ("20", 205.0)]));
        tokens.extend(row(60.0, &[("Notes", 10.0)]));
        tokens.extend(row(90.0, &[("x", 10.0), ("y", 200.0)]));
        let lines = LineGrouper::new().lines(&tokens);
        assert_eq!(strategy.row_groups(&lines), vec![0..2]);
    }

    #[test]
    fn test_region_bbox_and_cells() {
        let strategy = TokenAlignmentStrategy::new();
        let mut tokens = row(0.0, &[("Name", 10.0), ("Amt", 200.0)]);
        tokens.extend(row(30.0, &[("Aspirin", 12.0), ("20", 205.0)]));
        tokens.extend(row(60.0, &[("Paracetamol", 8.0), ("15", 198.0)]));
        let lines = LineGrouper::new().lines(&tokens);

        let regions = strategy.regions(&lines);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, BBox::new(8.0, 0.0, 245.0, 72.0));
        assert_eq!(regions[0].row_count(), 3);
        assert_eq!(regions[0].col_count(), 2);
        assert_eq!(regions[0].grid()[2], vec!["Paracetamol", "15"]);
    }

    #[test]
    fn test_disabled_strategy_is_unavailable() {
        let strategy = TokenAlignmentStrategy::with_config(
            AlignmentConfig {
                enabled: false,
                ..AlignmentConfig::default()
            },
            ColumnAssigner::new(),
        );
        assert_eq!(strategy.capability(), Capability::Unavailable);
    }
}
