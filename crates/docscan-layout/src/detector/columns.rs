//! Column anchor resolution and (row, col) cell assignment
//!
//! Anchors come from the sorted unique left-X values of every token in a row-group: the
//! first value is an anchor, and each value more than `anchor_tolerance` past the previous
//! value opens another. A token takes the index of the greatest anchor with
//! `left >= anchor - anchor_tolerance`; its row is the line ordinal inside the group.

use std::collections::BTreeSet;

use log::trace;
use ordered_float::OrderedFloat;

use crate::config::ColumnConfig;
use crate::types::{Cell, Line, TableRegion};

/// Assigns the tokens of a row-group to table cells
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColumnAssigner {
    config: ColumnConfig,
}

impl ColumnAssigner {
    #[inline]
    #[must_use = "returns a new ColumnAssigner instance"]
    pub fn new() -> Self {
        Self {
            config: ColumnConfig::default(),
        }
    }

    #[inline]
    #[must_use = "returns a new ColumnAssigner with custom config"]
    pub const fn with_config(config: ColumnConfig) -> Self {
        Self { config }
    }

    /// Column anchors (ascending) for the given lines
    #[must_use]
    pub fn anchors(&self, lines: &[Line]) -> Vec<f64> {
        let unique: BTreeSet<OrderedFloat<f64>> = lines
            .iter()
            .flat_map(Line::lefts)
            .map(OrderedFloat)
            .collect();

        let mut anchors = Vec::new();
        let mut previous: Option<f64> = None;
        for OrderedFloat(x) in unique {
            if previous.map_or(true, |p| x - p > self.config.anchor_tolerance) {
                anchors.push(x);
            }
            previous = Some(x);
        }
        anchors
    }

    /// Index of the column a left edge falls into
    #[must_use]
    pub fn column_of(&self, left: f64, anchors: &[f64]) -> usize {
        anchors
            .iter()
            .take_while(|&&anchor| left >= anchor - self.config.anchor_tolerance)
            .count()
            .saturating_sub(1)
    }

    /// Add one cell per token of `lines` to `region`
    pub fn assign(&self, lines: &[Line], region: &mut TableRegion) {
        let anchors = self.anchors(lines);
        trace!("Column anchors: {anchors:?}");

        for (row, line) in lines.iter().enumerate() {
            for token in &line.tokens {
                region.add_cell(Cell {
                    row,
                    col: self.column_of(token.left(), &anchors),
                    text: token.text.clone(),
                    bbox: token.bbox,
                    confidence: token.confidence,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_grouper::LineGrouper;
    use crate::types::TableMethod;
    use docscan_ocr::{BBox, Token};

    fn token(text: &str, left: f64, top: f64) -> Token {
        Token::new(text, BBox::from_ltwh(left, top, 20.0, 10.0), 0.8).unwrap()
    }

    #[test]
    fn test_anchor_gap_measured_from_previous_value() {
        // 0 → 10 → 20 → 30 chain within tolerance: one anchor; 100 opens a second
        let lines = LineGrouper::new().lines(&[
            token("a", 0.0, 0.0),
            token("b", 10.0, 30.0),
            token("c", 20.0, 60.0),
            token("d", 30.0, 90.0),
            token("e", 100.0, 90.0),
        ]);
        let assigner = ColumnAssigner::new();
        assert_eq!(assigner.anchors(&lines), vec![0.0, 100.0]);
    }

    #[test]
    fn test_column_of_uses_tolerance_left_of_anchor() {
        let assigner = ColumnAssigner::new();
        let anchors = [10.0, 100.0, 200.0];
        assert_eq!(assigner.column_of(0.0, &anchors), 0);
        assert_eq!(assigner.column_of(86.0, &anchors), 1);
        assert_eq!(assigner.column_of(84.0, &anchors), 0);
        assert_eq!(assigner.column_of(500.0, &anchors), 2);
    }

    #[test]
    fn test_assign_rows_by_line_ordinal() {
        let lines = LineGrouper::new().lines(&[
            token("Name", 10.0, 0.0),
            token("Amt", 200.0, 0.0),
            token("Aspirin", 12.0, 30.0),
            token("20", 205.0, 30.0),
        ]);
        let mut region =
            TableRegion::new(BBox::new(0.0, 0.0, 300.0, 50.0), 0.6, TableMethod::TokenAlignment);
        ColumnAssigner::new().assign(&lines, &mut region);
        let coords: Vec<(usize, usize, &str)> = region
            .cells
            .iter()
            .map(|c| (c.row, c.col, c.text.as_str()))
            .collect();
        assert_eq!(
            coords,
            vec![(0, 0, "Name"), (0, 1, "Amt"), (1, 0, "Aspirin"), (1, 1, "20")]
        );
    }
}
