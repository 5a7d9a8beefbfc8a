//! Property-Based Tests
//!
//! Invariants of the layout stages over arbitrary token sets:
//! - Line grouping partitions its input and orders lines and tokens
//! - Region merging is idempotent and leaves no overlapping pair
//! - Header grids survive a records round trip
//! - Raising `min_table_rows` never adds token-alignment candidates

use docscan_layout::{
    AlignmentConfig, ColumnAssigner, LineGrouper, LineGroupingConfig, RegionMerger,
    StructuredFormatter, TableMethod, TableRegion, TokenAlignmentStrategy,
};
use docscan_ocr::{BBox, Token};
use proptest::prelude::*;

fn arb_tokens() -> impl Strategy<Value = Vec<Token>> {
    prop::collection::vec((0u32..800, 0u32..600, 5u32..120, 5u32..30), 0..60).prop_map(|boxes| {
        boxes
            .into_iter()
            .enumerate()
            .map(|(i, (l, t, w, h))| {
                let bbox = BBox::from_ltwh(f64::from(l), f64::from(t), f64::from(w), f64::from(h));
                Token::new(format!("t{i}"), bbox, 0.9).unwrap()
            })
            .collect()
    })
}

fn arb_regions() -> impl Strategy<Value = Vec<TableRegion>> {
    prop::collection::vec((0u32..500, 0u32..500, 1u32..300, 1u32..300, 0u32..=100), 0..12)
        .prop_map(|boxes| {
            boxes
                .into_iter()
                .map(|(l, t, w, h, c)| {
                    TableRegion::new(
                        BBox::from_ltwh(f64::from(l), f64::from(t), f64::from(w), f64::from(h)),
                        f64::from(c) / 100.0,
                        TableMethod::TokenAlignment,
                    )
                })
                .collect()
        })
}

// ============================================================================
// Line grouping
// ============================================================================

/// Property: every token lands in exactly one line
#[test]
fn proptest_lines_partition_tokens() {
    proptest!(|(tokens in arb_tokens(), threshold in 0u32..40)| {
        let grouper = LineGrouper::with_config(LineGroupingConfig { y_threshold: f64::from(threshold) });
        let lines = grouper.lines(&tokens);

        let mut seen: Vec<String> = lines.iter().flat_map(|l| l.tokens.iter().map(|t| t.text.clone())).collect();
        let mut expected: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
        seen.sort();
        expected.sort();
        prop_assert_eq!(seen, expected);
        prop_assert!(lines.iter().all(|l| !l.is_empty()));
    });
}

/// Property: lines are ordered by top, tokens within a line by left, all near the anchor
#[test]
fn proptest_lines_ordered() {
    proptest!(|(tokens in arb_tokens(), threshold in 0u32..40)| {
        let threshold = f64::from(threshold);
        let lines = LineGrouper::with_config(LineGroupingConfig { y_threshold: threshold }).lines(&tokens);

        for pair in lines.windows(2) {
            prop_assert!(pair[0].anchor_top < pair[1].anchor_top);
        }
        for line in &lines {
            for pair in line.tokens.windows(2) {
                prop_assert!(pair[0].left() <= pair[1].left());
            }
            for token in &line.tokens {
                prop_assert!((token.top() - line.anchor_top).abs() <= threshold);
            }
        }
    });
}

// ============================================================================
// Region merge
// ============================================================================

/// Property: merging merged output changes nothing
#[test]
fn proptest_merge_idempotent() {
    proptest!(|(regions in arb_regions())| {
        let merger = RegionMerger::new();
        let once = merger.merge(regions);
        let twice = merger.merge(once.clone());
        prop_assert_eq!(once, twice);
    });
}

/// Property: no two merged regions overlap, and merging never grows the region count
#[test]
fn proptest_merge_output_disjoint() {
    proptest!(|(regions in arb_regions())| {
        let merger = RegionMerger::new();
        let count = regions.len();
        let merged = merger.merge(regions);
        prop_assert!(merged.len() <= count);
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                prop_assert!(!merger.overlaps(a, b));
            }
        }
    });
}

// ============================================================================
// Formatting
// ============================================================================

/// Property: grid → records → grid round-trips when row lengths match the header
#[test]
fn proptest_records_round_trip() {
    let grids = (1usize..6).prop_flat_map(|cols| {
        (
            prop::collection::hash_set("[A-Za-z]{1,8}", cols),
            prop::collection::vec(prop::collection::vec("[a-z0-9 ]{0,6}", cols), 1..8),
        )
    });

    proptest!(|((header, rows) in grids)| {
        let mut grid = vec![header.into_iter().collect::<Vec<String>>()];
        grid.extend(rows);

        let formatter = StructuredFormatter::new();
        let records = formatter.format_as_records(&grid, true);
        prop_assert_eq!(records.len(), grid.len() - 1);
        prop_assert_eq!(formatter.records_to_grid(&records), grid);
    });
}

// ============================================================================
// Token alignment
// ============================================================================

/// Property: a stricter row minimum never yields more candidates
#[test]
fn proptest_min_table_rows_monotonic() {
    proptest!(|(tokens in arb_tokens(), low in 1usize..5, extra in 0usize..4)| {
        let lines = LineGrouper::new().lines(&tokens);
        let strategy = |min_table_rows| {
            TokenAlignmentStrategy::with_config(
                AlignmentConfig { min_table_rows, ..AlignmentConfig::default() },
                ColumnAssigner::new(),
            )
        };
        let loose = strategy(low).regions(&lines).len();
        let strict = strategy(low + extra).regions(&lines).len();
        prop_assert!(strict <= loose);
    });
}
