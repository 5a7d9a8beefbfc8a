//! Strict table check for positioned blocks from a structured OCR engine
//!
//! Blocks are compared by their box centers. The check accepts only pages that look like
//! a regular grid of repeated short values:
//! - at least `min_blocks` blocks
//! - rows (center-Y within `row_y_threshold` of the previous block) with at least
//!   `min_blocks_per_row` blocks; at least `min_rows` of them
//! - at least `min_consistent_fraction` of rows within `column_tolerance` of the mean
//!   column count, and a mean of at least `min_avg_cols`
//! - not a form: at most `max_form_indicator_fraction` of first-row texts contain ':' or '/'
//! - among the first `repetition_rows` rows, at least `min_repeated_texts` distinct short
//!   texts occur `min_repeat_count` times or more

// Row and block counts are far below f64 mantissa range
#![allow(clippy::cast_precision_loss)]

use docscan_ocr::Token;
use log::debug;
use rustc_hash::FxHashMap;

use crate::config::StructureConfig;
use crate::fallback::DebugInfo;

/// Result of the structure check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureVerdict {
    pub is_table: bool,
    pub debug_info: DebugInfo,
}

/// Grid check and reconstruction over engine blocks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StructureCheck {
    config: StructureConfig,
}

impl StructureCheck {
    #[inline]
    #[must_use = "returns a new StructureCheck instance"]
    pub fn new() -> Self {
        Self {
            config: StructureConfig::default(),
        }
    }

    #[inline]
    #[must_use = "returns a new StructureCheck with custom config"]
    pub const fn with_config(config: StructureConfig) -> Self {
        Self { config }
    }

    /// Decide whether `blocks` form a table
    #[must_use]
    pub fn check(&self, blocks: &[Token]) -> StructureVerdict {
        let cfg = &self.config;
        let mut info = DebugInfo {
            total_tokens: blocks.len(),
            kept_tokens: blocks.len(),
            ..DebugInfo::default()
        };

        let verdict = |is_table: bool, info: DebugInfo| {
            debug!("Structure check: is_table={is_table} ({})", info.reason);
            StructureVerdict {
                is_table,
                debug_info: info,
            }
        };

        if blocks.len() < cfg.min_blocks {
            info.reason = format!(
                "Only {} blocks, need at least {}",
                blocks.len(),
                cfg.min_blocks
            );
            return verdict(false, info);
        }

        let mut sorted: Vec<&Token> = blocks.iter().collect();
        sorted.sort_by(|a, b| center_y(a).total_cmp(&center_y(b)));
        let rows: Vec<Vec<&Token>> = group_rows(&sorted, cfg.row_y_threshold)
            .into_iter()
            .filter(|row| row.len() >= cfg.min_blocks_per_row)
            .collect();
        info.raw_rows = rows.len();
        info.cleaned_rows = rows.len();

        if rows.len() < cfg.min_rows {
            info.reason = format!("Only {} multi-block rows found", rows.len());
            return verdict(false, info);
        }

        let col_counts: Vec<usize> = rows.iter().map(Vec::len).collect();
        let avg_cols = col_counts.iter().sum::<usize>() as f64 / rows.len() as f64;
        let similar = col_counts
            .iter()
            .filter(|&&c| (c as f64 - avg_cols).abs() <= cfg.column_tolerance)
            .count();
        info.consistency_ratio = similar as f64 / rows.len() as f64;
        info.avg_cols = avg_cols;
        info.col_counts = col_counts;

        let consistent = similar as f64 >= rows.len() as f64 * cfg.min_consistent_fraction;
        if !consistent || avg_cols < cfg.min_avg_cols {
            info.reason = format!(
                "Irregular columns: consistency={:.2}, avg_cols={avg_cols:.1}",
                info.consistency_ratio
            );
            return verdict(false, info);
        }

        let first_row = &rows[0];
        let form_indicators = first_row
            .iter()
            .filter(|b| b.text.contains(':') || b.text.contains('/'))
            .count();
        if form_indicators as f64 > first_row.len() as f64 * cfg.max_form_indicator_fraction {
            info.reason = format!(
                "Looks like a form: {form_indicators} of {} header texts contain ':' or '/'",
                first_row.len()
            );
            return verdict(false, info);
        }

        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for block in rows.iter().take(cfg.repetition_rows).flatten() {
            let text = block.text.trim();
            if text.chars().count() <= cfg.short_text_max_chars {
                *counts.entry(text).or_insert(0) += 1;
            }
        }
        let repeated = counts
            .values()
            .filter(|&&n| n >= cfg.min_repeat_count)
            .count();
        if repeated < cfg.min_repeated_texts {
            info.reason = format!(
                "Only {repeated} repeated short texts, need at least {}",
                cfg.min_repeated_texts
            );
            return verdict(false, info);
        }

        info.reason = "Detected".to_string();
        verdict(true, info)
    }

    /// Rebuild the grid: rows by center-Y, cells by center-X, short rows padded with ""
    #[must_use]
    pub fn reconstruct(&self, blocks: &[Token]) -> Vec<Vec<String>> {
        let mut sorted: Vec<&Token> = blocks.iter().collect();
        sorted.sort_by(|a, b| {
            center_y(a)
                .total_cmp(&center_y(b))
                .then_with(|| center_x(a).total_cmp(&center_x(b)))
        });

        let mut rows: Vec<Vec<String>> = group_rows(&sorted, self.config.reconstruct_y_threshold)
            .into_iter()
            .map(|mut row| {
                row.sort_by(|a, b| center_x(a).total_cmp(&center_x(b)));
                row.iter().map(|b| b.text.trim().to_string()).collect()
            })
            .collect();

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        rows
    }
}

fn center_x(token: &Token) -> f64 {
    token.bbox.center().0
}

fn center_y(token: &Token) -> f64 {
    token.bbox.center().1
}

/// Split center-Y-sorted blocks where the gap to the previous block exceeds `threshold`
fn group_rows<'a>(sorted: &[&'a Token], threshold: f64) -> Vec<Vec<&'a Token>> {
    let mut rows: Vec<Vec<&'a Token>> = Vec::new();
    for &block in sorted {
        let same_row = rows
            .last()
            .and_then(|row| row.last())
            .is_some_and(|prev| (center_y(block) - center_y(prev)).abs() <= threshold);
        match rows.last_mut() {
            Some(row) if same_row => row.push(block),
            _ => rows.push(vec![block]),
        }
    }
    rows
}
