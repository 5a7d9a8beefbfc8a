//! Lenient table reconstruction from a flat, noisy token list
//!
//! Used when no structured engine confirmed a table. Every threshold lives in
//! [`FallbackConfig`].
//!
//! Algorithm:
//! 1. Reject fewer than `min_tokens` tokens, before and after dropping tokens below
//!    `confidence_floor`
//! 2. Sort by (top, left); a token joins the current row when its top is within
//!    `row_y_threshold` of the row's last token top
//! 3. Row cells = trimmed non-empty texts by left-X; rows outside
//!    `min_row_cells..=max_row_cells` are dropped, except oversized rows, which are
//!    truncated to `truncate_to` cells (lossy)
//! 4. Accept rows with a digit and up to `max_cells_with_digit` cells, or any row with up to
//!    `max_cells_without_digit` cells; if too few survive, a lenient pass accepts every row
//!    with up to `lenient_max_cells` cells
//! 5. Decide from column-count consistency, row count, mean width and numeric rows

// Row and cell counts are far below f64 mantissa range
#![allow(clippy::cast_precision_loss)]

use docscan_ocr::Token;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::FallbackConfig;

/// Diagnostics of a table decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub total_tokens: usize,
    pub kept_tokens: usize,
    pub raw_rows: usize,
    pub cleaned_rows: usize,
    pub consistency_ratio: f64,
    pub avg_cols: f64,
    pub col_counts: Vec<usize>,
    pub reason: String,
}

/// Outcome of a reconstruction attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    pub table_detected: bool,
    /// Accepted rows; empty unless a table was detected
    pub rows: Vec<Vec<String>>,
    pub debug_info: DebugInfo,
}

impl Reconstruction {
    fn rejected(debug_info: DebugInfo) -> Self {
        debug!("Fallback reconstruction rejected: {}", debug_info.reason);
        Self {
            table_detected: false,
            rows: Vec::new(),
            debug_info,
        }
    }
}

/// Row-and-column reconstruction tolerant of low-confidence OCR
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FallbackReconstructor {
    config: FallbackConfig,
}

impl FallbackReconstructor {
    #[inline]
    #[must_use = "returns a new FallbackReconstructor instance"]
    pub fn new() -> Self {
        Self {
            config: FallbackConfig::default(),
        }
    }

    #[inline]
    #[must_use = "returns a new FallbackReconstructor with custom config"]
    pub const fn with_config(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Try to rebuild a table from `tokens`
    #[must_use]
    pub fn reconstruct(&self, tokens: &[Token]) -> Reconstruction {
        let cfg = &self.config;
        let mut info = DebugInfo {
            total_tokens: tokens.len(),
            ..DebugInfo::default()
        };

        if tokens.len() < cfg.min_tokens {
            info.reason = format!(
                "Only {} tokens, need at least {}",
                tokens.len(),
                cfg.min_tokens
            );
            return Reconstruction::rejected(info);
        }

        let mut kept: Vec<&Token> = tokens
            .iter()
            .filter(|t| t.confidence >= cfg.confidence_floor)
            .collect();
        info.kept_tokens = kept.len();
        if kept.len() < cfg.min_tokens {
            info.reason = format!(
                "Only {} tokens at confidence >= {:.2}, need at least {}",
                kept.len(),
                cfg.confidence_floor,
                cfg.min_tokens
            );
            return Reconstruction::rejected(info);
        }

        kept.sort_by(|a, b| {
            a.top()
                .total_cmp(&b.top())
                .then_with(|| a.left().total_cmp(&b.left()))
        });
        let raw_rows = self.raw_rows(&kept);
        info.raw_rows = raw_rows.len();
        if raw_rows.len() < cfg.min_rows {
            info.reason = format!("Only {} raw rows found", raw_rows.len());
            return Reconstruction::rejected(info);
        }

        let cleaned = self.accept_rows(&raw_rows);
        info.cleaned_rows = cleaned.len();
        if cleaned.len() < cfg.min_rows {
            info.reason = format!("Only {} valid rows found", cleaned.len());
            return Reconstruction::rejected(info);
        }

        let col_counts: Vec<usize> = cleaned.iter().map(Vec::len).collect();
        let rows = cleaned.len();
        let avg_cols = col_counts.iter().sum::<usize>() as f64 / rows as f64;
        let consistent = col_counts
            .iter()
            .filter(|&&c| (c as f64 - avg_cols).abs() <= cfg.consistency_tolerance)
            .count();
        let consistency_ratio = consistent as f64 / rows as f64;

        let mut detected = (consistency_ratio >= cfg.primary_consistency
            && rows >= cfg.primary_min_rows)
            || (consistency_ratio >= cfg.secondary_consistency && rows >= cfg.secondary_min_rows)
            || (avg_cols >= cfg.wide_min_avg_cols && rows >= cfg.wide_min_rows);

        if !detected && rows >= cfg.numeric_min_rows {
            let numeric = cleaned.iter().filter(|row| has_digit(row)).count();
            detected = numeric as f64 >= rows as f64 * cfg.numeric_row_fraction;
        }

        info.consistency_ratio = consistency_ratio;
        info.avg_cols = avg_cols;
        info.col_counts = col_counts;
        info.reason = if detected {
            "Detected".to_string()
        } else {
            format!("Failed: consistency={consistency_ratio:.2}, rows={rows}, avg_cols={avg_cols:.1}")
        };

        debug!(
            "Fallback reconstruction: {} raw rows, {} accepted, detected={}",
            info.raw_rows, info.cleaned_rows, detected
        );

        if detected {
            Reconstruction {
                table_detected: true,
                rows: cleaned,
                debug_info: info,
            }
        } else {
            Reconstruction::rejected(info)
        }
    }

    fn raw_rows(&self, sorted: &[&Token]) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut current: Vec<&Token> = Vec::new();

        for &token in sorted {
            let joins = current
                .last()
                .map_or(true, |last| (token.top() - last.top()).abs() <= self.config.row_y_threshold);
            if !joins {
                self.close_row(std::mem::take(&mut current), &mut rows);
            }
            current.push(token);
        }
        self.close_row(current, &mut rows);
        rows
    }

    fn close_row(&self, mut row: Vec<&Token>, rows: &mut Vec<Vec<String>>) {
        row.sort_by(|a, b| a.left().total_cmp(&b.left()));
        let mut texts: Vec<String> = row
            .iter()
            .map(|t| t.text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let cfg = &self.config;
        if texts.len() > cfg.max_row_cells {
            warn!(
                "Truncating {}-cell row to its first {} cells",
                texts.len(),
                cfg.truncate_to
            );
            texts.truncate(cfg.truncate_to);
            rows.push(texts);
        } else if texts.len() >= cfg.min_row_cells {
            rows.push(texts);
        } else {
            trace!("Dropping short row {texts:?}");
        }
    }

    fn accept_rows(&self, raw_rows: &[Vec<String>]) -> Vec<Vec<String>> {
        let cfg = &self.config;
        let accepted: Vec<Vec<String>> = raw_rows
            .iter()
            .filter(|row| {
                let n = row.len();
                let with_digit = has_digit(row) && (cfg.min_row_cells..=cfg.max_cells_with_digit).contains(&n);
                with_digit || (cfg.min_row_cells..=cfg.max_cells_without_digit).contains(&n)
            })
            .cloned()
            .collect();

        if accepted.len() >= cfg.min_rows {
            return accepted;
        }

        debug!(
            "Only {} rows accepted, retrying with up to {} cells per row",
            accepted.len(),
            cfg.lenient_max_cells
        );
        raw_rows
            .iter()
            .filter(|row| (cfg.min_row_cells..=cfg.lenient_max_cells).contains(&row.len()))
            .cloned()
            .collect()
    }
}

fn has_digit(row: &[String]) -> bool {
    row.iter().any(|cell| cell.chars().any(|c| c.is_ascii_digit()))
}
