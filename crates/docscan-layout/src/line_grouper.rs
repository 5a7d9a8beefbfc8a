//! Line grouping: partition tokens into lines by vertical proximity
//!
//! Algorithm:
//! 1. Stable-sort tokens by top-Y
//! 2. The first token of a line is its anchor; a token joins the line while
//!    `|token.top - anchor.top| <= y_threshold`
//! 3. Otherwise the line is closed (stable-sorted by left-X) and a new one starts
//!
//! The anchor never moves, so a slow vertical drift still opens a new line once it exceeds
//! the threshold.

use docscan_ocr::Token;
use log::trace;

use crate::config::LineGroupingConfig;
use crate::types::Line;

/// Groups tokens into [`Line`]s
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineGrouper {
    config: LineGroupingConfig,
}

impl LineGrouper {
    #[inline]
    #[must_use = "returns a new LineGrouper instance"]
    pub fn new() -> Self {
        Self {
            config: LineGroupingConfig::default(),
        }
    }

    #[inline]
    #[must_use = "returns a new LineGrouper with custom config"]
    pub const fn with_config(config: LineGroupingConfig) -> Self {
        Self { config }
    }

    /// Lazily iterate the lines of `tokens`
    ///
    /// The returned iterator is finite and restartable: clone it (or call
    /// [`Lines::restart`]) to walk the same lines again.
    #[must_use]
    pub fn group(&self, tokens: &[Token]) -> Lines {
        let mut sorted = tokens.to_vec();
        sorted.sort_by(|a, b| a.top().total_cmp(&b.top()));
        Lines {
            tokens: sorted,
            cursor: 0,
            y_threshold: self.config.y_threshold,
        }
    }

    /// Eagerly collect every line
    #[must_use]
    pub fn lines(&self, tokens: &[Token]) -> Vec<Line> {
        self.group(tokens).collect()
    }
}

/// Iterator over the lines of a token set, top to bottom
#[derive(Debug, Clone)]
pub struct Lines {
    tokens: Vec<Token>,
    cursor: usize,
    y_threshold: f64,
}

impl Lines {
    /// Rewind to the first line
    #[inline]
    pub fn restart(&mut self) {
        self.cursor = 0;
    }
}

impl Iterator for Lines {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        let anchor_top = self.tokens.get(self.cursor)?.top();
        let start = self.cursor;
        let end = self.tokens[start..]
            .iter()
            .position(|t| (t.top() - anchor_top).abs() > self.y_threshold)
            .map_or(self.tokens.len(), |offset| start + offset);
        self.cursor = end;

        let mut tokens = self.tokens[start..end].to_vec();
        tokens.sort_by(|a, b| a.left().total_cmp(&b.left()));
        trace!(
            "Line at top={anchor_top:.1}: {} tokens ({:?}…)",
            tokens.len(),
            tokens.first().map(|t| t.text.as_str())
        );
        Some(Line { anchor_top, tokens })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tokens.len() - self.cursor;
        (usize::from(remaining > 0), Some(remaining))
    }
}
