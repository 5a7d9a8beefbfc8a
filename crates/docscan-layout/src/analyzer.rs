//! Layout analysis orchestration
//!
//! ```text
//! OcrTokens ──validate──▶ Tokens ──LineGrouper──▶ Lines
//!                            │                      │
//!       image ──────────────▶│── TableDetector ◀────┘
//!                            │        │ (candidates → merge)
//!                            ▼        ▼
//!                      TextExtractor ──▶ LayoutResult
//! ```
//!
//! [`LayoutAnalyzer::analyze_layout`] never fails: missing input, malformed token dumps and
//! unavailable OCR engines produce an empty [`LayoutResult`] with `error` set.

// Element counts are far below f64 mantissa range
#![allow(clippy::cast_precision_loss)]

use docscan_ocr::{OcrBackend, OcrTokens, Token};
use image::DynamicImage;
use log::{debug, warn};

use crate::config::LayoutConfig;
use crate::detector::{PageContext, TableDetector, TableStrategy};
use crate::error::{LayoutError, Result};
use crate::line_grouper::LineGrouper;
use crate::text_extractor::TextExtractor;
use crate::types::{LayoutResult, TableRegion, TextBlock};

/// Explicit analysis handle; holds configuration and detection providers, no page state
#[derive(Debug)]
pub struct LayoutAnalyzer {
    config: LayoutConfig,
    grouper: LineGrouper,
    detector: TableDetector,
    extractor: TextExtractor,
}

impl Default for LayoutAnalyzer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutAnalyzer {
    /// Analyzer with default thresholds
    #[must_use = "returns a new LayoutAnalyzer instance"]
    pub fn new() -> Self {
        Self::build(LayoutConfig::default())
    }

    /// Analyzer with custom thresholds
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Config`] when `config` fails validation.
    pub fn with_config(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: LayoutConfig) -> Self {
        Self {
            grouper: LineGrouper::with_config(config.line_grouping),
            detector: TableDetector::with_config(&config),
            extractor: TextExtractor::new(),
            config,
        }
    }

    /// Register an additional table detection provider
    #[must_use = "returns the analyzer with the strategy registered"]
    pub fn with_strategy(mut self, strategy: Box<dyn TableStrategy>) -> Self {
        self.detector = self.detector.with_strategy(strategy);
        self
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Analyze a page from an optional raster and an optional raw token dump
    #[must_use]
    pub fn analyze_layout(
        &self,
        image: Option<&DynamicImage>,
        tokens: Option<&OcrTokens>,
    ) -> LayoutResult {
        if image.is_none() && tokens.is_none() {
            let err = LayoutError::UpstreamUnavailable("neither image nor OCR tokens supplied".into());
            warn!("{err}");
            return LayoutResult::failed(err.to_string());
        }

        let tokens = match tokens.map(OcrTokens::to_tokens).transpose() {
            Ok(tokens) => tokens.unwrap_or_default(),
            Err(e) => {
                let err = LayoutError::from_ocr(e);
                warn!("Layout analysis rejected its input: {err}");
                return LayoutResult::failed(err.to_string());
            }
        };

        self.analyze_tokens(image, &tokens)
    }

    /// Ask an OCR engine for the page's tokens, then analyze
    #[must_use]
    pub fn analyze_with_backend(
        &self,
        image: &DynamicImage,
        backend: &dyn OcrBackend,
    ) -> LayoutResult {
        if !backend.is_available() {
            let err = LayoutError::UpstreamUnavailable(format!(
                "OCR backend '{}' is not available",
                backend.name()
            ));
            warn!("{err}");
            return LayoutResult::failed(err.to_string());
        }

        match backend.recognize(image) {
            Ok(dump) => self.analyze_layout(Some(image), Some(&dump)),
            Err(e) => {
                let err = LayoutError::from_ocr(e);
                warn!("OCR backend '{}' failed: {err}", backend.name());
                LayoutResult::failed(err.to_string())
            }
        }
    }

    /// Every token's text in reading order: one output line per grouped line, words
    /// space-joined, tables included
    #[must_use]
    pub fn page_text(&self, tokens: &[Token]) -> String {
        self.grouper
            .group(tokens)
            .map(|line| line.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Analyze already-validated tokens
    #[must_use]
    pub fn analyze_tokens(&self, image: Option<&DynamicImage>, tokens: &[Token]) -> LayoutResult {
        let lines = self.grouper.lines(tokens);
        let page = PageContext {
            image,
            tokens,
            lines: &lines,
        };

        let tables = self.detector.detect(&page);
        let text_blocks = self.extractor.extract(tokens, &tables);
        let layout_confidence = layout_confidence(&text_blocks, &tables);

        debug!(
            "Layout: {} tokens, {} lines, {} tables, {} text blocks, confidence {:.3}",
            tokens.len(),
            lines.len(),
            tables.len(),
            text_blocks.len(),
            layout_confidence
        );

        LayoutResult {
            tables: self.extractor.format_tables(&tables),
            text_blocks,
            layout_confidence,
            error: None,
        }
    }
}

/// Mean confidence over every text block and table (0 when there are none)
#[must_use]
pub fn layout_confidence(text_blocks: &[TextBlock], tables: &[TableRegion]) -> f64 {
    let count = text_blocks.len() + tables.len();
    if count == 0 {
        return 0.0;
    }
    let total: f64 = text_blocks.iter().map(|b| b.confidence).sum::<f64>()
        + tables.iter().map(|t| t.confidence).sum::<f64>();
    total / count as f64
}
