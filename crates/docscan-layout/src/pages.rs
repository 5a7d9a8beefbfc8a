//! Multi-page fan-out
//!
//! Pages are analysed independently in parallel (rayon) and collected back in page order.
//! Page numbers are 1-based. Each text block is tagged with its page number. Page text covers
//! every OCR word of the page, tables included, one line per text line; pages are concatenated
//! as `[Page N]\n<text>` sections. A page that fails is recorded in `failed_pages` without
//! affecting the others.
//!
//! `layout_confidence` is the mean over pages that succeeded and found at least one element;
//! failed and empty pages are excluded.

// Page counts are far below f64 mantissa range
#![allow(clippy::cast_precision_loss)]

use docscan_ocr::OcrTokens;
use image::DynamicImage;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analyzer::LayoutAnalyzer;
use crate::types::LayoutResult;

/// Inputs of one page
#[derive(Debug, Clone, Default)]
pub struct PageInput {
    pub image: Option<DynamicImage>,
    pub tokens: Option<OcrTokens>,
}

impl PageInput {
    #[inline]
    #[must_use]
    pub const fn from_tokens(tokens: OcrTokens) -> Self {
        Self {
            image: None,
            tokens: Some(tokens),
        }
    }
}

/// Layout of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page: u32,
    /// Full OCR text of the page; empty for image-only or failed pages
    pub text: String,
    #[serde(flatten)]
    pub layout: LayoutResult,
}

/// A page whose analysis failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub page: u32,
    pub error: String,
}

/// Aggregated layout of a multi-page document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
    pub text: String,
    pub layout_confidence: f64,
    pub failed_pages: Vec<PageFailure>,
}

impl DocumentLayout {
    /// Tables of every page, in page order
    pub fn tables(&self) -> impl Iterator<Item = (u32, &crate::types::FormattedTable)> {
        self.pages
            .iter()
            .flat_map(|p| p.layout.tables.iter().map(move |t| (p.page, t)))
    }
}

/// Runs a [`LayoutAnalyzer`] over every page of a document
#[derive(Debug, Default)]
pub struct PageAnalyzer {
    analyzer: LayoutAnalyzer,
}

impl PageAnalyzer {
    #[inline]
    #[must_use = "returns a new PageAnalyzer instance"]
    pub const fn new(analyzer: LayoutAnalyzer) -> Self {
        Self { analyzer }
    }

    #[inline]
    #[must_use]
    pub const fn analyzer(&self) -> &LayoutAnalyzer {
        &self.analyzer
    }

    /// Analyze every page in parallel and aggregate in page order
    #[must_use]
    pub fn analyze_pages(&self, pages: &[PageInput]) -> DocumentLayout {
        let results: Vec<PageLayout> = pages
            .par_iter()
            .enumerate()
            .map(|(i, input)| {
                let page = u32::try_from(i + 1).unwrap_or(u32::MAX);
                let mut layout = self
                    .analyzer
                    .analyze_layout(input.image.as_ref(), input.tokens.as_ref());
                for block in &mut layout.text_blocks {
                    block.page = Some(page);
                }
                let text = match (&layout.error, &input.tokens) {
                    (None, Some(dump)) => dump
                        .to_tokens()
                        .map(|tokens| self.analyzer.page_text(&tokens))
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                PageLayout { page, text, layout }
            })
            .collect();

        Self::aggregate(results)
    }

    fn aggregate(pages: Vec<PageLayout>) -> DocumentLayout {
        let mut sections = Vec::new();
        let mut failed_pages = Vec::new();
        let mut confidence_sum = 0.0;
        let mut contributing = 0usize;

        for page in &pages {
            if let Some(error) = &page.layout.error {
                warn!("Page {} failed: {}", page.page, error);
                failed_pages.push(PageFailure {
                    page: page.page,
                    error: error.clone(),
                });
                continue;
            }

            if !page.text.is_empty() {
                sections.push(format!("[Page {}]\n{}", page.page, page.text));
            }
            if !page.layout.text_blocks.is_empty() || !page.layout.tables.is_empty() {
                confidence_sum += page.layout.layout_confidence;
                contributing += 1;
            }
        }

        let layout_confidence = if contributing == 0 {
            0.0
        } else {
            confidence_sum / contributing as f64
        };

        debug!(
            "Document: {} pages, {} failed, confidence {:.3}",
            pages.len(),
            failed_pages.len(),
            layout_confidence
        );

        DocumentLayout {
            pages,
            text: sections.join("\n\n"),
            layout_confidence,
            failed_pages,
        }
    }
}
