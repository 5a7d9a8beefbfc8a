//! Table extraction entry point
//!
//! Sources:
//! - [`TableSource::Tokens`]: flat tokens → [`FallbackReconstructor`]
//! - [`TableSource::Dump`]: validated first (mismatched arrays are an `Err`), then as tokens
//! - [`TableSource::Image`]: the backend's blocks go through [`StructureCheck`]; when it
//!   rejects them the fallback runs on the same tokens. An unavailable or failing backend,
//!   or one returning a malformed dump, yields `table_detected = false` with `error` set.

use docscan_ocr::{OcrBackend, OcrTokens, Token};
use image::DynamicImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::fallback::{DebugInfo, FallbackReconstructor};
use crate::formatter::{Record, StructuredFormatter};
use crate::structure::StructureCheck;

/// Where the table comes from
#[derive(Clone, Copy)]
pub enum TableSource<'a> {
    Tokens(&'a [Token]),
    Image {
        image: &'a DynamicImage,
        backend: &'a dyn OcrBackend,
    },
    Dump(&'a OcrTokens),
}

/// Output shaping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Also emit header-keyed records
    pub as_dict: bool,
    /// Row 0 holds the field names
    pub has_header: bool,
}

impl Default for ExtractOptions {
    #[inline]
    fn default() -> Self {
        Self {
            as_dict: true,
            has_header: true,
        }
    }
}

/// Which reconstruction produced the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Strict grid check over structured engine blocks
    Structure,
    /// Lenient row reconstruction
    Fallback,
}

/// Result of [`TableExtractor::extract`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableExtraction {
    pub table_detected: bool,
    pub structured_data: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_data: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableExtraction {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Explicit extraction handle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TableExtractor {
    fallback: FallbackReconstructor,
    structure: StructureCheck,
    formatter: StructuredFormatter,
}

impl TableExtractor {
    #[inline]
    #[must_use = "returns a new TableExtractor instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor with custom thresholds
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Config`] when `config` fails validation.
    pub fn with_config(config: &LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fallback: FallbackReconstructor::with_config(config.fallback),
            structure: StructureCheck::with_config(config.structure),
            formatter: StructuredFormatter::new(),
        })
    }

    /// Extract one table from `source`
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::MalformedInput`] for a [`TableSource::Dump`] whose arrays are
    /// not index-aligned. Upstream failures are reported in [`TableExtraction::error`].
    pub fn extract(&self, source: TableSource<'_>, options: ExtractOptions) -> Result<TableExtraction> {
        match source {
            TableSource::Tokens(tokens) => Ok(self.extract_tokens(tokens, options)),
            TableSource::Dump(dump) => {
                let tokens = dump.to_tokens().map_err(LayoutError::from_ocr)?;
                Ok(self.extract_tokens(&tokens, options))
            }
            TableSource::Image { image, backend } => Ok(self.extract_image(image, backend, options)),
        }
    }

    fn extract_tokens(&self, tokens: &[Token], options: ExtractOptions) -> TableExtraction {
        let reconstruction = self.fallback.reconstruct(tokens);
        self.finish(
            reconstruction.table_detected,
            reconstruction.rows,
            ExtractionMethod::Fallback,
            reconstruction.debug_info,
            options,
        )
    }

    fn extract_image(
        &self,
        image: &DynamicImage,
        backend: &dyn OcrBackend,
        options: ExtractOptions,
    ) -> TableExtraction {
        if !backend.is_available() {
            let err = LayoutError::UpstreamUnavailable(format!(
                "OCR backend '{}' is not available",
                backend.name()
            ));
            warn!("{err}");
            return TableExtraction::failed(err.to_string());
        }

        let tokens = match backend.recognize(image).and_then(|dump| dump.to_tokens()) {
            Ok(tokens) => tokens,
            Err(e) => {
                let err = LayoutError::from_ocr(e);
                warn!("Table extraction via '{}' failed: {err}", backend.name());
                return TableExtraction::failed(err.to_string());
            }
        };

        let verdict = self.structure.check(&tokens);
        if verdict.is_table {
            let grid = self.structure.reconstruct(&tokens);
            return self.finish(
                true,
                grid,
                ExtractionMethod::Structure,
                verdict.debug_info,
                options,
            );
        }

        debug!(
            "Structure check rejected {} blocks ({}), trying fallback",
            tokens.len(),
            verdict.debug_info.reason
        );
        self.extract_tokens(&tokens, options)
    }

    fn finish(
        &self,
        table_detected: bool,
        structured_data: Vec<Vec<String>>,
        method: ExtractionMethod,
        debug_info: DebugInfo,
        options: ExtractOptions,
    ) -> TableExtraction {
        let formatted_data = (options.as_dict && table_detected && !structured_data.is_empty())
            .then(|| {
                self.formatter
                    .format_as_records(&structured_data, options.has_header)
            });
        TableExtraction {
            table_detected,
            structured_data,
            formatted_data,
            method: Some(method),
            debug_info: Some(debug_info),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_ocr::{BBox, TokenDumpBackend, UnavailableBackend};

    fn dump(rows: &[&[&str]]) -> OcrTokens {
        let tokens: Vec<Token> = rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter().enumerate().map(move |(c, text)| {
                    let left = 10.0 + 150.0 * f64::from(u32::try_from(c).unwrap());
                    let top = 20.0 + 40.0 * f64::from(u32::try_from(r).unwrap());
                    Token::new(*text, BBox::from_ltwh(left, top, 90.0, 16.0), 0.9).unwrap()
                })
            })
            .collect();
        OcrTokens::from_tokens(&tokens)
    }

    #[test]
    fn test_dump_source_uses_fallback() {
        let d = dump(&[&["Name", "Amt"], &["Aspirin", "20"], &["Paracetamol", "15"]]);
        let result = TableExtractor::new()
            .extract(TableSource::Dump(&d), ExtractOptions::default())
            .unwrap();
        assert!(result.table_detected);
        assert_eq!(result.method, Some(ExtractionMethod::Fallback));
        let records = result.formatted_data.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("Name"), Some("Paracetamol"));
    }

    #[test]
    fn test_malformed_dump_is_err() {
        let mut d = dump(&[&["a", "b"]]);
        d.left.push(1.0);
        let err = TableExtractor::new()
            .extract(TableSource::Dump(&d), ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, LayoutError::MalformedInput(_)));
    }

    #[test]
    fn test_formatted_data_only_when_requested_and_detected() {
        let d = dump(&[&["Name", "Amt"], &["Aspirin", "20"], &["Paracetamol", "15"]]);
        let options = ExtractOptions {
            as_dict: false,
            has_header: true,
        };
        let result = TableExtractor::new()
            .extract(TableSource::Dump(&d), options)
            .unwrap();
        assert!(result.table_detected);
        assert!(result.formatted_data.is_none());

        let small = dump(&[&["a", "b"]]);
        let result = TableExtractor::new()
            .extract(TableSource::Dump(&small), ExtractOptions::default())
            .unwrap();
        assert!(!result.table_detected);
        assert!(result.formatted_data.is_none());
        assert!(result.debug_info.unwrap().reason.starts_with("Only 2 tokens"));
    }

    #[test]
    fn test_image_source_prefers_structure() {
        let d = dump(&[
            &["Drug", "Dose", "Qty"],
            &["Aspirin", "10mg", "2"],
            &["Ibuprofen", "10mg", "2"],
            &["Aspirin", "20mg", "1"],
        ]);
        let backend = TokenDumpBackend::new(d);
        let image = DynamicImage::new_luma8(4, 4);
        let result = TableExtractor::new()
            .extract(
                TableSource::Image {
                    image: &image,
                    backend: &backend,
                },
                ExtractOptions::default(),
            )
            .unwrap();
        assert_eq!(result.method, Some(ExtractionMethod::Structure));
        assert_eq!(result.structured_data.len(), 4);
    }

    #[test]
    fn test_image_source_falls_back_when_structure_rejects() {
        // 6 blocks: below the structure minimum, enough for the fallback
        let d = dump(&[&["Name", "Amt"], &["Aspirin", "20"], &["Paracetamol", "15"]]);
        let backend = TokenDumpBackend::new(d);
        let image = DynamicImage::new_luma8(4, 4);
        let result = TableExtractor::new()
            .extract(
                TableSource::Image {
                    image: &image,
                    backend: &backend,
                },
                ExtractOptions::default(),
            )
            .unwrap();
        assert!(result.table_detected);
        assert_eq!(result.method, Some(ExtractionMethod::Fallback));
    }

    #[test]
    fn test_malformed_backend_dump_reported_as_malformed() {
        let mut d = dump(&[&["Name", "Amt"]]);
        d.top.pop();
        let backend = TokenDumpBackend::new(d);
        let image = DynamicImage::new_luma8(4, 4);
        let result = TableExtractor::new()
            .extract(
                TableSource::Image {
                    image: &image,
                    backend: &backend,
                },
                ExtractOptions::default(),
            )
            .unwrap();
        assert!(!result.table_detected);
        let error = result.error.unwrap();
        assert!(error.starts_with("Malformed input"), "{error}");
        assert!(error.contains("top=1"), "{error}");
    }

    #[test]
    fn test_unavailable_backend_reports_error() {
        let backend = UnavailableBackend::new("paddle", "not installed");
        let image = DynamicImage::new_luma8(4, 4);
        let result = TableExtractor::new()
            .extract(
                TableSource::Image {
                    image: &image,
                    backend: &backend,
                },
                ExtractOptions::default(),
            )
            .unwrap();
        assert!(!result.table_detected);
        assert!(result.error.unwrap().contains("paddle"));
    }
}
