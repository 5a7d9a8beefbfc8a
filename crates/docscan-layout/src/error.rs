//! Error types for the docscan layout engine
//!
//! All fallible public APIs return [`Result<T>`], which wraps [`LayoutError`].
//! [`crate::LayoutAnalyzer::analyze_layout`] never returns an error: it records the
//! message in [`crate::LayoutResult::error`] instead.
//!
//! # Examples
//!
//! ```
//! use docscan_layout::{LayoutConfig, LayoutError};
//!
//! let mut config = LayoutConfig::default();
//! config.line_grouping.y_threshold = -1.0;
//! match config.validate() {
//!     Err(LayoutError::Config(reason)) => assert!(reason.contains("y_threshold")),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use docscan_ocr::OcrError;
use thiserror::Error;

/// Errors raised by the layout engine
///
/// - **Upstream** ([`UpstreamUnavailable`]): no usable input or OCR engine, result is empty
/// - **Input** ([`MalformedInput`]): token arrays violate their invariants, fail fast
/// - **Configuration** ([`Config`]): out-of-range threshold (user error, fixable)
///
/// [`UpstreamUnavailable`]: LayoutError::UpstreamUnavailable
/// [`MalformedInput`]: LayoutError::MalformedInput
/// [`Config`]: LayoutError::Config
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Neither image nor tokens were supplied, or the OCR engine could not run
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Token arrays are mismatched or otherwise malformed
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error raised by the OCR boundary
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl LayoutError {
    /// Map an OCR error onto the layout taxonomy
    ///
    /// Malformed dumps stay `MalformedInput`; everything else the OCR side raises means the
    /// upstream engine could not deliver tokens.
    #[must_use]
    pub fn from_ocr(err: OcrError) -> Self {
        match err {
            OcrError::MalformedInput(msg) => Self::MalformedInput(msg),
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Result type alias for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
