//! OCR collaborator boundary for docscan
//!
//! The layout engine never runs OCR itself. Whatever engine produced the words (Tesseract,
//! a `PaddleOCR` service, a cached dump on disk) hands them over through this crate:
//!
//! 1. **[`OcrTokens`]**: the raw, index-aligned arrays an engine emits
//!    (`text[i]`, `conf[i]`, `left[i]`, `top[i]`, `width[i]`, `height[i]` describe token *i*).
//!    The JSON shape matches Tesseract's `image_to_data` dictionary output.
//! 2. **[`Token`]**: one validated word with a [`BBox`] and a confidence in `[0, 1]`.
//! 3. **[`OcrBackend`]**: the trait an engine implements so the analyzer can ask it for
//!    tokens of a raster image. [`TokenDumpBackend`] replays a stored dump and
//!    [`UnavailableBackend`] stands in for an engine that is not installed.
//!
//! # Example
//!
//! ```
//! use docscan_ocr::OcrTokens;
//!
//! let dump = OcrTokens::from_json_str(
//!     r#"{"text":["Name","Amt"],"conf":[96,91],"left":[10,200],"top":[5,6],"width":[60,40],"height":[12,12]}"#,
//! ).unwrap();
//! let tokens = dump.to_tokens().unwrap();
//! assert_eq!(tokens.len(), 2);
//! assert!((tokens[0].confidence - 0.96).abs() < 1e-9);
//! ```

use image::DynamicImage;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Upper end of the confidence scale used by OCR engines (0..100)
const ENGINE_CONFIDENCE_SCALE: f64 = 100.0;

/// OCR boundary errors
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine is not installed or failed to initialise
    #[error("OCR backend '{backend}' is not available: {reason}")]
    Unavailable {
        /// Backend name
        backend: String,
        /// Why the backend cannot be used
        reason: String,
    },

    /// Token arrays are not index-aligned or a token violates its invariants
    #[error("Malformed OCR input: {0}")]
    MalformedInput(String),

    /// The engine ran but failed on this image
    #[error("OCR recognition failed: {0}")]
    Recognition(String),

    /// Reading a token dump failed
    #[error("Failed to read OCR dump: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing a token dump failed
    #[error("Failed to parse OCR dump: {0}")]
    Json(#[from] serde_json::Error),
}

/// Bounding box with left, top, right, bottom coordinates (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub l: f64, // left (x1)
    pub t: f64, // top (y1)
    pub r: f64, // right (x2)
    pub b: f64, // bottom (y2)
}

impl BBox {
    /// Create a new bounding box
    #[inline]
    #[must_use = "returns a new BBox instance"]
    pub const fn new(l: f64, t: f64, r: f64, b: f64) -> Self {
        Self { l, t, r, b }
    }

    /// Create a bounding box from an OCR `left/top/width/height` quadruple
    #[inline]
    #[must_use = "returns a new BBox instance"]
    pub fn from_ltwh(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.r - self.l
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.b - self.t
    }

    /// Center point `(x, y)`
    #[inline]
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        ((self.l + self.r) / 2.0, (self.t + self.b) / 2.0)
    }

    /// Calculate area of the bounding box
    #[inline]
    #[must_use = "returns the bounding box area"]
    pub fn area(&self) -> f64 {
        let width = (self.r - self.l).abs();
        let height = (self.b - self.t).abs();
        width * height
    }

    /// Calculate intersection area with another bbox
    #[inline]
    #[must_use = "returns the intersection area"]
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let x_left = self.l.max(other.l);
        let y_top = self.t.max(other.t);
        let x_right = self.r.min(other.r);
        let y_bottom = self.b.min(other.b);

        let width = (x_right - x_left).max(0.0);
        let height = (y_bottom - y_top).max(0.0);

        width * height
    }

    /// Intersection area divided by this box's own area (NOT `IoU`)
    #[inline]
    #[must_use = "returns the intersection-over-self ratio"]
    pub fn intersection_over_self(&self, other: &Self) -> f64 {
        let intersection = self.intersection_area(other);
        let self_area = self.area();

        if self_area > 0.0 {
            intersection / self_area
        } else {
            0.0
        }
    }

    /// Smallest box covering both boxes
    #[inline]
    #[must_use = "returns the union bounding box"]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            l: self.l.min(other.l),
            t: self.t.min(other.t),
            r: self.r.max(other.r),
            b: self.b.max(other.b),
        }
    }

    /// True when `other` lies fully inside this box (all four bounds, edges inclusive)
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.l >= self.l && other.t >= self.t && other.r <= self.r && other.b <= self.b
    }
}

/// One OCR-recognised word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub bbox: BBox,
    /// Recognition confidence in `[0, 1]`
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Token {
    /// Create a token, enforcing `x1 < x2`, `y1 < y2` and a confidence in `[0, 1]`
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::MalformedInput`] when the box is degenerate or the confidence is
    /// out of range.
    pub fn new(text: impl Into<String>, bbox: BBox, confidence: f64) -> Result<Self, OcrError> {
        let text = text.into();
        if !(bbox.l < bbox.r && bbox.t < bbox.b) {
            return Err(OcrError::MalformedInput(format!(
                "token {text:?} has a degenerate box ({:.1},{:.1})→({:.1},{:.1})",
                bbox.l, bbox.t, bbox.r, bbox.b
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(OcrError::MalformedInput(format!(
                "token {text:?} has confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self {
            text,
            bbox,
            confidence,
            page: None,
        })
    }

    /// Same token tagged with a page index
    #[inline]
    #[must_use]
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[inline]
    #[must_use]
    pub fn left(&self) -> f64 {
        self.bbox.l
    }

    #[inline]
    #[must_use]
    pub fn top(&self) -> f64 {
        self.bbox.t
    }
}

/// Raw OCR output: index-aligned arrays, one entry per recognised box
///
/// `conf` is on the engine scale `0..100`; Tesseract reports `-1` for boxes that are not
/// words (blocks, paragraphs, lines), which are skipped during conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrTokens {
    pub text: Vec<String>,
    #[serde(alias = "confidence")]
    pub conf: Vec<f64>,
    pub left: Vec<f64>,
    pub top: Vec<f64>,
    pub width: Vec<f64>,
    pub height: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl OcrTokens {
    /// Parse a JSON token dump
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::Json`] when the document does not match the dump shape.
    pub fn from_json_str(json: &str) -> Result<Self, OcrError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON token dump from disk
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::Io`] or [`OcrError::Json`].
    pub fn from_path(path: &Path) -> Result<Self, OcrError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Build a dump from already-validated tokens (confidence rescaled to `0..100`)
    #[must_use]
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut dump = Self {
            page: tokens.first().and_then(|t| t.page),
            ..Self::default()
        };
        for token in tokens {
            dump.text.push(token.text.clone());
            dump.conf.push(token.confidence * ENGINE_CONFIDENCE_SCALE);
            dump.left.push(token.bbox.l);
            dump.top.push(token.bbox.t);
            dump.width.push(token.bbox.width());
            dump.height.push(token.bbox.height());
        }
        dump
    }

    /// Number of entries (valid only after [`OcrTokens::validate`])
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Check that all five arrays are index-aligned
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::MalformedInput`] naming every array whose length differs from
    /// `text`. Mismatched arrays are never truncated or zipped.
    pub fn validate(&self) -> Result<(), OcrError> {
        let expected = self.text.len();
        let mismatched: Vec<String> = [
            ("conf", self.conf.len()),
            ("left", self.left.len()),
            ("top", self.top.len()),
            ("width", self.width.len()),
            ("height", self.height.len()),
        ]
        .iter()
        .filter(|(_, len)| *len != expected)
        .map(|(name, len)| format!("{name}={len}"))
        .collect();

        if mismatched.is_empty() {
            Ok(())
        } else {
            Err(OcrError::MalformedInput(format!(
                "token arrays are not index-aligned: text={expected}, {}",
                mismatched.join(", ")
            )))
        }
    }

    /// Convert to validated [`Token`]s
    ///
    /// Skips entries with blank text, non-positive confidence, or a degenerate box.
    /// Confidence is rescaled from `0..100` to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::MalformedInput`] when the arrays are not index-aligned.
    pub fn to_tokens(&self) -> Result<Vec<Token>, OcrError> {
        self.validate()?;

        let mut tokens = Vec::with_capacity(self.len());
        let mut skipped = 0usize;

        for i in 0..self.len() {
            let text = self.text[i].trim();
            let conf = self.conf[i];
            if text.is_empty() || conf <= 0.0 {
                skipped += 1;
                continue;
            }

            let bbox = BBox::from_ltwh(self.left[i], self.top[i], self.width[i], self.height[i]);
            let confidence = (conf / ENGINE_CONFIDENCE_SCALE).clamp(0.0, 1.0);
            match Token::new(text, bbox, confidence) {
                Ok(token) => {
                    let token = match self.page {
                        Some(page) => token.on_page(page),
                        None => token,
                    };
                    tokens.push(token);
                }
                Err(e) => {
                    trace!("Skipping OCR entry {i}: {e}");
                    skipped += 1;
                }
            }
        }

        debug!(
            "Converted OCR dump: {} tokens kept, {} entries skipped",
            tokens.len(),
            skipped
        );
        Ok(tokens)
    }
}

/// An OCR engine able to turn a raster image into a token dump
///
/// Backends declare availability up front; callers check [`OcrBackend::is_available`]
/// instead of probing for installed libraries.
pub trait OcrBackend: Send + Sync {
    /// Short engine name used in logs and error messages
    fn name(&self) -> &str;

    /// Whether the engine can currently be used
    fn is_available(&self) -> bool {
        true
    }

    /// Recognise words in the image
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::Unavailable`] when the engine is missing and
    /// [`OcrError::Recognition`] when it fails on this image.
    fn recognize(&self, image: &DynamicImage) -> Result<OcrTokens, OcrError>;
}

/// Backend replaying a previously recorded token dump
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDumpBackend {
    name: String,
    tokens: OcrTokens,
}

impl TokenDumpBackend {
    /// Wrap an in-memory dump
    #[inline]
    #[must_use = "backend is created but not used"]
    pub fn new(tokens: OcrTokens) -> Self {
        Self {
            name: "token-dump".to_string(),
            tokens,
        }
    }

    /// Load the dump from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::Io`] or [`OcrError::Json`].
    pub fn from_path(path: &Path) -> Result<Self, OcrError> {
        let tokens = OcrTokens::from_path(path)?;
        Ok(Self {
            name: format!("token-dump:{}", path.display()),
            tokens,
        })
    }

    #[inline]
    #[must_use]
    pub const fn tokens(&self) -> &OcrTokens {
        &self.tokens
    }
}

impl OcrBackend for TokenDumpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<OcrTokens, OcrError> {
        Ok(self.tokens.clone())
    }
}

/// Placeholder for an engine that is not installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableBackend {
    name: String,
    reason: String,
}

impl UnavailableBackend {
    #[inline]
    #[must_use = "backend is created but not used"]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl OcrBackend for UnavailableBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        false
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<OcrTokens, OcrError> {
        Err(OcrError::Unavailable {
            backend: self.name.clone(),
            reason: self.reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump() -> OcrTokens {
        OcrTokens {
            text: vec!["Name".into(), "  ".into(), "Amt".into(), "x".into()],
            conf: vec![96.0, 95.0, 91.0, -1.0],
            left: vec![10.0, 80.0, 200.0, 300.0],
            top: vec![5.0, 5.0, 6.0, 7.0],
            width: vec![60.0, 5.0, 40.0, 10.0],
            height: vec![12.0, 12.0, 12.0, 12.0],
            page: None,
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_bbox_calculations() {
        let bbox = BBox::from_ltwh(10.0, 20.0, 100.0, 50.0);
        assert_eq!(bbox.r, 110.0);
        assert_eq!(bbox.b, 70.0);
        assert_eq!(bbox.center(), (60.0, 45.0));
        assert_eq!(bbox.area(), 5000.0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_bbox_intersection_over_self_is_asymmetric() {
        let a = BBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BBox::new(50.0, 50.0, 140.0, 140.0);
        assert_eq!(a.intersection_area(&b), 2500.0);
        assert_eq!(a.intersection_over_self(&b), 0.25);
        assert!((b.intersection_over_self(&a) - 2500.0 / 8100.0).abs() < 1e-12);
    }

    #[test]
    fn test_bbox_contains_is_inclusive() {
        let outer = BBox::new(0.0, 0.0, 100.0, 50.0);
        assert!(outer.contains(&BBox::new(0.0, 0.0, 100.0, 50.0)));
        assert!(outer.contains(&BBox::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!outer.contains(&BBox::new(90.0, 10.0, 101.0, 20.0)));
    }

    #[test]
    fn test_token_rejects_degenerate_box() {
        let err = Token::new("x", BBox::new(5.0, 5.0, 5.0, 10.0), 0.5).unwrap_err();
        assert!(matches!(err, OcrError::MalformedInput(_)));
        assert!(Token::new("x", BBox::new(0.0, 0.0, 1.0, 1.0), 1.5).is_err());
    }

    #[test]
    fn test_to_tokens_skips_blank_and_non_words() {
        let tokens = dump().to_tokens().unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Name", "Amt"]);
        assert!((tokens[1].confidence - 0.91).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_arrays_fail_fast() {
        let mut d = dump();
        d.top.pop();
        d.height.push(3.0);
        let err = d.to_tokens().unwrap_err().to_string();
        assert!(err.contains("top=3"), "{err}");
        assert!(err.contains("height=5"), "{err}");
        assert!(err.contains("text=4"), "{err}");
    }

    #[test]
    fn test_page_is_propagated() {
        let mut d = dump();
        d.page = Some(3);
        let tokens = d.to_tokens().unwrap();
        assert!(tokens.iter().all(|t| t.page == Some(3)));
    }

    #[test]
    fn test_confidence_alias_accepted() {
        let dump = OcrTokens::from_json_str(
            r#"{"text":["a"],"confidence":[50],"left":[0],"top":[0],"width":[4],"height":[4]}"#,
        )
        .unwrap();
        assert_eq!(dump.len(), 1);
    }

    #[test]
    fn test_from_tokens_round_trips() {
        let tokens = dump().to_tokens().unwrap();
        let rebuilt = OcrTokens::from_tokens(&tokens).to_tokens().unwrap();
        assert_eq!(tokens, rebuilt);
    }

    #[test]
    fn test_dump_backend_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, serde_json::to_string(&dump()).unwrap()).unwrap();

        let backend = TokenDumpBackend::from_path(&path).unwrap();
        assert!(backend.is_available());
        let image = DynamicImage::new_luma8(4, 4);
        assert_eq!(backend.recognize(&image).unwrap(), dump());
    }

    #[test]
    fn test_unavailable_backend_reports_reason() {
        let backend = UnavailableBackend::new("tesseract", "binary not on PATH");
        assert!(!backend.is_available());
        let err = backend
            .recognize(&DynamicImage::new_luma8(1, 1))
            .unwrap_err()
            .to_string();
        assert_eq!(
            err,
            "OCR backend 'tesseract' is not available: binary not on PATH"
        );
    }
}
