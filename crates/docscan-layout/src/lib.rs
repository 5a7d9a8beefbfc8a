//! # docscan-layout - Layout analysis and table reconstruction over noisy OCR
//!
//! Separates prose from tables on scanned pages and rebuilds tables as clean grids.
//!
//! ## Pipeline
//!
//! 1. [`LineGrouper`]: tokens → lines by top-Y proximity
//! 2. [`TableDetector`]: ruled regions from the raster ([`LineMorphologyStrategy`]) and
//!    column-aligned line runs from the tokens ([`TokenAlignmentStrategy`]), merged by
//!    [`RegionMerger`]
//! 3. [`TextExtractor`]: tokens outside every table become [`TextBlock`]s
//! 4. [`LayoutAnalyzer`]: orchestrates 1-3 and scores the page
//!
//! Table extraction from a single token list ([`TableExtractor`]) uses the
//! [`StructureCheck`] for structured engine output and the [`FallbackReconstructor`]
//! otherwise; [`StructuredFormatter`] turns grids into header-keyed [`Record`]s.
//!
//! ## Example
//!
//! ```
//! use docscan_layout::LayoutAnalyzer;
//! use docscan_ocr::OcrTokens;
//!
//! let tokens = OcrTokens::from_json_str(r#"{
//!     "text": ["Name", "Amt", "Aspirin", "20"],
//!     "conf": [95, 95, 90, 90],
//!     "left": [40, 300, 42, 305],
//!     "top": [100, 100, 130, 130],
//!     "width": [50, 50, 50, 50],
//!     "height": [14, 14, 14, 14]
//! }"#).unwrap();
//!
//! let analyzer = LayoutAnalyzer::new();
//! let result = analyzer.analyze_layout(None, Some(&tokens));
//! assert_eq!(result.tables.len(), 1);
//! assert_eq!(result.tables[0].structured_data[1], vec!["Aspirin", "20"]);
//! ```

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod formatter;
pub mod line_grouper;
pub mod pages;
pub mod structure;
pub mod text_extractor;
pub mod types;

pub use analyzer::{layout_confidence, LayoutAnalyzer};
pub use config::{
    AlignmentConfig, ColumnConfig, FallbackConfig, LayoutConfig, LineGroupingConfig,
    LineMorphologyConfig, MergeConfig, StructureConfig,
};
pub use detector::{
    Capability, ColumnAssigner, LineMorphologyStrategy, PageContext, RegionMerger,
    TableDetector, TableStrategy, TokenAlignmentStrategy,
};
pub use error::{LayoutError, Result};
pub use extract::{ExtractOptions, ExtractionMethod, TableExtraction, TableExtractor, TableSource};
pub use fallback::{DebugInfo, FallbackReconstructor, Reconstruction};
pub use formatter::{Record, StructuredFormatter};
pub use line_grouper::{LineGrouper, Lines};
pub use pages::{DocumentLayout, PageAnalyzer, PageFailure, PageInput, PageLayout};
pub use structure::{StructureCheck, StructureVerdict};
pub use text_extractor::TextExtractor;
pub use types::{Cell, FormattedTable, LayoutResult, Line, TableMethod, TableRegion, TextBlock};
