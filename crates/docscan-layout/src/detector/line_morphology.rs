//! Ruled-table detection by morphological line extraction
//!
//! Algorithm:
//! 1. Grayscale, then Otsu global threshold, inverted (ink → 255)
//! 2. Opening with a `kernel_len × 1` rectangle keeps horizontal rules, `1 × kernel_len`
//!    keeps vertical rules; text strokes shorter than the kernel vanish
//! 3. Pixelwise max of both masks
//! 4. Bounding box of every external contour; keep those wider than `min_width` and taller
//!    than `min_height`
//!
//! A raster without contrast has no ink and yields no candidates.

use docscan_ocr::BBox;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::otsu_level;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use log::{debug, trace};

use super::{Capability, PageContext, TableStrategy};
use crate::config::LineMorphologyConfig;
use crate::error::{LayoutError, Result};
use crate::types::{TableMethod, TableRegion};

const INK: u8 = 255;

/// Finds ruled tables in a raster image
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineMorphologyStrategy {
    config: LineMorphologyConfig,
}

impl LineMorphologyStrategy {
    #[inline]
    #[must_use = "returns a new LineMorphologyStrategy instance"]
    pub fn new() -> Self {
        Self {
            config: LineMorphologyConfig::default(),
        }
    }

    #[inline]
    #[must_use = "returns a new LineMorphologyStrategy with custom config"]
    pub const fn with_config(config: LineMorphologyConfig) -> Self {
        Self { config }
    }

    /// Candidate regions of a raster
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Config`] when `kernel_len` cannot form a structuring element.
    pub fn detect_image(&self, image: &DynamicImage) -> Result<Vec<TableRegion>> {
        let gray = image.to_luma8();
        let Some(binary) = binarize_inverted(&gray) else {
            debug!("Raster has no contrast, skipping ruled-table detection");
            return Ok(Vec::new());
        };

        let horizontal = self.open(&binary, true)?;
        let vertical = self.open(&binary, false)?;
        let mut rules = horizontal;
        for (h, v) in rules.pixels_mut().zip(vertical.pixels()) {
            h.0[0] = h.0[0].max(v.0[0]);
        }

        let contours: Vec<Contour<u32>> = find_contours(&rules);
        let regions: Vec<TableRegion> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| self.region_for(c))
            .collect();

        debug!(
            "Line morphology: {} contours, {} ruled regions",
            contours.len(),
            regions.len()
        );
        Ok(regions)
    }

    /// Opening: erosion, then dilation with the reflected line element
    fn open(&self, binary: &GrayImage, horizontal: bool) -> Result<GrayImage> {
        let len = self.config.kernel_len;
        let too_long =
            || LayoutError::Config(format!("line_morphology.kernel_len {len} is too long"));
        let anchor = u8::try_from(len / 2).map_err(|_| too_long())?;
        let reflected = u8::try_from(len - 1 - len / 2).map_err(|_| too_long())?;
        let eroded = grayscale_erode(binary, &line_mask(len, anchor, horizontal));
        Ok(grayscale_dilate(&eroded, &line_mask(len, reflected, horizontal)))
    }

    fn region_for(&self, contour: &Contour<u32>) -> Option<TableRegion> {
        let min_x = contour.points.iter().map(|p| p.x).min()?;
        let max_x = contour.points.iter().map(|p| p.x).max()?;
        let min_y = contour.points.iter().map(|p| p.y).min()?;
        let max_y = contour.points.iter().map(|p| p.y).max()?;
        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;

        if width <= self.config.min_width || height <= self.config.min_height {
            trace!("Dropping ruled contour {width}x{height} at ({min_x},{min_y})");
            return None;
        }

        let bbox = BBox::new(
            f64::from(min_x),
            f64::from(min_y),
            f64::from(min_x + width),
            f64::from(min_y + height),
        );
        Some(TableRegion::new(
            bbox,
            self.config.confidence,
            TableMethod::LineMorphology,
        ))
    }
}

fn line_mask(len: u32, anchor: u8, horizontal: bool) -> Mask {
    if horizontal {
        Mask::from_image(&GrayImage::from_pixel(len, 1, Luma([INK])), anchor, 0)
    } else {
        Mask::from_image(&GrayImage::from_pixel(1, len, Luma([INK])), 0, anchor)
    }
}

/// Otsu threshold with ink as foreground; `None` when every pixel has the same value
fn binarize_inverted(gray: &GrayImage) -> Option<GrayImage> {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if min >= max {
        return None;
    }

    let level = otsu_level(gray);
    let mut binary = gray.clone();
    for pixel in binary.pixels_mut() {
        pixel.0[0] = if pixel.0[0] <= level { INK } else { 0 };
    }
    Some(binary)
}

impl TableStrategy for LineMorphologyStrategy {
    fn name(&self) -> &str {
        "line-morphology"
    }

    fn capability(&self) -> Capability {
        if self.config.enabled {
            Capability::LineMorphology
        } else {
            Capability::Unavailable
        }
    }

    fn detect(&self, page: &PageContext<'_>) -> Result<Vec<TableRegion>> {
        match page.image {
            Some(image) => self.detect_image(image),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn ruled_table() -> GrayImage {
        let mut img = GrayImage::from_pixel(400, 300, Luma([255]));
        let ink = Luma([0]);
        for y in [50, 150, 250] {
            draw_filled_rect_mut(&mut img, Rect::at(50, y).of_size(302, 2), ink);
        }
        for x in [50, 200, 350] {
            draw_filled_rect_mut(&mut img, Rect::at(x, 50).of_size(2, 202), ink);
        }
        // text-sized blob, removed by the opening
        draw_filled_rect_mut(&mut img, Rect::at(80, 90).of_size(12, 12), ink);
        img
    }

    #[test]
    fn test_ruled_grid_found() {
        let strategy = LineMorphologyStrategy::new();
        let regions = strategy
            .detect_image(&DynamicImage::ImageLuma8(ruled_table()))
            .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, BBox::new(50.0, 50.0, 352.0, 252.0));
        assert_eq!(regions[0].method, TableMethod::LineMorphology);
        assert!((regions[0].confidence - 0.7).abs() < f64::EPSILON);
        assert!(regions[0].cells.is_empty());
    }

    #[test]
    fn test_bbox_matches_ink_extent() {
        // ink covers x 50..250, y 50..150 (exclusive)
        let mut img = GrayImage::from_pixel(320, 220, Luma([255]));
        let ink = Luma([0]);
        draw_filled_rect_mut(&mut img, Rect::at(50, 50).of_size(200, 2), ink);
        draw_filled_rect_mut(&mut img, Rect::at(50, 148).of_size(200, 2), ink);
        draw_filled_rect_mut(&mut img, Rect::at(50, 50).of_size(2, 100), ink);
        draw_filled_rect_mut(&mut img, Rect::at(248, 50).of_size(2, 100), ink);
        let image = DynamicImage::ImageLuma8(img);

        for kernel_len in [40, 41] {
            let strategy = LineMorphologyStrategy::with_config(LineMorphologyConfig {
                kernel_len,
                ..LineMorphologyConfig::default()
            });
            let regions = strategy.detect_image(&image).unwrap();
            assert_eq!(regions.len(), 1, "kernel_len {kernel_len}");
            assert_eq!(
                regions[0].bbox,
                BBox::new(50.0, 50.0, 250.0, 150.0),
                "kernel_len {kernel_len}"
            );
        }
    }

    #[test]
    fn test_blank_raster_has_no_candidates() {
        let strategy = LineMorphologyStrategy::new();
        for value in [0u8, 255] {
            let img = GrayImage::from_pixel(200, 200, Luma([value]));
            assert!(strategy
                .detect_image(&DynamicImage::ImageLuma8(img))
                .unwrap()
                .is_empty());
        }
    }

    #[test]
    fn test_small_box_discarded() {
        let mut img = GrayImage::from_pixel(300, 200, Luma([255]));
        let ink = Luma([0]);
        // 90 x 60 ruled box: too narrow
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(90, 2), ink);
        draw_filled_rect_mut(&mut img, Rect::at(10, 68).of_size(90, 2), ink);
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(2, 60), ink);
        draw_filled_rect_mut(&mut img, Rect::at(98, 10).of_size(2, 60), ink);
        let regions = LineMorphologyStrategy::new()
            .detect_image(&DynamicImage::ImageLuma8(img))
            .unwrap();
        assert!(regions.is_empty());
    }
}
